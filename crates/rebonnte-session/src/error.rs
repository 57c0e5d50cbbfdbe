//! # Session Error Types
//!
//! Errors surfaced by session flows to the screens that drive them.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Session Error Categories                           │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │  Form input     │  │  Gateway        │  │  Boundary               │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  Validation     │  │  Duplicate      │  │  Auth                   │ │
//! │  │                 │  │  OperationFailed│  │  Config                 │ │
//! │  │                 │  │  DefaultAisle-  │  │                         │ │
//! │  │                 │  │   Protected     │  │                         │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The gateway never reports why a write failed, only that it did. Session
//! errors therefore carry user-facing messages, not storage causes.

use thiserror::Error;

use crate::auth::AuthError;
use rebonnte_core::{CoreError, ValidationError};

/// Result type alias for session operations.
pub type SessionResult<T> = Result<T, SessionError>;

/// Session error type.
#[derive(Debug, Error)]
pub enum SessionError {
    /// A form field failed validation. Displays the field's message.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The name is already taken.
    #[error("{entity} '{name}' already exists")]
    Duplicate { entity: &'static str, name: String },

    /// A gateway call returned its failure sentinel.
    #[error("{0}")]
    OperationFailed(String),

    /// The default aisle is the reassignment target and cannot be removed.
    #[error("The default aisle cannot be deleted")]
    DefaultAisleProtected,

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl SessionError {
    pub fn failed(message: impl Into<String>) -> Self {
        SessionError::OperationFailed(message.into())
    }
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<CoreError> for SessionError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Validation(e) => SessionError::Validation(e),
            CoreError::DefaultAisleProtected => SessionError::DefaultAisleProtected,
            other => SessionError::OperationFailed(other.to_string()),
        }
    }
}

impl From<std::io::Error> for SessionError {
    fn from(err: std::io::Error) -> Self {
        SessionError::Config(err.to_string())
    }
}

impl From<toml::de::Error> for SessionError {
    fn from(err: toml::de::Error) -> Self {
        SessionError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for SessionError {
    fn from(err: toml::ser::Error) -> Self {
        SessionError::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_displays_field_message() {
        let err: SessionError =
            ValidationError::required("name", "Aisle name is required.").into();
        assert_eq!(err.to_string(), "Aisle name is required.");
    }

    #[test]
    fn test_core_error_mapping() {
        let err: SessionError = CoreError::DefaultAisleProtected.into();
        assert!(matches!(err, SessionError::DefaultAisleProtected));

        let err: SessionError = CoreError::AisleNotFound("a-1".to_string()).into();
        assert!(matches!(err, SessionError::OperationFailed(_)));
    }

    #[test]
    fn test_duplicate_message() {
        let err = SessionError::Duplicate {
            entity: "Aisle",
            name: "Fridge".to_string(),
        };
        assert_eq!(err.to_string(), "Aisle 'Fridge' already exists");
    }
}
