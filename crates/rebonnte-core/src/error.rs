//! # Error Types
//!
//! Domain-specific error types for rebonnte-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  rebonnte-core errors (this file)                                      │
//! │  ├── CoreError        - General domain errors                          │
//! │  └── ValidationError  - Form input failures (user-facing messages)     │
//! │                                                                         │
//! │  rebonnte-db errors (separate crate)                                   │
//! │  └── DbError          - Never leaves the gateway boundary              │
//! │                                                                         │
//! │  rebonnte-session errors                                               │
//! │  ├── SessionError     - What a screen sees                             │
//! │  └── AuthError        - Authentication boundary failures               │
//! │                                                                         │
//! │  Flow: ValidationError → SessionError → transient notification         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core domain errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Medicine cannot be found.
    #[error("Medicine not found: {0}")]
    MedicineNotFound(String),

    /// Aisle cannot be found.
    #[error("Aisle not found: {0}")]
    AisleNotFound(String),

    /// The default aisle is the reassignment target and cannot be removed.
    ///
    /// ## When This Occurs
    /// ```text
    /// delete_aisle(DEFAULT_AISLE_ID)
    ///      │
    ///      ▼
    /// Nowhere to move its medicines
    ///      │
    ///      ▼
    /// DefaultAisleProtected
    /// ```
    #[error("The default aisle cannot be deleted")]
    DefaultAisleProtected,

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// `Required` carries the exact message shown to the user, since each form
/// field has its own wording.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is missing or blank.
    #[error("{message}")]
    Required { field: String, message: String },

    /// Field value is too short.
    #[error("{field} must be at least {min} characters")]
    TooShort { field: String, min: usize },

    /// Invalid format (e.g. malformed email).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

impl ValidationError {
    /// Creates a `Required` error with its user-facing message.
    pub fn required(field: impl Into<String>, message: impl Into<String>) -> Self {
        ValidationError::Required {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Name of the offending field.
    pub fn field(&self) -> &str {
        match self {
            ValidationError::Required { field, .. }
            | ValidationError::TooShort { field, .. }
            | ValidationError::InvalidFormat { field, .. } => field,
        }
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_displays_its_message() {
        let err = ValidationError::required("name", "Aisle name is required.");
        assert_eq!(err.to_string(), "Aisle name is required.");
        assert_eq!(err.field(), "name");
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::TooShort {
            field: "password".to_string(),
            min: 6,
        };
        assert_eq!(err.to_string(), "password must be at least 6 characters");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::required("name", "Medicine name is required.");
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
