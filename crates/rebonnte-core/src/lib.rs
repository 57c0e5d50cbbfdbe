//! # rebonnte-core: Pure Domain Logic for Rebonnte
//!
//! This crate holds the pharmacy-stock domain: records, the stock clamping
//! rule, history entry construction and form validation. It has zero I/O
//! dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Rebonnte Architecture                            │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    Screens (out of tree)                        │   │
//! │  │    Aisles ──► Aisle detail ──► Medicine detail ──► History     │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    rebonnte-session                             │   │
//! │  │    StockUpdater, AisleDetail, MedicineDetail, Accounts          │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ rebonnte-core (THIS CRATE) ★                    │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌──────────────┐  ┌───────────┐               │   │
//! │  │   │   types   │  │  validation  │  │   error   │               │   │
//! │  │   │  Medicine │  │  form rules  │  │ CoreError │               │   │
//! │  │   │  Stock    │  │  credentials │  │           │               │   │
//! │  │   └───────────┘  └──────────────┘  └───────────┘               │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                  rebonnte-db (Gateway Layer)                    │   │
//! │  │        SQLite queries, live subscriptions, repositories         │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain records (Aisle, Medicine, Stock, StockHistory, User)
//! - [`error`] - Domain error types
//! - [`validation`] - Form and credential validation
//!
//! ## Example Usage
//!
//! ```rust
//! use rebonnte_core::{apply_delta, StockAction};
//!
//! // Stock never goes below zero
//! assert_eq!(apply_delta(2, -5), 0);
//!
//! // The action label follows the delta sign
//! assert_eq!(StockAction::from_delta(1).as_str(), "ADD");
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Well-known aisle id for medicines without a location.
///
/// Used when a medicine is created without an aisle, and as the
/// reassignment target when an aisle is deleted.
pub const DEFAULT_AISLE_ID: &str = "0phZ52jwfLfhd7ri8PqH";

/// Display name of the default aisle.
pub const DEFAULT_AISLE_NAME: &str = "Unassigned medications";

/// Author recorded when the acting user's profile cannot be resolved.
pub const UNKNOWN_AUTHOR: &str = "Unknown";

/// Medicine name recorded in history when the medicine record is missing.
pub const UNKNOWN_MEDICINE_NAME: &str = "Unknown";

/// Aisle name shown when a medicine's aisle cannot be resolved.
pub const UNKNOWN_AISLE_NAME: &str = "Unknown";

/// Description recorded on history entries written from the medicine screen.
pub const STOCK_UPDATE_DESCRIPTION: &str = "Stock Update";

/// Delay after the last tap before a batched stock write is flushed.
pub const DEFAULT_DEBOUNCE_MS: u64 = 1000;

/// Highest BMP private-use code point, appended to a prefix to close a
/// name range query.
pub const SEARCH_PREFIX_SENTINEL: char = '\u{f8ff}';

/// `dd-MM-yyyy`
pub const HISTORY_DATE_FORMAT: &str = "%d-%m-%Y";

/// `HH:mm:ss`
pub const HISTORY_TIME_FORMAT: &str = "%H:%M:%S";

/// Minimum password length accepted at registration.
pub const MIN_PASSWORD_LENGTH: usize = 6;
