//! # rebonnte-session: Session State for Rebonnte
//!
//! This crate holds what a signed-in session keeps between storage calls:
//! the state behind each screen, the debounced stock updater and the
//! authentication boundary. Every container is owned by the session that
//! created it; nothing here is a process-wide singleton.
//!
//! ## Architecture Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Session Architecture                             │
//! │                                                                         │
//! │  ┌──────────────────┐  ┌──────────────────┐  ┌──────────────────────┐  │
//! │  │ MedicineCatalog  │  │ AisleList        │  │ Accounts             │  │
//! │  │ AddMedicineForm  │  │ AddAisleForm     │  │                      │  │
//! │  │                  │  │ AisleDetail      │  │ AuthProvider         │  │
//! │  │ filter / sort    │  │ delete +         │  │  └ LocalAuthProvider │  │
//! │  │ prefix search    │  │ reassignment     │  │ profile mirroring    │  │
//! │  └────────┬─────────┘  └────────┬─────────┘  └──────────┬───────────┘  │
//! │           │                     │                       │              │
//! │  ┌────────┴─────────────────────┴───────────────────────┴───────────┐  │
//! │  │ MedicineDetail                                                   │  │
//! │  │   caches (watch) ◄── StockUpdater: taps ─► debounce ─► 1 write   │  │
//! │  └──────────────────────────────┬───────────────────────────────────┘  │
//! │                                 ▼                                      │
//! │                        rebonnte-db gateway                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`account`] - Registration, sign-in and account removal
//! - [`aisles`] - Aisle list, add-aisle form, aisle detail and deletion
//! - [`auth`] - `AuthProvider` trait and the in-process provider
//! - [`config`] - Session configuration (TOML + environment)
//! - [`error`] - Session error types
//! - [`medicine_detail`] - Medicine screen caches and stock taps
//! - [`medicines`] - Catalog list and add-medicine form
//! - [`stock_updater`] - Debounced stock writes
//!
//! ## Usage
//!
//! ```rust,ignore
//! use rebonnte_session::{MedicineDetail, SessionConfig};
//! use rebonnte_db::Database;
//!
//! let config = SessionConfig::load_or_default(None);
//! let db = Database::new(config.db_config()).await?;
//!
//! let detail = MedicineDetail::new(db, medicine_id, Some(uid), config.debounce());
//! detail.load_medicine().await?;
//!
//! detail.apply_delta(1);
//! detail.apply_delta(1);
//! // one write of +2 after the debounce window
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod account;
pub mod aisles;
pub mod auth;
pub mod config;
pub mod error;
pub mod medicine_detail;
pub mod medicines;
pub mod stock_updater;

// =============================================================================
// Re-exports
// =============================================================================

pub use account::Accounts;
pub use aisles::{AddAisleForm, AisleDetail, AisleList, ReassignmentReport};
pub use auth::{AuthError, AuthIdentity, AuthProvider, AuthResult, LocalAuthProvider};
pub use config::SessionConfig;
pub use error::{SessionError, SessionResult};
pub use medicine_detail::MedicineDetail;
pub use medicines::{AddMedicineForm, CatalogSort, MedicineCatalog};
pub use stock_updater::{StockUpdater, UpdateOutcome, UpdaterPhase};
