//! # Repository Module
//!
//! One repository per collection. Together they form the gateway every
//! session flow goes through.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Gateway Error Boundary                               │
//! │                                                                         │
//! │  Session flow                                                          │
//! │       │                                                                 │
//! │       │  db.stock().update_quantity_in_stock(id, -1, author, "")       │
//! │       ▼                                                                 │
//! │  StockRepository (public method)                                       │
//! │       │                                                                 │
//! │       │  apply_quantity_delta(...) -> DbResult<()>                     │
//! │       ▼                                                                 │
//! │  SQLite ── error? ──► settle(): warn! + sentinel (false/None/[])       │
//! │       │                                                                 │
//! │       └── ok ──► db.notify(Collection::Stock) ──► live subscriptions   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`aisle::AisleRepository`] - Aisle CRUD and aisle contents
//! - [`medicine::MedicineRepository`] - Medicine CRUD, search and catalog
//! - [`stock::StockRepository`] - Quantity updates and aisle moves
//! - [`history::HistoryRepository`] - Append-only stock history
//! - [`user::UserRepository`] - Mirrored user profiles

pub mod aisle;
pub mod history;
pub mod medicine;
pub mod stock;
pub mod user;

use tracing::warn;

use crate::error::DbResult;

/// Resolves a gateway result at the error boundary.
///
/// Errors are logged under `operation` and replaced by `fallback`.
pub(crate) fn settle<T>(operation: &'static str, result: DbResult<T>, fallback: T) -> T {
    match result {
        Ok(value) => value,
        Err(e) => {
            warn!(operation, error = %e, "Gateway operation failed");
            fallback
        }
    }
}
