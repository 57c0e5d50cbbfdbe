//! # rebonnte-db: Document-Store Gateway for Rebonnte
//!
//! This crate provides storage access for the Rebonnte pharmacy stock
//! system. It uses SQLite with sqlx for async operations and exposes one
//! repository per collection, plus live subscriptions driven by an
//! in-process change feed.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Rebonnte Data Flow                               │
//! │                                                                         │
//! │  Session flow (StockUpdater flush, AisleDetail delete, ...)            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                   rebonnte-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │ Subscription │  │   │
//! │  │   │   (pool.rs)   │    │               │    │              │  │   │
//! │  │   │               │    │ AisleRepo     │    │ listener task│  │   │
//! │  │   │ SqlitePool    │◄───│ MedicineRepo  │───►│ mpsc buffer  │  │   │
//! │  │   │ change feed   │    │ StockRepo     │    │ Stream impl  │  │   │
//! │  │   │               │    │ HistoryRepo   │    │              │  │   │
//! │  │   └───────────────┘    │ UserRepo      │    └──────────────┘  │   │
//! │  │                        └───────────────┘                       │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database                             │   │
//! │  │   aisles · medicines · stock · history · users                  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Error Boundary
//!
//! Public repository methods never return an error. Failures are logged and
//! turned into `false`, `None`, an empty list or an ended stream. Callers
//! that need the cause (the seed binary, tests) use the `DbResult` helpers.
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool, configuration and change feed
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - One repository per collection
//! - [`subscription`] - Live query streams
//!
//! ## Usage
//!
//! ```rust,ignore
//! use rebonnte_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("path/to/rebonnte.db")).await?;
//!
//! db.aisles().add_aisle("Fridge", "Cold storage").await;
//!
//! let mut aisles = db.aisles().fetch_all_aisles();
//! while let Some(list) = aisles.next().await {
//!     println!("{} aisles", list.len());
//! }
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;
pub mod subscription;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};
pub use subscription::{Collection, Subscription};

// Repository re-exports for convenience
pub use repository::aisle::AisleRepository;
pub use repository::history::HistoryRepository;
pub use repository::medicine::MedicineRepository;
pub use repository::stock::StockRepository;
pub use repository::user::UserRepository;
