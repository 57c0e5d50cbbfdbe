//! # Stock Repository
//!
//! Quantity updates and aisle moves for stock rows.
//!
//! ## Quantity Update
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │            update_quantity_in_stock("med-1", -5, author, "")            │
//! │                                                                         │
//! │  1. read stock.quantity ───────────────► 2      (missing row → false)  │
//! │  2. read medicines.name ───────────────► "Ibuprofen" (or "Unknown")    │
//! │  3. write max(0, 2 + -5) ──────────────► 0                             │
//! │  4. append history {quantity: -5, action: REMOVE, author, date, time}  │
//! │                                                                         │
//! │  Steps 1 and 3 are a plain read-modify-write. Two sessions flushing    │
//! │  the same medicine at once can lose one update.                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use tracing::info;

use crate::error::{DbError, DbResult};
use crate::pool::Database;
use crate::repository::settle;
use crate::subscription::Collection;
use rebonnte_core::{apply_delta, Stock, StockHistory, UNKNOWN_MEDICINE_NAME};

/// Repository for stock database operations.
///
/// ## Usage
/// ```rust,ignore
/// let repo = db.stock();
///
/// repo.update_quantity_in_stock("med-1", 2, "pharma@rebonnte.fr", "").await;
/// let quantity = repo.get_stock_quantity("med-1").await;
/// ```
#[derive(Debug, Clone)]
pub struct StockRepository {
    db: Database,
}

impl StockRepository {
    /// Creates a new StockRepository.
    pub fn new(db: Database) -> Self {
        StockRepository { db }
    }

    // =========================================================================
    // Gateway Operations
    // =========================================================================

    /// Applies a signed delta to a medicine's stock and records it in history.
    ///
    /// ## Arguments
    /// * `medicine_id` - Medicine whose stock row is updated
    /// * `delta` - Signed change; the stored quantity is clamped at zero
    /// * `author` - Email recorded on the history entry
    /// * `description` - Free text recorded on the history entry
    ///
    /// ## Returns
    /// * `true` - Quantity written and history appended
    /// * `false` - No stock row for this medicine, or a write failed
    ///
    /// ## Note
    /// Read, clamp, write with no version check. Two sessions flushing the
    /// same medicine at once can lose one of the updates; the last write wins.
    pub async fn update_quantity_in_stock(
        &self,
        medicine_id: &str,
        delta: i64,
        author: &str,
        description: &str,
    ) -> bool {
        settle(
            "update_quantity_in_stock",
            self.apply_quantity_delta(medicine_id, delta, author, description)
                .await
                .map(|_| true),
            false,
        )
    }

    /// Moves a medicine's stock row to another aisle.
    ///
    /// ## Returns
    /// * `false` - No stock row for this medicine, or the write failed
    pub async fn update_medicine_aisle(&self, medicine_id: &str, new_aisle_id: &str) -> bool {
        settle(
            "update_medicine_aisle",
            self.move_to_aisle(medicine_id, new_aisle_id).await.map(|_| true),
            false,
        )
    }

    /// Current quantity for a medicine, `None` when it has no stock row.
    pub async fn get_stock_quantity(&self, medicine_id: &str) -> Option<i64> {
        let stock = settle("get_stock_quantity", self.find_stock(medicine_id).await, None);
        stock.map(|s| s.quantity)
    }

    /// Full stock row for a medicine.
    pub async fn get_stock(&self, medicine_id: &str) -> Option<Stock> {
        settle("get_stock", self.find_stock(medicine_id).await, None)
    }

    // =========================================================================
    // Fallible Helpers
    // =========================================================================

    /// Applies a delta and returns the history entry that was appended.
    ///
    /// ## Errors
    /// * `DbError::NotFound` - No stock row for this medicine
    pub async fn apply_quantity_delta(
        &self,
        medicine_id: &str,
        delta: i64,
        author: &str,
        description: &str,
    ) -> DbResult<StockHistory> {
        let current: i64 = sqlx::query_scalar("SELECT quantity FROM stock WHERE medicine_id = ?1")
            .bind(medicine_id)
            .fetch_optional(self.db.pool())
            .await?
            .ok_or_else(|| DbError::not_found("Stock", medicine_id))?;

        let medicine_name: String =
            sqlx::query_scalar("SELECT name FROM medicines WHERE medicine_id = ?1")
                .bind(medicine_id)
                .fetch_optional(self.db.pool())
                .await?
                .unwrap_or_else(|| UNKNOWN_MEDICINE_NAME.to_string());

        let quantity = apply_delta(current, delta);

        sqlx::query("UPDATE stock SET quantity = ?1 WHERE medicine_id = ?2")
            .bind(quantity)
            .bind(medicine_id)
            .execute(self.db.pool())
            .await?;
        self.db.notify(Collection::Stock);

        let entry = StockHistory::record(
            medicine_id,
            medicine_name,
            delta,
            description,
            author,
            Utc::now(),
        );
        self.db.history().append(&entry).await?;

        info!(
            medicine_id = %medicine_id,
            delta,
            previous = current,
            quantity,
            author = %author,
            "Stock quantity updated"
        );

        Ok(entry)
    }

    async fn move_to_aisle(&self, medicine_id: &str, new_aisle_id: &str) -> DbResult<()> {
        let result = sqlx::query("UPDATE stock SET aisle_id = ?1 WHERE medicine_id = ?2")
            .bind(new_aisle_id)
            .bind(medicine_id)
            .execute(self.db.pool())
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Stock", medicine_id));
        }

        info!(medicine_id = %medicine_id, aisle_id = %new_aisle_id, "Medicine moved");
        self.db.notify(Collection::Stock);
        Ok(())
    }

    pub async fn find_stock(&self, medicine_id: &str) -> DbResult<Option<Stock>> {
        let stock = sqlx::query_as::<_, Stock>(
            "SELECT medicine_id, aisle_id, quantity FROM stock WHERE medicine_id = ?1",
        )
        .bind(medicine_id)
        .fetch_optional(self.db.pool())
        .await?;

        Ok(stock)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
