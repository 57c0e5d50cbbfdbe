//! # History Repository
//!
//! Append-only audit trail of persisted stock movements.
//!
//! Entries are written by [`StockRepository`](super::stock::StockRepository)
//! only. There is no update or delete: an entry, once appended, is final.
//!
//! ## Ordering
//! `date` and `time` are display strings (`dd-MM-yyyy`, `HH:mm:ss`) that do
//! not sort. Listings order by `recorded_at`, then by insertion order.

use tracing::debug;

use crate::error::DbResult;
use crate::pool::Database;
use crate::repository::settle;
use crate::subscription::{Collection, Subscription};
use rebonnte_core::StockHistory;

const HISTORY_COLUMNS: &str = "history_id, medicine_id, medicine_name, quantity, action, \
     description, author, date, time, recorded_at";

/// Repository for stock history.
#[derive(Debug, Clone)]
pub struct HistoryRepository {
    db: Database,
}

impl HistoryRepository {
    /// Creates a new HistoryRepository.
    pub fn new(db: Database) -> Self {
        HistoryRepository { db }
    }

    /// Live history of one medicine, newest first.
    ///
    /// Read failures are logged and emitted as an empty list.
    pub fn fetch_history_for_medicine(&self, medicine_id: &str) -> Subscription<Vec<StockHistory>> {
        let medicine_id = medicine_id.to_string();

        Subscription::listen(&self.db, "medicine-history", &[Collection::History], move |db| {
            let medicine_id = medicine_id.clone();
            async move {
                let result = db.history().list_for_medicine(&medicine_id).await;
                Ok(settle("fetch_history_for_medicine", result, Vec::new()))
            }
        })
    }

    /// Live history of every medicine, newest first.
    ///
    /// Read failures are logged and emitted as an empty list.
    pub fn fetch_all_history(&self) -> Subscription<Vec<StockHistory>> {
        Subscription::listen(&self.db, "all-history", &[Collection::History], |db| async move {
            let result = db.history().list_all().await;
            Ok(settle("fetch_all_history", result, Vec::new()))
        })
    }

    // =========================================================================
    // Fallible Helpers
    // =========================================================================

    pub(crate) async fn append(&self, entry: &StockHistory) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO history (
                history_id, medicine_id, medicine_name, quantity, action,
                description, author, date, time, recorded_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&entry.history_id)
        .bind(&entry.medicine_id)
        .bind(&entry.medicine_name)
        .bind(entry.quantity)
        .bind(entry.action)
        .bind(&entry.description)
        .bind(&entry.author)
        .bind(&entry.date)
        .bind(&entry.time)
        .bind(entry.recorded_at)
        .execute(self.db.pool())
        .await?;

        debug!(
            history_id = %entry.history_id,
            medicine_id = %entry.medicine_id,
            action = %entry.action,
            "History appended"
        );
        self.db.notify(Collection::History);
        Ok(())
    }

    pub async fn list_for_medicine(&self, medicine_id: &str) -> DbResult<Vec<StockHistory>> {
        let sql = format!(
            "SELECT {HISTORY_COLUMNS} FROM history WHERE medicine_id = ?1 \
             ORDER BY recorded_at DESC, rowid DESC"
        );
        let entries = sqlx::query_as::<_, StockHistory>(&sql)
            .bind(medicine_id)
            .fetch_all(self.db.pool())
            .await?;

        Ok(entries)
    }

    pub async fn list_all(&self) -> DbResult<Vec<StockHistory>> {
        let sql = format!("SELECT {HISTORY_COLUMNS} FROM history ORDER BY recorded_at DESC, rowid DESC");
        let entries = sqlx::query_as::<_, StockHistory>(&sql)
            .fetch_all(self.db.pool())
            .await?;

        Ok(entries)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::DbConfig;
    use chrono::{Duration as ChronoDuration, Utc};
    use std::time::Duration;
    use tokio::time::timeout;

    async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    #[tokio::test]
    async fn test_listings_are_newest_first() {
        let db = test_db().await;
        let history = db.history();
        let start = Utc::now();

        for (i, delta) in [1, -2, 3].into_iter().enumerate() {
            let at = start + ChronoDuration::seconds(i as i64);
            let entry = StockHistory::record("med-1", "Ibuprofen", delta, "", "a@b.fr", at);
            history.append(&entry).await.unwrap();
        }
        let other = StockHistory::record("med-2", "Doliprane", 5, "", "a@b.fr", start);
        history.append(&other).await.unwrap();

        let deltas: Vec<_> = history
            .list_for_medicine("med-1")
            .await
            .unwrap()
            .into_iter()
            .map(|h| h.quantity)
            .collect();
        assert_eq!(deltas, vec![3, -2, 1]);

        assert_eq!(history.list_all().await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_same_instant_falls_back_to_insertion_order() {
        let db = test_db().await;
        let at = Utc::now();

        for delta in [1, 2] {
            let entry = StockHistory::record("med-1", "Ibuprofen", delta, "", "a@b.fr", at);
            db.history().append(&entry).await.unwrap();
        }

        let latest = &db.history().list_for_medicine("med-1").await.unwrap()[0];
        assert_eq!(latest.quantity, 2);
    }

    #[tokio::test]
    async fn test_fetch_history_for_medicine_is_live() {
        let db = test_db().await;
        let mut entries = db.history().fetch_history_for_medicine("med-1");
        assert_eq!(entries.next().await, Some(Vec::new()));

        let entry = StockHistory::record("med-1", "Ibuprofen", 1, "", "a@b.fr", Utc::now());
        db.history().append(&entry).await.unwrap();

        let next = timeout(Duration::from_secs(2), entries.next())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(next.len(), 1);
        assert_eq!(next[0].history_id, entry.history_id);
    }

    #[tokio::test]
    async fn test_failed_read_emits_empty_list() {
        let db = test_db().await;
        db.close().await;

        let mut entries = db.history().fetch_all_history();
        let first = timeout(Duration::from_secs(2), entries.next()).await.unwrap();
        assert_eq!(first, Some(Vec::new()));
        assert!(entries.is_listening());
    }
}
