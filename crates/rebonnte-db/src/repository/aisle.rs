//! # Aisle Repository
//!
//! Database operations for aisles.
//!
//! ## Key Operations
//! - Create with name uniqueness
//! - Unconditional delete (no referential checks)
//! - Live aisle list
//! - Aisle contents (stock rows joined with their medicines)
//!
//! ## Aisle Contents
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                 fetch_medicines_for_aisle("Fridge")                     │
//! │                                                                         │
//! │  stock                               medicines                          │
//! │  ┌──────────┬──────────┬─────┐       ┌──────────┬─────────────┐        │
//! │  │ med-1    │ Fridge   │  4  │──────►│ med-1    │ Insulin     │ ✓      │
//! │  │ med-2    │ Fridge   │  0  │──────►│ med-2    │ Amoxicillin │ ✓      │
//! │  │ med-9    │ Fridge   │  2  │──╳    (deleted medicine)         skipped │
//! │  │ med-3    │ Shelf A  │  7  │       (other aisle)              skipped │
//! │  └──────────┴──────────┴─────┘                                         │
//! │                                                                         │
//! │  Result (by name): [Amoxicillin ×0, Insulin ×4]                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::pool::Database;
use crate::repository::settle;
use crate::subscription::{Collection, Subscription};
use rebonnte_core::{Aisle, MedicineWithStock};

/// Repository for aisle database operations.
///
/// ## Usage
/// ```rust,ignore
/// let repo = db.aisles();
///
/// if repo.add_aisle("Fridge", "Cold storage").await {
///     let mut aisles = repo.fetch_all_aisles();
///     let current = aisles.next().await;
/// }
/// ```
#[derive(Debug, Clone)]
pub struct AisleRepository {
    db: Database,
}

impl AisleRepository {
    /// Creates a new AisleRepository.
    pub fn new(db: Database) -> Self {
        AisleRepository { db }
    }

    // =========================================================================
    // Gateway Operations
    // =========================================================================

    /// Creates an aisle.
    ///
    /// ## Returns
    /// * `true` - Aisle persisted
    /// * `false` - An aisle with this name already exists, or the write failed
    pub async fn add_aisle(&self, name: &str, description: &str) -> bool {
        match self.create_aisle(name, description).await {
            Ok(_) => true,
            Err(e) if e.is_unique_violation() => {
                debug!(name = %name, "Aisle name already taken");
                false
            }
            Err(e) => settle("add_aisle", Err(e), false),
        }
    }

    /// Deletes an aisle.
    ///
    /// Medicines stocked in the aisle are left untouched: reassigning them is
    /// the caller's job. Deleting an absent aisle succeeds.
    pub async fn delete_aisle(&self, aisle_id: &str) -> bool {
        let result = sqlx::query("DELETE FROM aisles WHERE aisle_id = ?1")
            .bind(aisle_id)
            .execute(self.db.pool())
            .await;

        match result {
            Ok(done) => {
                info!(aisle_id = %aisle_id, removed = done.rows_affected(), "Aisle deleted");
                self.db.notify(Collection::Aisles);
                true
            }
            Err(e) => settle("delete_aisle", Err(e.into()), false),
        }
    }

    /// Live list of every aisle, ordered by name.
    ///
    /// Re-emits after each aisle write. A failing query ends the stream.
    pub fn fetch_all_aisles(&self) -> Subscription<Vec<Aisle>> {
        Subscription::listen(&self.db, "all-aisles", &[Collection::Aisles], |db| async move {
            db.aisles().list_aisles().await
        })
    }

    /// Gets an aisle by its ID.
    ///
    /// ## Returns
    /// * `Some(Aisle)` - Aisle found
    /// * `None` - Aisle not found, or the read failed
    pub async fn fetch_aisle_by_id(&self, aisle_id: &str) -> Option<Aisle> {
        settle("fetch_aisle_by_id", self.find_aisle(aisle_id).await, None)
    }

    /// Medicines stocked in an aisle, with their quantities, ordered by name.
    ///
    /// Stock rows whose medicine record no longer exists are skipped.
    pub async fn fetch_medicines_for_aisle(&self, aisle_id: &str) -> Vec<MedicineWithStock> {
        settle(
            "fetch_medicines_for_aisle",
            self.list_medicines_in(aisle_id).await,
            Vec::new(),
        )
    }

    // =========================================================================
    // Fallible Helpers
    // =========================================================================

    /// Inserts an aisle and returns it.
    ///
    /// ## Errors
    /// * `DbError::UniqueViolation` - Name already taken
    pub async fn create_aisle(&self, name: &str, description: &str) -> DbResult<Aisle> {
        let taken: Option<String> =
            sqlx::query_scalar("SELECT aisle_id FROM aisles WHERE name = ?1")
                .bind(name)
                .fetch_optional(self.db.pool())
                .await?;

        if taken.is_some() {
            return Err(DbError::duplicate("aisles.name", name));
        }

        let aisle = Aisle::new(name, description);

        // The unique index still guards a concurrent insert of the same name.
        sqlx::query(
            "INSERT INTO aisles (aisle_id, name, description, created_at) VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(&aisle.aisle_id)
        .bind(&aisle.name)
        .bind(&aisle.description)
        .bind(aisle.created_at)
        .execute(self.db.pool())
        .await?;

        info!(aisle_id = %aisle.aisle_id, name = %aisle.name, "Aisle created");
        self.db.notify(Collection::Aisles);

        Ok(aisle)
    }

    pub async fn list_aisles(&self) -> DbResult<Vec<Aisle>> {
        let aisles = sqlx::query_as::<_, Aisle>(
            "SELECT aisle_id, name, description, created_at FROM aisles ORDER BY name",
        )
        .fetch_all(self.db.pool())
        .await?;

        debug!(count = aisles.len(), "Listed aisles");
        Ok(aisles)
    }

    pub async fn find_aisle(&self, aisle_id: &str) -> DbResult<Option<Aisle>> {
        let aisle = sqlx::query_as::<_, Aisle>(
            "SELECT aisle_id, name, description, created_at FROM aisles WHERE aisle_id = ?1",
        )
        .bind(aisle_id)
        .fetch_optional(self.db.pool())
        .await?;

        Ok(aisle)
    }

    async fn list_medicines_in(&self, aisle_id: &str) -> DbResult<Vec<MedicineWithStock>> {
        let medicines = sqlx::query_as::<_, MedicineWithStock>(
            r#"
            SELECT
                m.medicine_id,
                m.name,
                m.description,
                m.dosage,
                m.manufacturer,
                m.indication,
                m.active_ingredient,
                m.usage,
                m.warning,
                m.created_at,
                s.quantity
            FROM stock s
            INNER JOIN medicines m ON m.medicine_id = s.medicine_id
            WHERE s.aisle_id = ?1
            ORDER BY m.name
            "#,
        )
        .bind(aisle_id)
        .fetch_all(self.db.pool())
        .await?;

        debug!(aisle_id = %aisle_id, count = medicines.len(), "Listed aisle contents");
        Ok(medicines)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::DbConfig;
    use rebonnte_core::{NewMedicine, DEFAULT_AISLE_ID};
    use std::time::Duration;
    use tokio::time::timeout;

    async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    fn medicine(name: &str) -> NewMedicine {
        NewMedicine {
            name: name.to_string(),
            description: "desc".to_string(),
            dosage: "1/day".to_string(),
            manufacturer: "Lab".to_string(),
            indication: "Pain".to_string(),
            active_ingredient: name.to_string(),
            usage: "Oral".to_string(),
            warning: "None".to_string(),
        }
    }

    #[tokio::test]
    async fn test_add_aisle_rejects_duplicate_name() {
        let db = test_db().await;
        let repo = db.aisles();

        assert!(repo.add_aisle("Fridge", "Cold storage").await);
        assert!(!repo.add_aisle("Fridge", "Another fridge").await);

        let aisles = repo.list_aisles().await.unwrap();
        assert_eq!(aisles.iter().filter(|a| a.name == "Fridge").count(), 1);
    }

    #[tokio::test]
    async fn test_create_aisle_assigns_identity() {
        let db = test_db().await;
        let aisle = db.aisles().create_aisle("Shelf A", "Front shelf").await.unwrap();

        assert!(!aisle.aisle_id.is_empty());
        let stored = db.aisles().fetch_aisle_by_id(&aisle.aisle_id).await.unwrap();
        assert_eq!(stored.name, "Shelf A");
        assert_eq!(stored.description, "Front shelf");
    }

    #[tokio::test]
    async fn test_delete_aisle_is_unconditional() {
        let db = test_db().await;
        let repo = db.aisles();
        let aisle = repo.create_aisle("Fridge", "Cold storage").await.unwrap();

        assert!(repo.delete_aisle(&aisle.aisle_id).await);
        assert!(repo.fetch_aisle_by_id(&aisle.aisle_id).await.is_none());

        // Absent aisle
        assert!(repo.delete_aisle(&aisle.aisle_id).await);
    }

    #[tokio::test]
    async fn test_delete_aisle_leaves_stock_rows() {
        let db = test_db().await;
        let aisle = db.aisles().create_aisle("Fridge", "Cold storage").await.unwrap();
        let insulin = db
            .medicines()
            .create_medicine(&medicine("Insulin"), Some(&aisle.aisle_id))
            .await
            .unwrap();

        assert!(db.aisles().delete_aisle(&aisle.aisle_id).await);

        let stock = db.stock().get_stock(&insulin.medicine_id).await.unwrap();
        assert_eq!(stock.aisle_id, aisle.aisle_id);
    }

    #[tokio::test]
    async fn test_fetch_all_aisles_is_live() {
        let db = test_db().await;
        let mut aisles = db.aisles().fetch_all_aisles();

        let first = aisles.next().await.unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].aisle_id, DEFAULT_AISLE_ID);

        assert!(db.aisles().add_aisle("Fridge", "Cold storage").await);

        let second = timeout(Duration::from_secs(2), aisles.next())
            .await
            .unwrap()
            .unwrap();
        let names: Vec<_> = second.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["Fridge", "Unassigned medications"]);
    }

    #[tokio::test]
    async fn test_fetch_medicines_for_aisle() {
        let db = test_db().await;
        let fridge = db.aisles().create_aisle("Fridge", "Cold storage").await.unwrap();
        let shelf = db.aisles().create_aisle("Shelf A", "Front shelf").await.unwrap();

        let medicines = db.medicines();
        medicines
            .create_medicine(&medicine("Insulin"), Some(&fridge.aisle_id))
            .await
            .unwrap();
        medicines
            .create_medicine(&medicine("Amoxicillin"), Some(&fridge.aisle_id))
            .await
            .unwrap();
        medicines
            .create_medicine(&medicine("Paracetamol"), Some(&shelf.aisle_id))
            .await
            .unwrap();

        // Orphan stock row: its medicine does not exist
        sqlx::query("INSERT INTO stock (medicine_id, aisle_id, quantity) VALUES ('ghost', ?1, 3)")
            .bind(&fridge.aisle_id)
            .execute(db.pool())
            .await
            .unwrap();

        let contents = db.aisles().fetch_medicines_for_aisle(&fridge.aisle_id).await;
        let names: Vec<_> = contents.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["Amoxicillin", "Insulin"]);
        assert!(contents.iter().all(|m| m.quantity == 0));
    }

    #[tokio::test]
    async fn test_closed_database_yields_sentinels() {
        let db = test_db().await;
        db.close().await;

        let repo = db.aisles();
        assert!(!repo.add_aisle("Fridge", "Cold storage").await);
        assert!(!repo.delete_aisle(DEFAULT_AISLE_ID).await);
        assert!(repo.fetch_aisle_by_id(DEFAULT_AISLE_ID).await.is_none());
        assert!(repo.fetch_medicines_for_aisle(DEFAULT_AISLE_ID).await.is_empty());

        let mut aisles = repo.fetch_all_aisles();
        let next = timeout(Duration::from_secs(2), aisles.next()).await.unwrap();
        assert!(next.is_none());
    }
}
