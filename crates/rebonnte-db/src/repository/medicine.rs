//! # Medicine Repository
//!
//! Database operations for medicines.
//!
//! ## Key Operations
//! - Create (medicine + empty stock row, one transaction)
//! - Delete (medicine, then stock)
//! - Live catalog, with or without quantities
//! - Live prefix search by name
//!
//! ## Prefix Search
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    How Prefix Search Works                              │
//! │                                                                         │
//! │  User types: "Ibu"                                                     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Range on name:  "Ibu"  <=  name  <=  "Ibu\u{f8ff}"                    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────┐                           │
//! │  │ medicines (unique index on name)        │                           │
//! │  │                                         │                           │
//! │  │ Doliprane                               │                           │
//! │  │ Ibuprofen 200mg                         │ ← MATCH                   │
//! │  │ Ibuprofen 400mg                         │ ← MATCH                   │
//! │  │ ibuprofen (lowercase)                   │   (case-sensitive)        │
//! │  └─────────────────────────────────────────┘                           │
//! │                                                                         │
//! │  Empty query: one empty emission, no listener.                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::error::{DbError, DbResult};
use crate::pool::Database;
use crate::repository::settle;
use crate::subscription::{Collection, Subscription};
use rebonnte_core::{
    generate_id, Medicine, MedicineWithStock, NewMedicine, DEFAULT_AISLE_ID,
    SEARCH_PREFIX_SENTINEL,
};

const MEDICINE_COLUMNS: &str = "medicine_id, name, description, dosage, manufacturer, \
     indication, active_ingredient, usage, warning, created_at";

fn name_order(sort_descending: bool) -> &'static str {
    if sort_descending {
        "DESC"
    } else {
        "ASC"
    }
}

/// Repository for medicine database operations.
///
/// ## Usage
/// ```rust,ignore
/// let repo = db.medicines();
///
/// repo.add_medicine(&new_medicine, Some("Fridge")).await;
///
/// let mut results = repo.search_medicines_real_time("Ibu");
/// let matches = results.next().await;
/// ```
#[derive(Debug, Clone)]
pub struct MedicineRepository {
    db: Database,
}

impl MedicineRepository {
    /// Creates a new MedicineRepository.
    pub fn new(db: Database) -> Self {
        MedicineRepository { db }
    }

    // =========================================================================
    // Gateway Operations
    // =========================================================================

    /// Creates a medicine and its stock row (quantity 0).
    ///
    /// ## Arguments
    /// * `medicine` - Descriptive fields
    /// * `aisle_id` - Aisle for the stock row. Missing or blank means the
    ///   default aisle.
    ///
    /// ## Returns
    /// * `true` - Medicine and stock row persisted
    /// * `false` - Name already taken, or the write failed
    pub async fn add_medicine(&self, medicine: &NewMedicine, aisle_id: Option<&str>) -> bool {
        match self.create_medicine(medicine, aisle_id).await {
            Ok(_) => true,
            Err(e) if e.is_unique_violation() => {
                debug!(name = %medicine.name, "Medicine name already taken");
                false
            }
            Err(e) => settle("add_medicine", Err(e), false),
        }
    }

    /// Deletes a medicine and its stock row.
    ///
    /// ## Note
    /// Two separate statements. A failure between them leaves an orphan
    /// stock row, which aisle listings skip. History entries are kept.
    pub async fn delete_medicine(&self, medicine_id: &str) -> bool {
        settle(
            "delete_medicine",
            self.remove_medicine(medicine_id).await.map(|_| true),
            false,
        )
    }

    /// Live list of every medicine, ordered by name.
    pub fn fetch_all_medicines(&self, sort_descending: bool) -> Subscription<Vec<Medicine>> {
        Subscription::listen(
            &self.db,
            "all-medicines",
            &[Collection::Medicines],
            move |db| async move { db.medicines().list_medicines(sort_descending).await },
        )
    }

    /// Gets a medicine by its ID.
    ///
    /// ## Returns
    /// * `Some(Medicine)` - Medicine found
    /// * `None` - Medicine not found, or the read failed
    pub async fn fetch_medicine_by_id(&self, medicine_id: &str) -> Option<Medicine> {
        settle(
            "fetch_medicine_by_id",
            self.find_medicine(medicine_id).await,
            None,
        )
    }

    /// Live name-prefix search.
    ///
    /// Matching is case-sensitive. An empty query yields a single empty
    /// result and attaches no listener.
    pub fn search_medicines_real_time(&self, query: &str) -> Subscription<Vec<Medicine>> {
        if query.is_empty() {
            return Subscription::ready(Vec::new());
        }

        let lower = query.to_string();
        let upper = format!("{}{}", query, SEARCH_PREFIX_SENTINEL);

        Subscription::listen(
            &self.db,
            "medicine-search",
            &[Collection::Medicines],
            move |db| {
                let (lower, upper) = (lower.clone(), upper.clone());
                async move { db.medicines().search_by_prefix(&lower, &upper).await }
            },
        )
    }

    /// Live aisle id of a medicine's stock row.
    ///
    /// Emits `None` when the medicine has no stock row. Read failures are
    /// logged and also emitted as `None`, so the stream stays open.
    pub fn get_medicine_aisle(&self, medicine_id: &str) -> Subscription<Option<String>> {
        let medicine_id = medicine_id.to_string();

        Subscription::listen(&self.db, "medicine-aisle", &[Collection::Stock], move |db| {
            let medicine_id = medicine_id.clone();
            async move {
                match db.stock().find_stock(&medicine_id).await {
                    Ok(stock) => Ok(stock.map(|s| s.aisle_id)),
                    Err(e) => {
                        warn!(medicine_id = %medicine_id, error = %e, "Could not read medicine aisle");
                        Ok(None)
                    }
                }
            }
        })
    }

    /// Live catalog: every medicine with its quantity.
    ///
    /// A medicine without a stock row is listed with quantity 0.
    pub fn fetch_all_medicines_with_stock(
        &self,
        sort_descending: bool,
    ) -> Subscription<Vec<MedicineWithStock>> {
        Subscription::listen(
            &self.db,
            "medicine-catalog",
            &[Collection::Medicines, Collection::Stock],
            move |db| async move { db.medicines().list_with_stock(sort_descending).await },
        )
    }

    // =========================================================================
    // Fallible Helpers
    // =========================================================================

    /// Inserts a medicine plus its stock row and returns the medicine.
    ///
    /// ## Errors
    /// * `DbError::UniqueViolation` - Name already taken
    pub async fn create_medicine(
        &self,
        medicine: &NewMedicine,
        aisle_id: Option<&str>,
    ) -> DbResult<Medicine> {
        let taken: Option<String> =
            sqlx::query_scalar("SELECT medicine_id FROM medicines WHERE name = ?1")
                .bind(&medicine.name)
                .fetch_optional(self.db.pool())
                .await?;

        if taken.is_some() {
            return Err(DbError::duplicate("medicines.name", &medicine.name));
        }

        let aisle_id = match aisle_id.map(str::trim) {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => DEFAULT_AISLE_ID.to_string(),
        };
        let record = medicine.clone().into_medicine(generate_id(), Utc::now());

        let mut tx = self
            .db
            .pool()
            .begin()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO medicines (
                medicine_id, name, description, dosage, manufacturer,
                indication, active_ingredient, usage, warning, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&record.medicine_id)
        .bind(&record.name)
        .bind(&record.description)
        .bind(&record.dosage)
        .bind(&record.manufacturer)
        .bind(&record.indication)
        .bind(&record.active_ingredient)
        .bind(&record.usage)
        .bind(&record.warning)
        .bind(record.created_at)
        .execute(&mut *tx)
        .await?;

        sqlx::query("INSERT INTO stock (medicine_id, aisle_id, quantity) VALUES (?1, ?2, 0)")
            .bind(&record.medicine_id)
            .bind(&aisle_id)
            .execute(&mut *tx)
            .await?;

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        info!(
            medicine_id = %record.medicine_id,
            name = %record.name,
            aisle_id = %aisle_id,
            "Medicine created"
        );
        self.db.notify(Collection::Medicines);
        self.db.notify(Collection::Stock);

        Ok(record)
    }

    async fn remove_medicine(&self, medicine_id: &str) -> DbResult<()> {
        let medicines = sqlx::query("DELETE FROM medicines WHERE medicine_id = ?1")
            .bind(medicine_id)
            .execute(self.db.pool())
            .await?;
        self.db.notify(Collection::Medicines);

        let stock = sqlx::query("DELETE FROM stock WHERE medicine_id = ?1")
            .bind(medicine_id)
            .execute(self.db.pool())
            .await?;
        self.db.notify(Collection::Stock);

        info!(
            medicine_id = %medicine_id,
            medicines = medicines.rows_affected(),
            stock_rows = stock.rows_affected(),
            "Medicine deleted"
        );
        Ok(())
    }

    pub async fn find_medicine(&self, medicine_id: &str) -> DbResult<Option<Medicine>> {
        let sql = format!("SELECT {MEDICINE_COLUMNS} FROM medicines WHERE medicine_id = ?1");
        let medicine = sqlx::query_as::<_, Medicine>(&sql)
            .bind(medicine_id)
            .fetch_optional(self.db.pool())
            .await?;

        Ok(medicine)
    }

    pub async fn list_medicines(&self, sort_descending: bool) -> DbResult<Vec<Medicine>> {
        let sql = format!(
            "SELECT {MEDICINE_COLUMNS} FROM medicines ORDER BY name {}",
            name_order(sort_descending)
        );
        let medicines = sqlx::query_as::<_, Medicine>(&sql)
            .fetch_all(self.db.pool())
            .await?;

        debug!(count = medicines.len(), "Listed medicines");
        Ok(medicines)
    }

    async fn search_by_prefix(&self, lower: &str, upper: &str) -> DbResult<Vec<Medicine>> {
        let sql = format!(
            "SELECT {MEDICINE_COLUMNS} FROM medicines \
             WHERE name >= ?1 AND name <= ?2 ORDER BY name"
        );
        let medicines = sqlx::query_as::<_, Medicine>(&sql)
            .bind(lower)
            .bind(upper)
            .fetch_all(self.db.pool())
            .await?;

        debug!(prefix = %lower, count = medicines.len(), "Prefix search");
        Ok(medicines)
    }

    pub async fn list_with_stock(&self, sort_descending: bool) -> DbResult<Vec<MedicineWithStock>> {
        let sql = format!(
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
                COALESCE(s.quantity, 0) AS quantity
            FROM medicines m
            LEFT JOIN stock s ON s.medicine_id = m.medicine_id
            ORDER BY m.name {}
            "#,
            name_order(sort_descending)
        );
        let medicines = sqlx::query_as::<_, MedicineWithStock>(&sql)
            .fetch_all(self.db.pool())
            .await?;

        Ok(medicines)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
