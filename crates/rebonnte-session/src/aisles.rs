//! # Aisle Flows
//!
//! The aisle list, the add-aisle form and the aisle detail screen.
//!
//! ## Aisle Deletion
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                   AisleDetail::delete_aisle()                           │
//! │                                                                         │
//! │   aisle == DEFAULT_AISLE_ID ? ──yes──► Err(DefaultAisleProtected)      │
//! │          │ no                                                           │
//! │          ▼                                                              │
//! │   fetch_medicines_for_aisle(aisle)      fresh read, not the cache      │
//! │          │                                                              │
//! │          ▼                                                              │
//! │   for each medicine:                                                    │
//! │       update_medicine_aisle(id, DEFAULT_AISLE_ID)   one write each     │
//! │          │ false ─► warn!, count as failed, continue                   │
//! │          ▼                                                              │
//! │   delete_aisle(aisle) ──false──► Err("Failed to delete aisle")         │
//! │          │                                                              │
//! │          ▼                                                              │
//! │   Ok(ReassignmentReport { reassigned, failed })                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Medicines whose move failed keep pointing at the deleted aisle. Their
//! detail screen then shows the aisle as "Unknown".

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::{SessionError, SessionResult};
use rebonnte_core::validation::validate_aisle_form;
use rebonnte_core::{Aisle, CoreError, MedicineWithStock, DEFAULT_AISLE_ID};
use rebonnte_db::Database;

// =============================================================================
// Aisle List
// =============================================================================

/// Live list of aisles, ordered by name.
///
/// A feeder task copies every snapshot of `fetch_all_aisles` into a watch
/// channel. Dropping the list stops the feeder and detaches the
/// subscription.
#[derive(Debug)]
pub struct AisleList {
    rx: watch::Receiver<Vec<Aisle>>,
    feeder: JoinHandle<()>,
}

impl AisleList {
    /// Attaches to the live aisle list. Must be called within a tokio runtime.
    pub fn attach(db: &Database) -> Self {
        let (tx, rx) = watch::channel(Vec::new());
        let mut aisles = db.aisles().fetch_all_aisles();

        let feeder = tokio::spawn(async move {
            while let Some(snapshot) = aisles.next().await {
                debug!(count = snapshot.len(), "Aisle list updated");
                tx.send_replace(snapshot);
            }
            debug!("Aisle list stream ended");
        });

        AisleList { rx, feeder }
    }

    /// Latest snapshot. Empty until the first emission arrives.
    pub fn aisles(&self) -> Vec<Aisle> {
        self.rx.borrow().clone()
    }

    /// Receiver that is notified on each new snapshot and closes when the
    /// list is dropped.
    pub fn subscribe(&self) -> watch::Receiver<Vec<Aisle>> {
        self.rx.clone()
    }
}

impl Drop for AisleList {
    fn drop(&mut self) {
        self.feeder.abort();
    }
}

// =============================================================================
// Add Aisle Form
// =============================================================================

#[derive(Debug, Clone)]
pub struct AddAisleForm {
    db: Database,
}

impl AddAisleForm {
    pub fn new(db: Database) -> Self {
        AddAisleForm { db }
    }

    /// Validates and creates the aisle.
    ///
    /// ## Returns
    /// * `Err(Validation)` - Name or description blank
    /// * `Err(Duplicate)` - The gateway refused the aisle
    pub async fn submit(&self, name: &str, description: &str) -> SessionResult<()> {
        validate_aisle_form(name, description)?;

        if !self.db.aisles().add_aisle(name, description).await {
            return Err(SessionError::Duplicate {
                entity: "Aisle",
                name: name.to_string(),
            });
        }

        Ok(())
    }
}

// =============================================================================
// Aisle Detail
// =============================================================================

/// Outcome of an aisle deletion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReassignmentReport {
    /// Medicines moved to the default aisle.
    pub reassigned: usize,
    /// Medicines whose move failed.
    pub failed: usize,
}

/// Session state for one aisle screen.
#[derive(Debug)]
pub struct AisleDetail {
    db: Database,
    aisle_id: String,
    aisle: watch::Sender<Option<Aisle>>,
    medicines: watch::Sender<Vec<MedicineWithStock>>,
}

impl AisleDetail {
    pub fn new(db: Database, aisle_id: impl Into<String>) -> Self {
        let (aisle, _) = watch::channel(None);
        let (medicines, _) = watch::channel(Vec::new());

        AisleDetail {
            db,
            aisle_id: aisle_id.into(),
            aisle,
            medicines,
        }
    }

    /// Loads the aisle and the medicines stocked in it.
    pub async fn load(&self) -> SessionResult<Aisle> {
        let aisle = self
            .db
            .aisles()
            .fetch_aisle_by_id(&self.aisle_id)
            .await
            .ok_or_else(|| CoreError::AisleNotFound(self.aisle_id.clone()))?;
        let medicines = self.db.aisles().fetch_medicines_for_aisle(&self.aisle_id).await;

        self.aisle.send_replace(Some(aisle.clone()));
        self.medicines.send_replace(medicines);
        Ok(aisle)
    }

    /// Moves every medicine to the default aisle, then deletes this aisle.
    pub async fn delete_aisle(&self) -> SessionResult<ReassignmentReport> {
        if self.aisle_id == DEFAULT_AISLE_ID {
            return Err(CoreError::DefaultAisleProtected.into());
        }

        let medicines = self.db.aisles().fetch_medicines_for_aisle(&self.aisle_id).await;
        let stock = self.db.stock();
        let mut report = ReassignmentReport::default();

        for medicine in &medicines {
            if stock
                .update_medicine_aisle(&medicine.medicine_id, DEFAULT_AISLE_ID)
                .await
            {
                report.reassigned += 1;
            } else {
                warn!(
                    aisle_id = %self.aisle_id,
                    medicine_id = %medicine.medicine_id,
                    "Could not move medicine to the default aisle"
                );
                report.failed += 1;
            }
        }

        if !self.db.aisles().delete_aisle(&self.aisle_id).await {
            return Err(SessionError::failed("Failed to delete aisle"));
        }

        info!(
            aisle_id = %self.aisle_id,
            reassigned = report.reassigned,
            failed = report.failed,
            "Aisle removed"
        );
        self.aisle.send_replace(None);
        self.medicines.send_replace(Vec::new());
        Ok(report)
    }

    pub fn aisle_id(&self) -> &str {
        &self.aisle_id
    }

    pub fn aisle(&self) -> Option<Aisle> {
        self.aisle.borrow().clone()
    }

    pub fn medicines(&self) -> Vec<MedicineWithStock> {
        self.medicines.borrow().clone()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rebonnte_core::{NewMedicine, DEFAULT_AISLE_NAME};
    use rebonnte_db::DbConfig;
    use std::time::Duration;
    use tokio::time::timeout;

    fn medicine(name: &str) -> NewMedicine {
        NewMedicine {
            name: name.to_string(),
            description: "Test medicine".to_string(),
            dosage: "10mg".to_string(),
            manufacturer: "Pharma SA".to_string(),
            indication: "Testing".to_string(),
            active_ingredient: name.to_string(),
            usage: "Oral".to_string(),
            warning: "None".to_string(),
        }
    }

    async fn wait_for<F>(rx: &mut watch::Receiver<Vec<Aisle>>, pred: F) -> Vec<Aisle>
    where
        F: Fn(&[Aisle]) -> bool,
    {
        timeout(Duration::from_secs(2), async {
            loop {
                {
                    let current = rx.borrow_and_update();
                    if pred(&current) {
                        return current.clone();
                    }
                }
                rx.changed().await.unwrap();
            }
        })
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_aisle_list_follows_writes() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let list = AisleList::attach(&db);
        let mut rx = list.subscribe();

        let initial = wait_for(&mut rx, |a| !a.is_empty()).await;
        assert_eq!(initial[0].name, DEFAULT_AISLE_NAME);

        AddAisleForm::new(db.clone())
            .submit("Fridge", "Cold storage")
            .await
            .unwrap();

        let names: Vec<String> = wait_for(&mut rx, |a| a.len() == 2)
            .await
            .into_iter()
            .map(|a| a.name)
            .collect();
        assert_eq!(names, vec!["Fridge", DEFAULT_AISLE_NAME]);
        assert_eq!(list.aisles().len(), 2);
    }

    #[tokio::test]
    async fn test_aisle_list_closes_on_drop() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let list = AisleList::attach(&db);
        let mut rx = list.subscribe();
        wait_for(&mut rx, |a| !a.is_empty()).await;

        drop(list);

        let closed = timeout(Duration::from_secs(2), async {
            while rx.changed().await.is_ok() {}
        })
        .await;
        assert!(closed.is_ok());
    }

    #[tokio::test]
    async fn test_add_aisle_form() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let form = AddAisleForm::new(db);

        let err = form.submit("", "Cold storage").await.unwrap_err();
        assert_eq!(err.to_string(), "Aisle name is required.");

        let err = form.submit("Fridge", " ").await.unwrap_err();
        assert_eq!(err.to_string(), "Aisle description is required.");

        form.submit("Fridge", "Cold storage").await.unwrap();
        assert!(matches!(
            form.submit("Fridge", "Another fridge").await,
            Err(SessionError::Duplicate { entity: "Aisle", .. })
        ));
    }

    #[tokio::test]
    async fn test_load_aisle_detail() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let fridge = db.aisles().create_aisle("Fridge", "Cold storage").await.unwrap();
        db.medicines()
            .create_medicine(&medicine("Insulin"), Some(&fridge.aisle_id))
            .await
            .unwrap();

        let detail = AisleDetail::new(db.clone(), &fridge.aisle_id);
        let aisle = detail.load().await.unwrap();
        assert_eq!(aisle.name, "Fridge");
        assert_eq!(detail.aisle(), Some(aisle));
        assert_eq!(detail.medicines().len(), 1);
        assert_eq!(detail.medicines()[0].name, "Insulin");

        let missing = AisleDetail::new(db, "missing");
        assert!(missing.load().await.is_err());
    }

    #[tokio::test]
    async fn test_delete_aisle_reassigns_medicines() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let fridge = db.aisles().create_aisle("Fridge", "Cold storage").await.unwrap();
        let mut ids = Vec::new();
        for name in ["Insulin", "Vaccine"] {
            let created = db
                .medicines()
                .create_medicine(&medicine(name), Some(&fridge.aisle_id))
                .await
                .unwrap();
            ids.push(created.medicine_id);
        }

        let detail = AisleDetail::new(db.clone(), &fridge.aisle_id);
        detail.load().await.unwrap();

        let report = detail.delete_aisle().await.unwrap();
        assert_eq!(report, ReassignmentReport { reassigned: 2, failed: 0 });

        assert!(db.aisles().fetch_aisle_by_id(&fridge.aisle_id).await.is_none());
        for id in &ids {
            let stock = db.stock().get_stock(id).await.unwrap();
            assert_eq!(stock.aisle_id, DEFAULT_AISLE_ID);
        }
        assert_eq!(db.aisles().fetch_medicines_for_aisle(DEFAULT_AISLE_ID).await.len(), 2);
        assert!(detail.aisle().is_none());
        assert!(detail.medicines().is_empty());
    }

    #[tokio::test]
    async fn test_delete_default_aisle_refused() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let detail = AisleDetail::new(db.clone(), DEFAULT_AISLE_ID);

        assert!(matches!(
            detail.delete_aisle().await,
            Err(SessionError::DefaultAisleProtected)
        ));
        assert!(db.aisles().fetch_aisle_by_id(DEFAULT_AISLE_ID).await.is_some());
    }

    #[tokio::test]
    async fn test_delete_empty_aisle() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let shelf = db.aisles().create_aisle("Shelf", "Dry storage").await.unwrap();

        let report = AisleDetail::new(db.clone(), &shelf.aisle_id)
            .delete_aisle()
            .await
            .unwrap();
        assert_eq!(report, ReassignmentReport::default());
        assert!(db.aisles().fetch_aisle_by_id(&shelf.aisle_id).await.is_none());
    }

    #[tokio::test]
    async fn test_delete_aisle_on_closed_database_fails() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let shelf = db.aisles().create_aisle("Shelf", "Dry storage").await.unwrap();
        db.close().await;

        let err = AisleDetail::new(db, &shelf.aisle_id)
            .delete_aisle()
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Failed to delete aisle");
    }
}
