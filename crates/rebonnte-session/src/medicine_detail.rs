//! # Medicine Detail
//!
//! Session state behind the medicine screen: the medicine with its stock,
//! its movement history, the name of its aisle, and the stock updater that
//! batches "+" and "-" taps.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │ MedicineDetail                                                   │
//! │                                                                  │
//! │   DetailCache ◄───── optimistic ──── StockUpdater ◄── taps      │
//! │   ├ medicine (watch)       ▲                │                    │
//! │   └ history  (watch)       └── refresh ─────┘ after each flush  │
//! │                                                                  │
//! │   aisle name (watch) ◄── load_medicine_aisle / update_aisle     │
//! └──────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::error::{SessionError, SessionResult};
use crate::stock_updater::{StockUpdater, UpdateOutcome, UpdaterPhase};
use rebonnte_core::{
    apply_delta, CoreError, Medicine, MedicineWithStock, StockHistory, STOCK_UPDATE_DESCRIPTION,
    UNKNOWN_AISLE_NAME,
};
use rebonnte_db::Database;

// =============================================================================
// Detail Cache
// =============================================================================

/// Database state read for one refresh.
#[derive(Debug)]
pub(crate) struct DetailSnapshot {
    medicine: Option<Medicine>,
    quantity: Option<i64>,
    history: Vec<StockHistory>,
}

/// Medicine and history caches shared by the detail screen and its updater.
#[derive(Debug)]
pub(crate) struct DetailCache {
    medicine: watch::Sender<Option<MedicineWithStock>>,
    history: watch::Sender<Vec<StockHistory>>,
}

impl DetailCache {
    pub(crate) fn new() -> Self {
        let (medicine, _) = watch::channel(None);
        let (history, _) = watch::channel(Vec::new());
        DetailCache { medicine, history }
    }

    /// Moves the cached quantity by `delta`, clamped at zero. No-op until a
    /// medicine has been loaded.
    pub(crate) fn adjust_quantity(&self, delta: i64) {
        self.medicine.send_if_modified(|cached| match cached {
            Some(medicine) => {
                medicine.quantity = apply_delta(medicine.quantity, delta);
                true
            }
            None => false,
        });
    }

    pub(crate) async fn fetch(&self, db: &Database, medicine_id: &str) -> DetailSnapshot {
        let medicine = db.medicines().fetch_medicine_by_id(medicine_id).await;
        let quantity = db.stock().get_stock_quantity(medicine_id).await;
        let history = db
            .history()
            .fetch_history_for_medicine(medicine_id)
            .next()
            .await
            .unwrap_or_default();

        DetailSnapshot {
            medicine,
            quantity,
            history,
        }
    }

    /// Replaces both caches. Taps not yet written are re-applied on top of
    /// the stored quantity.
    pub(crate) fn publish(&self, snapshot: DetailSnapshot, unsettled: i64) {
        let stored = snapshot.quantity.unwrap_or(0);
        let medicine = snapshot
            .medicine
            .map(|m| MedicineWithStock::from_parts(m, apply_delta(stored, unsettled)));

        self.medicine.send_replace(medicine);
        self.history.send_replace(snapshot.history);
    }

    pub(crate) fn medicine(&self) -> Option<MedicineWithStock> {
        self.medicine.borrow().clone()
    }

    pub(crate) fn history(&self) -> Vec<StockHistory> {
        self.history.borrow().clone()
    }
}

// =============================================================================
// Medicine Detail
// =============================================================================

/// Session state for one medicine screen.
///
/// Owns its own [`StockUpdater`]. Dropping the detail drops the updater,
/// which discards taps whose debounce window has not elapsed.
#[derive(Debug)]
pub struct MedicineDetail {
    db: Database,
    medicine_id: String,
    cache: Arc<DetailCache>,
    aisle_name: watch::Sender<String>,
    updater: StockUpdater,
}

impl MedicineDetail {
    /// Opens a detail session whose stock movements are described as
    /// "Stock Update".
    ///
    /// ## Arguments
    /// * `user_id` - Signed-in user, credited as author of stock movements
    /// * `debounce` - Quiet period before batched taps are written
    pub fn new(
        db: Database,
        medicine_id: impl Into<String>,
        user_id: Option<String>,
        debounce: Duration,
    ) -> Self {
        Self::with_description(db, medicine_id, user_id, STOCK_UPDATE_DESCRIPTION, debounce)
    }

    /// Opens a detail session that records `description` on each stock
    /// movement.
    pub fn with_description(
        db: Database,
        medicine_id: impl Into<String>,
        user_id: Option<String>,
        description: impl Into<String>,
        debounce: Duration,
    ) -> Self {
        let medicine_id = medicine_id.into();
        let cache = Arc::new(DetailCache::new());
        let updater = StockUpdater::new(
            db.clone(),
            medicine_id.clone(),
            user_id,
            description,
            debounce,
            Arc::clone(&cache),
        );
        let (aisle_name, _) = watch::channel(UNKNOWN_AISLE_NAME.to_string());

        MedicineDetail {
            db,
            medicine_id,
            cache,
            aisle_name,
            updater,
        }
    }

    pub fn medicine_id(&self) -> &str {
        &self.medicine_id
    }

    // =========================================================================
    // Loading
    // =========================================================================

    /// Loads the medicine with its stock quantity.
    ///
    /// ## Returns
    /// * `Err(OperationFailed)` - No medicine with this id
    pub async fn load_medicine(&self) -> SessionResult<MedicineWithStock> {
        self.updater.refresh_cache().await;

        self.cache.medicine().ok_or_else(|| {
            debug!(medicine_id = %self.medicine_id, "Medicine not found");
            CoreError::MedicineNotFound(self.medicine_id.clone()).into()
        })
    }

    /// Loads the stock history, newest first.
    pub async fn load_history(&self) -> Vec<StockHistory> {
        self.updater.refresh_cache().await;
        self.cache.history()
    }

    /// Resolves the name of the aisle the medicine is stored in.
    ///
    /// Falls back to "Unknown" when the stock row or the aisle is missing.
    pub async fn load_medicine_aisle(&self) -> String {
        let aisle_id = self
            .db
            .medicines()
            .get_medicine_aisle(&self.medicine_id)
            .next()
            .await
            .flatten();

        let name = match aisle_id {
            Some(aisle_id) => self
                .db
                .aisles()
                .fetch_aisle_by_id(&aisle_id)
                .await
                .map(|aisle| aisle.name),
            None => None,
        }
        .unwrap_or_else(|| UNKNOWN_AISLE_NAME.to_string());

        self.aisle_name.send_replace(name.clone());
        name
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Moves the medicine to another aisle and reloads the aisle name.
    pub async fn update_medicine_aisle(&self, new_aisle_id: &str) -> SessionResult<()> {
        if !self
            .db
            .stock()
            .update_medicine_aisle(&self.medicine_id, new_aisle_id)
            .await
        {
            warn!(medicine_id = %self.medicine_id, "Aisle change rejected");
            return Err(SessionError::failed("Failed to update medicine aisle"));
        }

        self.load_medicine_aisle().await;
        Ok(())
    }

    /// Deletes the medicine and its stock row. History is kept.
    pub async fn delete_medicine(&self) -> SessionResult<()> {
        if !self.db.medicines().delete_medicine(&self.medicine_id).await {
            return Err(SessionError::failed("Failed to delete medicine"));
        }

        info!(medicine_id = %self.medicine_id, "Medicine deleted from detail screen");
        Ok(())
    }

    /// Records a stock tap. See [`StockUpdater::apply_delta`].
    pub fn apply_delta(&self, delta: i64) {
        self.updater.apply_delta(delta);
    }

    pub fn status(&self) -> watch::Receiver<Option<UpdateOutcome>> {
        self.updater.status()
    }

    pub fn reset_update_status(&self) {
        self.updater.reset_status();
    }

    // =========================================================================
    // Views
    // =========================================================================

    /// Cached medicine, including taps not yet written.
    pub fn medicine(&self) -> Option<MedicineWithStock> {
        self.cache.medicine()
    }

    pub fn history(&self) -> Vec<StockHistory> {
        self.cache.history()
    }

    pub fn aisle_name(&self) -> String {
        self.aisle_name.borrow().clone()
    }

    pub fn subscribe_medicine(&self) -> watch::Receiver<Option<MedicineWithStock>> {
        self.cache.medicine.subscribe()
    }

    pub fn subscribe_history(&self) -> watch::Receiver<Vec<StockHistory>> {
        self.cache.history.subscribe()
    }

    pub fn subscribe_aisle_name(&self) -> watch::Receiver<String> {
        self.aisle_name.subscribe()
    }

    pub fn update_phase(&self) -> UpdaterPhase {
        self.updater.phase()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rebonnte_core::{NewMedicine, StockAction, DEFAULT_AISLE_ID, DEFAULT_AISLE_NAME};
    use rebonnte_db::DbConfig;
    use tokio::time::timeout;

    const DEBOUNCE: Duration = Duration::from_millis(70);

    fn ibuprofen() -> NewMedicine {
        NewMedicine {
            name: "Ibuprofen".to_string(),
            description: "Anti-inflammatory".to_string(),
            dosage: "200mg".to_string(),
            manufacturer: "Pharma SA".to_string(),
            indication: "Pain".to_string(),
            active_ingredient: "Ibuprofen".to_string(),
            usage: "Oral".to_string(),
            warning: "Take with food".to_string(),
        }
    }

    /// Fridge aisle holding Ibuprofen at quantity 0.
    async fn setup() -> (Database, String, String) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let fridge = db.aisles().create_aisle("Fridge", "Cold storage").await.unwrap();
        let medicine = db
            .medicines()
            .create_medicine(&ibuprofen(), Some(&fridge.aisle_id))
            .await
            .unwrap();
        (db, fridge.aisle_id, medicine.medicine_id)
    }

    async fn wait_for_flush(detail: &MedicineDetail) -> UpdateOutcome {
        let mut status = detail.status();
        let outcome = timeout(Duration::from_secs(2), async {
            loop {
                if let Some(outcome) = *status.borrow_and_update() {
                    return outcome;
                }
                status.changed().await.unwrap();
            }
        })
        .await
        .unwrap();

        timeout(Duration::from_secs(2), async {
            while detail.update_phase() != UpdaterPhase::Idle {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();

        detail.reset_update_status();
        outcome
    }

    #[tokio::test]
    async fn test_load_medicine() {
        let (db, _, id) = setup().await;
        let detail = MedicineDetail::new(db, &id, None, DEBOUNCE);

        let medicine = detail.load_medicine().await.unwrap();
        assert_eq!(medicine.name, "Ibuprofen");
        assert_eq!(medicine.quantity, 0);
        assert_eq!(detail.medicine(), Some(medicine));
        assert!(detail.load_history().await.is_empty());
    }

    #[tokio::test]
    async fn test_load_missing_medicine() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let detail = MedicineDetail::new(db, "missing", None, DEBOUNCE);

        assert!(matches!(
            detail.load_medicine().await,
            Err(SessionError::OperationFailed(_))
        ));
        assert!(detail.medicine().is_none());
    }

    #[tokio::test]
    async fn test_aisle_name_and_move() {
        let (db, _, id) = setup().await;
        let detail = MedicineDetail::new(db, &id, None, DEBOUNCE);

        assert_eq!(detail.load_medicine_aisle().await, "Fridge");

        detail.update_medicine_aisle(DEFAULT_AISLE_ID).await.unwrap();
        assert_eq!(detail.aisle_name(), DEFAULT_AISLE_NAME);

        detail.update_medicine_aisle("gone").await.unwrap();
        assert_eq!(detail.aisle_name(), UNKNOWN_AISLE_NAME);
    }

    #[tokio::test]
    async fn test_update_aisle_of_deleted_medicine_fails() {
        let (db, _, id) = setup().await;
        let detail = MedicineDetail::new(db, &id, None, DEBOUNCE);

        detail.delete_medicine().await.unwrap();

        let err = detail.update_medicine_aisle(DEFAULT_AISLE_ID).await.unwrap_err();
        assert_eq!(err.to_string(), "Failed to update medicine aisle");
        assert_eq!(detail.load_medicine_aisle().await, UNKNOWN_AISLE_NAME);
        assert!(detail.load_medicine().await.is_err());
    }

    #[tokio::test]
    async fn test_fridge_ibuprofen_scenario() {
        let (db, _, id) = setup().await;
        db.users()
            .add_user(&rebonnte_core::User::new("uid-1", "pharma@rebonnte.fr", "Jean", "Dupont"))
            .await;
        let detail = MedicineDetail::new(db.clone(), &id, Some("uid-1".to_string()), DEBOUNCE);
        detail.load_medicine().await.unwrap();

        detail.apply_delta(1);
        detail.apply_delta(1);
        detail.apply_delta(-1);
        assert_eq!(detail.medicine().map(|m| m.quantity), Some(1));

        assert_eq!(wait_for_flush(&detail).await, UpdateOutcome { delta: 1, success: true });
        assert_eq!(detail.medicine().map(|m| m.quantity), Some(1));

        let history = detail.history();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].quantity, 1);
        assert_eq!(history[0].action, StockAction::Add);
        assert_eq!(history[0].medicine_name, "Ibuprofen");
        assert_eq!(history[0].author, "pharma@rebonnte.fr");
        assert_eq!(history[0].description, STOCK_UPDATE_DESCRIPTION);

        detail.apply_delta(1);
        wait_for_flush(&detail).await;
        assert_eq!(db.stock().get_stock_quantity(&id).await, Some(2));

        detail.apply_delta(-5);
        assert_eq!(detail.medicine().map(|m| m.quantity), Some(0));
        assert_eq!(wait_for_flush(&detail).await, UpdateOutcome { delta: -5, success: true });

        assert_eq!(db.stock().get_stock_quantity(&id).await, Some(0));
        let history = detail.history();
        assert_eq!(history.len(), 3);
        assert_eq!(history[0].quantity, -5);
        assert_eq!(history[0].action, StockAction::Remove);
    }

    #[tokio::test]
    async fn test_custom_movement_description() {
        let (db, _, id) = setup().await;
        let detail =
            MedicineDetail::with_description(db.clone(), &id, None, "Inventory count", DEBOUNCE);
        detail.load_medicine().await.unwrap();

        detail.apply_delta(4);
        wait_for_flush(&detail).await;

        let history = detail.history();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].description, "Inventory count");
    }

    #[test]
    fn test_cache_adjust_before_load_is_noop() {
        let cache = DetailCache::new();
        cache.adjust_quantity(3);
        assert!(cache.medicine().is_none());
    }
}
