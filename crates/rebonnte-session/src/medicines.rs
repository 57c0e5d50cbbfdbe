//! # Medicine Catalog
//!
//! The medicine list screen and the add-medicine form.
//!
//! The catalog keeps the latest snapshot of every medicine with its stock
//! and derives the visible list from it: an optional name filter, then an
//! optional sort. Filtering and sorting never touch the database.

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::error::{SessionError, SessionResult};
use rebonnte_core::validation::validate_medicine_form;
use rebonnte_core::{Medicine, MedicineWithStock, NewMedicine};
use rebonnte_db::{Database, Subscription};

/// Ordering applied on top of the gateway's name order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CatalogSort {
    /// Keep the order the gateway emitted.
    #[default]
    None,
    ByName,
    /// Lowest stock first, ties broken by name.
    ByStock,
}

// =============================================================================
// Medicine Catalog
// =============================================================================

/// Live medicine list with client-side filter and sort.
///
/// ## Example
/// ```rust,ignore
/// let mut catalog = MedicineCatalog::attach(&db, false);
/// catalog.sort_by_stock();
/// let low_first = catalog.filter_by_name("ine");
/// ```
#[derive(Debug)]
pub struct MedicineCatalog {
    db: Database,
    rx: watch::Receiver<Vec<MedicineWithStock>>,
    feeder: JoinHandle<()>,
    filter: String,
    sort: CatalogSort,
}

impl MedicineCatalog {
    /// Attaches to `fetch_all_medicines_with_stock`.
    ///
    /// ## Arguments
    /// * `sort_descending` - Gateway name order, Z to A when true
    pub fn attach(db: &Database, sort_descending: bool) -> Self {
        let (tx, rx) = watch::channel(Vec::new());
        let mut catalog = db.medicines().fetch_all_medicines_with_stock(sort_descending);

        let feeder = tokio::spawn(async move {
            while let Some(snapshot) = catalog.next().await {
                debug!(count = snapshot.len(), "Medicine catalog updated");
                tx.send_replace(snapshot);
            }
        });

        MedicineCatalog {
            db: db.clone(),
            rx,
            feeder,
            filter: String::new(),
            sort: CatalogSort::None,
        }
    }

    /// Sets the name filter and returns the visible list.
    ///
    /// Case-insensitive substring match. An empty query clears the filter.
    pub fn filter_by_name(&mut self, query: &str) -> Vec<MedicineWithStock> {
        self.filter = query.trim().to_lowercase();
        self.medicines()
    }

    pub fn sort_by_name(&mut self) -> Vec<MedicineWithStock> {
        self.sort = CatalogSort::ByName;
        self.medicines()
    }

    pub fn sort_by_stock(&mut self) -> Vec<MedicineWithStock> {
        self.sort = CatalogSort::ByStock;
        self.medicines()
    }

    pub fn sort_by_none(&mut self) -> Vec<MedicineWithStock> {
        self.sort = CatalogSort::None;
        self.medicines()
    }

    pub fn sort(&self) -> CatalogSort {
        self.sort
    }

    /// Visible list: latest snapshot, filtered then sorted.
    pub fn medicines(&self) -> Vec<MedicineWithStock> {
        let mut visible: Vec<MedicineWithStock> = self
            .rx
            .borrow()
            .iter()
            .filter(|m| self.filter.is_empty() || m.name.to_lowercase().contains(&self.filter))
            .cloned()
            .collect();

        match self.sort {
            CatalogSort::None => {}
            CatalogSort::ByName => visible.sort_by(|a, b| a.name.cmp(&b.name)),
            CatalogSort::ByStock => visible.sort_by(|a, b| {
                a.quantity.cmp(&b.quantity).then_with(|| a.name.cmp(&b.name))
            }),
        }

        visible
    }

    /// Receiver notified on each raw snapshot.
    pub fn subscribe(&self) -> watch::Receiver<Vec<MedicineWithStock>> {
        self.rx.clone()
    }

    /// Live case-sensitive prefix search on medicine names.
    pub fn search(&self, query: &str) -> Subscription<Vec<Medicine>> {
        self.db.medicines().search_medicines_real_time(query)
    }
}

impl Drop for MedicineCatalog {
    fn drop(&mut self) {
        self.feeder.abort();
    }
}

// =============================================================================
// Add Medicine Form
// =============================================================================

#[derive(Debug, Clone)]
pub struct AddMedicineForm {
    db: Database,
}

impl AddMedicineForm {
    pub fn new(db: Database) -> Self {
        AddMedicineForm { db }
    }

    /// Validates the form and creates the medicine with an empty stock row.
    ///
    /// Fields are checked in form order and the first blank one is reported.
    pub async fn submit(&self, medicine: &NewMedicine, aisle_id: Option<&str>) -> SessionResult<()> {
        validate_medicine_form(medicine, aisle_id)?;

        if !self.db.medicines().add_medicine(medicine, aisle_id).await {
            return Err(SessionError::Duplicate {
                entity: "Medicine",
                name: medicine.name.clone(),
            });
        }

        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
