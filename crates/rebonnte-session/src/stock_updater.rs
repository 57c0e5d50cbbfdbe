//! # Stock Updater
//!
//! Debounced stock writes for one medicine-detail session.
//!
//! Taps on "+" and "-" update the displayed quantity at once. The database
//! sees one write per burst: the sum of every tap made until the user pauses
//! for the debounce window.
//!
//! ## Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Stock Updater Phases                             │
//! │                                                                         │
//! │          apply_delta(+1)                                               │
//! │   Idle ──────────────────► Accumulating ◄──┐                           │
//! │    ▲                        │   timer armed │ apply_delta(d):          │
//! │    │                        │               │ pending += d,            │
//! │    │                        │               │ cache.quantity += d,     │
//! │    │                        │               │ abort + re-arm timer     │
//! │    │                        │ ──────────────┘                          │
//! │    │                        │                                          │
//! │    │                        ▼ window elapsed with no tap               │
//! │    │                     Flushing                                      │
//! │    │                        │ take batch (later taps start a new one)  │
//! │    │                        │ flush gate ─► resolve author             │
//! │    │                        │ update_quantity_in_stock(batch) × 1      │
//! │    │                        │ publish UpdateOutcome                    │
//! │    │                        │ refresh caches                           │
//! │    └────────────────────────┘                                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Timer Ownership
//! Each armed timer carries a generation number. A timer that lost the race
//! against a newer tap sees a stale generation and exits without flushing,
//! even if it woke before its abort landed.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::medicine_detail::DetailCache;
use rebonnte_core::UNKNOWN_AUTHOR;
use rebonnte_db::Database;

// =============================================================================
// Public Types
// =============================================================================

/// Where the updater is in its debounce cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdaterPhase {
    /// Nothing pending.
    Idle,
    /// Taps pending, timer armed.
    Accumulating,
    /// A batch was taken and its write has not completed yet.
    Flushing,
}

/// Result of one flushed batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateOutcome {
    /// Net delta that was sent.
    pub delta: i64,
    /// Whether the gateway accepted the write.
    pub success: bool,
}

// =============================================================================
// Internal State
// =============================================================================

#[derive(Debug, Default)]
struct UpdaterState {
    /// Sum of taps since the last batch was taken.
    pending: i64,
    /// Taps not yet reflected by a completed write: `pending` plus batches
    /// taken but still in flight.
    unsettled: i64,
    timer: Option<JoinHandle<()>>,
    generation: u64,
    in_flight: usize,
}

impl UpdaterState {
    fn phase(&self) -> UpdaterPhase {
        if self.timer.is_some() {
            UpdaterPhase::Accumulating
        } else if self.in_flight > 0 {
            UpdaterPhase::Flushing
        } else {
            UpdaterPhase::Idle
        }
    }
}

#[derive(Debug)]
struct Shared {
    db: Database,
    medicine_id: String,
    user_id: Option<String>,
    description: String,
    debounce: Duration,
    cache: Arc<DetailCache>,
    state: Mutex<UpdaterState>,
    /// Serializes this session's flushes.
    flush_gate: tokio::sync::Mutex<()>,
    status: watch::Sender<Option<UpdateOutcome>>,
}

impl Shared {
    fn lock_state(&self) -> MutexGuard<'_, UpdaterState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// =============================================================================
// Stock Updater
// =============================================================================

/// Debounced stock-update coordinator for one medicine.
///
/// ## Usage
/// ```rust,ignore
/// let updater = StockUpdater::new(
///     db,
///     medicine_id,
///     Some(uid),
///     STOCK_UPDATE_DESCRIPTION,
///     Duration::from_secs(1),
///     cache,
/// );
///
/// updater.apply_delta(1);
/// updater.apply_delta(1);
/// updater.apply_delta(-1);
/// // one second later: one write of +1, one history entry
/// ```
///
/// Dropping the updater discards taps whose timer has not fired. A batch
/// already taken is written to completion.
#[derive(Debug)]
pub struct StockUpdater {
    shared: Arc<Shared>,
}

impl StockUpdater {
    /// Creates an updater for `medicine_id`.
    ///
    /// ## Arguments
    /// * `user_id` - UID of the acting user, resolved to an email at flush time
    /// * `description` - Free text recorded on every history entry
    /// * `debounce` - Quiet period after the last tap before writing
    /// * `cache` - Session caches updated optimistically and after each write
    pub(crate) fn new(
        db: Database,
        medicine_id: impl Into<String>,
        user_id: Option<String>,
        description: impl Into<String>,
        debounce: Duration,
        cache: Arc<DetailCache>,
    ) -> Self {
        let (status, _) = watch::channel(None);

        StockUpdater {
            shared: Arc::new(Shared {
                db,
                medicine_id: medicine_id.into(),
                user_id,
                description: description.into(),
                debounce,
                cache,
                state: Mutex::new(UpdaterState::default()),
                flush_gate: tokio::sync::Mutex::new(()),
                status,
            }),
        }
    }

    /// Records a tap.
    ///
    /// Updates the cached quantity immediately (clamped at zero) and restarts
    /// the debounce window. Must be called from within a tokio runtime.
    pub fn apply_delta(&self, delta: i64) {
        let shared = &self.shared;
        let mut state = shared.lock_state();

        state.pending += delta;
        state.unsettled += delta;
        shared.cache.adjust_quantity(delta);

        if let Some(timer) = state.timer.take() {
            timer.abort();
        }
        state.generation += 1;

        let generation = state.generation;
        let task_shared = Arc::clone(shared);
        state.timer = Some(tokio::spawn(async move {
            tokio::time::sleep(task_shared.debounce).await;
            flush(task_shared, generation).await;
        }));

        debug!(
            medicine_id = %shared.medicine_id,
            delta,
            pending = state.pending,
            "Stock tap accumulated"
        );
    }

    pub fn phase(&self) -> UpdaterPhase {
        self.shared.lock_state().phase()
    }

    /// Sum of taps waiting for the timer.
    pub fn pending_delta(&self) -> i64 {
        self.shared.lock_state().pending
    }

    /// Outcome of the latest flush, `None` until one completes or after
    /// [`reset_status`](Self::reset_status).
    pub fn status(&self) -> watch::Receiver<Option<UpdateOutcome>> {
        self.shared.status.subscribe()
    }

    /// Clears the published outcome once the screen has shown it.
    pub fn reset_status(&self) {
        self.shared.status.send_replace(None);
    }

    /// Reloads the caches from the database, keeping unsettled taps applied.
    ///
    /// Waits for a running flush, so the stored quantity and the unsettled
    /// taps are read on the same side of its write.
    pub(crate) async fn refresh_cache(&self) {
        let _gate = self.shared.flush_gate.lock().await;
        refresh_cache(&self.shared).await;
    }
}

impl Drop for StockUpdater {
    fn drop(&mut self) {
        let mut state = self.shared.lock_state();
        if let Some(timer) = state.timer.take() {
            timer.abort();
            state.generation += 1;
            debug!(
                medicine_id = %self.shared.medicine_id,
                discarded = state.pending,
                "Stock updater dropped with pending taps"
            );
        }
    }
}

// =============================================================================
// Flush
// =============================================================================

async fn flush(shared: Arc<Shared>, generation: u64) {
    let batch = {
        let mut state = shared.lock_state();
        if state.generation != generation {
            return;
        }
        state.timer = None;
        state.in_flight += 1;
        std::mem::take(&mut state.pending)
    };

    // From here on no tap can cancel this batch.
    let _gate = shared.flush_gate.lock().await;

    debug!(medicine_id = %shared.medicine_id, batch, "Flushing stock batch");

    let author = resolve_author(&shared.db, shared.user_id.as_deref()).await;
    let success = shared
        .db
        .stock()
        .update_quantity_in_stock(&shared.medicine_id, batch, &author, &shared.description)
        .await;

    shared.lock_state().unsettled -= batch;

    if success {
        info!(medicine_id = %shared.medicine_id, delta = batch, "Stock batch written");
    } else {
        warn!(medicine_id = %shared.medicine_id, delta = batch, "Stock batch rejected");
    }
    shared
        .status
        .send_replace(Some(UpdateOutcome { delta: batch, success }));

    refresh_cache(&shared).await;
    shared.lock_state().in_flight -= 1;
}

async fn refresh_cache(shared: &Shared) {
    let snapshot = shared.cache.fetch(&shared.db, &shared.medicine_id).await;
    let state = shared.lock_state();
    shared.cache.publish(snapshot, state.unsettled);
}

async fn resolve_author(db: &Database, user_id: Option<&str>) -> String {
    let profile = match user_id {
        Some(uid) => db.users().get_user_by_id(uid).await,
        None => None,
    };

    profile
        .map(|user| user.email)
        .filter(|email| !email.is_empty())
        .unwrap_or_else(|| UNKNOWN_AUTHOR.to_string())
}

// =============================================================================
// Unit Tests
// =============================================================================
