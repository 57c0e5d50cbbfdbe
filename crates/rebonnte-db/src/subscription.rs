//! # Live Subscriptions
//!
//! Long-lived query streams that re-emit the current result set whenever a
//! collection they read from changes.
//!
//! ## Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Subscription Lifecycle                              │
//! │                                                                         │
//! │  Subscription::listen(db, collections, query)                          │
//! │       │                                                                 │
//! │       ├── subscribe to change feed (before first query: no gap)        │
//! │       ▼                                                                 │
//! │  ┌──────────────┐   snapshot   ┌──────────────┐                        │
//! │  │ run query    │ ───────────► │ mpsc buffer  │ ──► consumer .next()   │
//! │  └──────┬───────┘              └──────────────┘                        │
//! │         │ ▲                                                             │
//! │         ▼ │ relevant change (burst coalesced)                          │
//! │  ┌──────────────┐                                                       │
//! │  │ wait on feed │                                                       │
//! │  └──────────────┘                                                       │
//! │                                                                         │
//! │  drop(Subscription) ──► listener aborted, never outlives its consumer  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures_util::Stream;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::DbResult;
use crate::pool::Database;

// =============================================================================
// Collection
// =============================================================================

/// A logical collection of the document store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Aisles,
    Medicines,
    Stock,
    History,
    Users,
}

impl Collection {
    /// Collection name in the logical document schema.
    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Aisles => "Aisle",
            Collection::Medicines => "medicines",
            Collection::Stock => "stock",
            Collection::History => "history",
            Collection::Users => "users",
        }
    }
}

impl std::fmt::Display for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Subscription
// =============================================================================

/// A live query stream.
///
/// Yields a fresh snapshot after every change to the collections it
/// watches. The listener task is aborted when the subscription is dropped.
///
/// ## Example
/// ```rust,ignore
/// let mut aisles = db.aisles().fetch_all_aisles();
/// while let Some(snapshot) = aisles.next().await {
///     render(snapshot);
/// }
/// ```
#[derive(Debug)]
pub struct Subscription<T> {
    rx: mpsc::Receiver<T>,
    listener: Option<JoinHandle<()>>,
}

impl<T: Send + 'static> Subscription<T> {
    /// Attaches a listener that runs `query` now and after every change to
    /// one of `collections`.
    ///
    /// A failing query ends the stream. Queries that should keep the stream
    /// alive must map their own errors to a value.
    pub(crate) fn listen<F, Fut>(
        db: &Database,
        name: &'static str,
        collections: &'static [Collection],
        query: F,
    ) -> Self
    where
        F: Fn(Database) -> Fut + Send + 'static,
        Fut: Future<Output = DbResult<T>> + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(db.subscription_buffer());
        let mut changes = db.watch_changes();
        let db = db.clone();

        let listener = tokio::spawn(async move {
            debug!(subscription = name, "Listener attached");

            loop {
                let snapshot = match query(db.clone()).await {
                    Ok(snapshot) => snapshot,
                    Err(e) => {
                        warn!(subscription = name, error = %e, "Live query failed, closing stream");
                        break;
                    }
                };

                if tx.send(snapshot).await.is_err() {
                    break;
                }

                if !wait_for_change(&mut changes, collections, &tx).await {
                    break;
                }
            }

            debug!(subscription = name, "Listener detached");
        });

        Subscription {
            rx,
            listener: Some(listener),
        }
    }
}

impl<T> Subscription<T> {
    /// A finished stream holding one value, with no listener attached.
    pub fn ready(value: T) -> Self {
        let (tx, rx) = mpsc::channel(1);
        // Capacity 1 and a fresh channel: cannot be full.
        let _ = tx.try_send(value);
        Subscription { rx, listener: None }
    }

    /// Waits for the next snapshot. `None` once the stream has ended.
    pub async fn next(&mut self) -> Option<T> {
        self.rx.recv().await
    }

    /// Returns true while a listener is attached and running.
    pub fn is_listening(&self) -> bool {
        self.listener
            .as_ref()
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        if let Some(listener) = self.listener.take() {
            listener.abort();
        }
    }
}

// No field is structurally pinned.
impl<T> Unpin for Subscription<T> {}

impl<T> Stream for Subscription<T> {
    type Item = T;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<T>> {
        self.get_mut().rx.poll_recv(cx)
    }
}

/// Waits for a change to one of `collections`.
///
/// Returns false when the listener should stop: the consumer is gone or the
/// feed closed. Changes queued behind the first relevant one are drained so a
/// burst of writes costs one re-query.
async fn wait_for_change<T>(
    changes: &mut broadcast::Receiver<Collection>,
    collections: &[Collection],
    tx: &mpsc::Sender<T>,
) -> bool {
    loop {
        tokio::select! {
            _ = tx.closed() => return false,
            change = changes.recv() => match change {
                Ok(collection) if collections.contains(&collection) => break,
                Ok(_) => continue,
                Err(RecvError::Lagged(skipped)) => {
                    debug!(skipped, "Change feed lagged, re-querying");
                    break;
                }
                Err(RecvError::Closed) => return false,
            },
        }
    }

    loop {
        match changes.try_recv() {
            Ok(_) | Err(TryRecvError::Lagged(_)) => continue,
            Err(TryRecvError::Empty) => return true,
            Err(TryRecvError::Closed) => return false,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
