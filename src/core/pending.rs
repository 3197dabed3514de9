//! # Pending handler work.
//!
//! Deferred work returned by handlers is spawned and tracked here until it
//! settles, so barriers can wait for it and resets can discard it.
//!
//! ## Architecture
//! ```text
//! track(work, scope) ──► tokio::spawn ──► select! {
//!                                           scope.cancelled() → Cancelled (result discarded)
//!                                           work (panic-caught) → Ok / Err
//!                                         }
//!                                         ├─► report (log + counters)
//!                                         ├─► detach from set
//!                                         └─► settled latch fires
//! ```
//!
//! ## Rules
//! - Work is reported, then detached, then its settled latch fires.
//! - Cancellation never raises: cancelled work is counted and logged at debug.
//! - Panics inside work are caught and reported as [`HandlerError::Panicked`].

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::FutureExt;
use tokio_util::sync::CancellationToken;

use super::stats::Counters;
use crate::{error::HandlerError, handlers::BoxWork};

/// What the work was spawned for; used only for logging.
pub(crate) struct WorkLabel {
    pub(crate) event_type: String,
    pub(crate) seq: u64,
    pub(crate) handler: String,
}

/// Set of in-flight handler work, keyed by an internal id.
#[derive(Clone)]
pub(crate) struct PendingSet {
    entries: Arc<Mutex<HashMap<u64, CancellationToken>>>,
    next_id: Arc<AtomicU64>,
    processor: Arc<str>,
    counters: Arc<Counters>,
}

impl PendingSet {
    pub(crate) fn new(processor: Arc<str>, counters: Arc<Counters>) -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
            next_id: Arc::new(AtomicU64::new(0)),
            processor,
            counters,
        }
    }

    /// Spawns `work` and tracks it until it settles or `scope` is cancelled.
    pub(crate) fn track(&self, work: BoxWork, scope: CancellationToken, label: WorkLabel) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let settled = CancellationToken::new();
        self.lock().insert(id, settled.clone());

        let me = self.clone();
        tokio::spawn(async move {
            let outcome = tokio::select! {
                biased;
                _ = scope.cancelled() => Err(HandlerError::Cancelled),
                res = AssertUnwindSafe(work).catch_unwind() => match res {
                    Ok(r) => r,
                    Err(panic) => Err(HandlerError::Panicked { info: panic_message(panic.as_ref()) }),
                },
            };
            me.report(&label, outcome);
            me.lock().remove(&id);
            settled.cancel();
        });
    }

    /// Settled latches of everything currently in flight.
    pub(crate) fn snapshot(&self) -> Vec<CancellationToken> {
        self.lock().values().cloned().collect()
    }

    /// Number of in-flight work items.
    pub(crate) fn len(&self) -> usize {
        self.lock().len()
    }

    fn report(&self, label: &WorkLabel, outcome: Result<(), HandlerError>) {
        match outcome {
            Ok(()) => {
                Counters::bump(&self.counters.work_completed);
            }
            Err(HandlerError::Cancelled) => {
                Counters::bump(&self.counters.work_cancelled);
                tracing::debug!(
                    processor = %self.processor,
                    event_type = %label.event_type,
                    seq = label.seq,
                    handler = %label.handler,
                    "handler work discarded after reset"
                );
            }
            Err(err) => {
                Counters::bump(&self.counters.handler_failures);
                tracing::warn!(
                    processor = %self.processor,
                    event_type = %label.event_type,
                    seq = label.seq,
                    handler = %label.handler,
                    error = %err,
                    label = err.as_label(),
                    "handler work failed"
                );
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<u64, CancellationToken>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Waits until every latch in `latches` has fired.
pub(crate) async fn wait_settled(latches: Vec<CancellationToken>) {
    futures::future::join_all(latches.iter().map(CancellationToken::cancelled)).await;
}

/// Renders a panic payload as text.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
