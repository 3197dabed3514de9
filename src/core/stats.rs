//! Processor counters.

use std::sync::atomic::{AtomicU64, Ordering};

/// Point-in-time snapshot of a processor's counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProcessorStats {
    /// Events that went through `process_event`.
    pub events_processed: u64,
    /// Events routed to a handler.
    pub events_dispatched: u64,
    /// Handler failures (inline errors, panics, failed work).
    pub handler_failures: u64,
    /// Deferred work that finished successfully.
    pub work_completed: u64,
    /// Deferred work discarded because its scope was reset.
    pub work_cancelled: u64,
    /// `run-start` events observed.
    pub runs_started: u64,
    /// Suites restarted mid-run.
    pub suite_restarts: u64,
    /// Polls that failed with a log error.
    pub poll_failures: u64,
}

#[derive(Default)]
pub(crate) struct Counters {
    pub(crate) events_processed: AtomicU64,
    pub(crate) events_dispatched: AtomicU64,
    pub(crate) handler_failures: AtomicU64,
    pub(crate) work_completed: AtomicU64,
    pub(crate) work_cancelled: AtomicU64,
    pub(crate) runs_started: AtomicU64,
    pub(crate) suite_restarts: AtomicU64,
    pub(crate) poll_failures: AtomicU64,
}

impl Counters {
    #[inline]
    pub(crate) fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> ProcessorStats {
        let load = |c: &AtomicU64| c.load(Ordering::Relaxed);
        ProcessorStats {
            events_processed: load(&self.events_processed),
            events_dispatched: load(&self.events_dispatched),
            handler_failures: load(&self.handler_failures),
            work_completed: load(&self.work_completed),
            work_cancelled: load(&self.work_cancelled),
            runs_started: load(&self.runs_started),
            suite_restarts: load(&self.suite_restarts),
            poll_failures: load(&self.poll_failures),
        }
    }
}
