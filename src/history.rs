//! # Windowed views over the event log.
//!
//! The log does not track run or suite boundaries. These helpers rebuild them
//! from a lookback window:
//!
//! ```text
//! window:  … run-start r1 … │ run-start r2  suite-start A  test-start 0 … suite-end A  run-end
//!                           └── current_run ────────────────────────────────────────────────┘
//!                                           └── suite_window("A") ─────────┘
//! ```
//!
//! ## Rules
//! - [`current_run`] scans **backward** for the last `run-start`; without one the
//!   whole window is the current run.
//! - [`suite_window`] picks the **latest** `suite-start` of the suite, then the first
//!   `suite-end` after it. A missing end extends the range to the end of the window.
//! - A window shorter than requested is treated as covering the entire log.
//!
//! The pure functions work on slices; [`History`] binds them to a reader.

use std::sync::Arc;

use crate::{
    error::LogError,
    events::{Event, EventKind},
    log::{EventLog, Reader},
};

/// Returns the suffix of `window` starting at (and including) the last `run-start`.
pub fn current_run(window: &[Event]) -> &[Event] {
    match window.iter().rposition(|e| e.kind == EventKind::RunStart) {
        Some(start) => &window[start..],
        None => window,
    }
}

/// Returns the events of the latest incarnation of `suite` within `run_events`.
///
/// The range runs from the last `suite-start` for `suite` through the first
/// following `suite-end` for `suite` (inclusive), filtered to events of that suite.
/// Empty if the suite never started.
pub fn suite_window(run_events: &[Event], suite: &str) -> Vec<Event> {
    let Some(start) = run_events
        .iter()
        .rposition(|e| e.kind == EventKind::SuiteStart && e.is_for_suite(suite))
    else {
        return Vec::new();
    };

    let end = run_events[start..]
        .iter()
        .position(|e| e.kind == EventKind::SuiteEnd && e.is_for_suite(suite))
        .map_or(run_events.len(), |offset| start + offset + 1);

    run_events[start..end]
        .iter()
        .filter(|e| e.is_for_suite(suite))
        .cloned()
        .collect()
}

/// Returns the events of `suite_events` that carry exactly `test_index`.
pub fn test_window(suite_events: &[Event], test_index: u32) -> Vec<Event> {
    suite_events
        .iter()
        .filter(|e| e.test_index == Some(test_index))
        .cloned()
        .collect()
}

/// Read-only query handle bound to one reader.
///
/// Cheap to clone; handed to handlers through
/// [`HandlerContext`](crate::HandlerContext) and used by [`Processor`](crate::Processor).
#[derive(Clone)]
pub struct History {
    log: Arc<dyn EventLog>,
    reader: Arc<dyn Reader>,
    default_lookback: usize,
}

impl History {
    /// Creates a handle over `reader`, using `log` for the latest sequence.
    pub fn new(log: Arc<dyn EventLog>, reader: Arc<dyn Reader>, default_lookback: usize) -> Self {
        Self {
            log,
            reader,
            default_lookback: default_lookback.max(1),
        }
    }

    /// Advances the underlying cursor by up to `max` events.
    pub(crate) async fn consume(&self, max: usize) -> Result<Vec<Event>, LogError> {
        self.reader.consume(max).await
    }

    /// Number of events fetched when no explicit count is given.
    pub fn default_lookback(&self) -> usize {
        self.default_lookback
    }

    /// Returns up to `count` most recent events, oldest first.
    pub async fn lookback(&self, count: usize) -> Result<Vec<Event>, LogError> {
        let latest = self.log.latest_sequence().await?;
        self.reader.lookback(count, latest).await
    }

    /// [`History::lookback`] with the configured default window.
    pub async fn recent(&self) -> Result<Vec<Event>, LogError> {
        self.lookback(self.default_lookback).await
    }

    /// Everything since the active run began (see [`current_run`]).
    pub async fn current_run_events(&self) -> Result<Vec<Event>, LogError> {
        let window = self.recent().await?;
        Ok(current_run(&window).to_vec())
    }

    /// Events of the latest incarnation of `suite` in the current run.
    pub async fn suite_events(&self, suite: &str) -> Result<Vec<Event>, LogError> {
        let run = self.current_run_events().await?;
        Ok(suite_window(&run, suite))
    }

    /// Events of one test of `suite` in the current run.
    pub async fn test_events(&self, suite: &str, test_index: u32) -> Result<Vec<Event>, LogError> {
        let suite_events = self.suite_events(suite).await?;
        Ok(test_window(&suite_events, test_index))
    }
}
