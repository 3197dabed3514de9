//! # Suite completion analysis.
//!
//! Pure functions that infer run/suite completion from an ordered event slice.
//!
//! ## Rules
//! - A test is keyed by `suite-testIndex` ([`Event::test_key`]).
//! - `test-start` adds the key to `started`; `test-complete` adds it to `completed`.
//! - `test-skip` adds the key to **both** sets (started and completed at once).
//! - A suite is **complete** iff `started` is non-empty and `|started| == |completed|`.
//! - `suite-start` / `suite-end` are markers tracked separately. An explicit
//!   `suite-end` never makes a suite complete, and its absence never makes it pending:
//!   the end marker can be flushed before straggling `test-complete` events.
//! - Events missing `suite` or `test_index` are ignored.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use crate::{
    events::{Event, EventKind},
    history::current_run,
};

/// Started/completed test keys of one suite.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SuiteState {
    started: HashSet<String>,
    completed: HashSet<String>,
}

impl SuiteState {
    /// Applies one test lifecycle event. Returns `true` if the state changed.
    ///
    /// Non-test events and malformed test events are ignored.
    pub fn record(&mut self, event: &Event) -> bool {
        if !event.kind.is_test_lifecycle() {
            return false;
        }
        let Some(key) = event.test_key() else {
            return false;
        };
        match event.kind {
            EventKind::TestStart => self.started.insert(key),
            EventKind::TestComplete => self.completed.insert(key),
            EventKind::TestSkip => {
                let started = self.started.insert(key.clone());
                let completed = self.completed.insert(key);
                started || completed
            }
            _ => false,
        }
    }

    /// Number of distinct started tests.
    pub fn started(&self) -> usize {
        self.started.len()
    }

    /// Number of distinct completed tests.
    pub fn completed(&self) -> usize {
        self.completed.len()
    }

    /// True if the test key has started.
    pub fn has_started(&self, key: &str) -> bool {
        self.started.contains(key)
    }

    /// True if the test key has completed.
    pub fn has_completed(&self, key: &str) -> bool {
        self.completed.contains(key)
    }

    /// Inferred completion: `started > 0 && started == completed`.
    pub fn is_complete(&self) -> bool {
        !self.started.is_empty() && self.started.len() == self.completed.len()
    }
}

/// Result of [`analyze_suite_states`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SuiteStates {
    /// Suites with a `suite-start` marker or any test activity.
    pub suites_started: BTreeSet<String>,
    /// Suites inferred complete from their test sets.
    pub suites_completed: BTreeSet<String>,
    /// `suites_started` minus `suites_completed`.
    pub suites_pending: BTreeSet<String>,
    /// Suites that reported an explicit `suite-end`.
    pub explicit_suite_ends: BTreeSet<String>,
    /// Per-suite test sets.
    pub suites: BTreeMap<String, SuiteState>,
}

impl SuiteStates {
    /// Returns the test sets of `suite`.
    pub fn get(&self, suite: &str) -> Option<&SuiteState> {
        self.suites.get(suite)
    }

    /// True if at least one suite started and none is pending.
    pub fn all_complete(&self) -> bool {
        !self.suites_started.is_empty() && self.suites_pending.is_empty()
    }

    /// Suites that sent `suite-end` but are not inferred complete yet.
    pub fn ended_but_incomplete(&self) -> BTreeSet<String> {
        self.explicit_suite_ends
            .difference(&self.suites_completed)
            .cloned()
            .collect()
    }
}

/// Computes suite completion from `events` in one forward pass.
pub fn analyze_suite_states(events: &[Event]) -> SuiteStates {
    let mut out = SuiteStates::default();

    for event in events {
        let Some(suite) = event.suite.as_deref() else {
            continue;
        };
        match event.kind {
            EventKind::SuiteStart => {
                out.suites_started.insert(suite.to_string());
            }
            EventKind::SuiteEnd => {
                out.explicit_suite_ends.insert(suite.to_string());
            }
            EventKind::TestStart | EventKind::TestComplete | EventKind::TestSkip => {
                if event.test_index.is_none() {
                    continue;
                }
                out.suites_started.insert(suite.to_string());
                out.suites
                    .entry(suite.to_string())
                    .or_default()
                    .record(event);
            }
            _ => {}
        }
    }

    for suite in &out.suites_started {
        let complete = out.suites.get(suite).is_some_and(SuiteState::is_complete);
        if complete {
            out.suites_completed.insert(suite.clone());
        } else {
            out.suites_pending.insert(suite.clone());
        }
    }
    out
}

/// Summary of the current run within a window.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunState {
    /// `run_id` of the `run-start` marker, if any.
    pub run_id: Option<String>,
    /// True if the window contains a `run-start`.
    pub started: bool,
    /// True if a `run-end` follows the last `run-start`.
    pub ended: bool,
    /// Suite analysis restricted to the current run.
    pub suites: SuiteStates,
}

impl RunState {
    /// Run ended and every started suite is inferred complete.
    pub fn is_settled(&self) -> bool {
        self.ended && self.suites.suites_pending.is_empty()
    }
}

/// Analyzes the current run (see [`current_run`]) of `window`.
pub fn analyze_run_state(window: &[Event]) -> RunState {
    let run = current_run(window);
    let marker = run.first().filter(|e| e.kind == EventKind::RunStart);

    RunState {
        run_id: marker.and_then(|e| e.run_id.as_deref()).map(str::to_string),
        started: marker.is_some(),
        ended: run.iter().any(|e| e.kind == EventKind::RunEnd),
        suites: analyze_suite_states(run),
    }
}
