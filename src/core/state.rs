//! # Run/suite lifecycle tracker.
//!
//! Maintains the processor's view of the active run and its suites, plus the
//! cancellation scopes handed to handlers.
//!
//! ## Architecture
//! ```text
//! root token (processor shutdown)
//!   └── run token (replaced on every run-start)
//!         ├── suite token "A" (replaced when "A" restarts)
//!         └── suite token "B"
//! ```
//!
//! ## Rules
//! - `run-start` cancels the run token (and thus every suite token) and clears all suites.
//! - `suite-start` for a suite whose start marker was already seen in this run
//!   cancels that suite's token and clears its test sets.
//! - Test events create the suite entry on demand; malformed ones are ignored.
//! - `suite-end` only sets the explicit end marker; inferred completion comes from
//!   the test sets.

use std::collections::HashMap;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::{
    analysis::SuiteState,
    events::{Event, EventKind},
};

/// Per-suite tracking within the active run.
#[derive(Debug)]
struct SuiteTrack {
    tests: SuiteState,
    /// `suite-start` seen for this incarnation.
    started: bool,
    /// `suite-end` seen for this incarnation.
    ended: bool,
    token: CancellationToken,
}

impl SuiteTrack {
    fn new(parent: &CancellationToken) -> Self {
        Self {
            tests: SuiteState::default(),
            started: false,
            ended: false,
            token: parent.child_token(),
        }
    }
}

/// What a reset-relevant event did to the state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Transition {
    /// Nothing reset.
    None,
    /// A new run began; every suite was cleared.
    RunRestarted,
    /// The named suite restarted and was cleared.
    SuiteRestarted(String),
}

/// Lifecycle state owned by one processor.
pub(crate) struct LifecycleState {
    root: CancellationToken,
    run_token: CancellationToken,
    run_active: bool,
    run_id: Option<Arc<str>>,
    suites: HashMap<String, SuiteTrack>,
}

impl LifecycleState {
    pub(crate) fn new(root: CancellationToken) -> Self {
        let run_token = root.child_token();
        Self {
            root,
            run_token,
            run_active: false,
            run_id: None,
            suites: HashMap::new(),
        }
    }

    /// Applies `ev`: resets first, then bookkeeping.
    pub(crate) fn apply(&mut self, ev: &Event) -> Transition {
        match ev.kind {
            EventKind::RunStart => {
                self.reset_run();
                self.run_active = true;
                self.run_id = ev.run_id.clone();
                Transition::RunRestarted
            }
            EventKind::RunEnd => {
                self.run_active = false;
                Transition::None
            }
            EventKind::SuiteStart => {
                let Some(suite) = ev.suite.as_deref() else {
                    return Transition::None;
                };
                let restarted = self.suites.get(suite).is_some_and(|t| t.started);
                if restarted {
                    self.clear_suite(suite);
                }
                let parent = self.run_token.clone();
                self.suites
                    .entry(suite.to_string())
                    .or_insert_with(|| SuiteTrack::new(&parent))
                    .started = true;

                if restarted {
                    Transition::SuiteRestarted(suite.to_string())
                } else {
                    Transition::None
                }
            }
            EventKind::SuiteEnd => {
                if let Some(suite) = ev.suite.as_deref() {
                    self.track_mut(suite).ended = true;
                }
                Transition::None
            }
            EventKind::TestStart | EventKind::TestComplete | EventKind::TestSkip => {
                if let (Some(suite), Some(_)) = (ev.suite.as_deref(), ev.test_index) {
                    self.track_mut(suite).tests.record(ev);
                }
                Transition::None
            }
            EventKind::Diagnostic(_) => Transition::None,
        }
    }

    /// Cancellation scope for work dispatched for `ev`.
    ///
    /// Read-only: suites unknown to the state fall back to the run scope.
    pub(crate) fn scope_for(&self, ev: &Event) -> CancellationToken {
        match ev.suite.as_deref() {
            Some(suite) if ev.kind != EventKind::RunStart && ev.kind != EventKind::RunEnd => self
                .suites
                .get(suite)
                .map(|t| t.token.clone())
                .unwrap_or_else(|| self.run_token.clone()),
            _ => self.run_token.clone(),
        }
    }

    /// Cancels every scope and forgets all suites. The run is no longer active.
    pub(crate) fn reset_all(&mut self) {
        self.reset_run();
        self.run_active = false;
        self.run_id = None;
    }

    fn reset_run(&mut self) {
        self.run_token.cancel();
        self.run_token = self.root.child_token();
        self.suites.clear();
    }

    fn clear_suite(&mut self, suite: &str) {
        if let Some(track) = self.suites.remove(suite) {
            track.token.cancel();
        }
    }

    fn track_mut(&mut self, suite: &str) -> &mut SuiteTrack {
        let parent = &self.run_token;
        self.suites
            .entry(suite.to_string())
            .or_insert_with(|| SuiteTrack::new(parent))
    }

    pub(crate) fn is_run_active(&self) -> bool {
        self.run_active
    }

    pub(crate) fn run_id(&self) -> Option<Arc<str>> {
        self.run_id.clone()
    }

    /// Suites whose start marker was seen and whose end marker was not, sorted.
    pub(crate) fn active_suites(&self) -> Vec<String> {
        let mut active: Vec<String> = self
            .suites
            .iter()
            .filter(|(_, t)| t.started && !t.ended)
            .map(|(name, _)| name.clone())
            .collect();
        active.sort_unstable();
        active
    }

    pub(crate) fn suite_state(&self, suite: &str) -> Option<SuiteState> {
        self.suites.get(suite).map(|t| t.tests.clone())
    }

    pub(crate) fn has_suite_ended(&self, suite: &str) -> bool {
        self.suites.get(suite).is_some_and(|t| t.ended)
    }
}
