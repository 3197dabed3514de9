//! # Processor: consumes the event log and coordinates the run/suite lifecycle.
//!
//! A [`Processor`] owns one named reader cursor, a routing table of handlers, the
//! lifecycle state of the active run and the barriers callers can block on.
//!
//! ## Architecture
//! ```text
//! poll loop (interval, MissedTickBehavior::Delay)
//!   └─► poll(): reader.consume(batch_size) ─► for each event, in order:
//!
//! process_event(ev)
//!   ├─► state.apply(ev)
//!   │     ├─ RunRestarted      → cancel run scope, reject all barriers
//!   │     └─ SuiteRestarted(s) → cancel suite scope, reject barrier of s
//!   ├─► handler = routes[ev.kind]            (unrouted kinds: bookkeeping only)
//!   │     └─ handle(ev, ctx)  (panic-caught)
//!   │           ├─ Done
//!   │           ├─ Work(fut)  → PendingSet::track(fut, scope)
//!   │           └─ Err        → warn, count, continue
//!   └─► suite-end / run-end
//!         └─ snapshot pending ─► spawn { wait_settled ─► barrier.resolve() }
//!
//! block_for_suite(s) / block_for_run()
//!   └─► subscribe(barrier) ─► wait
//!         ├─ resolved           → Ok(())
//!         ├─ Reset(reason)      → Ok(())  (logged at debug)
//!         └─ Inactive/Abandoned → Err
//! ```
//!
//! ## Rules
//! - Events are processed strictly in sequence order, one batch at a time.
//! - Resets are applied **before** the handler for the resetting event runs.
//! - A failing handler never stops processing of later events.
//! - A processor that is disabled, has no log, or could not create its reader is
//!   inert: it never polls, never dispatches and its blocks fail with
//!   [`BlockError::Inactive`].

use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};

use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::{
    barrier::{BarrierSet, BarrierWait},
    builder::ProcessorBuilder,
    hooks::ProcessorHooks,
    pending::{PendingSet, WorkLabel, panic_message, wait_settled},
    state::{LifecycleState, Transition},
    stats::{Counters, ProcessorStats},
};
use crate::{
    analysis::SuiteState,
    config::ProcessorConfig,
    error::{BlockError, HandlerError, LogError, ResetReason},
    events::{Event, EventKind},
    handlers::{Dispatch, HandlerContext, HandlerMap},
    history::History,
    log::LogRef,
};

/// Event-log consumer with run/suite lifecycle coordination.
///
/// Cheap to clone; clones share the same cursor, state and barriers.
#[derive(Clone)]
pub struct Processor {
    inner: Arc<Inner>,
}

struct Inner {
    name: Arc<str>,
    cfg: ProcessorConfig,
    log: Option<LogRef>,
    handlers: HandlerMap,
    hooks: Option<Arc<dyn ProcessorHooks>>,

    history: OnceLock<History>,
    shared: Mutex<Shared>,
    pending: PendingSet,
    counters: Arc<Counters>,

    root: CancellationToken,
    batch_lock: tokio::sync::Mutex<()>,
    poll_task: Mutex<Option<JoinHandle<()>>>,
    shut_down: AtomicBool,
}

/// State mutated together under one lock.
struct Shared {
    state: LifecycleState,
    barriers: BarrierSet,
}

impl Inner {
    fn shared(&self) -> MutexGuard<'_, Shared> {
        self.shared.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn poll_task(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.poll_task.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        self.root.cancel();
    }
}

impl Processor {
    /// Starts building a processor named `name`.
    pub fn builder(name: impl Into<Arc<str>>) -> ProcessorBuilder {
        ProcessorBuilder::new(name)
    }

    pub(crate) fn new_internal(
        name: Arc<str>,
        cfg: ProcessorConfig,
        log: Option<LogRef>,
        handlers: HandlerMap,
        hooks: Option<Arc<dyn ProcessorHooks>>,
    ) -> Self {
        let root = CancellationToken::new();
        let counters = Arc::new(Counters::default());
        Self {
            inner: Arc::new(Inner {
                pending: PendingSet::new(Arc::clone(&name), Arc::clone(&counters)),
                shared: Mutex::new(Shared {
                    state: LifecycleState::new(root.clone()),
                    barriers: BarrierSet::default(),
                }),
                name,
                cfg,
                log,
                handlers,
                hooks,
                history: OnceLock::new(),
                counters,
                root,
                batch_lock: tokio::sync::Mutex::new(()),
                poll_task: Mutex::new(None),
                shut_down: AtomicBool::new(false),
            }),
        }
    }

    /// Processor name; also the name of its reader cursor.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn config(&self) -> &ProcessorConfig {
        &self.inner.cfg
    }

    /// True once initialized and until shut down.
    pub fn is_active(&self) -> bool {
        self.inner.history.get().is_some() && !self.inner.shut_down.load(Ordering::Acquire)
    }

    /// Activates the processor.
    ///
    /// Creates the reader, runs [`ProcessorHooks::on_initialize`] and, when
    /// `async_processing` is set, spawns the poll loop. Returns `false` if the
    /// processor stays inert (disabled, no log, reader creation failed, or
    /// already shut down). Calling it again on an active processor is a no-op
    /// returning `true`.
    pub async fn initialize(&self) -> bool {
        let inner = &self.inner;
        if inner.shut_down.load(Ordering::Acquire) {
            debug!(processor = %inner.name, "initialize after shutdown ignored");
            return false;
        }
        if inner.history.get().is_some() {
            return true;
        }
        if !inner.cfg.enabled {
            debug!(processor = %inner.name, "processor disabled; staying inert");
            return false;
        }
        let Some(log) = inner.log.clone() else {
            debug!(processor = %inner.name, "no event log attached; staying inert");
            return false;
        };

        let reader = match log.create_reader(&inner.name).await {
            Ok(reader) => reader,
            Err(err) => {
                warn!(
                    processor = %inner.name,
                    error = %err,
                    label = err.as_label(),
                    "reader creation failed; staying inert"
                );
                return false;
            }
        };
        let history = History::new(log, reader, inner.cfg.default_lookback_clamped());
        if inner.history.set(history).is_err() {
            // A concurrent initialize won the race.
            return true;
        }

        if let Some(hooks) = &inner.hooks {
            hooks.on_initialize(self).await;
        }
        if inner.cfg.async_processing {
            self.spawn_poll_loop();
        }
        info!(
            processor = %inner.name,
            async_processing = inner.cfg.async_processing,
            handlers = inner.handlers.len(),
            "processor initialized"
        );
        true
    }

    /// Stops the processor. Idempotent.
    ///
    /// Cancels the poll loop and all pending work, clears lifecycle state,
    /// rejects every outstanding barrier and finally runs
    /// [`ProcessorHooks::on_shutdown`].
    pub async fn shutdown(&self) {
        let inner = &self.inner;
        if inner.shut_down.swap(true, Ordering::AcqRel) {
            return;
        }
        inner.root.cancel();

        let task = inner.poll_task().take();
        if let Some(task) = task {
            if let Err(err) = task.await {
                warn!(processor = %inner.name, error = %err, "poll loop ended abnormally");
            }
        }

        // Wait out a batch in flight so nothing is dispatched after the reset below.
        let rejected = {
            let _batch = inner.batch_lock.lock().await;
            let mut shared = inner.shared();
            shared.state.reset_all();
            shared.barriers.reject_all(ResetReason::StateReset)
        };

        if inner.history.get().is_some() {
            if let Some(hooks) = &inner.hooks {
                hooks.on_shutdown(self).await;
            }
        }
        info!(processor = %inner.name, rejected, "processor shut down");
    }

    fn spawn_poll_loop(&self) {
        let weak = Arc::downgrade(&self.inner);
        let token = self.inner.root.clone();
        let period = self.inner.cfg.poll_interval_clamped();

        let handle = tokio::spawn(async move {
            let mut ticker = time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {}
                }
                let Some(inner) = weak.upgrade() else { break };
                let processor = Processor { inner };
                if let Err(err) = processor.poll().await {
                    Counters::bump(&processor.inner.counters.poll_failures);
                    warn!(
                        processor = %processor.inner.name,
                        error = %err,
                        label = err.as_label(),
                        "poll failed; retrying next tick"
                    );
                }
            }
        });
        *self.inner.poll_task() = Some(handle);
    }

    /// Consumes up to `batch_size` new events and processes them in order.
    ///
    /// Returns how many events were processed; `0` for an inert processor.
    pub async fn poll(&self) -> Result<usize, LogError> {
        let Some(history) = self.live_history() else {
            return Ok(0);
        };
        let _guard = self.inner.batch_lock.lock().await;
        if self.inner.shut_down.load(Ordering::Acquire) {
            return Ok(0);
        }
        let events = history.consume(self.inner.cfg.batch_size_clamped()).await?;
        for ev in &events {
            self.dispatch(ev, history);
        }
        Ok(events.len())
    }

    /// Polls until the reader is caught up. Returns the number of events processed.
    pub async fn drain(&self) -> Result<usize, LogError> {
        let mut total = 0;
        loop {
            let n = self.poll().await?;
            if n == 0 {
                return Ok(total);
            }
            total += n;
        }
    }

    /// Processes `events` in order without touching the reader cursor.
    ///
    /// Returns how many were processed; `0` for an inert processor.
    pub async fn process_batch(&self, events: &[Event]) -> usize {
        let Some(history) = self.live_history() else {
            return 0;
        };
        let _guard = self.inner.batch_lock.lock().await;
        if self.inner.shut_down.load(Ordering::Acquire) {
            return 0;
        }
        for ev in events {
            self.dispatch(ev, history);
        }
        events.len()
    }

    /// Processes a single event. Returns `false` if the processor is inert.
    pub async fn process_event(&self, ev: &Event) -> bool {
        self.process_batch(std::slice::from_ref(ev)).await == 1
    }

    fn dispatch(&self, ev: &Event, history: &History) {
        let inner = &*self.inner;
        Counters::bump(&inner.counters.events_processed);

        let scope = {
            let mut shared = inner.shared();
            match shared.state.apply(ev) {
                Transition::RunRestarted => {
                    Counters::bump(&inner.counters.runs_started);
                    let rejected = shared.barriers.reject_all(ResetReason::RunRestarted);
                    debug!(
                        processor = %inner.name,
                        seq = ev.seq,
                        run_id = ev.run_id.as_deref().unwrap_or(""),
                        rejected,
                        "run started; lifecycle state reset"
                    );
                }
                Transition::SuiteRestarted(suite) => {
                    Counters::bump(&inner.counters.suite_restarts);
                    let rejected = shared.barriers.reject_suite(&suite, ResetReason::SuiteRestarted);
                    debug!(
                        processor = %inner.name,
                        seq = ev.seq,
                        suite = %suite,
                        rejected,
                        "suite restarted; suite state reset"
                    );
                }
                Transition::None => {}
            }
            shared.state.scope_for(ev)
        };

        if let Some(handler) = inner.handlers.get(&ev.kind) {
            Counters::bump(&inner.counters.events_dispatched);
            let ctx = HandlerContext::new(Arc::clone(&inner.name), scope.clone(), history.clone());
            let outcome = std::panic::catch_unwind(AssertUnwindSafe(|| handler.handle(ev, &ctx)))
                .unwrap_or_else(|panic| {
                    Err(HandlerError::Panicked {
                        info: panic_message(panic.as_ref()),
                    })
                });

            match outcome {
                Ok(Dispatch::Done) => {}
                Ok(Dispatch::Work(work)) => {
                    let label = WorkLabel {
                        event_type: ev.kind.to_string(),
                        seq: ev.seq,
                        handler: handler.name().to_string(),
                    };
                    inner.pending.track(work, scope, label);
                }
                Err(HandlerError::Cancelled) => {
                    Counters::bump(&inner.counters.work_cancelled);
                    debug!(
                        processor = %inner.name,
                        event_type = %ev.kind,
                        seq = ev.seq,
                        "handler observed cancellation"
                    );
                }
                Err(err) => {
                    Counters::bump(&inner.counters.handler_failures);
                    warn!(
                        processor = %inner.name,
                        event_type = %ev.kind,
                        seq = ev.seq,
                        suite = ev.suite.as_deref().unwrap_or(""),
                        handler = handler.name(),
                        error = %err,
                        label = err.as_label(),
                        "handler failed; continuing"
                    );
                }
            }
        }

        if !ev.kind.is_boundary_end() {
            return;
        }
        let barrier = match (&ev.kind, ev.suite.as_deref()) {
            (EventKind::SuiteEnd, Some(suite)) => Some(inner.shared().barriers.suite(suite)),
            (EventKind::RunEnd, _) => Some(inner.shared().barriers.run()),
            _ => None,
        };
        if let Some(barrier) = barrier.filter(|b| !b.is_settled()) {
            let latches = inner.pending.snapshot();
            tokio::spawn(async move {
                wait_settled(latches).await;
                barrier.resolve();
            });
        }
    }

    /// Waits until `suite` has ended in the active run and every handler work
    /// pending at that moment has settled.
    ///
    /// A reset of the suite or the run while waiting ends the wait with `Ok(())`.
    pub async fn block_for_suite(&self, suite: &str) -> Result<(), BlockError> {
        let wait = self.subscribe(|barriers| barriers.suite(suite).subscribe())?;
        self.finish_block(wait.wait().await, suite)
    }

    /// Waits until the active run has ended and every handler work pending at
    /// that moment has settled.
    ///
    /// A new run starting while waiting ends the wait with `Ok(())`.
    pub async fn block_for_run(&self) -> Result<(), BlockError> {
        let wait = self.subscribe(|barriers| barriers.run().subscribe())?;
        self.finish_block(wait.wait().await, "run")
    }

    fn subscribe<F>(&self, pick: F) -> Result<BarrierWait, BlockError>
    where
        F: FnOnce(&mut BarrierSet) -> BarrierWait,
    {
        if self.inner.history.get().is_none() {
            return Err(BlockError::Inactive);
        }
        let mut shared = self.inner.shared();
        // Checked under the lock: shutdown rejects barriers under the same lock.
        if self.inner.shut_down.load(Ordering::Acquire) {
            return Err(BlockError::Inactive);
        }
        Ok(pick(&mut shared.barriers))
    }

    fn finish_block(&self, res: Result<(), BlockError>, scope: &str) -> Result<(), BlockError> {
        match res {
            Err(BlockError::Reset(reason)) => {
                debug!(
                    processor = %self.inner.name,
                    scope,
                    reason = %reason,
                    "wait ended by reset"
                );
                Ok(())
            }
            other => other,
        }
    }

    /// Waits until every handler work currently pending has settled.
    pub async fn settle(&self) {
        wait_settled(self.inner.pending.snapshot()).await;
    }

    /// Number of handler works in flight.
    pub fn pending_work(&self) -> usize {
        self.inner.pending.len()
    }

    pub fn is_run_active(&self) -> bool {
        self.inner.shared().state.is_run_active()
    }

    /// Id carried by the `run-start` of the active run, if any.
    pub fn run_id(&self) -> Option<Arc<str>> {
        self.inner.shared().state.run_id()
    }

    /// Suites started but not yet ended in the active run, sorted by name.
    pub fn active_suites(&self) -> Vec<String> {
        self.inner.shared().state.active_suites()
    }

    /// Test-level state of `suite` in the active run.
    pub fn suite_state(&self, suite: &str) -> Option<SuiteState> {
        self.inner.shared().state.suite_state(suite)
    }

    /// True if every started test of `suite` completed or was skipped.
    pub fn is_suite_complete(&self, suite: &str) -> bool {
        self.suite_state(suite).is_some_and(|s| s.is_complete())
    }

    /// True if `suite-end` was seen for the current incarnation of `suite`.
    pub fn has_suite_ended(&self, suite: &str) -> bool {
        self.inner.shared().state.has_suite_ended(suite)
    }

    pub fn stats(&self) -> ProcessorStats {
        self.inner.counters.snapshot()
    }

    /// Query handle bound to this processor's reader, once initialized.
    pub fn history(&self) -> Option<History> {
        self.inner.history.get().cloned()
    }

    /// Up to `count` most recent events, oldest first.
    pub async fn lookback(&self, count: usize) -> Result<Vec<Event>, LogError> {
        self.require_history()?.lookback(count).await
    }

    /// Events since the most recent `run-start` in the default lookback window.
    pub async fn current_run_events(&self) -> Result<Vec<Event>, LogError> {
        self.require_history()?.current_run_events().await
    }

    /// Events of the latest incarnation of `suite` in the current run.
    pub async fn suite_events(&self, suite: &str) -> Result<Vec<Event>, LogError> {
        self.require_history()?.suite_events(suite).await
    }

    /// Events of test `test_index` of `suite` in the current run.
    pub async fn test_events(&self, suite: &str, test_index: u32) -> Result<Vec<Event>, LogError> {
        self.require_history()?.test_events(suite, test_index).await
    }

    fn require_history(&self) -> Result<&History, LogError> {
        self.inner.history.get().ok_or(LogError::Unavailable)
    }

    fn live_history(&self) -> Option<&History> {
        if self.inner.shut_down.load(Ordering::Acquire) {
            return None;
        }
        self.inner.history.get()
    }
}

impl std::fmt::Debug for Processor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Processor")
            .field("name", &self.inner.name)
            .field("active", &self.is_active())
            .field("handlers", &self.inner.handlers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::{sync_fn, work_fn};
    use crate::log::{EventLog, MemoryLog};
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    fn manual(log: &MemoryLog) -> ProcessorBuilder {
        Processor::builder("unit")
            .with_config(ProcessorConfig::manual())
            .with_log(Arc::new(log.clone()))
    }

    #[tokio::test]
    async fn inert_without_log() {
        let p = Processor::builder("none").build();
        assert!(!p.initialize().await);
        assert!(!p.is_active());
        assert_eq!(p.poll().await, Ok(0));
        assert_eq!(p.block_for_run().await, Err(BlockError::Inactive));
        assert_eq!(p.lookback(5).await, Err(LogError::Unavailable));
    }

    #[tokio::test]
    async fn disabled_processor_stays_inert() {
        let log = MemoryLog::default();
        let cfg = ProcessorConfig {
            enabled: false,
            ..ProcessorConfig::manual()
        };
        let p = manual(&log).with_config(cfg).build();
        assert!(!p.initialize().await);
        assert!(!p.process_event(&Event::run_start("r")).await);
        assert_eq!(p.stats().events_processed, 0);
    }

    #[tokio::test]
    async fn inline_failure_does_not_stop_later_events() {
        let log = MemoryLog::default();
        let seen = Arc::new(AtomicUsize::new(0));
        let seen2 = Arc::clone(&seen);
        let p = manual(&log)
            .on(
                EventKind::TestStart,
                sync_fn("flaky", |ev, _| match ev.test_index {
                    Some(0) => Err(HandlerError::failed("first")),
                    Some(1) => panic!("second"),
                    _ => Ok(()),
                }),
            )
            .on(
                EventKind::TestComplete,
                sync_fn("count", move |_, _| {
                    seen2.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }),
            )
            .build();
        assert!(p.initialize().await);

        for ev in [
            Event::test_start("A", 0),
            Event::test_start("A", 1),
            Event::test_start("A", 2),
            Event::test_complete("A", 0),
        ] {
            log.append(ev).await.unwrap();
        }
        assert_eq!(p.drain().await, Ok(4));
        assert_eq!(seen.load(Ordering::SeqCst), 1);
        assert_eq!(p.stats().handler_failures, 2);
        assert_eq!(p.stats().events_dispatched, 4);
    }

    #[tokio::test]
    async fn shutdown_is_idempotent_and_cancels_work() {
        let log = MemoryLog::default();
        let p = manual(&log)
            .on(
                EventKind::SuiteStart,
                work_fn("slow", |_, _| async {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    Ok(())
                }),
            )
            .build();
        assert!(p.initialize().await);
        p.process_event(&Event::suite_start("A")).await;
        assert_eq!(p.pending_work(), 1);

        p.shutdown().await;
        p.shutdown().await;
        p.settle().await;

        assert!(!p.is_active());
        assert_eq!(p.pending_work(), 0);
        assert_eq!(p.stats().work_cancelled, 1);
        assert!(!p.initialize().await);
        assert_eq!(p.block_for_suite("A").await, Err(BlockError::Inactive));
    }

    #[tokio::test]
    async fn unrouted_kinds_still_update_state() {
        let log = MemoryLog::default();
        let p = manual(&log).build();
        assert!(p.initialize().await);

        p.process_batch(&[
            Event::run_start("r1"),
            Event::suite_start("A"),
            Event::test_start("A", 0),
        ])
        .await;
        assert!(p.is_run_active());
        assert_eq!(p.run_id().as_deref(), Some("r1"));
        assert_eq!(p.active_suites(), vec!["A".to_string()]);
        assert!(!p.is_suite_complete("A"));
        assert_eq!(p.stats().events_dispatched, 0);
    }

    #[tokio::test]
    async fn malformed_and_diagnostic_events_leave_suites_untouched() {
        let log = MemoryLog::default();
        let p = manual(&log)
            .on("coverage", sync_fn("coverage", |_, _| Ok(())))
            .on(EventKind::TestStart, sync_fn("starts", |_, _| Ok(())))
            .build();
        assert!(p.initialize().await);

        p.process_batch(&[
            Event::run_start("r"),
            Event::new("coverage").with_suite("X"),
            Event::new(EventKind::TestStart).with_suite("Y"),
        ])
        .await;

        assert!(p.suite_state("X").is_none());
        assert!(p.suite_state("Y").is_none());
        assert!(p.active_suites().is_empty());
        assert_eq!(p.stats().events_dispatched, 2);
    }
}
