use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;
use tokio::time::timeout;

use suitewatch::{
    BlockError, Event, EventKind, EventLog, HandlerError, HandlerRef, LogError, MemoryLog,
    Processor, ProcessorBuilder, ProcessorConfig, ProcessorHooks, ReaderRef, analyze_suite_states,
    sync_fn, work_fn,
};

const ALL_KINDS: [EventKind; 7] = [
    EventKind::RunStart,
    EventKind::SuiteStart,
    EventKind::TestStart,
    EventKind::TestComplete,
    EventKind::TestSkip,
    EventKind::SuiteEnd,
    EventKind::RunEnd,
];

fn manual(name: &str, log: &MemoryLog) -> ProcessorBuilder {
    Processor::builder(name.to_string())
        .with_config(ProcessorConfig::manual())
        .with_log(Arc::new(log.clone()))
}

fn recorder() -> (HandlerRef, Arc<Mutex<Vec<u64>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let handler = sync_fn("recorder", move |ev, _| {
        sink.lock().unwrap().push(ev.seq);
        Ok(())
    });
    (handler, seen)
}

async fn append_all(log: &MemoryLog, events: Vec<Event>) {
    for ev in events {
        log.append(ev).await.unwrap();
    }
}

async fn eventually<F: Fn() -> bool>(cond: F) {
    timeout(Duration::from_secs(5), async {
        while !cond() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

fn kinds(events: &[Event]) -> Vec<&str> {
    events.iter().map(|e| e.kind.as_str()).collect()
}

#[tokio::test]
async fn cursors_are_monotonic_and_independent() {
    let log = MemoryLog::new(100);
    let (rec_a, seen_a) = recorder();
    let (rec_b, seen_b) = recorder();
    let a = manual("a", &log).on_many(ALL_KINDS, rec_a).build();
    let b = manual("b", &log)
        .with_config(ProcessorConfig {
            batch_size: 2,
            ..ProcessorConfig::manual()
        })
        .on_many(ALL_KINDS, rec_b)
        .build();
    assert!(a.initialize().await);
    assert!(b.initialize().await);

    append_all(&log, vec![Event::run_start("r1"), Event::suite_start("A")]).await;
    assert_eq!(a.drain().await, Ok(2));
    append_all(
        &log,
        vec![Event::test_start("A", 0), Event::test_complete("A", 0), Event::suite_end("A")],
    )
    .await;
    assert_eq!(a.drain().await, Ok(3));
    assert_eq!(a.drain().await, Ok(0));

    // b consumes in batches of two
    assert_eq!(b.poll().await, Ok(2));
    assert_eq!(b.poll().await, Ok(2));
    assert_eq!(b.poll().await, Ok(1));
    assert_eq!(b.poll().await, Ok(0));

    assert_eq!(*seen_a.lock().unwrap(), vec![1, 2, 3, 4, 5]);
    assert_eq!(*seen_b.lock().unwrap(), vec![1, 2, 3, 4, 5]);
}

#[tokio::test]
async fn skipped_tests_count_toward_completion() {
    let log = MemoryLog::default();
    let p = manual("completion", &log).build();
    assert!(p.initialize().await);

    append_all(
        &log,
        vec![
            Event::run_start("r1"),
            Event::suite_start("A"),
            Event::test_start("A", 0),
            Event::test_start("A", 1),
            Event::test_start("A", 2),
            Event::test_complete("A", 0),
            Event::test_complete("A", 1),
        ],
    )
    .await;
    p.drain().await.unwrap();
    assert!(!p.is_suite_complete("A"));

    log.append(Event::test_skip("A", 2)).await.unwrap();
    p.drain().await.unwrap();
    assert!(p.is_suite_complete("A"));
    assert!(!p.has_suite_ended("A"));

    let states = analyze_suite_states(&p.current_run_events().await.unwrap());
    assert!(states.suites_completed.contains("A"));
    assert!(states.suites_pending.is_empty());
}

#[tokio::test]
async fn consecutive_run_starts_leave_single_run_state() {
    let once = MemoryLog::default();
    let twice = MemoryLog::default();
    let p1 = manual("once", &once).build();
    let p2 = manual("twice", &twice).build();
    assert!(p1.initialize().await);
    assert!(p2.initialize().await);

    let prefix = vec![
        Event::run_start("r0"),
        Event::suite_start("A"),
        Event::test_start("A", 0),
    ];
    append_all(&once, prefix.clone()).await;
    append_all(&twice, prefix).await;
    append_all(&once, vec![Event::run_start("r1")]).await;
    append_all(&twice, vec![Event::run_start("r1"), Event::run_start("r1")]).await;
    p1.drain().await.unwrap();
    p2.drain().await.unwrap();

    for p in [&p1, &p2] {
        assert!(p.is_run_active());
        assert_eq!(p.run_id().as_deref(), Some("r1"));
        assert!(p.active_suites().is_empty());
        assert!(p.suite_state("A").is_none());
    }
    assert_eq!(p2.stats().runs_started, 3);
}

#[tokio::test]
async fn run_start_releases_suite_waiters() {
    let log = MemoryLog::default();
    let p = manual("barrier", &log).build();
    assert!(p.initialize().await);

    p.process_batch(&[Event::run_start("r1"), Event::suite_start("A")]).await;

    let waiter = {
        let p = p.clone();
        tokio::spawn(async move { p.block_for_suite("A").await })
    };
    tokio::task::yield_now().await;
    assert!(!waiter.is_finished());

    p.process_event(&Event::run_start("r2")).await;
    let res = timeout(Duration::from_secs(5), waiter).await.unwrap().unwrap();
    assert_eq!(res, Ok(()));
    assert!(!p.has_suite_ended("A"));
}

#[tokio::test]
async fn suite_restart_releases_only_that_suite() {
    let log = MemoryLog::default();
    let p = manual("restart", &log).build();
    assert!(p.initialize().await);
    p.process_batch(&[Event::suite_start("A"), Event::suite_start("B")]).await;

    let wait_a = {
        let p = p.clone();
        tokio::spawn(async move { p.block_for_suite("A").await })
    };
    let wait_b = {
        let p = p.clone();
        tokio::spawn(async move { p.block_for_suite("B").await })
    };
    tokio::task::yield_now().await;

    p.process_event(&Event::suite_start("A")).await;
    assert_eq!(timeout(Duration::from_secs(5), wait_a).await.unwrap().unwrap(), Ok(()));
    tokio::task::yield_now().await;
    assert!(!wait_b.is_finished());
    assert_eq!(p.stats().suite_restarts, 1);

    p.process_event(&Event::suite_end("B")).await;
    assert_eq!(timeout(Duration::from_secs(5), wait_b).await.unwrap().unwrap(), Ok(()));
}

#[tokio::test]
async fn queries_only_see_latest_run() {
    let log = MemoryLog::default();
    let p = manual("ordering", &log).build();
    assert!(p.initialize().await);

    append_all(
        &log,
        vec![
            Event::run_start("r1"),
            Event::suite_start("S"),
            Event::test_start("S", 0),
            Event::run_start("r2"),
            Event::suite_start("S"),
            Event::test_start("S", 0),
            Event::test_complete("S", 0),
            Event::suite_end("S"),
        ],
    )
    .await;
    assert_eq!(p.drain().await, Ok(8));

    let run = p.current_run_events().await.unwrap();
    assert_eq!(
        kinds(&run),
        vec!["run-start", "suite-start", "test-start", "test-complete", "suite-end"]
    );
    assert_eq!(run[0].seq, 4);
    assert_eq!(run[0].run_id.as_deref(), Some("r2"));

    let suite = p.suite_events("S").await.unwrap();
    assert_eq!(
        kinds(&suite),
        vec!["suite-start", "test-start", "test-complete", "suite-end"]
    );
    assert!(suite.iter().all(|e| e.seq >= 5));

    let test = p.test_events("S", 0).await.unwrap();
    assert_eq!(kinds(&test), vec!["test-start", "test-complete"]);
}

#[tokio::test]
async fn suite_window_excludes_run_boundaries() {
    let log = MemoryLog::default();
    let p = manual("window", &log).build();
    assert!(p.initialize().await);

    append_all(
        &log,
        vec![
            Event::run_start("r1"),
            Event::suite_start("A"),
            Event::test_start("A", 0),
            Event::test_complete("A", 0).with_field("status", "pass"),
            Event::suite_end("A"),
            Event::run_end(),
        ],
    )
    .await;
    p.drain().await.unwrap();

    let suite = p.suite_events("A").await.unwrap();
    assert_eq!(
        kinds(&suite),
        vec!["suite-start", "test-start", "test-complete", "suite-end"]
    );
    assert_eq!(
        suite[2].field("status").and_then(|v| v.as_str()),
        Some("pass")
    );
    assert_eq!(p.lookback(2).await.unwrap().len(), 2);
    assert!(p.block_for_run().await.is_ok());
}

#[tokio::test]
async fn failing_handler_does_not_stop_poll_loop() {
    let log = MemoryLog::default();
    let (rec, seen) = recorder();
    let p = Processor::builder("isolation")
        .with_config(ProcessorConfig {
            poll_interval: Duration::from_millis(10),
            ..ProcessorConfig::default()
        })
        .with_log(Arc::new(log.clone()))
        .on(
            EventKind::TestStart,
            sync_fn("explodes", |ev, _| {
                if ev.test_index == Some(0) {
                    panic!("handler bug");
                }
                Err(HandlerError::failed("always"))
            }),
        )
        .on(EventKind::TestComplete, rec)
        .build();
    assert!(p.initialize().await);

    append_all(
        &log,
        vec![
            Event::test_start("A", 0),
            Event::test_start("A", 1),
            Event::test_complete("A", 0),
        ],
    )
    .await;
    eventually(|| p.stats().events_processed == 3).await;

    // next tick still runs
    log.append(Event::test_complete("A", 1)).await.unwrap();
    eventually(|| p.stats().events_processed == 4).await;

    assert_eq!(*seen.lock().unwrap(), vec![3, 4]);
    assert_eq!(p.stats().handler_failures, 2);
    p.shutdown().await;
}

#[tokio::test]
async fn poll_loop_survives_log_errors() {
    let log = MemoryLog::default();
    let p = Processor::builder("closed")
        .with_config(ProcessorConfig {
            poll_interval: Duration::from_millis(5),
            ..ProcessorConfig::default()
        })
        .with_log(Arc::new(log.clone()))
        .build();
    assert!(p.initialize().await);

    log.close().await;
    eventually(|| p.stats().poll_failures >= 2).await;
    assert!(p.is_active());
    p.shutdown().await;
}

#[tokio::test]
async fn pending_work_is_discarded_on_reset() {
    let log = MemoryLog::default();
    let observed = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&observed);
    let p = manual("discard", &log)
        .on(
            EventKind::TestStart,
            work_fn("slow", move |ev, ctx| {
                let sink = Arc::clone(&sink);
                async move {
                    ctx.cancel_token().cancelled().await;
                    sink.lock().unwrap().push(ev.seq);
                    Err(HandlerError::Cancelled)
                }
            }),
        )
        .build();
    assert!(p.initialize().await);

    p.process_batch(&[
        Event::run_start("r1"),
        Event::suite_start("A"),
        Event::test_start("A", 0),
        Event::test_start("A", 1),
    ])
    .await;
    assert_eq!(p.pending_work(), 2);

    p.process_event(&Event::run_start("r2")).await;
    p.settle().await;

    assert_eq!(p.pending_work(), 0);
    let stats = p.stats();
    assert_eq!(stats.work_cancelled, 2);
    assert_eq!(stats.handler_failures, 0);
    assert_eq!(stats.work_completed, 0);
    assert!(observed.lock().unwrap().is_empty());
}

#[tokio::test]
async fn suite_barrier_waits_for_pending_work() {
    let log = MemoryLog::default();
    let gate = Arc::new(Notify::new());
    let gate_in = Arc::clone(&gate);
    let p = manual("gated", &log)
        .on(
            EventKind::TestComplete,
            work_fn("gated", move |_, _| {
                let gate = Arc::clone(&gate_in);
                async move {
                    gate.notified().await;
                    Ok(())
                }
            }),
        )
        .build();
    assert!(p.initialize().await);

    p.process_batch(&[
        Event::run_start("r1"),
        Event::suite_start("A"),
        Event::test_start("A", 0),
        Event::test_complete("A", 0),
        Event::suite_end("A"),
    ])
    .await;
    assert!(p.has_suite_ended("A"));
    assert!(p.is_suite_complete("A"));

    let waiter = {
        let p = p.clone();
        tokio::spawn(async move { p.block_for_suite("A").await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(!waiter.is_finished());

    gate.notify_one();
    assert_eq!(timeout(Duration::from_secs(5), waiter).await.unwrap().unwrap(), Ok(()));
    assert_eq!(p.stats().work_completed, 1);

    // already resolved: returns immediately
    assert_eq!(p.block_for_suite("A").await, Ok(()));
}

#[tokio::test]
async fn shutdown_releases_waiters_and_deactivates() {
    let log = MemoryLog::default();
    let p = manual("stop", &log).build();
    assert!(p.initialize().await);
    p.process_event(&Event::run_start("r1")).await;

    let waiter = {
        let p = p.clone();
        tokio::spawn(async move { p.block_for_run().await })
    };
    tokio::task::yield_now().await;

    p.shutdown().await;
    assert_eq!(timeout(Duration::from_secs(5), waiter).await.unwrap().unwrap(), Ok(()));
    assert!(!p.is_run_active());
    assert_eq!(p.block_for_run().await, Err(BlockError::Inactive));
    assert_eq!(p.poll().await, Ok(0));
}

struct BrokenLog;

#[async_trait]
impl EventLog for BrokenLog {
    async fn append(&self, _event: Event) -> Result<u64, LogError> {
        Err(LogError::Unavailable)
    }

    async fn create_reader(&self, _name: &str) -> Result<ReaderRef, LogError> {
        Err(LogError::Io {
            reason: "permission denied".into(),
        })
    }

    async fn latest_sequence(&self) -> Result<u64, LogError> {
        Err(LogError::Unavailable)
    }
}

#[tokio::test]
async fn reader_failure_leaves_processor_inert() {
    let p = Processor::builder("broken")
        .with_log(Arc::new(BrokenLog))
        .build();
    assert!(!p.initialize().await);
    assert!(!p.is_active());
    assert!(!p.process_event(&Event::run_start("r1")).await);
    assert_eq!(p.block_for_suite("A").await, Err(BlockError::Inactive));
    assert_eq!(p.suite_events("A").await, Err(LogError::Unavailable));
    assert_eq!(p.stats().events_processed, 0);
}

#[derive(Default)]
struct Trace {
    calls: Mutex<Vec<String>>,
}

#[async_trait]
impl ProcessorHooks for Trace {
    async fn on_initialize(&self, processor: &Processor) {
        self.calls
            .lock()
            .unwrap()
            .push(format!("init:{}", processor.name()));
    }

    async fn on_shutdown(&self, processor: &Processor) {
        self.calls
            .lock()
            .unwrap()
            .push(format!("shutdown:{}", processor.is_active()));
    }
}

#[tokio::test]
async fn hooks_run_once_around_lifecycle() {
    let log = MemoryLog::default();
    let trace = Arc::new(Trace::default());
    let p = manual("hooked", &log).with_hooks(trace.clone()).build();

    assert!(p.initialize().await);
    assert!(p.initialize().await);
    p.shutdown().await;
    p.shutdown().await;

    assert_eq!(
        *trace.calls.lock().unwrap(),
        vec!["init:hooked".to_string(), "shutdown:false".to_string()]
    );
}
