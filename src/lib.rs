//! # suitewatch
//!
//! **Suitewatch** consumes an append-only log of test-telemetry events and
//! coordinates the run/suite lifecycle around it.
//!
//! A [`Processor`] owns a named cursor into an [`EventLog`], routes each event to
//! the [`Handler`] registered for its [`EventKind`], keeps track of which suites
//! and tests are in flight, and lets callers block until a suite or the whole run
//! has ended with every piece of handler work settled.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!   producers ──► append(Event) ──► ┌──────────────────────────────┐
//!                                   │  EventLog (MemoryLog, ...)   │
//!                                   │  seq 1, 2, 3, ...  bounded   │
//!                                   └──────┬──────────────┬────────┘
//!                         consume(batch)   │              │  lookback(n, latest)
//!                                          ▼              ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Processor "name"                                                 │
//! │  - Reader cursor (one per name)                                   │
//! │  - LifecycleState (run, suites, tests, cancellation scopes)       │
//! │  - HandlerMap (EventKind → Handler)                               │
//! │  - PendingSet (spawned handler work)                              │
//! │  - BarrierSet (suite / run barriers)                              │
//! └──────┬──────────────────────┬───────────────────────┬─────────────┘
//!        ▼                      ▼                       ▼
//!   handle(ev, ctx)        block_for_suite(s)      History queries
//!   ├─ Done                block_for_run()         current_run_events()
//!   └─ Work(fut) ─► spawn                          suite_events(s)
//!                                                  test_events(s, i)
//! ```
//!
//! ### Lifecycle
//! ```text
//! run-start   ─► cancel run scope, reject every barrier, clear suites
//! suite-start ─► (seen before in this run?) cancel suite scope, reject its barrier
//! test-*      ─► record started / completed keys ("suite-index")
//! suite-end   ─► after pending work settles: resolve suite barrier
//! run-end     ─► after pending work settles: resolve run barrier
//! ```
//!
//! ## Features
//! | Area           | Description                                              | Key types / traits                         |
//! |----------------|----------------------------------------------------------|--------------------------------------------|
//! | **Log**        | Append-only sequenced log with named reader cursors.      | [`EventLog`], [`Reader`], [`MemoryLog`]    |
//! | **Handlers**   | Per-kind routing with inline and deferred work.          | [`Handler`], [`Dispatch`], [`sync_fn`]     |
//! | **Processing** | Polling, ordered dispatch, barriers, resets.             | [`Processor`], [`ProcessorBuilder`]        |
//! | **Queries**    | Windowed views of recent history.                        | [`History`], [`current_run`]               |
//! | **Analysis**   | Pure suite/run state analysis over event windows.        | [`analyze_suite_states`], [`RunState`]     |
//! | **Errors**     | Typed errors for log access, handlers and blocking.      | [`LogError`], [`HandlerError`], [`BlockError`] |
//!
//! ## Optional features
//! - `logging`: exports a simple built-in [`LogWriter`] handler _(demo/reference only)_.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use suitewatch::{Event, EventKind, EventLog, MemoryLog, Processor, ProcessorConfig, sync_fn};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let log = MemoryLog::new(1_000);
//!
//!     let processor = Processor::builder("reporter")
//!         .with_config(ProcessorConfig::manual())
//!         .with_log(Arc::new(log.clone()))
//!         .on(
//!             EventKind::SuiteEnd,
//!             sync_fn("report", |ev, _ctx| {
//!                 println!("suite {:?} ended", ev.suite);
//!                 Ok(())
//!             }),
//!         )
//!         .build();
//!     processor.initialize().await;
//!
//!     log.append(Event::run_start("r1")).await?;
//!     log.append(Event::suite_start("A")).await?;
//!     log.append(Event::suite_end("A")).await?;
//!     processor.drain().await?;
//!
//!     processor.block_for_suite("A").await?;
//!     processor.shutdown().await;
//!     Ok(())
//! }
//! ```
mod analysis;
mod config;
mod core;
mod error;
mod events;
mod handlers;
mod history;
mod log;

// ---- Public re-exports ----

pub use analysis::{RunState, SuiteState, SuiteStates, analyze_run_state, analyze_suite_states};
pub use config::ProcessorConfig;
pub use core::{Processor, ProcessorBuilder, ProcessorHooks, ProcessorStats};
pub use error::{BlockError, HandlerError, LogError, ResetReason};
pub use events::{Event, EventKind};
pub use handlers::{
    BoxWork, Dispatch, Handler, HandlerContext, HandlerFn, HandlerMap, HandlerRef, sync_fn, work_fn,
};
pub use history::{History, current_run, suite_window, test_window};
pub use log::{EventLog, LogRef, MemoryLog, MemoryReader, Reader, ReaderRef};

// Optional: expose a simple built-in logging handler (demo/reference).
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use handlers::LogWriter;
