//! # Event handlers for processors.
//!
//! This module provides the [`Handler`] trait, function-backed handlers and the
//! [`HandlerMap`] a processor routes events through.
//!
//! ## Architecture
//! ```text
//! Processor::process_event(&Event)
//!        │
//!        └──► HandlerMap.get(&event.kind) ──► Handler::handle(&Event, &HandlerContext)
//!                                                   │
//!                                    ┌──────────────┼──────────────┐
//!                                    ▼              ▼              ▼
//!                              aggregation     console out    failure analysis
//! ```
//!
//! ## Handler types
//! - **Inline handlers** ([`sync_fn`]) update state in log order
//! - **Deferred handlers** ([`work_fn`]) return futures tracked as pending work
//! - **Custom handlers** implement [`Handler`] and may mix both

mod handler;
mod handler_fn;
#[cfg(feature = "logging")]
mod log;
mod map;

pub use handler::{BoxWork, Dispatch, Handler, HandlerContext, HandlerRef};
pub use handler_fn::{HandlerFn, sync_fn, work_fn};
#[cfg(feature = "logging")]
pub use log::LogWriter;
pub use map::HandlerMap;
