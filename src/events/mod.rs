//! Telemetry events: the data model shared by producers, logs and processors.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//!
//! ## Quick reference
//! - **Producers**: test runners appending to an [`EventLog`](crate::EventLog).
//! - **Consumers**: [`Processor`](crate::Processor) instances, each through its own
//!   [`Reader`](crate::Reader) cursor.

mod event;

pub use event::{Event, EventKind};
