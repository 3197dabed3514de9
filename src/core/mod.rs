//! Runtime core: event dispatch and lifecycle coordination.
//!
//! The public API of this module is [`Processor`] (built with
//! [`ProcessorBuilder`]), its [`ProcessorHooks`] and [`ProcessorStats`].
//!
//! Internal modules:
//! - [`processor`]: poll loop, ordered dispatch, blocking operations;
//! - [`state`]: run/suite tracking and cancellation scopes;
//! - [`barrier`]: one-shot waitable verdicts per suite and run;
//! - [`pending`]: spawned handler work and its settled latches;
//! - [`stats`]: counters.

mod barrier;
mod builder;
mod hooks;
mod pending;
mod processor;
mod state;
mod stats;

pub use builder::ProcessorBuilder;
pub use hooks::ProcessorHooks;
pub use processor::Processor;
pub use stats::ProcessorStats;
