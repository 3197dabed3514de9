//! # Processor lifecycle hooks.
//!
//! Override points invoked around activation and shutdown. Both default to no-ops.
//!
//! ## Example
//! ```rust
//! use async_trait::async_trait;
//! use suitewatch::{Processor, ProcessorHooks};
//!
//! struct Banner;
//!
//! #[async_trait]
//! impl ProcessorHooks for Banner {
//!     async fn on_initialize(&self, processor: &Processor) {
//!         println!("{} listening", processor.name());
//!     }
//! }
//! ```

use async_trait::async_trait;

use super::processor::Processor;

/// Lifecycle hooks of a [`Processor`].
///
/// ### Rules
/// - `on_initialize` runs once, after the reader exists and before the poll loop starts.
/// - `on_shutdown` runs once, after polling stopped, pending work was cancelled and
///   barriers were rejected. It is skipped for processors that never activated.
#[async_trait]
pub trait ProcessorHooks: Send + Sync + 'static {
    /// Called when the processor activates.
    async fn on_initialize(&self, _processor: &Processor) {}

    /// Called when the processor shuts down.
    async fn on_shutdown(&self, _processor: &Processor) {}
}
