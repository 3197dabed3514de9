//! # Event log contract and a bounded in-memory implementation.
//!
//! [`EventLog`] and [`Reader`] describe what a processor needs from the backing
//! store. Anything that honours the contract (an on-disk ring, a shared-memory
//! segment, a remote service) can feed processors.
//!
//! ## Contract
//! - `append` assigns a strictly increasing sequence; on overflow the **oldest**
//!   retained entry is evicted, never the one being appended.
//! - `create_reader(name)` is idempotent per name. A new reader starts at the
//!   beginning of the currently retained window.
//! - `Reader::consume(n)` returns up to `n` unread events in sequence order and
//!   commits the cursor past the last one returned.
//! - `Reader::lookback(n, from)` is read-only: up to `n` most recent retained events
//!   with `seq <= from`, oldest first.
//! - Cursors are independent; there is no notion of a slowest consumer.
//!
//! ```text
//!  producer ── append ──► [ ring: seq 41 .. seq 1064 ] ◄── consume ── reader "console"
//!                                  ▲        ▲
//!                                  │        └───────────── consume ── reader "summary"
//!                                  └── lookback (no cursor movement)
//! ```

mod memory;

use std::sync::Arc;

use async_trait::async_trait;

use crate::{error::LogError, events::Event};

pub use memory::{MemoryLog, MemoryReader};

/// Shared handle to an event log.
pub type LogRef = Arc<dyn EventLog>;

/// Shared handle to a reader cursor.
pub type ReaderRef = Arc<dyn Reader>;

/// Append-only, capacity-bounded event store with named reader cursors.
#[async_trait]
pub trait EventLog: Send + Sync + 'static {
    /// Appends an event, assigning and returning its sequence number.
    async fn append(&self, event: Event) -> Result<u64, LogError>;

    /// Returns the reader registered under `name`, creating it if needed.
    async fn create_reader(&self, name: &str) -> Result<ReaderRef, LogError>;

    /// Returns the sequence of the most recently appended event (`0` when empty).
    async fn latest_sequence(&self) -> Result<u64, LogError>;
}

/// Named cursor over an [`EventLog`].
#[async_trait]
pub trait Reader: Send + Sync + 'static {
    /// Reader name (stable across `create_reader` calls).
    fn name(&self) -> &str;

    /// Returns and commits the next `max` unread events.
    async fn consume(&self, max: usize) -> Result<Vec<Event>, LogError>;

    /// Returns up to `count` retained events with `seq <= from`, oldest first.
    ///
    /// Does not move any cursor.
    async fn lookback(&self, count: usize, from: u64) -> Result<Vec<Event>, LogError>;
}
