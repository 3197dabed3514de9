//! # Processor configuration.
//!
//! Provides [`ProcessorConfig`] centralized settings for one processor.
//!
//! ## Sentinel values
//! - `batch_size = 0` → clamped to 1
//! - `default_lookback = 0` → clamped to 1
//! - `poll_interval = 0s` → clamped to 1ms (tokio intervals reject zero)

use std::time::Duration;

/// Configuration for a [`Processor`](crate::Processor).
///
/// ## Field semantics
/// - `enabled`: `false` keeps the processor inert (`initialize` returns `false`)
/// - `async_processing`: start the timer-driven poll loop on `initialize`;
///   when `false` the owner drives [`Processor::poll`](crate::Processor::poll)
/// - `poll_interval`: delay between poll ticks
/// - `batch_size`: maximum events consumed per tick
/// - `default_lookback`: window size for the history queries
///
/// ## Notes
/// All fields are public. Prefer the accessors, which apply the clamps above.
#[derive(Clone, Debug)]
pub struct ProcessorConfig {
    /// Whether the processor activates at all.
    pub enabled: bool,

    /// Whether `initialize` spawns the poll loop.
    pub async_processing: bool,

    /// Interval between poll ticks.
    pub poll_interval: Duration,

    /// Maximum events consumed per poll.
    pub batch_size: usize,

    /// Default number of events fetched by history queries.
    pub default_lookback: usize,
}

impl ProcessorConfig {
    /// Configuration for a processor driven manually through `poll`/`drain`.
    pub fn manual() -> Self {
        Self {
            async_processing: false,
            ..Self::default()
        }
    }

    /// Returns the poll interval clamped to at least 1ms.
    #[inline]
    pub fn poll_interval_clamped(&self) -> Duration {
        self.poll_interval.max(Duration::from_millis(1))
    }

    /// Returns the batch size clamped to a minimum of 1.
    #[inline]
    pub fn batch_size_clamped(&self) -> usize {
        self.batch_size.max(1)
    }

    /// Returns the default lookback clamped to a minimum of 1.
    #[inline]
    pub fn default_lookback_clamped(&self) -> usize {
        self.default_lookback.max(1)
    }
}

impl Default for ProcessorConfig {
    /// Default configuration:
    ///
    /// - `enabled = true`
    /// - `async_processing = true`
    /// - `poll_interval = 100ms`
    /// - `batch_size = 100`
    /// - `default_lookback = 1000`
    fn default() -> Self {
        Self {
            enabled: true,
            async_processing: true,
            poll_interval: Duration::from_millis(100),
            batch_size: 100,
            default_lookback: 1000,
        }
    }
}
