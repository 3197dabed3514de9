//! Error types used by the suitewatch log contract, handlers and barriers.
//!
//! This module defines:
//!
//! - [`LogError`]: failures reported by an [`EventLog`](crate::EventLog) or its readers.
//! - [`HandlerError`]: failures raised by handler dispatch or handler work.
//! - [`ResetReason`]: synthetic causes used to invalidate barriers on restarts.
//! - [`BlockError`]: failures surfaced by [`Processor::block_for_suite`](crate::Processor::block_for_suite)
//!   and [`Processor::block_for_run`](crate::Processor::block_for_run).
//!
//! Every type provides `as_label` (stable snake_case label for logs/metrics).

use thiserror::Error;

/// # Errors produced by the backing event log.
///
/// These are treated as **transient** by the poll loop: the failure is logged
/// and the next tick tries again. No processor state is touched.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LogError {
    /// The log is not reachable right now.
    #[error("event log unavailable")]
    Unavailable,

    /// A read or write against the log failed.
    #[error("event log i/o failed: {reason}")]
    Io {
        /// The underlying failure message.
        reason: String,
    },

    /// The log was closed and will not serve further requests.
    #[error("event log closed")]
    Closed,
}

impl LogError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            LogError::Unavailable => "log_unavailable",
            LogError::Io { .. } => "log_io",
            LogError::Closed => "log_closed",
        }
    }
}

/// # Errors produced by event handlers.
///
/// Handler errors never leave the processor: they are caught per event,
/// logged with the processor name and event type, and counted.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HandlerError {
    /// The handler reported a failure.
    #[error("handler failed: {reason}")]
    Failed {
        /// The underlying failure message.
        reason: String,
    },

    /// The handler (or its async work) panicked.
    #[error("handler panicked: {info}")]
    Panicked {
        /// Panic payload rendered as text.
        info: String,
    },

    /// Work observed its cancellation token and gave up.
    #[error("handler work cancelled")]
    Cancelled,
}

impl HandlerError {
    /// Shorthand for [`HandlerError::Failed`].
    pub fn failed(reason: impl Into<String>) -> Self {
        HandlerError::Failed {
            reason: reason.into(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            HandlerError::Failed { .. } => "handler_failed",
            HandlerError::Panicked { .. } => "handler_panicked",
            HandlerError::Cancelled => "handler_cancelled",
        }
    }
}

/// Cause attached to a barrier that was invalidated by a state reset.
///
/// Display strings are stable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResetReason {
    /// A new `run-start` arrived.
    RunRestarted,
    /// A `suite-start` arrived for a suite that had already started in this run.
    SuiteRestarted,
    /// The processor was shut down or its state cleared wholesale.
    StateReset,
}

impl ResetReason {
    /// Returns the human-readable reset message.
    pub fn as_str(&self) -> &'static str {
        match self {
            ResetReason::RunRestarted => "Run restarted",
            ResetReason::SuiteRestarted => "Suite restarted",
            ResetReason::StateReset => "State reset",
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            ResetReason::RunRestarted => "run_restarted",
            ResetReason::SuiteRestarted => "suite_restarted",
            ResetReason::StateReset => "state_reset",
        }
    }
}

impl std::fmt::Display for ResetReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// # Errors produced while waiting on a lifecycle barrier.
///
/// Only [`BlockError::Reset`] is *recognised*: the public block operations
/// swallow it and return normally. The remaining variants propagate.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BlockError {
    /// The barrier was invalidated by a restart or reset.
    #[error("{0}")]
    Reset(ResetReason),

    /// The processor is not active (disabled, no log, never initialised, or shut down).
    #[error("processor is not active")]
    Inactive,

    /// The barrier was dropped without being resolved or rejected.
    #[error("barrier abandoned")]
    Abandoned,
}

impl BlockError {
    /// Returns the reset cause if this is a recognised reset rejection.
    pub fn reset_reason(&self) -> Option<ResetReason> {
        match self {
            BlockError::Reset(reason) => Some(*reason),
            _ => None,
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            BlockError::Reset(reason) => reason.as_label(),
            BlockError::Inactive => "block_inactive",
            BlockError::Abandoned => "block_abandoned",
        }
    }
}
