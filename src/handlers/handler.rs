//! # Event handler abstraction.
//!
//! A [`Handler`] is registered for one or more [`EventKind`](crate::EventKind)s at
//! construction time. Dispatch happens in two phases:
//!
//! 1. **Inline**: [`Handler::handle`] runs on the processor's poll task, in log
//!    order, before the next event is looked at. Use it for bookkeeping that later
//!    events depend on.
//! 2. **Deferred**: if `handle` returns [`Dispatch::Work`], the future is spawned and
//!    tracked as pending work. Barriers wait for it; resets cancel it.
//!
//! ```text
//! poll ──► process_event(e) ──► handler.handle(&e, &ctx)
//!                                    ├─ Ok(Dispatch::Done)      → nothing pending
//!                                    ├─ Ok(Dispatch::Work(fut)) → spawn + track (cancellable)
//!                                    └─ Err(e) / panic          → logged, next event
//! ```

use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use tokio_util::sync::CancellationToken;

use crate::{error::HandlerError, events::Event, history::History};

/// Deferred handler work.
pub type BoxWork = BoxFuture<'static, Result<(), HandlerError>>;

/// Outcome of the inline phase of a dispatch.
pub enum Dispatch {
    /// Handling finished inline.
    Done,
    /// Handling continues asynchronously; the processor tracks the future.
    Work(BoxWork),
}

impl Dispatch {
    /// Boxes `fut` as deferred work.
    pub fn work<F>(fut: F) -> Self
    where
        F: Future<Output = Result<(), HandlerError>> + Send + 'static,
    {
        Dispatch::Work(Box::pin(fut))
    }
}

impl std::fmt::Debug for Dispatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Dispatch::Done => f.write_str("Done"),
            Dispatch::Work(_) => f.write_str("Work(..)"),
        }
    }
}

/// Everything a handler may use besides the event itself.
///
/// - `cancel` is scoped to the event's suite (or to the run for run-level events);
///   it fires when that scope is reset or the processor shuts down.
/// - `history` reads the log through the processor's reader without moving it.
#[derive(Clone)]
pub struct HandlerContext {
    processor: Arc<str>,
    cancel: CancellationToken,
    history: History,
}

impl HandlerContext {
    pub(crate) fn new(processor: Arc<str>, cancel: CancellationToken, history: History) -> Self {
        Self {
            processor,
            cancel,
            history,
        }
    }

    /// Name of the dispatching processor.
    pub fn processor(&self) -> &str {
        &self.processor
    }

    /// Token cancelled when this event's scope is invalidated.
    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// True once the event's scope has been invalidated.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Read-only access to the log history.
    pub fn history(&self) -> &History {
        &self.history
    }
}

/// # Event handler.
///
/// # Example
/// ```
/// use suitewatch::{Dispatch, Event, Handler, HandlerContext, HandlerError};
///
/// struct CountFailures;
///
/// impl Handler for CountFailures {
///     fn handle(&self, ev: &Event, ctx: &HandlerContext) -> Result<Dispatch, HandlerError> {
///         if ev.field("status").and_then(|v| v.as_str()) != Some("fail") {
///             return Ok(Dispatch::Done);
///         }
///         let history = ctx.history().clone();
///         let suite = ev.suite.clone();
///         Ok(Dispatch::work(async move {
///             if let Some(suite) = suite {
///                 let _events = history.suite_events(&suite).await
///                     .map_err(|e| HandlerError::failed(e.to_string()))?;
///             }
///             Ok(())
///         }))
///     }
///
///     fn name(&self) -> &str { "count-failures" }
/// }
/// ```
pub trait Handler: Send + Sync + 'static {
    /// Runs the inline phase for `event`.
    ///
    /// Errors and panics are caught by the processor and logged.
    fn handle(&self, event: &Event, ctx: &HandlerContext) -> Result<Dispatch, HandlerError>;

    /// Returns the handler name used in logs.
    ///
    /// The default uses `type_name::<Self>()`, which can be verbose - override it when possible.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// Shared handle to a handler.
pub type HandlerRef = Arc<dyn Handler>;
