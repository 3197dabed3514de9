//! # Function-backed handlers
//!
//! [`HandlerFn`] wraps a closure `F: Fn(&Event, &HandlerContext) -> Result<Dispatch, HandlerError>`.
//! [`sync_fn`] and [`work_fn`] cover the two common shapes: inline-only and fully async.
//!
//! ## Example
//! ```rust
//! use suitewatch::{work_fn, HandlerRef, HandlerError};
//!
//! let h: HandlerRef = work_fn("summary", |ev, ctx| async move {
//!     if ctx.is_cancelled() {
//!         return Err(HandlerError::Cancelled);
//!     }
//!     let _ = ev.suite;
//!     Ok(())
//! });
//! assert_eq!(h.name(), "summary");
//! ```

use std::borrow::Cow;
use std::future::Future;
use std::sync::Arc;

use crate::{
    error::HandlerError,
    events::Event,
    handlers::handler::{Dispatch, Handler, HandlerContext, HandlerRef},
};

/// Function-backed handler implementation.
#[derive(Debug)]
pub struct HandlerFn<F> {
    name: Cow<'static, str>,
    f: F,
}

impl<F> HandlerFn<F> {
    /// Creates a new function-backed handler.
    ///
    /// Prefer [`HandlerFn::arc`] when you immediately need a [`HandlerRef`].
    pub fn new(name: impl Into<Cow<'static, str>>, f: F) -> Self
    where
        F: Fn(&Event, &HandlerContext) -> Result<Dispatch, HandlerError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            f,
        }
    }

    /// Creates the handler and returns it as a shared handle.
    pub fn arc(name: impl Into<Cow<'static, str>>, f: F) -> HandlerRef
    where
        F: Fn(&Event, &HandlerContext) -> Result<Dispatch, HandlerError> + Send + Sync + 'static,
    {
        Arc::new(Self::new(name, f))
    }
}

impl<F> Handler for HandlerFn<F>
where
    F: Fn(&Event, &HandlerContext) -> Result<Dispatch, HandlerError> + Send + Sync + 'static,
{
    fn handle(&self, event: &Event, ctx: &HandlerContext) -> Result<Dispatch, HandlerError> {
        (self.f)(event, ctx)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Handler that only runs inline.
pub fn sync_fn<F>(name: impl Into<Cow<'static, str>>, f: F) -> HandlerRef
where
    F: Fn(&Event, &HandlerContext) -> Result<(), HandlerError> + Send + Sync + 'static,
{
    HandlerFn::arc(name, move |ev: &Event, ctx: &HandlerContext| {
        f(ev, ctx).map(|()| Dispatch::Done)
    })
}

/// Handler whose whole body is deferred work.
///
/// The closure receives owned clones of the event and context, so the
/// returned future is `'static`.
pub fn work_fn<F, Fut>(name: impl Into<Cow<'static, str>>, f: F) -> HandlerRef
where
    F: Fn(Event, HandlerContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
{
    HandlerFn::arc(name, move |ev: &Event, ctx: &HandlerContext| {
        Ok(Dispatch::work(f(ev.clone(), ctx.clone())))
    })
}
