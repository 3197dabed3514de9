//! # Lifecycle barriers.
//!
//! A [`Barrier`] is a one-shot verdict (resolved or rejected with a
//! [`ResetReason`]) that any number of waiters can observe. It is built on
//! [`tokio::sync::watch`]: waiters subscribe and wait until a verdict appears.
//!
//! ## Rules
//! - The **first** verdict wins; later `resolve`/`reject` calls are no-ops.
//! - Waiting on a barrier that already has a verdict returns immediately.
//! - Dropping every handle without a verdict surfaces [`BlockError::Abandoned`].
//!
//! [`BarrierSet`] keys barriers by suite name plus one run-level barrier, and
//! creates them lazily.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::watch;

use crate::error::{BlockError, ResetReason};

type Verdict = Option<Result<(), ResetReason>>;

/// One-shot, multi-waiter barrier.
#[derive(Clone, Debug)]
pub(crate) struct Barrier {
    tx: Arc<watch::Sender<Verdict>>,
}

/// Subscription to a [`Barrier`].
pub(crate) struct BarrierWait {
    rx: watch::Receiver<Verdict>,
}

impl Barrier {
    pub(crate) fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx: Arc::new(tx) }
    }

    /// Resolves the barrier. Returns `false` if a verdict already existed.
    pub(crate) fn resolve(&self) -> bool {
        self.settle(Ok(()))
    }

    /// Rejects the barrier. Returns `false` if a verdict already existed.
    pub(crate) fn reject(&self, reason: ResetReason) -> bool {
        self.settle(Err(reason))
    }

    pub(crate) fn is_settled(&self) -> bool {
        self.tx.borrow().is_some()
    }

    pub(crate) fn subscribe(&self) -> BarrierWait {
        BarrierWait {
            rx: self.tx.subscribe(),
        }
    }

    fn settle(&self, verdict: Result<(), ResetReason>) -> bool {
        self.tx.send_if_modified(|current| {
            if current.is_some() {
                return false;
            }
            *current = Some(verdict);
            true
        })
    }
}

impl BarrierWait {
    /// Waits for the verdict.
    pub(crate) async fn wait(mut self) -> Result<(), BlockError> {
        let verdict = match self.rx.wait_for(Option::is_some).await {
            Ok(v) => *v,
            Err(_closed) => return Err(BlockError::Abandoned),
        };
        match verdict {
            Some(Ok(())) => Ok(()),
            Some(Err(reason)) => Err(BlockError::Reset(reason)),
            None => Err(BlockError::Abandoned),
        }
    }
}

/// Lazily-created barriers for suites and the run.
#[derive(Default)]
pub(crate) struct BarrierSet {
    suites: HashMap<String, Barrier>,
    run: Option<Barrier>,
}

impl BarrierSet {
    /// Returns the barrier for `suite`, creating it if absent.
    pub(crate) fn suite(&mut self, suite: &str) -> Barrier {
        self.suites
            .entry(suite.to_string())
            .or_insert_with(Barrier::new)
            .clone()
    }

    /// Returns the run barrier, creating it if absent.
    pub(crate) fn run(&mut self) -> Barrier {
        self.run.get_or_insert_with(Barrier::new).clone()
    }

    /// Rejects and forgets the barrier of `suite`. Returns `true` if a waiter
    /// could have been affected (barrier existed and had no verdict).
    pub(crate) fn reject_suite(&mut self, suite: &str, reason: ResetReason) -> bool {
        self.suites
            .remove(suite)
            .is_some_and(|barrier| barrier.reject(reason))
    }

    /// Rejects and forgets every barrier. Returns how many were still open.
    pub(crate) fn reject_all(&mut self, reason: ResetReason) -> usize {
        let mut open = 0;
        for (_, barrier) in self.suites.drain() {
            if barrier.reject(reason) {
                open += 1;
            }
        }
        if let Some(barrier) = self.run.take() {
            if barrier.reject(reason) {
                open += 1;
            }
        }
        open
    }

    /// Number of barriers without a verdict.
    #[cfg(test)]
    pub(crate) fn open(&self) -> usize {
        self.suites.values().filter(|b| !b.is_settled()).count()
            + self.run.iter().filter(|b| !b.is_settled()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn first_verdict_wins() {
        let b = Barrier::new();
        let w = b.subscribe();
        assert!(b.resolve());
        assert!(!b.reject(ResetReason::RunRestarted));
        assert_eq!(w.wait().await, Ok(()));
    }

    #[tokio::test]
    async fn late_waiters_see_existing_verdict() {
        let b = Barrier::new();
        b.reject(ResetReason::SuiteRestarted);
        assert_eq!(
            b.subscribe().wait().await,
            Err(BlockError::Reset(ResetReason::SuiteRestarted))
        );
    }

    #[tokio::test]
    async fn dropped_barrier_is_abandoned() {
        let b = Barrier::new();
        let w = b.subscribe();
        drop(b);
        assert_eq!(w.wait().await, Err(BlockError::Abandoned));
    }

    #[tokio::test]
    async fn waiter_wakes_on_later_verdict() {
        let b = Barrier::new();
        let w = b.subscribe();
        let waiter = tokio::spawn(w.wait());
        tokio::task::yield_now().await;
        b.resolve();
        assert_eq!(waiter.await.unwrap(), Ok(()));
    }

    #[tokio::test]
    async fn reject_all_clears_set() {
        let mut set = BarrierSet::default();
        let a = set.suite("A").subscribe();
        let r = set.run().subscribe();
        set.suite("B").resolve();
        assert_eq!(set.open(), 2);

        assert_eq!(set.reject_all(ResetReason::RunRestarted), 2);
        assert_eq!(set.open(), 0);
        assert_eq!(a.wait().await, Err(BlockError::Reset(ResetReason::RunRestarted)));
        assert_eq!(r.wait().await, Err(BlockError::Reset(ResetReason::RunRestarted)));
    }

    #[test]
    fn suites_are_created_lazily_and_shared() {
        let mut set = BarrierSet::default();
        set.suite("A").resolve();
        assert!(set.suite("A").is_settled());
        assert!(!set.reject_suite("A", ResetReason::SuiteRestarted));
        assert!(!set.suite("A").is_settled());
    }
}
