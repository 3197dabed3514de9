//! # Handler registry keyed by event kind.
//!
//! Explicit `EventKind → Handler` routing, built once and then read-only.
//! Kinds without an entry are processed for lifecycle bookkeeping only.

use std::collections::HashMap;

use crate::{events::EventKind, handlers::handler::HandlerRef};

/// Immutable-after-build routing table.
#[derive(Clone, Default)]
pub struct HandlerMap {
    routes: HashMap<EventKind, HandlerRef>,
}

impl HandlerMap {
    /// Creates an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Routes `kind` to `handler`, returning the handler it replaces.
    pub fn insert(&mut self, kind: EventKind, handler: HandlerRef) -> Option<HandlerRef> {
        self.routes.insert(kind, handler)
    }

    /// Returns the handler routed for `kind`.
    pub fn get(&self, kind: &EventKind) -> Option<&HandlerRef> {
        self.routes.get(kind)
    }

    /// True if `kind` has a handler.
    pub fn contains(&self, kind: &EventKind) -> bool {
        self.routes.contains_key(kind)
    }

    /// Number of routed kinds.
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// True if nothing is routed.
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
