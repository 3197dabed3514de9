use std::sync::Arc;

use super::{hooks::ProcessorHooks, processor::Processor};
use crate::{
    config::ProcessorConfig,
    events::EventKind,
    handlers::{HandlerMap, HandlerRef},
    log::LogRef,
};

/// Builder for constructing a [`Processor`] with its routes and hooks.
pub struct ProcessorBuilder {
    name: Arc<str>,
    cfg: ProcessorConfig,
    log: Option<LogRef>,
    handlers: HandlerMap,
    hooks: Option<Arc<dyn ProcessorHooks>>,
}

impl ProcessorBuilder {
    /// Creates a new builder; `name` also names the reader cursor.
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self {
            name: name.into(),
            cfg: ProcessorConfig::default(),
            log: None,
            handlers: HandlerMap::new(),
            hooks: None,
        }
    }

    /// Sets the configuration.
    pub fn with_config(mut self, cfg: ProcessorConfig) -> Self {
        self.cfg = cfg;
        self
    }

    /// Attaches the event log. Without one the processor stays inert.
    pub fn with_log(mut self, log: LogRef) -> Self {
        self.log = Some(log);
        self
    }

    /// Routes `kind` to `handler` (replacing any earlier route for that kind).
    pub fn on(mut self, kind: impl Into<EventKind>, handler: HandlerRef) -> Self {
        self.handlers.insert(kind.into(), handler);
        self
    }

    /// Routes every kind in `kinds` to the same `handler`.
    pub fn on_many<I>(mut self, kinds: I, handler: HandlerRef) -> Self
    where
        I: IntoIterator<Item = EventKind>,
    {
        for kind in kinds {
            self.handlers.insert(kind, Arc::clone(&handler));
        }
        self
    }

    /// Sets lifecycle hooks.
    pub fn with_hooks(mut self, hooks: Arc<dyn ProcessorHooks>) -> Self {
        self.hooks = Some(hooks);
        self
    }

    /// Routes the lifecycle kinds to the built-in [`LogWriter`](crate::LogWriter).
    ///
    /// Requires the `logging` feature flag.
    #[cfg(feature = "logging")]
    pub fn with_log_writer(self) -> Self {
        let writer: HandlerRef = Arc::new(crate::handlers::LogWriter::new());
        self.on_many(crate::handlers::LogWriter::kinds(), writer)
    }

    /// Builds the processor. It stays idle until [`Processor::initialize`].
    pub fn build(self) -> Processor {
        Processor::new_internal(self.name, self.cfg, self.log, self.handlers, self.hooks)
    }
}
