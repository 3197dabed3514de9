//! # LogWriter: lifecycle event printer
//!
//! A minimal handler that renders lifecycle events through `tracing`.
//! Use it for demos or while debugging a producer.
//!
//! ## Example output
//! ```text
//! [run-start] run="r-42"
//! [suite-start] suite="parser"
//! [test-start] suite="parser" test=0
//! [test-complete] suite="parser" test=0 status="pass"
//! [test-skip] suite="parser" test=1
//! [suite-end] suite="parser"
//! [run-end]
//! ```

use crate::{
    error::HandlerError,
    events::{Event, EventKind},
    handlers::handler::{Dispatch, Handler, HandlerContext},
};

/// Lifecycle event writer.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Kinds this writer renders.
    pub fn kinds() -> [EventKind; 7] {
        [
            EventKind::RunStart,
            EventKind::SuiteStart,
            EventKind::TestStart,
            EventKind::TestComplete,
            EventKind::TestSkip,
            EventKind::SuiteEnd,
            EventKind::RunEnd,
        ]
    }
}

impl Handler for LogWriter {
    fn handle(&self, e: &Event, ctx: &HandlerContext) -> Result<Dispatch, HandlerError> {
        let processor = ctx.processor();
        let suite = e.suite.as_deref().unwrap_or("unknown");
        match &e.kind {
            EventKind::RunStart => {
                tracing::info!(processor, seq = e.seq, "[run-start] run={:?}", e.run_id);
            }
            EventKind::RunEnd => {
                tracing::info!(processor, seq = e.seq, "[run-end]");
            }
            EventKind::SuiteStart => {
                tracing::info!(processor, seq = e.seq, "[suite-start] suite={suite:?}");
            }
            EventKind::SuiteEnd => {
                tracing::info!(processor, seq = e.seq, "[suite-end] suite={suite:?}");
            }
            EventKind::TestStart => {
                tracing::info!(
                    processor,
                    seq = e.seq,
                    "[test-start] suite={suite:?} test={:?}",
                    e.test_index
                );
            }
            EventKind::TestComplete => {
                let status = e.field("status").and_then(|v| v.as_str()).unwrap_or("unknown");
                tracing::info!(
                    processor,
                    seq = e.seq,
                    "[test-complete] suite={suite:?} test={:?} status={status:?}",
                    e.test_index
                );
            }
            EventKind::TestSkip => {
                tracing::info!(
                    processor,
                    seq = e.seq,
                    "[test-skip] suite={suite:?} test={:?}",
                    e.test_index
                );
            }
            EventKind::Diagnostic(name) => {
                tracing::debug!(processor, seq = e.seq, "[{name}]");
            }
        }
        Ok(Dispatch::Done)
    }

    fn name(&self) -> &str {
        "LogWriter"
    }
}
