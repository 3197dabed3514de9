//! # Test lifecycle telemetry events.
//!
//! The [`EventKind`] enum classifies events across three categories:
//! - **Run boundaries**: `run-start`, `run-end`
//! - **Suite boundaries**: `suite-start`, `suite-end`
//! - **Test lifecycle**: `test-start`, `test-complete`, `test-skip`
//!
//! Anything else is a [`EventKind::Diagnostic`] carrying its raw type name.
//!
//! The [`Event`] struct carries the sequence number assigned by the log, the
//! suite/test coordinates, a wall-clock timestamp, and a free-form JSON payload.
//!
//! ## Ordering guarantees
//! `seq` is assigned by the [`EventLog`](crate::EventLog) on append and increases
//! strictly. Events built with [`Event::new`] carry `seq = 0` until appended.
//!
//! ## Example
//! ```rust
//! use suitewatch::{Event, EventKind};
//!
//! let ev = Event::test_complete("parser", 3).with_field("status", "pass");
//!
//! assert_eq!(ev.kind, EventKind::TestComplete);
//! assert_eq!(ev.suite.as_deref(), Some("parser"));
//! assert_eq!(ev.test_key().as_deref(), Some("parser-3"));
//! ```

use std::fmt;
use std::sync::Arc;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Classification of telemetry events.
///
/// Serialized as the kebab-case type name (`"test-complete"`); unknown names
/// round-trip through [`EventKind::Diagnostic`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EventKind {
    /// A new run began. Resets all suite state, barriers and pending work.
    ///
    /// Sets:
    /// - `run_id`: identifier of the run (optional)
    RunStart,

    /// A suite began (or restarted, if already started in this run).
    ///
    /// Sets:
    /// - `suite`: suite name
    SuiteStart,

    /// A test began.
    ///
    /// Sets:
    /// - `suite`: suite name
    /// - `test_index`: index unique within the suite
    TestStart,

    /// A test finished (any outcome; the outcome lives in the payload).
    ///
    /// Sets:
    /// - `suite`: suite name
    /// - `test_index`: index unique within the suite
    TestComplete,

    /// A test was skipped: started and completed at once.
    ///
    /// Sets:
    /// - `suite`: suite name
    /// - `test_index`: index unique within the suite
    TestSkip,

    /// A suite reported its explicit end marker.
    ///
    /// Sets:
    /// - `suite`: suite name
    SuiteEnd,

    /// The run finished.
    RunEnd,

    /// Arbitrary diagnostic event with its raw type name.
    Diagnostic(Arc<str>),
}

impl EventKind {
    /// Returns the kebab-case type name.
    pub fn as_str(&self) -> &str {
        match self {
            EventKind::RunStart => "run-start",
            EventKind::SuiteStart => "suite-start",
            EventKind::TestStart => "test-start",
            EventKind::TestComplete => "test-complete",
            EventKind::TestSkip => "test-skip",
            EventKind::SuiteEnd => "suite-end",
            EventKind::RunEnd => "run-end",
            EventKind::Diagnostic(name) => name,
        }
    }

    /// Parses a type name. Never fails: unknown names become diagnostics.
    pub fn parse(name: &str) -> Self {
        match name {
            "run-start" => EventKind::RunStart,
            "suite-start" => EventKind::SuiteStart,
            "test-start" => EventKind::TestStart,
            "test-complete" => EventKind::TestComplete,
            "test-skip" => EventKind::TestSkip,
            "suite-end" => EventKind::SuiteEnd,
            "run-end" => EventKind::RunEnd,
            other => EventKind::Diagnostic(Arc::from(other)),
        }
    }

    /// Creates a diagnostic kind.
    pub fn diagnostic(name: impl Into<Arc<str>>) -> Self {
        let name: Arc<str> = name.into();
        EventKind::parse(&name)
    }

    /// True for the per-test kinds (`test-start`, `test-complete`, `test-skip`).
    #[inline]
    pub fn is_test_lifecycle(&self) -> bool {
        matches!(
            self,
            EventKind::TestStart | EventKind::TestComplete | EventKind::TestSkip
        )
    }

    /// True for kinds that close a scope barriers wait on (`suite-end`, `run-end`).
    #[inline]
    pub fn is_boundary_end(&self) -> bool {
        matches!(self, EventKind::SuiteEnd | EventKind::RunEnd)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for EventKind {
    fn from(value: String) -> Self {
        EventKind::parse(&value)
    }
}

impl From<&str> for EventKind {
    fn from(value: &str) -> Self {
        EventKind::parse(value)
    }
}

impl From<EventKind> for String {
    fn from(value: EventKind) -> Self {
        value.as_str().to_string()
    }
}

/// Telemetry event with optional coordinates and payload.
///
/// - `seq`: sequence assigned by the log
/// - `at`: wall-clock timestamp set by the producer
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    /// Log-assigned, strictly increasing sequence number.
    #[serde(rename = "sequence", default)]
    pub seq: u64,
    /// Event classification.
    #[serde(rename = "type")]
    pub kind: EventKind,
    /// Suite name, if applicable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suite: Option<Arc<str>>,
    /// Test index within the suite, if applicable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_index: Option<u32>,
    /// Run identifier (present on `run-start`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_id: Option<Arc<str>>,
    /// Wall-clock timestamp.
    #[serde(rename = "timestamp")]
    pub at: SystemTime,
    /// Handler-specific payload (outcome, duration, messages, ...).
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub payload: Map<String, Value>,
}

impl Event {
    /// Creates a new event of the given kind stamped with the current time.
    pub fn new(kind: impl Into<EventKind>) -> Self {
        Self {
            seq: 0,
            kind: kind.into(),
            suite: None,
            test_index: None,
            run_id: None,
            at: SystemTime::now(),
            payload: Map::new(),
        }
    }

    /// Creates a `run-start` event.
    pub fn run_start(run_id: impl Into<Arc<str>>) -> Self {
        Event::new(EventKind::RunStart).with_run_id(run_id)
    }

    /// Creates a `run-end` event.
    pub fn run_end() -> Self {
        Event::new(EventKind::RunEnd)
    }

    /// Creates a `suite-start` event.
    pub fn suite_start(suite: impl Into<Arc<str>>) -> Self {
        Event::new(EventKind::SuiteStart).with_suite(suite)
    }

    /// Creates a `suite-end` event.
    pub fn suite_end(suite: impl Into<Arc<str>>) -> Self {
        Event::new(EventKind::SuiteEnd).with_suite(suite)
    }

    /// Creates a `test-start` event.
    pub fn test_start(suite: impl Into<Arc<str>>, index: u32) -> Self {
        Event::new(EventKind::TestStart)
            .with_suite(suite)
            .with_test_index(index)
    }

    /// Creates a `test-complete` event.
    pub fn test_complete(suite: impl Into<Arc<str>>, index: u32) -> Self {
        Event::new(EventKind::TestComplete)
            .with_suite(suite)
            .with_test_index(index)
    }

    /// Creates a `test-skip` event.
    pub fn test_skip(suite: impl Into<Arc<str>>, index: u32) -> Self {
        Event::new(EventKind::TestSkip)
            .with_suite(suite)
            .with_test_index(index)
    }

    /// Attaches a suite name.
    #[inline]
    pub fn with_suite(mut self, suite: impl Into<Arc<str>>) -> Self {
        self.suite = Some(suite.into());
        self
    }

    /// Attaches a test index.
    #[inline]
    pub fn with_test_index(mut self, index: u32) -> Self {
        self.test_index = Some(index);
        self
    }

    /// Attaches a run identifier.
    #[inline]
    pub fn with_run_id(mut self, run_id: impl Into<Arc<str>>) -> Self {
        self.run_id = Some(run_id.into());
        self
    }

    /// Overrides the timestamp.
    #[inline]
    pub fn with_timestamp(mut self, at: SystemTime) -> Self {
        self.at = at;
        self
    }

    /// Attaches one payload field.
    #[inline]
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.payload.insert(key.into(), value.into());
        self
    }

    /// Returns a payload field.
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.payload.get(key)
    }

    /// Returns the `suite-testIndex` key identifying a test within a run.
    ///
    /// `None` if either coordinate is missing (malformed test event).
    pub fn test_key(&self) -> Option<String> {
        match (self.suite.as_deref(), self.test_index) {
            (Some(suite), Some(index)) => Some(format!("{suite}-{index}")),
            _ => None,
        }
    }

    /// True if this event belongs to the given suite.
    #[inline]
    pub fn is_for_suite(&self, suite: &str) -> bool {
        self.suite.as_deref() == Some(suite)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_names_roundtrip() {
        for name in [
            "run-start",
            "suite-start",
            "test-start",
            "test-complete",
            "test-skip",
            "suite-end",
            "run-end",
        ] {
            let kind = EventKind::parse(name);
            assert!(!matches!(kind, EventKind::Diagnostic(_)), "{name}");
            assert_eq!(kind.as_str(), name);
        }
    }

    #[test]
    fn unknown_names_are_diagnostics() {
        let kind = EventKind::from("coverage-report");
        assert_eq!(kind, EventKind::Diagnostic(Arc::from("coverage-report")));
        assert_eq!(kind.to_string(), "coverage-report");
        assert_eq!(EventKind::diagnostic("suite-end"), EventKind::SuiteEnd);
    }

    #[test]
    fn test_key_requires_both_coordinates() {
        assert_eq!(
            Event::test_start("a", 0).test_key().as_deref(),
            Some("a-0")
        );
        assert_eq!(Event::new(EventKind::TestStart).with_suite("a").test_key(), None);
        assert_eq!(Event::new(EventKind::TestStart).with_test_index(1).test_key(), None);
    }

    #[test]
    fn serializes_with_wire_names() {
        let ev = Event::test_complete("math", 2).with_field("status", "pass");
        let json = serde_json::to_value(&ev).unwrap();
        assert_eq!(json["type"], "test-complete");
        assert_eq!(json["suite"], "math");
        assert_eq!(json["testIndex"], 2);
        assert_eq!(json["payload"]["status"], "pass");
        assert!(json.get("runId").is_none());

        let back: Event = serde_json::from_value(json).unwrap();
        assert_eq!(back, ev);
    }
}
