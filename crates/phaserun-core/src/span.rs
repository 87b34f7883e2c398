//! Span records for tracing run, phase and task execution.

use crate::SpanId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A timed, attributed record of one unit of work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Span {
    /// Unique span identifier.
    pub id: SpanId,

    /// Parent span, if this is not a root.
    pub parent_id: Option<SpanId>,

    /// Span name (e.g. `agent_orchestration`, `run_nist`).
    pub name: String,

    /// String attributes, kept sorted for stable export.
    pub attributes: BTreeMap<String, String>,

    /// When the span was started.
    pub started_at: DateTime<Utc>,

    /// When the span was ended. `None` while open.
    pub ended_at: Option<DateTime<Utc>>,

    /// Error recorded on the span, if the unit of work failed.
    pub error: Option<String>,
}

impl Span {
    /// Create a new open span.
    pub fn new(name: impl Into<String>, parent_id: Option<SpanId>) -> Self {
        Self {
            id: SpanId::generate(),
            parent_id,
            name: name.into(),
            attributes: BTreeMap::new(),
            started_at: Utc::now(),
            ended_at: None,
            error: None,
        }
    }

    /// Set an attribute, replacing any previous value.
    pub fn set_attribute(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.attributes.insert(key.into(), value.into());
    }

    /// Look up an attribute.
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    /// Close the span with an optional error.
    pub fn end(&mut self, error: Option<String>) {
        self.ended_at = Some(Utc::now());
        self.error = error;
    }

    /// Check if the span has been ended.
    pub fn is_ended(&self) -> bool {
        self.ended_at.is_some()
    }

    /// Check if this span is a root span.
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    /// Duration in milliseconds, if ended.
    pub fn duration_ms(&self) -> Option<i64> {
        self.ended_at
            .map(|end| (end - self.started_at).num_milliseconds())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_lifecycle() {
        let mut span = Span::new("run_nist", Some(SpanId::new("parent")));
        assert!(!span.is_ended());
        assert!(!span.is_root());
        assert_eq!(span.duration_ms(), None);

        span.set_attribute("agent.name", "nist");
        span.end(Some("boom".into()));

        assert!(span.is_ended());
        assert_eq!(span.attribute("agent.name"), Some("nist"));
        assert_eq!(span.error.as_deref(), Some("boom"));
        assert!(span.duration_ms().is_some());
    }
}
