//! Span exporters.
//!
//! The recorder hands every completed span to its exporters. Shipping spans
//! anywhere beyond stdout or the log is left to other implementations of
//! [`SpanExporter`].

use std::io::{self, Write};
use std::sync::{Mutex, PoisonError};

use phaserun_core::Span;
use tracing::info;

/// Accepts completed spans for display or shipping.
pub trait SpanExporter: Send + Sync {
    /// Called once for every span that is ended.
    fn export(&self, span: &Span);
}

/// Writes each completed span to stdout as a JSON line.
#[derive(Debug, Default)]
pub struct ConsoleExporter;

impl ConsoleExporter {
    /// Create a new console exporter.
    pub fn new() -> Self {
        Self
    }

    /// Format a span as a single JSON line.
    pub fn format_line(span: &Span) -> Option<String> {
        serde_json::to_string(span).ok()
    }
}

impl SpanExporter for ConsoleExporter {
    fn export(&self, span: &Span) {
        if let Some(line) = Self::format_line(span) {
            let mut stdout = io::stdout().lock();
            let _ = writeln!(stdout, "{}", line);
            let _ = stdout.flush();
        }
    }
}

/// Emits each completed span as a `tracing` event.
#[derive(Debug, Default)]
pub struct LogExporter;

impl LogExporter {
    /// Create a new log exporter.
    pub fn new() -> Self {
        Self
    }
}

impl SpanExporter for LogExporter {
    fn export(&self, span: &Span) {
        info!(
            span_id = %span.id,
            parent_id = ?span.parent_id.as_ref().map(|p| p.as_str()),
            name = %span.name,
            duration_ms = ?span.duration_ms(),
            error = ?span.error,
            attributes = ?span.attributes,
            "Span ended"
        );
    }
}

/// Keeps completed spans in memory, in the order they were ended.
#[derive(Debug, Default)]
pub struct InMemoryExporter {
    spans: Mutex<Vec<Span>>,
}

impl InMemoryExporter {
    /// Create a new empty exporter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every exported span.
    pub fn spans(&self) -> Vec<Span> {
        self.spans
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// All exported spans with the given name.
    pub fn find(&self, name: &str) -> Vec<Span> {
        self.spans()
            .into_iter()
            .filter(|s| s.name == name)
            .collect()
    }
}

impl SpanExporter for InMemoryExporter {
    fn export(&self, span: &Span) {
        self.spans
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(span.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use phaserun_core::SpanId;

    fn ended_span() -> Span {
        let mut span = Span::new("run_nist", Some(SpanId::new("0000000000000001")));
        span.set_attribute("worker.name", "nist");
        span.end(None);
        span
    }

    #[test]
    fn test_console_line_is_json() {
        let line = ConsoleExporter::format_line(&ended_span()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&line).unwrap();

        assert_eq!(value["name"], "run_nist");
        assert_eq!(value["parent_id"], "0000000000000001");
        assert_eq!(value["attributes"]["worker.name"], "nist");
        assert!(!line.contains('\n'));
    }

    #[test]
    fn test_in_memory_keeps_order() {
        let exporter = InMemoryExporter::new();
        let first = ended_span();
        let mut second = Span::new("run_mitre", None);
        second.end(Some("MITRE down".into()));

        exporter.export(&first);
        exporter.export(&second);
        LogExporter::new().export(&second);

        let spans = exporter.spans();
        assert_eq!(spans.len(), 2);
        assert_eq!(spans[0].name, "run_nist");
        assert_eq!(exporter.find("run_mitre")[0].error.as_deref(), Some("MITRE down"));
        assert!(exporter.find("missing").is_empty());
    }
}
