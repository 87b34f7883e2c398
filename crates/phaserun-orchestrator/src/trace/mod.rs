//! Span recording and export.

mod exporter;
mod recorder;

pub use exporter::{ConsoleExporter, InMemoryExporter, LogExporter, SpanExporter};
pub use recorder::SpanRecorder;
