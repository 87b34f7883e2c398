//! Context carried from one phase into the next.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Accumulated text passed between phases.
///
/// Lines can only be appended. A phase never edits the context it was given;
/// it produces a fresh one for the next phase.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunContext {
    lines: Vec<String>,
}

impl RunContext {
    /// Create an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a context from a block of text, one entry per line.
    pub fn from_text(text: impl AsRef<str>) -> Self {
        Self {
            lines: text.as_ref().lines().map(str::to_owned).collect(),
        }
    }

    /// Append a line.
    pub fn push_line(&mut self, line: impl Into<String>) {
        self.lines.push(line.into());
    }

    /// Builder method to append a line.
    pub fn with_line(mut self, line: impl Into<String>) -> Self {
        self.push_line(line);
        self
    }

    /// All lines in insertion order.
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Check if the context has no lines.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Render the context as a single newline-joined string.
    pub fn render(&self) -> String {
        self.lines.join("\n")
    }
}

impl fmt::Display for RunContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_text_splits_lines() {
        let ctx = RunContext::from_text("Query: CVE-2024-1234\nnist result: ok");
        assert_eq!(ctx.lines().len(), 2);
        assert_eq!(ctx.render(), "Query: CVE-2024-1234\nnist result: ok");
    }

    #[test]
    fn test_append_only() {
        let ctx = RunContext::new().with_line("a").with_line("b");
        assert_eq!(ctx.to_string(), "a\nb");
        assert!(!ctx.is_empty());
        assert!(RunContext::new().is_empty());
    }
}
