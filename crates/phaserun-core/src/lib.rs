//! phaserun Core Domain Types
//!
//! This crate contains pure domain types with no dependencies on:
//! - An async runtime
//! - Trace exporters
//! - Terminal output
//!
//! All types here describe a phased run: tasks, their settled results,
//! the context passed between phases and the spans recorded along the way.

pub mod context;
pub mod error;
pub mod ids;
pub mod report;
pub mod span;
pub mod status;
pub mod task;

// Re-export commonly used types
pub use context::RunContext;
pub use error::{CapabilityError, CoreError};
pub use ids::{RunId, SpanId, TaskId};
pub use report::{OrchestrationReport, PhaseFailure, PhaseReport};
pub use span::Span;
pub use status::PhaseStatus;
pub use task::{TaskOutcome, TaskResult};
