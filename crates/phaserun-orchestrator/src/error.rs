//! Orchestrator errors.

use phaserun_core::{CoreError, PhaseFailure, SpanId};
use thiserror::Error;

/// Errors returned by the span recorder.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpanError {
    /// No span with this id was ever started.
    #[error("Span not found: {0}")]
    NotFound(SpanId),

    /// The span was already ended.
    #[error("Span already ended: {0}")]
    AlreadyEnded(SpanId),

    /// The requested parent is not open, or no longer accepts children.
    #[error("Parent span is not open: {0}")]
    ParentNotOpen(SpanId),
}

/// Errors that stop an orchestration run.
///
/// Capability failures never show up here; they are recorded on task results.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// Invalid phase or pool input.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Span bookkeeping failed.
    #[error("Span error: {0}")]
    Span(#[from] SpanError),

    /// Every task in a phase failed and the run is configured to fail fast.
    #[error("Phase failed: {0}")]
    PhaseFailed(PhaseFailure),
}
