//! Core domain errors.

use thiserror::Error;

/// Failure of a single capability invocation.
///
/// The display form is the human-readable cause only, so it can be copied
/// verbatim into a task result.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CapabilityError {
    /// The capability ran and reported a failure.
    #[error("{0}")]
    Failed(String),

    /// The capability noticed the run's cancellation signal and gave up.
    #[error("cancelled: {0}")]
    Cancelled(String),
}

impl CapabilityError {
    /// Create a `Failed` error from any displayable cause.
    pub fn failed(cause: impl Into<String>) -> Self {
        Self::Failed(cause.into())
    }

    /// Returns true if the capability stopped because of cancellation.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled(_))
    }
}

/// Core domain errors for phaserun.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Invalid input.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Worker referenced by name is not registered.
    #[error("Worker not found: {0}")]
    WorkerNotFound(String),
}
