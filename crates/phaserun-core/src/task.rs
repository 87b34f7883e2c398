//! Settled task results.

use crate::{CapabilityError, TaskId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What a settled task produced: exactly one of output or error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskOutcome {
    /// The capability returned this output.
    Output(String),
    /// The capability failed; human-readable cause.
    Error(String),
}

impl From<Result<String, CapabilityError>> for TaskOutcome {
    fn from(result: Result<String, CapabilityError>) -> Self {
        match result {
            Ok(output) => Self::Output(output),
            Err(e) => Self::Error(e.to_string()),
        }
    }
}

/// Result of one worker invocation, produced exactly once per submitted task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskResult {
    /// Task this result belongs to.
    pub task_id: TaskId,

    /// Name of the worker that ran the task.
    pub worker_name: String,

    /// Output or error description.
    pub outcome: TaskOutcome,

    /// When the invocation started.
    pub started_at: DateTime<Utc>,

    /// When the invocation settled.
    pub finished_at: DateTime<Utc>,
}

impl TaskResult {
    /// Create a new TaskResult.
    pub fn new(
        task_id: TaskId,
        worker_name: impl Into<String>,
        outcome: impl Into<TaskOutcome>,
        started_at: DateTime<Utc>,
        finished_at: DateTime<Utc>,
    ) -> Self {
        Self {
            task_id,
            worker_name: worker_name.into(),
            outcome: outcome.into(),
            started_at,
            finished_at,
        }
    }

    /// The output, if the task succeeded.
    pub fn output(&self) -> Option<&str> {
        match &self.outcome {
            TaskOutcome::Output(output) => Some(output),
            TaskOutcome::Error(_) => None,
        }
    }

    /// The error description, if the task failed.
    pub fn error(&self) -> Option<&str> {
        match &self.outcome {
            TaskOutcome::Output(_) => None,
            TaskOutcome::Error(error) => Some(error),
        }
    }

    /// Check if the task succeeded.
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, TaskOutcome::Output(_))
    }

    /// Wall-clock duration of the invocation in milliseconds.
    pub fn duration_ms(&self) -> i64 {
        (self.finished_at - self.started_at).num_milliseconds()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_from_result() {
        let ok: TaskOutcome = Ok::<_, CapabilityError>("NIST-OK".to_string()).into();
        assert_eq!(ok, TaskOutcome::Output("NIST-OK".into()));

        let err: TaskOutcome = Err::<String, _>(CapabilityError::failed("MITRE down")).into();
        assert_eq!(err, TaskOutcome::Error("MITRE down".into()));
    }

    #[test]
    fn test_exactly_one_side_is_set() {
        let now = Utc::now();
        let ok = TaskResult::new(TaskId::new("t1"), "nist", TaskOutcome::Output("x".into()), now, now);
        assert_eq!(ok.output(), Some("x"));
        assert_eq!(ok.error(), None);
        assert!(ok.is_success());

        let failed = TaskResult::new(TaskId::new("t2"), "mitre", TaskOutcome::Error("down".into()), now, now);
        assert_eq!(failed.output(), None);
        assert_eq!(failed.error(), Some("down"));
        assert!(!failed.is_success());
    }

    #[test]
    fn test_outcome_serializes_tagged() {
        let json = serde_json::to_string(&TaskOutcome::Error("down".into())).unwrap();
        assert_eq!(json, r#"{"error":"down"}"#);
    }
}
