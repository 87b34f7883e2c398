//! Status enums for phases.

use serde::{Deserialize, Serialize};

use crate::TaskResult;

/// Settled status of a phase, derived from its task results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PhaseStatus {
    /// Every task succeeded (or the phase had no tasks).
    #[default]
    Completed,
    /// At least one task failed and at least one succeeded.
    Degraded,
    /// Every task failed.
    Failed,
}

impl PhaseStatus {
    /// Derive the status of a phase from its settled results.
    pub fn from_results(results: &[TaskResult]) -> Self {
        let failed = results.iter().filter(|r| !r.is_success()).count();
        if failed == 0 {
            Self::Completed
        } else if failed == results.len() {
            Self::Failed
        } else {
            Self::Degraded
        }
    }

    /// Returns true if no task in the phase succeeded.
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{TaskId, TaskOutcome};
    use chrono::Utc;

    fn result(outcome: TaskOutcome) -> TaskResult {
        let now = Utc::now();
        TaskResult::new(TaskId::generate(), "w", outcome, now, now)
    }

    #[test]
    fn test_status_from_results() {
        let ok = || result(TaskOutcome::Output("ok".into()));
        let bad = || result(TaskOutcome::Error("bad".into()));

        assert_eq!(PhaseStatus::from_results(&[]), PhaseStatus::Completed);
        assert_eq!(PhaseStatus::from_results(&[ok(), ok()]), PhaseStatus::Completed);
        assert_eq!(PhaseStatus::from_results(&[ok(), bad()]), PhaseStatus::Degraded);
        assert_eq!(PhaseStatus::from_results(&[bad(), bad()]), PhaseStatus::Failed);
    }
}
