//! Phase and run reports.

use crate::{PhaseStatus, RunContext, RunId, TaskResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Recorded when every task in a phase failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseFailure {
    /// Name of the failed phase.
    pub phase: String,

    /// Number of tasks that failed.
    pub failed_tasks: usize,

    /// `<worker>: <error>` entries, sorted by worker name.
    pub errors: Vec<String>,
}

impl PhaseFailure {
    /// Build a failure record from a phase's results.
    ///
    /// Returns `None` unless the phase had tasks and all of them failed.
    pub fn from_results(phase: &str, results: &[TaskResult]) -> Option<Self> {
        if results.is_empty() || !PhaseStatus::from_results(results).is_failed() {
            return None;
        }

        let mut errors: Vec<String> = results
            .iter()
            .filter_map(|r| r.error().map(|e| format!("{}: {}", r.worker_name, e)))
            .collect();
        errors.sort();

        Some(Self {
            phase: phase.to_string(),
            failed_tasks: results.len(),
            errors,
        })
    }
}

impl fmt::Display for PhaseFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "all {} tasks in phase '{}' failed ({})",
            self.failed_tasks,
            self.phase,
            self.errors.join("; ")
        )
    }
}

/// Everything one phase produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseReport {
    /// Phase name.
    pub name: String,

    /// Settled status.
    pub status: PhaseStatus,

    /// One result per task, in no particular order.
    pub results: Vec<TaskResult>,

    /// Aggregated context handed to the next phase.
    pub context_out: RunContext,

    /// Present when every task failed.
    pub failure: Option<PhaseFailure>,

    /// True if the run deadline expired before the barrier was reached.
    pub timed_out: bool,

    /// When the phase started.
    pub started_at: DateTime<Utc>,

    /// When the phase barrier returned.
    pub finished_at: DateTime<Utc>,
}

impl PhaseReport {
    /// Results sorted by worker name, then task id.
    pub fn sorted_results(&self) -> Vec<&TaskResult> {
        let mut sorted: Vec<&TaskResult> = self.results.iter().collect();
        sorted.sort_by(|a, b| {
            a.worker_name
                .cmp(&b.worker_name)
                .then_with(|| a.task_id.cmp(&b.task_id))
        });
        sorted
    }
}

/// Outcome of a whole orchestration run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrchestrationReport {
    /// Run identifier.
    pub run_id: RunId,

    /// The query the run started from.
    pub query: String,

    /// Reports for every phase that ran, in order.
    pub phases: Vec<PhaseReport>,

    /// Context produced by the last phase.
    pub final_context: RunContext,
}

impl OrchestrationReport {
    /// All recorded phase failures.
    pub fn failures(&self) -> impl Iterator<Item = &PhaseFailure> {
        self.phases.iter().filter_map(|p| p.failure.as_ref())
    }

    /// Check if any phase hit the run deadline.
    pub fn timed_out(&self) -> bool {
        self.phases.iter().any(|p| p.timed_out)
    }

    /// Successful outputs of the last phase, sorted by worker name.
    ///
    /// Returns `None` when the last phase produced no output at all.
    pub fn final_output(&self) -> Option<String> {
        let last = self.phases.last()?;
        let outputs: Vec<&str> = last
            .sorted_results()
            .into_iter()
            .filter_map(TaskResult::output)
            .collect();

        if outputs.is_empty() {
            None
        } else {
            Some(outputs.join("\n"))
        }
    }
}
