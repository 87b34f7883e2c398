//! Phase barrier and run sequencing.

use std::sync::Arc;

use chrono::Utc;
use phaserun_core::{
    OrchestrationReport, PhaseFailure, PhaseReport, PhaseStatus, RunContext, RunId, SpanId,
    TaskResult,
};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::aggregator::aggregate_with_prefix;
use crate::config::{FailurePolicy, OrchestratorConfig};
use crate::error::OrchestratorError;
use crate::phase::Phase;
use crate::pool::{WorkerPool, DEADLINE_EXCEEDED};
use crate::trace::SpanRecorder;
use crate::worker::WorkerTask;

/// Name of the root span opened for every run.
pub const ROOT_SPAN: &str = "agent_orchestration";

/// Per-run state shared by every phase of one run.
#[derive(Debug, Clone)]
pub struct RunScope {
    query: String,
    deadline: Option<Instant>,
    cancel: CancellationToken,
}

impl RunScope {
    /// Create a scope for `query`, with the deadline counted from now.
    pub fn new(query: impl Into<String>, deadline: Option<std::time::Duration>) -> Self {
        Self {
            query: query.into(),
            deadline: deadline.map(|d| Instant::now() + d),
            cancel: CancellationToken::new(),
        }
    }

    /// The query the run started from.
    pub fn query(&self) -> &str {
        &self.query
    }

    /// Token fired when the run deadline expires.
    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }
}

/// Runs phases in strict sequence, with a barrier after each.
pub struct Orchestrator {
    config: OrchestratorConfig,
    recorder: Arc<SpanRecorder>,
    pool: WorkerPool,
}

impl Orchestrator {
    /// Create an orchestrator recording spans on `recorder`.
    pub fn new(config: OrchestratorConfig, recorder: Arc<SpanRecorder>) -> Self {
        let pool = WorkerPool::new(recorder.clone());
        Self {
            config,
            recorder,
            pool,
        }
    }

    /// The configuration in use.
    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Run one phase and wait at its barrier.
    ///
    /// Task spans are opened under `parent`. The returned report carries the
    /// aggregated context for the next phase.
    pub async fn run_phase(
        &self,
        phase: &Phase,
        context: &RunContext,
        previous: &[TaskResult],
        scope: &RunScope,
        parent: &SpanId,
    ) -> Result<PhaseReport, OrchestratorError> {
        let input = phase.input_context(context, previous).render();
        let tasks: Vec<WorkerTask> = phase
            .workers()
            .iter()
            .map(|worker| WorkerTask::new(worker.clone(), input.clone()))
            .collect();

        info!(
            phase = %phase.name(),
            tasks = tasks.len(),
            concurrency = phase.concurrency(),
            "Starting phase"
        );
        let started_at = Utc::now();

        let run = self
            .pool
            .run_until(
                tasks,
                phase.concurrency(),
                parent,
                scope.deadline,
                &scope.cancel,
            )
            .await?;

        let finished_at = Utc::now();
        let context_out = aggregate_with_prefix(&format!("Query: {}", scope.query), &run.results);
        let status = PhaseStatus::from_results(&run.results);
        let failure = PhaseFailure::from_results(phase.name(), &run.results);

        if run.timed_out {
            warn!(phase = %phase.name(), "Run deadline exceeded while awaiting phase barrier");
        }
        match &failure {
            Some(failure) => warn!(phase = %phase.name(), error = %failure, "Phase failed"),
            None => info!(phase = %phase.name(), status = ?status, "Phase settled"),
        }

        Ok(PhaseReport {
            name: phase.name().to_string(),
            status,
            results: run.results,
            context_out,
            failure,
            timed_out: run.timed_out,
            started_at,
            finished_at,
        })
    }

    /// Run every phase in order, feeding each phase's context into the next.
    ///
    /// Opens one root span for the run and one child span per phase. Under
    /// [`FailurePolicy::BestEffort`] a phase where every task failed is
    /// recorded on the report and the run continues; under
    /// [`FailurePolicy::FailFast`] it ends the run with an error.
    pub async fn run_orchestration(
        &self,
        query: &str,
        phases: &[Phase],
    ) -> Result<OrchestrationReport, OrchestratorError> {
        let run_id = RunId::generate();
        let scope = RunScope::new(query, self.config.deadline);

        let root = self.recorder.start_span(ROOT_SPAN, None)?;
        self.recorder
            .set_attribute(&root, "service.name", self.config.service_name.as_str())?;
        self.recorder.set_attribute(&root, "run.id", run_id.as_str())?;
        self.recorder.set_attribute(&root, "query", query)?;

        info!(run_id = %run_id, query = %query, phases = phases.len(), "Starting orchestration");

        let mut context = RunContext::from_text(query);
        let mut previous: Vec<TaskResult> = Vec::new();
        let mut reports = Vec::with_capacity(phases.len());

        for (index, phase) in phases.iter().enumerate() {
            let phase_span = match self
                .recorder
                .start_span(format!("phase_{}", phase.name()), Some(&root))
            {
                Ok(span) => span,
                Err(e) => {
                    self.close_root(&root, reports.len(), Some(e.to_string()));
                    return Err(e.into());
                }
            };
            let _ = self
                .recorder
                .set_attribute(&phase_span, "phase.index", (index + 1).to_string());

            let report = match self
                .run_phase(phase, &context, &previous, &scope, &phase_span)
                .await
            {
                Ok(report) => report,
                Err(e) => {
                    let _ = self.recorder.end_span(
                        &phase_span,
                        Vec::<(String, String)>::new(),
                        Some(e.to_string()),
                    );
                    self.close_root(&root, reports.len(), Some(e.to_string()));
                    return Err(e);
                }
            };

            let failed = report.results.iter().filter(|r| !r.is_success()).count();
            let span_error = report
                .failure
                .as_ref()
                .map(ToString::to_string)
                .or_else(|| report.timed_out.then(|| DEADLINE_EXCEEDED.to_string()));
            self.recorder.end_span(
                &phase_span,
                [
                    ("phase.status", format!("{:?}", report.status)),
                    ("phase.tasks", report.results.len().to_string()),
                    ("phase.failed", failed.to_string()),
                ],
                span_error,
            )?;

            if let Some(failure) = &report.failure {
                if self.config.failure_policy == FailurePolicy::FailFast {
                    self.close_root(&root, reports.len() + 1, Some(failure.to_string()));
                    return Err(OrchestratorError::PhaseFailed(failure.clone()));
                }
            }

            // Replace, never mutate: the next phase starts from a fresh context.
            context = report.context_out.clone();
            previous = report.results.clone();
            reports.push(report);
        }

        let report = OrchestrationReport {
            run_id,
            query: query.to_string(),
            phases: reports,
            final_context: context,
        };

        let degraded = report.failures().count() > 0 || report.timed_out();
        self.recorder.end_span(
            &root,
            [
                ("run.phases", report.phases.len().to_string()),
                ("run.degraded", degraded.to_string()),
            ],
            None,
        )?;

        info!(
            run_id = %report.run_id,
            failed_phases = report.failures().count(),
            timed_out = report.timed_out(),
            "Orchestration finished"
        );

        Ok(report)
    }

    fn close_root(&self, root: &SpanId, phases: usize, error: Option<String>) {
        let _ = self
            .recorder
            .end_span(root, [("run.phases", phases.to_string())], error);
    }
}
