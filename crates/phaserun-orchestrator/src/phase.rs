//! Phase definitions.

use std::fmt;
use std::sync::Arc;

use phaserun_core::{RunContext, TaskResult};

use crate::worker::Worker;

/// Maps the previous phase's results into this phase's input context.
pub type ContextMapper = Arc<dyn Fn(&[TaskResult]) -> RunContext + Send + Sync>;

/// A batch of workers run concurrently, gated by a barrier.
///
/// Every worker in the phase receives the same input: the previous phase's
/// aggregated context, or the output of the context mapper when one is set.
#[derive(Clone)]
pub struct Phase {
    name: String,
    workers: Vec<Worker>,
    concurrency: Option<usize>,
    context_mapper: Option<ContextMapper>,
}

impl Phase {
    /// Create an empty phase.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            workers: Vec::new(),
            concurrency: None,
            context_mapper: None,
        }
    }

    /// Builder method to add a worker.
    pub fn with_worker(mut self, worker: Worker) -> Self {
        self.workers.push(worker);
        self
    }

    /// Builder method to cap the number of workers in flight.
    ///
    /// Defaults to the number of workers, so all of them start at once.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = Some(concurrency);
        self
    }

    /// Builder method to derive this phase's input from the previous results.
    pub fn with_context_mapper<F>(mut self, mapper: F) -> Self
    where
        F: Fn(&[TaskResult]) -> RunContext + Send + Sync + 'static,
    {
        self.context_mapper = Some(Arc::new(mapper));
        self
    }

    /// Phase name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Workers in submission order.
    pub fn workers(&self) -> &[Worker] {
        &self.workers
    }

    /// Effective concurrency limit.
    pub fn concurrency(&self) -> usize {
        self.concurrency.unwrap_or_else(|| self.workers.len().max(1))
    }

    /// Build the input context for this phase.
    pub fn input_context(&self, context: &RunContext, previous: &[TaskResult]) -> RunContext {
        match &self.context_mapper {
            Some(mapper) => mapper(previous),
            None => context.clone(),
        }
    }
}

impl fmt::Debug for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Phase")
            .field("name", &self.name)
            .field("workers", &self.workers)
            .field("concurrency", &self.concurrency())
            .field("context_mapper", &self.context_mapper.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::worker::capability_fn;
    use chrono::Utc;
    use phaserun_core::{TaskId, TaskOutcome};

    fn worker(name: &str) -> Worker {
        Worker::new(name, capability_fn(|q| Ok(q.to_string())))
    }

    #[test]
    fn test_default_concurrency_runs_all_workers() {
        let phase = Phase::new("research")
            .with_worker(worker("nist"))
            .with_worker(worker("mitre"))
            .with_worker(worker("osv"));
        assert_eq!(phase.concurrency(), 3);
        assert_eq!(Phase::new("empty").concurrency(), 1);
        assert_eq!(phase.clone().with_concurrency(2).concurrency(), 2);
    }

    #[test]
    fn test_input_context_uses_mapper() {
        let context = RunContext::from_text("Query: CVE-2024-1234");
        let now = Utc::now();
        let previous = vec![TaskResult::new(
            TaskId::new("t1"),
            "nist",
            TaskOutcome::Output("CVE-2024-1234".into()),
            now,
            now,
        )];

        let plain = Phase::new("remediation");
        assert_eq!(plain.input_context(&context, &previous), context);

        let mapped = Phase::new("remediation").with_context_mapper(|results| {
            results
                .iter()
                .filter_map(TaskResult::output)
                .fold(RunContext::new(), |ctx, out| ctx.with_line(out))
        });
        assert_eq!(mapped.input_context(&context, &previous).render(), "CVE-2024-1234");
    }
}
