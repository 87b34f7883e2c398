//! Bounded-concurrency worker pool.
//!
//! Every task is spawned onto the runtime immediately and waits on a
//! semaphore for a slot, so at most `concurrency` invocations are in flight
//! and a new one starts as soon as a slot frees. Results are collected in
//! completion order.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use chrono::Utc;
use futures_util::stream::{FuturesUnordered, StreamExt};
use futures_util::FutureExt;
use phaserun_core::{CapabilityError, CoreError, SpanId, TaskId, TaskOutcome, TaskResult};
use tokio::sync::Semaphore;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::OrchestratorError;
use crate::trace::SpanRecorder;
use crate::worker::WorkerTask;

/// Error text recorded for tasks still unsettled when the deadline expired.
pub const DEADLINE_EXCEEDED: &str = "deadline exceeded";

/// Results of one pool run.
#[derive(Debug, Clone)]
pub struct PoolRun {
    /// Exactly one result per submitted task, in completion order.
    pub results: Vec<TaskResult>,

    /// True if the deadline expired before every task settled.
    pub timed_out: bool,
}

/// Runs batches of worker tasks with bounded concurrency.
#[derive(Clone)]
pub struct WorkerPool {
    recorder: Arc<SpanRecorder>,
}

impl WorkerPool {
    /// Create a pool that records task spans on `recorder`.
    pub fn new(recorder: Arc<SpanRecorder>) -> Self {
        Self { recorder }
    }

    /// Run every task and wait for all of them to settle.
    ///
    /// A failing task never aborts its siblings; its error is recorded on its
    /// result and on its span.
    pub async fn run(
        &self,
        tasks: Vec<WorkerTask>,
        concurrency: usize,
        parent: &SpanId,
    ) -> Result<Vec<TaskResult>, OrchestratorError> {
        let run = self
            .run_until(tasks, concurrency, parent, None, &CancellationToken::new())
            .await?;
        Ok(run.results)
    }

    /// Like [`run`](Self::run), but stops waiting at `deadline`.
    ///
    /// On expiry the cancellation token is fired, open task spans under
    /// `parent` are ended with a `deadline exceeded` error, and each unsettled
    /// task gets an error result. Invocations already running are detached,
    /// not aborted.
    pub async fn run_until(
        &self,
        tasks: Vec<WorkerTask>,
        concurrency: usize,
        parent: &SpanId,
        deadline: Option<Instant>,
        cancel: &CancellationToken,
    ) -> Result<PoolRun, OrchestratorError> {
        if concurrency == 0 {
            return Err(CoreError::InvalidInput("concurrency must be at least 1".to_string()).into());
        }

        let submitted_at = Utc::now();
        let total = tasks.len();
        let semaphore = Arc::new(Semaphore::new(concurrency));
        let mut submitted: Vec<(TaskId, String)> = Vec::with_capacity(total);
        let mut in_flight = FuturesUnordered::new();

        for (index, task) in tasks.into_iter().enumerate() {
            submitted.push((task.id.clone(), task.worker.name().to_string()));
            let handle = tokio::spawn(execute_task(
                task,
                semaphore.clone(),
                self.recorder.clone(),
                parent.clone(),
                cancel.clone(),
            ));
            in_flight.push(async move { (index, handle.await) });
        }

        debug!(tasks = total, concurrency, "Submitted tasks to pool");

        let mut settled = vec![false; total];
        let mut results = Vec::with_capacity(total);
        let mut timed_out = false;

        loop {
            let next = match deadline {
                Some(deadline) => match tokio::time::timeout_at(deadline, in_flight.next()).await {
                    Ok(next) => next,
                    Err(_) => {
                        timed_out = true;
                        break;
                    }
                },
                None => in_flight.next().await,
            };

            let Some((index, joined)) = next else {
                break;
            };

            let result = match joined {
                Ok(result) => result,
                Err(e) => {
                    let (task_id, worker_name) = &submitted[index];
                    warn!(task_id = %task_id, worker = %worker_name, error = %e, "Task did not complete");
                    TaskResult::new(
                        task_id.clone(),
                        worker_name.clone(),
                        TaskOutcome::Error(format!("task did not complete: {e}")),
                        submitted_at,
                        Utc::now(),
                    )
                }
            };
            settled[index] = true;
            results.push(result);
        }

        if timed_out {
            // Unfinished invocations keep running detached once `in_flight` drops.
            cancel.cancel();
            let closed = self.recorder.seal(parent, DEADLINE_EXCEEDED);
            let now = Utc::now();
            let mut unsettled = 0;

            for ((task_id, worker_name), done) in submitted.into_iter().zip(settled) {
                if done {
                    continue;
                }
                unsettled += 1;
                results.push(TaskResult::new(
                    task_id,
                    worker_name,
                    TaskOutcome::Error(DEADLINE_EXCEEDED.to_string()),
                    submitted_at,
                    now,
                ));
            }

            warn!(
                unsettled,
                spans_closed = closed,
                "Deadline exceeded while awaiting tasks"
            );
        }

        Ok(PoolRun { results, timed_out })
    }
}

async fn execute_task(
    task: WorkerTask,
    semaphore: Arc<Semaphore>,
    recorder: Arc<SpanRecorder>,
    parent: SpanId,
    cancel: CancellationToken,
) -> TaskResult {
    let WorkerTask { id, worker, input } = task;
    let name = worker.name().to_string();

    let _permit = match semaphore.acquire_owned().await {
        Ok(permit) => permit,
        Err(_) => return skipped(id, name, "worker pool closed"),
    };

    if cancel.is_cancelled() {
        return skipped(id, name, "run cancelled before task started");
    }

    // Fails once the pool sealed the parent after a deadline.
    let span_id = match recorder.start_span(format!("run_{name}"), Some(&parent)) {
        Ok(span_id) => span_id,
        Err(_) => return skipped(id, name, "run cancelled before task started"),
    };
    let _ = recorder.set_attribute(&span_id, "worker.name", name.as_str());
    let _ = recorder.set_attribute(&span_id, "worker.input", input.as_str());

    info!(worker = %name, task_id = %id, "Starting task");
    let started_at = Utc::now();

    let outcome = match AssertUnwindSafe(worker.invoke(&input, &cancel))
        .catch_unwind()
        .await
    {
        Ok(outcome) => outcome,
        Err(panic) => Err(CapabilityError::failed(format!(
            "worker panicked: {}",
            panic_message(&*panic)
        ))),
    };

    let finished_at = Utc::now();
    let mut attributes = Vec::new();
    match &outcome {
        Ok(output) => {
            info!(worker = %name, task_id = %id, "Task finished");
            attributes.push(("worker.result", output.clone()));
        }
        Err(e) => {
            warn!(worker = %name, task_id = %id, error = %e, "Task failed");
        }
    }

    let error = outcome.as_ref().err().map(ToString::to_string);
    if let Err(e) = recorder.end_span(&span_id, attributes, error) {
        debug!(worker = %name, error = %e, "Task span already closed");
    }

    TaskResult::new(id, name, outcome, started_at, finished_at)
}

fn skipped(id: TaskId, worker_name: String, reason: &str) -> TaskResult {
    let now = Utc::now();
    debug!(worker = %worker_name, task_id = %id, reason, "Skipping task");
    TaskResult::new(
        id,
        worker_name,
        Err::<String, _>(CapabilityError::Cancelled(reason.to_string())),
        now,
        now,
    )
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
