//! Workers and the capabilities they invoke.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use phaserun_core::{CapabilityError, TaskId};
use tokio_util::sync::CancellationToken;

/// The external function a worker invokes to do its actual work.
///
/// Implementations may block on I/O. The cancellation token fires when the
/// run deadline expires; checking it is optional and purely cooperative.
#[async_trait]
pub trait Capability: Send + Sync {
    /// Invoke the capability with the given input.
    async fn invoke(
        &self,
        input: &str,
        cancel: &CancellationToken,
    ) -> Result<String, CapabilityError>;
}

/// Adapts a plain function into a [`Capability`].
pub struct FnCapability<F> {
    func: F,
}

/// Wrap a function as a capability.
pub fn capability_fn<F>(func: F) -> FnCapability<F>
where
    F: Fn(&str) -> Result<String, CapabilityError> + Send + Sync,
{
    FnCapability { func }
}

#[async_trait]
impl<F> Capability for FnCapability<F>
where
    F: Fn(&str) -> Result<String, CapabilityError> + Send + Sync,
{
    async fn invoke(
        &self,
        input: &str,
        _cancel: &CancellationToken,
    ) -> Result<String, CapabilityError> {
        (self.func)(input)
    }
}

/// Simulates I/O latency in front of another capability.
///
/// Gives up with [`CapabilityError::Cancelled`] if the run is cancelled while
/// waiting.
pub struct Delayed<C> {
    inner: C,
    latency: Duration,
}

impl<C: Capability> Delayed<C> {
    /// Delay every invocation of `inner` by `latency`.
    pub fn new(inner: C, latency: Duration) -> Self {
        Self { inner, latency }
    }
}

#[async_trait]
impl<C: Capability> Capability for Delayed<C> {
    async fn invoke(
        &self,
        input: &str,
        cancel: &CancellationToken,
    ) -> Result<String, CapabilityError> {
        tokio::select! {
            _ = cancel.cancelled() => {
                Err(CapabilityError::Cancelled("run cancelled while waiting on I/O".to_string()))
            }
            _ = tokio::time::sleep(self.latency) => self.inner.invoke(input, cancel).await,
        }
    }
}

/// A named unit bound to exactly one capability.
///
/// Cloning is cheap; clones share the capability.
#[derive(Clone)]
pub struct Worker {
    name: String,
    description: String,
    capability: Arc<dyn Capability>,
}

impl Worker {
    /// Create a worker bound to `capability`.
    pub fn new(name: impl Into<String>, capability: impl Capability + 'static) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            capability: Arc::new(capability),
        }
    }

    /// Builder method to set description.
    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = desc.into();
        self
    }

    /// Worker name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Human-readable description.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Invoke the bound capability.
    pub async fn invoke(
        &self,
        input: &str,
        cancel: &CancellationToken,
    ) -> Result<String, CapabilityError> {
        self.capability.invoke(input, cancel).await
    }
}

impl fmt::Debug for Worker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Worker")
            .field("name", &self.name)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

/// One submitted worker invocation.
#[derive(Debug, Clone)]
pub struct WorkerTask {
    /// Unique task identifier.
    pub id: TaskId,

    /// Worker to run.
    pub worker: Worker,

    /// Input handed to the worker's capability.
    pub input: String,
}

impl WorkerTask {
    /// Create a new task with a generated id.
    pub fn new(worker: Worker, input: impl Into<String>) -> Self {
        Self {
            id: TaskId::generate(),
            worker,
            input: input.into(),
        }
    }

    /// Builder method to set a specific ID (useful for testing).
    pub fn with_id(mut self, id: TaskId) -> Self {
        self.id = id;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fn_capability() {
        let worker = Worker::new(
            "nist",
            capability_fn(|q| Ok(format!("NIST result for {q}"))),
        )
        .with_description("NIST lookup");

        let out = worker
            .invoke("CVE-2024-1234", &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(out, "NIST result for CVE-2024-1234");
        assert_eq!(worker.name(), "nist");
        assert_eq!(worker.description(), "NIST lookup");
    }

    #[tokio::test]
    async fn test_fn_capability_error() {
        let worker = Worker::new("mitre", capability_fn(|_| Err(CapabilityError::failed("MITRE down"))));
        let err = worker.invoke("q", &CancellationToken::new()).await.unwrap_err();
        assert_eq!(err, CapabilityError::failed("MITRE down"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_delayed_waits_then_delegates() {
        let capability = Delayed::new(capability_fn(|q| Ok(q.to_uppercase())), Duration::from_secs(1));
        let start = tokio::time::Instant::now();

        let out = capability.invoke("ok", &CancellationToken::new()).await.unwrap();

        assert_eq!(out, "OK");
        assert!(start.elapsed() >= Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_delayed_notices_cancellation() {
        let capability = Delayed::new(capability_fn(|q| Ok(q.to_string())), Duration::from_secs(60));
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            trigger.cancel();
        });

        let err = capability.invoke("q", &cancel).await.unwrap_err();
        assert!(err.is_cancelled());
    }

    #[test]
    fn test_task_ids_are_unique() {
        let worker = Worker::new("nist", capability_fn(|q| Ok(q.to_string())));
        let a = WorkerTask::new(worker.clone(), "q");
        let b = WorkerTask::new(worker, "q");
        assert_ne!(a.id, b.id);
        assert_eq!(a.with_id(TaskId::new("fixed")).id.as_str(), "fixed");
    }
}
