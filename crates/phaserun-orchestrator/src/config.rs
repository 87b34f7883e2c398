//! Orchestrator configuration.

use std::time::Duration;

/// What to do when every task in a phase failed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Record the failure, warn, and feed the degraded context to the next phase.
    #[default]
    BestEffort,
    /// Stop the run at the first failed phase.
    FailFast,
}

/// Orchestrator configuration.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Overall run deadline. `None` waits for every barrier indefinitely.
    pub deadline: Option<Duration>,

    /// Policy for phases in which every task failed.
    pub failure_policy: FailurePolicy,

    /// Value of the `service.name` attribute on the root span.
    pub service_name: String,
}

impl OrchestratorConfig {
    /// Builder method to set the run deadline.
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Builder method to set the failure policy.
    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    /// Builder method to set the service name.
    pub fn with_service_name(mut self, name: impl Into<String>) -> Self {
        self.service_name = name.into();
        self
    }
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            deadline: None,
            failure_policy: FailurePolicy::BestEffort,
            service_name: "cve-multi-agent-service".to_string(),
        }
    }
}
