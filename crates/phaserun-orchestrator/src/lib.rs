//! Phased concurrent orchestration.
//!
//! An [`Orchestrator`] runs a sequence of [`Phase`]s. Within a phase every
//! [`Worker`] is handed the same input and run on a bounded [`WorkerPool`];
//! the phase ends at a barrier once every task has settled, and the
//! [aggregated](aggregator) results become the next phase's input. Each run,
//! phase and task is recorded as a span on a [`SpanRecorder`].

pub mod aggregator;
pub mod config;
pub mod error;
pub mod orchestrator;
pub mod phase;
pub mod pool;
pub mod trace;
pub mod worker;

pub use aggregator::{aggregate, aggregate_with_prefix, NO_SUCCESSFUL_RESULTS};
pub use config::{FailurePolicy, OrchestratorConfig};
pub use error::{OrchestratorError, SpanError};
pub use orchestrator::{Orchestrator, RunScope, ROOT_SPAN};
pub use phase::{ContextMapper, Phase};
pub use pool::{PoolRun, WorkerPool, DEADLINE_EXCEEDED};
pub use trace::{ConsoleExporter, InMemoryExporter, LogExporter, SpanExporter, SpanRecorder};
pub use worker::{capability_fn, Capability, Delayed, FnCapability, Worker, WorkerTask};
