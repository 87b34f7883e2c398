//! Mock CVE capabilities used by the demo binary.

use std::time::Duration;

use phaserun_core::{CapabilityError, CoreError};
use phaserun_orchestrator::{capability_fn, Delayed, Phase, Worker};

pub const NIST: &str = "nist";
pub const MITRE: &str = "mitre";
pub const REMEDIATION: &str = "remediation";

/// Every worker name the binary knows about.
pub const WORKER_NAMES: [&str; 3] = [NIST, MITRE, REMEDIATION];

/// How the workers are arranged into phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Variant {
    /// Lookups in parallel, then remediation on their aggregated results.
    Phased,
    /// Every worker in one phase, all on the raw query.
    AllParallel,
}

fn nist_lookup(query: &str) -> Result<String, CapabilityError> {
    Ok(format!("Found NIST CVE-2024-1234 for {query}. Severity: High."))
}

fn mitre_lookup(query: &str) -> Result<String, CapabilityError> {
    Ok(format!(
        "Found MITRE CVE-2024-5678 for {query}. Description: Buffer overflow."
    ))
}

fn gcp_remediation(context: &str) -> Result<String, CapabilityError> {
    Ok(format!(
        "Remediation for {context} on GCP: Update to the latest patch level and enable Cloud Armor."
    ))
}

/// The three mock workers, with simulated latency.
#[derive(Debug, Clone)]
pub struct MockWorkers {
    pub nist: Worker,
    pub mitre: Worker,
    pub remediation: Worker,
}

impl MockWorkers {
    /// Build the workers. Names listed in `failing` return an error instead
    /// of their canned answer.
    pub fn new(latency: Duration, failing: &[String]) -> Result<Self, CoreError> {
        if let Some(unknown) = failing
            .iter()
            .find(|name| !WORKER_NAMES.contains(&name.as_str()))
        {
            return Err(CoreError::WorkerNotFound(unknown.clone()));
        }

        let fails = |name: &str| failing.iter().any(|f| f == name);
        let build = |name: &str,
                     description: &str,
                     lookup: fn(&str) -> Result<String, CapabilityError>| {
            let worker = if fails(name) {
                let cause = format!("{name} service unavailable");
                Worker::new(
                    name,
                    Delayed::new(
                        capability_fn(move |_| Err(CapabilityError::failed(cause.clone()))),
                        latency,
                    ),
                )
            } else {
                Worker::new(name, Delayed::new(capability_fn(lookup), latency))
            };
            worker.with_description(description)
        };

        Ok(Self {
            nist: build(NIST, "Looks up a CVE in the NIST database", nist_lookup),
            mitre: build(MITRE, "Looks up a CVE in the MITRE database", mitre_lookup),
            remediation: build(
                REMEDIATION,
                "Provides GCP-specific remediation steps",
                gcp_remediation,
            ),
        })
    }

    /// Arrange the workers into phases.
    pub fn phases(&self, variant: Variant) -> Vec<Phase> {
        match variant {
            Variant::Phased => vec![
                Phase::new("research")
                    .with_worker(self.nist.clone())
                    .with_worker(self.mitre.clone())
                    .with_concurrency(2),
                Phase::new("remediation")
                    .with_worker(self.remediation.clone())
                    .with_concurrency(1),
            ],
            Variant::AllParallel => vec![Phase::new("all")
                .with_worker(self.nist.clone())
                .with_worker(self.mitre.clone())
                .with_worker(self.remediation.clone())
                .with_concurrency(3)],
        }
    }
}
