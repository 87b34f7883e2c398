//! phaserun - run the phased CVE lookup and remediation demo.

use std::io::{self, BufRead, IsTerminal, Write};
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use phaserun_orchestrator::{
    ConsoleExporter, FailurePolicy, LogExporter, Orchestrator, OrchestratorConfig, SpanRecorder,
};

mod capabilities;
mod output;

use capabilities::{MockWorkers, Variant};

const DEFAULT_QUERY: &str = "CVE-2024-1234";

/// Where completed spans go.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum TraceMode {
    /// One JSON line per span on stdout.
    Console,
    /// One tracing event per span on stderr.
    Log,
    /// Record spans without exporting them.
    None,
}

/// phaserun - phased concurrent task orchestration demo
#[derive(Parser, Debug)]
#[command(name = "phaserun")]
#[command(about = "Look up a CVE in parallel, then plan its remediation", long_about = None)]
struct Cli {
    /// CVE query; prompts when omitted and stdin is a terminal
    query: Option<String>,

    /// How workers are arranged into phases
    #[arg(long, value_enum, default_value_t = Variant::Phased)]
    variant: Variant,

    /// Overall run deadline in seconds
    #[arg(long)]
    deadline_secs: Option<u64>,

    /// Stop at the first phase in which every task failed
    #[arg(long)]
    fail_fast: bool,

    /// Simulated latency of each mock capability, in milliseconds
    #[arg(long, default_value_t = 1000)]
    latency_ms: u64,

    /// Force a mock worker to fail (nist, mitre, remediation); repeatable
    #[arg(long = "fail", value_name = "WORKER")]
    fail: Vec<String>,

    /// Span export target
    #[arg(long, value_enum, default_value_t = TraceMode::Console)]
    trace: TraceMode,

    /// Print the whole report as JSON instead of text
    #[arg(long)]
    json: bool,
}

impl Cli {
    fn config(&self) -> OrchestratorConfig {
        let mut config = OrchestratorConfig::default();
        if let Some(secs) = self.deadline_secs {
            config = config.with_deadline(Duration::from_secs(secs));
        }
        if self.fail_fast {
            config = config.with_failure_policy(FailurePolicy::FailFast);
        }
        config
    }

    fn recorder(&self) -> SpanRecorder {
        let recorder = SpanRecorder::new();
        match self.trace {
            TraceMode::Console => recorder.with_exporter(Arc::new(ConsoleExporter::new())),
            TraceMode::Log => recorder.with_exporter(Arc::new(LogExporter::new())),
            TraceMode::None => recorder,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Logs go to stderr; stdout carries spans and the report.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("phaserun=info")),
        )
        .with_writer(io::stderr)
        .with_target(true)
        .init();

    let query = resolve_query(cli.query.clone())?;
    let workers = MockWorkers::new(Duration::from_millis(cli.latency_ms), &cli.fail)?;
    let phases = workers.phases(cli.variant);
    let config = cli.config();

    info!(
        query = %query,
        variant = ?cli.variant,
        deadline_secs = ?cli.deadline_secs,
        failure_policy = ?config.failure_policy,
        "Starting phaserun"
    );

    let orchestrator = Orchestrator::new(config, Arc::new(cli.recorder()));
    let report = match orchestrator.run_orchestration(&query, &phases).await {
        Ok(report) => report,
        Err(e) => {
            error!(error = %e, "Orchestration aborted");
            return Err(e.into());
        }
    };

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", output::render_report(&report));
    }

    Ok(())
}

/// Use the query argument, or prompt for one on an interactive terminal.
fn resolve_query(arg: Option<String>) -> io::Result<String> {
    if let Some(query) = arg.map(|q| q.trim().to_string()).filter(|q| !q.is_empty()) {
        return Ok(query);
    }

    let stdin = io::stdin();
    if !stdin.is_terminal() {
        return Ok(DEFAULT_QUERY.to_string());
    }

    print!("Enter CVE query (or press Enter for default '{DEFAULT_QUERY}'): ");
    io::stdout().flush()?;

    let mut line = String::new();
    stdin.lock().read_line(&mut line)?;
    let line = line.trim();
    Ok(if line.is_empty() {
        DEFAULT_QUERY.to_string()
    } else {
        line.to_string()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::parse_from(["phaserun"]);
        assert_eq!(cli.variant, Variant::Phased);
        assert_eq!(cli.trace, TraceMode::Console);
        assert_eq!(cli.latency_ms, 1000);
        assert!(cli.query.is_none());

        let config = cli.config();
        assert!(config.deadline.is_none());
        assert_eq!(config.failure_policy, FailurePolicy::BestEffort);
    }

    #[test]
    fn test_cli_flags_map_onto_config() {
        let cli = Cli::parse_from([
            "phaserun",
            "log4j",
            "--variant",
            "all-parallel",
            "--deadline-secs",
            "5",
            "--fail-fast",
            "--fail",
            "nist",
            "--fail",
            "mitre",
            "--trace",
            "none",
        ]);
        assert_eq!(cli.query.as_deref(), Some("log4j"));
        assert_eq!(cli.variant, Variant::AllParallel);
        assert_eq!(cli.fail, vec!["nist", "mitre"]);

        let config = cli.config();
        assert_eq!(config.deadline, Some(Duration::from_secs(5)));
        assert_eq!(config.failure_policy, FailurePolicy::FailFast);
    }

    #[test]
    fn test_query_argument_is_trimmed() {
        assert_eq!(resolve_query(Some("  log4j ".to_string())).unwrap(), "log4j");
    }
}
