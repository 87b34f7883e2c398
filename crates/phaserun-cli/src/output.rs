//! Human-readable report rendering.

use std::fmt::Write;

use phaserun_core::{OrchestrationReport, TaskOutcome};

/// Render a settled run: one block per phase, then the final report.
pub fn render_report(report: &OrchestrationReport) -> String {
    let mut out = String::new();

    for (index, phase) in report.phases.iter().enumerate() {
        let _ = writeln!(
            out,
            "=== Phase {}: {} ({:?}, {} tasks) ===",
            index + 1,
            phase.name,
            phase.status,
            phase.results.len()
        );

        for result in phase.sorted_results() {
            match &result.outcome {
                TaskOutcome::Output(output) => {
                    let _ = writeln!(out, "[{}] Finished: {}", result.worker_name, output);
                }
                TaskOutcome::Error(error) => {
                    let _ = writeln!(out, "[{}] Error: {}", result.worker_name, error);
                }
            }
        }

        if phase.timed_out {
            let _ = writeln!(out, "WARNING: run deadline expired during this phase");
        }
        if let Some(failure) = &phase.failure {
            let _ = writeln!(out, "WARNING: {failure}");
        }
        out.push('\n');
    }

    out.push_str("--- Final Report ---\n");
    match report.final_output() {
        Some(output) => {
            let _ = writeln!(out, "{output}");
        }
        None => {
            let _ = writeln!(out, "(no successful output in the last phase)");
        }
    }

    out
}
