//! Result aggregation.
//!
//! Pool results arrive in completion order, so they are sorted by worker
//! name (then task id) before being rendered. The same set of results always
//! produces the same context.

use phaserun_core::{RunContext, TaskOutcome, TaskResult};

/// Line appended when no result in the set succeeded.
pub const NO_SUCCESSFUL_RESULTS: &str = "no successful results";

/// Aggregate settled results into a context, one line per result.
pub fn aggregate(results: &[TaskResult]) -> RunContext {
    render(RunContext::new(), results)
}

/// Aggregate settled results under a leading line such as the original query.
pub fn aggregate_with_prefix(prefix: &str, results: &[TaskResult]) -> RunContext {
    render(RunContext::from_text(prefix), results)
}

fn render(mut context: RunContext, results: &[TaskResult]) -> RunContext {
    let mut sorted: Vec<&TaskResult> = results.iter().collect();
    sorted.sort_by(|a, b| {
        a.worker_name
            .cmp(&b.worker_name)
            .then_with(|| a.task_id.cmp(&b.task_id))
    });

    for result in &sorted {
        context.push_line(result_line(result));
    }

    if !sorted.iter().any(|r| r.is_success()) {
        context.push_line(NO_SUCCESSFUL_RESULTS);
    }

    context
}

fn result_line(result: &TaskResult) -> String {
    match &result.outcome {
        TaskOutcome::Output(output) => format!("{} result: {}", result.worker_name, output),
        TaskOutcome::Error(error) => format!("{} result: [error] {}", result.worker_name, error),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use phaserun_core::TaskId;

    fn result(id: &str, worker: &str, outcome: TaskOutcome) -> TaskResult {
        let now = Utc::now();
        TaskResult::new(TaskId::new(id), worker, outcome, now, now)
    }

    fn sample() -> Vec<TaskResult> {
        vec![
            result("t1", "nist", TaskOutcome::Output("NIST-OK".into())),
            result("t2", "mitre", TaskOutcome::Error("MITRE down".into())),
            result("t3", "osv", TaskOutcome::Output("OSV-OK".into())),
            result("t4", "mitre", TaskOutcome::Output("MITRE-OK".into())),
        ]
    }

    #[test]
    fn test_lines_sorted_by_worker_then_task() {
        let ctx = aggregate(&sample());
        assert_eq!(
            ctx.lines(),
            &[
                "mitre result: [error] MITRE down",
                "mitre result: MITRE-OK",
                "nist result: NIST-OK",
                "osv result: OSV-OK",
            ]
        );
    }

    #[test]
    fn test_arrival_order_does_not_matter() {
        let forward = sample();
        let expected = aggregate_with_prefix("Query: CVE-2024-1234", &forward).render();

        let mut reversed = forward.clone();
        reversed.reverse();
        let mut rotated = forward.clone();
        rotated.rotate_left(1);
        let mut swapped = forward;
        swapped.swap(0, 3);

        for permutation in [reversed, rotated, swapped] {
            assert_eq!(
                aggregate_with_prefix("Query: CVE-2024-1234", &permutation).render(),
                expected
            );
        }
    }

    #[test]
    fn test_prefix_comes_first() {
        let ctx = aggregate_with_prefix(
            "Query: CVE-2024-1234",
            &[result("t1", "nist", TaskOutcome::Output("NIST-OK".into()))],
        );
        assert_eq!(ctx.render(), "Query: CVE-2024-1234\nnist result: NIST-OK");
    }

    #[test]
    fn test_marks_when_nothing_succeeded() {
        let ctx = aggregate(&[
            result("t1", "nist", TaskOutcome::Error("NIST down".into())),
            result("t2", "mitre", TaskOutcome::Error("MITRE down".into())),
        ]);
        assert_eq!(ctx.lines().last().map(String::as_str), Some(NO_SUCCESSFUL_RESULTS));
        assert!(ctx.render().contains("nist result: [error] NIST down"));

        assert_eq!(aggregate(&[]).lines(), &[NO_SUCCESSFUL_RESULTS]);
    }
}
