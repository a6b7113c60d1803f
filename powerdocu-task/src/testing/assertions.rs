//! Assertions for run summaries.

use crate::host::{LogLevel, TaskResult};
use crate::pipeline::{RunState, RunSummary, StageKind};

use super::CollectingHost;

/// Asserts that the run completed every stage.
pub fn assert_run_succeeded(summary: &RunSummary) {
    assert_eq!(
        summary.state,
        RunState::Succeeded,
        "Expected run to succeed, failed with: {:?}",
        summary.error
    );
    assert_eq!(summary.executed_kinds(), StageKind::ALL.to_vec());
}

/// Asserts that the run stopped at `kind` and ran nothing after it.
pub fn assert_run_failed_at(summary: &RunSummary, kind: StageKind) {
    assert_eq!(summary.state, RunState::Failed, "Expected run to fail");
    assert!(summary.error.is_some(), "Failed run lost its error");

    let failed = summary
        .failed_stage()
        .unwrap_or_else(|| panic!("No failed stage recorded"));
    assert_eq!(failed.kind, kind, "Run failed at the wrong stage");
    assert_eq!(
        summary.stage_results.last().map(|r| r.kind),
        Some(kind),
        "Stages ran after the failure"
    );
}

/// Asserts that exactly one terminal result was reported.
pub fn assert_single_result(host: &CollectingHost, expected: TaskResult) {
    let results = host.results();
    assert_eq!(results.len(), 1, "Expected one terminal result, got {results:?}");
    assert_eq!(results[0].0, expected);
}

/// Asserts that `message` was logged at `level`.
pub fn assert_logged(host: &CollectingHost, level: LogLevel, message: &str) {
    let lines = host.lines_at(level);
    assert!(
        lines.iter().any(|line| line == message),
        "Expected '{message}' at {level}, got {lines:?}"
    );
}
