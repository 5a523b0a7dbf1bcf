//! Structured observability hooks for triage run lifecycle events.
//!
//! This module provides:
//! - The run-scoped span every stage of a triage run is instrumented with
//! - Emission functions for the key lifecycle events of one triage run
//!
//! Events are emitted at `info!` level except failures, which use `warn!`.
//! Every event carries an `event` field so log pipelines can filter on it.

use tracing::{info, warn};

use crate::decision::Decision;

/// Span tagging every event of one run with its id and issue.
///
/// ```ignore
/// run_triage(ctx, 42).instrument(triage_span(&run_id, 42)).await
/// ```
pub fn triage_span(run_id: &str, issue_number: u64) -> tracing::Span {
    tracing::info_span!("triage.run", run_id = %run_id, issue = issue_number)
}

pub fn emit_triage_started(run_id: &str, event_name: &str, issue_number: u64) {
    info!(
        event = "triage.started",
        run_id = %run_id,
        event_name = %event_name,
        issue = issue_number,
    );
}

pub fn emit_duplicate_skipped(issue_number: u64) {
    info!(
        event = "triage.duplicate_skipped",
        issue = issue_number,
        "duplicate comment detected, not sending another identical message"
    );
}

pub fn emit_offer_posted(issue_number: u64, comment_id: u64) {
    info!(event = "triage.offer_posted", issue = issue_number, comment_id = comment_id);
}

pub fn emit_decision(decision: Decision, reply_chars: usize) {
    info!(event = "triage.decision", decision = ?decision, reply_chars = reply_chars);
}

pub fn emit_files_selected(paths: &[String]) {
    info!(event = "triage.files_selected", count = paths.len(), paths = ?paths);
}

pub fn emit_branch_created(branch: &str, base_sha: &str) {
    info!(event = "triage.branch_created", branch = %branch, base_sha = %base_sha);
}

pub fn emit_file_modified(path: &str, mode: &str, description: &str) {
    info!(
        event = "triage.file_modified",
        path = %path,
        mode = %mode,
        description_chars = description.chars().count(),
    );
    tracing::debug!(path = %path, "commit description:\n{description}");
}

pub fn emit_patch_fallback(path: &str, reason: &str) {
    warn!(event = "triage.patch_fallback", path = %path, reason = %reason);
}

pub fn emit_file_failed(path: &str, stage: &str, error: &dyn std::fmt::Display) {
    warn!(event = "triage.file_failed", path = %path, stage = %stage, error = %error);
}

pub fn emit_commit_failed(path: &str, error: &dyn std::fmt::Display) {
    warn!(event = "triage.commit_failed", path = %path, error = %error);
}

pub fn emit_triage_finished(run_id: &str, outcome: &str, duration_ms: u64) {
    info!(
        event = "triage.finished",
        run_id = %run_id,
        outcome = %outcome,
        duration_ms = duration_ms,
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_triage_span_create() {
        let _entered = triage_span("test-run-id", 7).entered();
        emit_patch_fallback("src/lib.rs", "hunk #1 failed");
    }
}
