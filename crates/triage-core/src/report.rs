//! Serializable summary of one triage run.

use serde::{Deserialize, Serialize};

use crate::decision::Decision;
use crate::event::TriggerEvent;
use crate::modify::Mode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriageOutcome {
    OfferPosted,
    DuplicateSkipped,
    DecisionNegative,
    DecisionUnknown,
    Modified,
    Ignored,
}

impl TriageOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            TriageOutcome::OfferPosted => "offer_posted",
            TriageOutcome::DuplicateSkipped => "duplicate_skipped",
            TriageOutcome::DecisionNegative => "decision_negative",
            TriageOutcome::DecisionUnknown => "decision_unknown",
            TriageOutcome::Modified => "modified",
            TriageOutcome::Ignored => "ignored",
        }
    }
}

/// How the diff of a diff-mode file fared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatchStatus {
    Applied,
    FailedFallback,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileReport {
    pub path: String,
    /// `None` when the file never reached the model
    pub mode: Option<Mode>,
    /// Only set in diff mode
    pub patch: Option<PatchStatus>,
    pub committed: bool,
    pub error: Option<String>,
}

impl FileReport {
    pub fn failed(path: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            mode: None,
            patch: None,
            committed: false,
            error: Some(error.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriageReport {
    pub run_id: String,
    pub event: TriggerEvent,
    pub outcome: TriageOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decision: Option<Decision>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<FileReport>,
}

impl TriageReport {
    pub fn new(run_id: impl Into<String>, event: TriggerEvent, outcome: TriageOutcome) -> Self {
        Self {
            run_id: run_id.into(),
            event,
            outcome,
            decision: None,
            branch: None,
            files: Vec::new(),
        }
    }

    pub fn committed_paths(&self) -> Vec<&str> {
        self.files
            .iter()
            .filter(|f| f.committed)
            .map(|f| f.path.as_str())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_serializes_snake_case() {
        let mut report = TriageReport::new(
            "run-1",
            TriggerEvent::IssueComment { issue_number: 3 },
            TriageOutcome::Modified,
        );
        report.decision = Some(Decision::Affirmative);
        report.branch = Some("llm-updates-1-1000".to_string());
        report.files.push(FileReport {
            path: "src/lib.rs".to_string(),
            mode: Some(Mode::UnifiedDiff),
            patch: Some(PatchStatus::FailedFallback),
            committed: true,
            error: None,
        });

        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["outcome"], "modified");
        assert_eq!(value["decision"], "affirmative");
        assert_eq!(value["event"]["kind"], "issue_comment");
        assert_eq!(value["files"][0]["mode"], "unified_diff");
        assert_eq!(value["files"][0]["patch"], "failed_fallback");
        assert_eq!(report.committed_paths(), vec!["src/lib.rs"]);
    }

    #[test]
    fn test_quiet_report_omits_empty_fields() {
        let report = TriageReport::new(
            "run-2",
            TriggerEvent::Unsupported {
                name: "push".to_string(),
            },
            TriageOutcome::Ignored,
        );
        let value = serde_json::to_value(&report).unwrap();
        assert!(value.get("branch").is_none());
        assert!(value.get("files").is_none());
        assert_eq!(value["outcome"], "ignored");
    }
}
