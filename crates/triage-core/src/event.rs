//! Trigger event intake from a webhook payload.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Result, TriageError};

pub const ISSUES_EVENT: &str = "issues";
pub const ISSUE_COMMENT_EVENT: &str = "issue_comment";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TriggerEvent {
    IssueOpened { issue_number: u64 },
    IssueComment { issue_number: u64 },
    Unsupported { name: String },
}

impl TriggerEvent {
    /// Classify an event by name and resolve the issue it refers to.
    pub fn from_payload(event_name: &str, payload: &Value) -> Result<Self> {
        match event_name {
            ISSUES_EVENT => {
                let issue_number = issue_number(payload).ok_or_else(|| {
                    TriageError::UnresolvableIssue("payload has no issue.number".to_string())
                })?;
                Ok(TriggerEvent::IssueOpened { issue_number })
            }
            ISSUE_COMMENT_EVENT => {
                let issue_number = issue_number(payload)
                    .or_else(|| issue_number_from_url(payload))
                    .ok_or_else(|| {
                        TriageError::UnresolvableIssue(
                            "payload has neither issue.number nor a parsable comment.issue_url"
                                .to_string(),
                        )
                    })?;
                Ok(TriggerEvent::IssueComment { issue_number })
            }
            other => Ok(TriggerEvent::Unsupported {
                name: other.to_string(),
            }),
        }
    }

    pub fn issue_number(&self) -> Option<u64> {
        match self {
            TriggerEvent::IssueOpened { issue_number }
            | TriggerEvent::IssueComment { issue_number } => Some(*issue_number),
            TriggerEvent::Unsupported { .. } => None,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            TriggerEvent::IssueOpened { .. } => ISSUES_EVENT,
            TriggerEvent::IssueComment { .. } => ISSUE_COMMENT_EVENT,
            TriggerEvent::Unsupported { name } => name,
        }
    }
}

fn issue_number(payload: &Value) -> Option<u64> {
    payload.get("issue")?.get("number")?.as_u64()
}

fn issue_number_from_url(payload: &Value) -> Option<u64> {
    payload
        .get("comment")?
        .get("issue_url")?
        .as_str()?
        .trim_end_matches('/')
        .rsplit('/')
        .next()?
        .parse()
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_issues_event_reads_issue_number() {
        let payload = json!({"action": "opened", "issue": {"number": 42, "body": "bug"}});
        assert_eq!(
            TriggerEvent::from_payload("issues", &payload).unwrap(),
            TriggerEvent::IssueOpened { issue_number: 42 }
        );
    }

    #[test]
    fn test_comment_event_prefers_issue_number() {
        let payload = json!({
            "issue": {"number": 7},
            "comment": {"issue_url": "https://api.github.com/repos/o/r/issues/99"}
        });
        assert_eq!(
            TriggerEvent::from_payload("issue_comment", &payload).unwrap(),
            TriggerEvent::IssueComment { issue_number: 7 }
        );
    }

    #[test]
    fn test_comment_event_falls_back_to_issue_url() {
        let payload = json!({
            "comment": {"issue_url": "https://api.github.com/repos/o/r/issues/99"}
        });
        let event = TriggerEvent::from_payload("issue_comment", &payload).unwrap();
        assert_eq!(event.issue_number(), Some(99));
    }

    #[test]
    fn test_comment_event_without_reference_is_unresolvable() {
        let payload = json!({"comment": {"issue_url": "https://example.com/issues/abc"}});
        let err = TriggerEvent::from_payload("issue_comment", &payload).unwrap_err();
        assert!(matches!(err, TriageError::UnresolvableIssue(_)));

        let err = TriggerEvent::from_payload("issues", &json!({})).unwrap_err();
        assert!(matches!(err, TriageError::UnresolvableIssue(_)));
    }

    #[test]
    fn test_other_events_are_unsupported() {
        let event = TriggerEvent::from_payload("push", &json!({})).unwrap();
        assert_eq!(
            event,
            TriggerEvent::Unsupported {
                name: "push".to_string()
            }
        );
        assert_eq!(event.issue_number(), None);
        assert_eq!(event.name(), "push");
    }
}
