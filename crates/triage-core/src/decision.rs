//! Tri-state yes/no/unknown decision from the streamed decision model.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::conversation::ConversationMessage;
use crate::error::{Result, TriageError};
use crate::oracle::StreamingOracle;

/// Closing delimiter of the model's thinking block.
pub const THINK_CLOSE: &str = "</think>";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Affirmative,
    Negative,
    Unknown,
}

/// Decision plus the merged reply it was read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecisionOutcome {
    pub decision: Decision,
    pub reply: String,
}

/// Read the verdict after the first closing think delimiter.
///
/// The tail is case-folded and searched for substrings: "yes" wins over
/// "no" when both appear. A missing delimiter or neither word is `Unknown`.
pub fn extract_decision(reply: &str) -> Decision {
    let Some(idx) = reply.find(THINK_CLOSE) else {
        return Decision::Unknown;
    };
    let tail = reply[idx + THINK_CLOSE.len()..].trim().to_lowercase();
    if tail.contains("yes") {
        Decision::Affirmative
    } else if tail.contains("no") {
        Decision::Negative
    } else {
        Decision::Unknown
    }
}

/// Stream the conversation through the decision model and extract the
/// verdict. The whole call is bounded by `timeout`.
pub async fn decide(
    oracle: &dyn StreamingOracle,
    conversation: &[ConversationMessage],
    timeout: Duration,
) -> Result<DecisionOutcome> {
    let reply = tokio::time::timeout(timeout, oracle.stream_completion(conversation))
        .await
        .map_err(|_| TriageError::DecisionTimeout(timeout))??;
    Ok(DecisionOutcome {
        decision: extract_decision(&reply),
        reply,
    })
}
