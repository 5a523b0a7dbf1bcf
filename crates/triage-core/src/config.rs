//! Non-secret tunables for a triage run.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TriageError};

pub const DEFAULT_DECISION_URL: &str = "https://playground.ai.cloudflare.com/api/inference";
pub const DEFAULT_DECISION_MODEL: &str = "@cf/deepseek-ai/deepseek-r1-distill-qwen-32b";
pub const DEFAULT_COMPLETION_URL: &str = "https://openrouter.ai/api/v1";

/// Numbered file content at or above this many characters is modified
/// through a unified diff instead of a full rewrite.
pub const DEFAULT_SIZE_THRESHOLD: usize = 15_000;

pub const DEFAULT_DECISION_TIMEOUT: Duration = Duration::from_secs(30);

/// Settings for the streaming decision endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionConfig {
    pub url: String,
    pub model: String,
    pub max_tokens: u32,
}

impl Default for DecisionConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_DECISION_URL.to_string(),
            model: DEFAULT_DECISION_MODEL.to_string(),
            max_tokens: 1672,
        }
    }
}

/// Settings for the chat-completion endpoint used for file selection and
/// modification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionConfig {
    pub base_url: String,
    pub model: String,
}

impl CompletionConfig {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_COMPLETION_URL.to_string(),
            model: model.into(),
        }
    }
}

/// Pipeline policy knobs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriageConfig {
    /// Numbered-content length at which diff mode starts
    pub size_threshold: usize,
    /// Messages kept from each end of a long conversation
    pub trim_keep: usize,
    /// Files with this extension never appear in the tree
    pub excluded_extension: String,
    pub branch_prefix: String,
    /// Bound on the whole streamed decision call
    pub decision_timeout: Duration,
}

impl Default for TriageConfig {
    fn default() -> Self {
        Self {
            size_threshold: DEFAULT_SIZE_THRESHOLD,
            trim_keep: 5,
            excluded_extension: "mds".to_string(),
            branch_prefix: "llm-updates".to_string(),
            decision_timeout: DEFAULT_DECISION_TIMEOUT,
        }
    }
}

impl TriageConfig {
    pub fn validate(&self) -> Result<()> {
        if self.size_threshold == 0 {
            return Err(TriageError::Config(
                "size_threshold must be greater than zero".to_string(),
            ));
        }
        if self.trim_keep == 0 {
            return Err(TriageError::Config(
                "trim_keep must be greater than zero".to_string(),
            ));
        }
        if self.branch_prefix.trim().is_empty() {
            return Err(TriageError::Config("branch_prefix cannot be empty".to_string()));
        }
        if self.decision_timeout.is_zero() {
            return Err(TriageError::Config(
                "decision_timeout must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Reject empty credentials and model names up front.
pub fn require_non_empty(name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(TriageError::Config(format!("{name} is required")));
    }
    Ok(())
}
