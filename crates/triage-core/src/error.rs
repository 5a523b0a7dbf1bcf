//! Error taxonomy for the triage pipeline.

use std::time::Duration;

use triage_store::StorageError;

/// Errors produced by a language-model endpoint.
#[derive(Debug, thiserror::Error)]
pub enum OracleError {
    #[error("model request failed: {0}")]
    Transport(String),

    #[error("model endpoint returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("failed to decode model response: {0}")]
    Decode(String),

    #[error("model returned empty content")]
    EmptyResponse,
}

/// Triage pipeline errors.
///
/// Only failures that end a run surface here; per-file failures are
/// logged and recorded in the run report instead.
#[derive(Debug, thiserror::Error)]
pub enum TriageError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("could not determine issue number from payload: {0}")]
    UnresolvableIssue(String),

    #[error("model error: {0}")]
    Oracle(#[from] OracleError),

    #[error("decision stream timed out after {0:?}")]
    DecisionTimeout(Duration),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for triage operations.
pub type Result<T> = std::result::Result<T, TriageError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_triage_error_display() {
        let err = TriageError::Config("model name is required".to_string());
        assert!(err.to_string().contains("invalid configuration"));

        let err = TriageError::UnresolvableIssue("no issue or issue_url".to_string());
        assert!(err.to_string().contains("issue number"));

        let err = TriageError::DecisionTimeout(Duration::from_secs(30));
        assert!(err.to_string().contains("30s"));
    }

    #[test]
    fn test_oracle_error_converts() {
        let err: TriageError = OracleError::Api {
            status: 503,
            body: "overloaded".to_string(),
        }
        .into();
        let msg = err.to_string();
        assert!(msg.contains("503"));
        assert!(msg.contains("overloaded"));
    }

    #[test]
    fn test_storage_error_converts() {
        let err: TriageError = StorageError::InvalidInput("bad slug".to_string()).into();
        assert!(err.to_string().contains("storage error"));
        assert!(err.to_string().contains("bad slug"));
    }
}
