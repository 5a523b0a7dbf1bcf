//! Error types for triage-store

use thiserror::Error;

/// Errors that can occur while talking to the repository host
#[derive(Error, Debug)]
pub enum StorageError {
    /// The addressed issue, ref or file does not exist
    #[error("{resource} not found")]
    NotFound { resource: String },

    /// A ref or object with the same name already exists
    #[error("{resource} already exists")]
    AlreadyExists { resource: String },

    /// The blob identity supplied with a file write no longer matches the
    /// file on the target branch
    #[error("stale blob for {path}: expected {expected}, found {actual}")]
    StaleBlob {
        path: String,
        expected: String,
        actual: String,
    },

    /// The host answered with a non-success status
    #[error("{operation} failed with status {status}: {body}")]
    Api {
        operation: String,
        status: u16,
        body: String,
    },

    /// The request never produced a response
    #[error("{operation} request failed: {message}")]
    Transport { operation: String, message: String },

    /// The response body did not have the expected shape
    #[error("failed to decode {operation} response: {message}")]
    Decode { operation: String, message: String },

    /// Caller-supplied value is malformed (repository slug, path, token)
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl StorageError {
    pub(crate) fn not_found(resource: impl Into<String>) -> Self {
        StorageError::NotFound {
            resource: resource.into(),
        }
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Decode {
            operation: "json".to_string(),
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_display() {
        let err = StorageError::Api {
            operation: "create comment".to_string(),
            status: 422,
            body: "Validation Failed".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("create comment"));
        assert!(msg.contains("422"));
        assert!(msg.contains("Validation Failed"));
    }

    #[test]
    fn test_stale_blob_display() {
        let err = StorageError::StaleBlob {
            path: "src/lib.rs".to_string(),
            expected: "abc123".to_string(),
            actual: "def456".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("src/lib.rs"));
        assert!(msg.contains("abc123"));
        assert!(msg.contains("def456"));
    }

    #[test]
    fn test_not_found_helper() {
        let err = StorageError::not_found("issue #7");
        assert!(matches!(err, StorageError::NotFound { .. }));
        assert_eq!(err.to_string(), "issue #7 not found");
    }
}
