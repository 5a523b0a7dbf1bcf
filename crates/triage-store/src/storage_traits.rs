//! Storage trait definitions for issue triage
//!
//! The repository host is treated as a remote object store. The
//! `RepoHost` trait covers everything a triage run reads or writes:
//! - issues and their comment threads
//! - branch refs (read the default head, create a new branch)
//! - file blobs (read the blob identity, write a new revision as a commit)
//!
//! The trait is async and backend-agnostic. An in-memory fake is provided
//! for testing via the `fakes` module; `github` talks to the GitHub REST API.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::error::StorageError;

/// Result type for storage operations
pub type StorageResult<T> = std::result::Result<T, StorageError>;

// ---------------------------------------------------------------------------
// Issues
// ---------------------------------------------------------------------------

/// An issue as seen by the triage pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    pub number: u64,
    /// Issue description; the host may return none at all
    pub body: Option<String>,
}

/// A single comment on an issue thread.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueComment {
    pub id: u64,
    /// Login of the comment author
    pub author: String,
    pub body: String,
    pub created_at: Option<DateTime<Utc>>,
}

// ---------------------------------------------------------------------------
// Refs and blobs
// ---------------------------------------------------------------------------

/// Blob identity of a file revision as reported by the host.
///
/// For GitHub this is the git blob SHA-1; the in-memory fake uses the
/// SHA-256 of the content. Callers treat it as opaque.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlobSha(String);

impl BlobSha {
    pub fn new(sha: impl Into<String>) -> Self {
        BlobSha(sha.into())
    }

    /// Compute the SHA-256 identity of the given bytes.
    pub fn of_content(data: &[u8]) -> Self {
        use sha2::Digest;
        let mut hasher = Sha256::new();
        hasher.update(data);
        BlobSha(hex::encode(hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for BlobSha {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A branch created for one triage run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchRef {
    pub name: String,
    /// Commit the branch was cut from
    pub base_sha: String,
}

/// Author / committer identity attached to a commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub name: String,
    pub email: String,
}

impl Identity {
    /// Identity for a host login using the GitHub no-reply address.
    pub fn noreply(login: &str) -> Self {
        Identity {
            name: login.to_string(),
            email: format!("{login}@users.noreply.github.com"),
        }
    }
}

/// One file write on a branch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitRecord {
    pub path: String,
    pub message: String,
    pub new_content: String,
    /// Blob identity of the revision being replaced
    pub base_file_sha: BlobSha,
    pub branch: String,
    pub author: Identity,
    pub committer: Identity,
}

/// Returned by the host after a successful file commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitReceipt {
    pub commit_sha: String,
    pub blob_sha: BlobSha,
}

// ---------------------------------------------------------------------------
// RepoHost
// ---------------------------------------------------------------------------

/// Remote repository host.
///
/// Guarantees:
/// - `list_comments` returns comments oldest first.
/// - `create_branch` fails with `AlreadyExists` rather than moving a ref.
/// - `commit_file` fails with `StaleBlob` when `base_file_sha` does not match
///   the file currently on the target branch; nothing is written then.
#[async_trait]
pub trait RepoHost: Send + Sync {
    /// Login of the identity the host credential authenticates as.
    async fn authenticated_login(&self) -> StorageResult<String>;

    /// Fetch a single issue by number.
    async fn get_issue(&self, number: u64) -> StorageResult<Issue>;

    /// Full comment history of an issue, oldest first.
    async fn list_comments(&self, number: u64) -> StorageResult<Vec<IssueComment>>;

    /// Post a new comment on an issue.
    async fn create_comment(&self, number: u64, body: &str) -> StorageResult<IssueComment>;

    /// Name of the repository default branch.
    async fn default_branch(&self) -> StorageResult<String>;

    /// Commit SHA the named branch currently points at.
    async fn branch_head(&self, branch: &str) -> StorageResult<String>;

    /// Create a new branch pointing at `sha`.
    async fn create_branch(&self, name: &str, sha: &str) -> StorageResult<BranchRef>;

    /// Blob identity of `path` at `git_ref` (branch name or commit).
    async fn file_sha(&self, path: &str, git_ref: &str) -> StorageResult<BlobSha>;

    /// Write a new revision of a file as a single commit on `commit.branch`.
    async fn commit_file(&self, commit: &CommitRecord) -> StorageResult<CommitReceipt>;
}
