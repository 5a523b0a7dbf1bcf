//! Triage-Store: repository host seam for issue triage
//!
//! This crate provides the persistence layer the triage pipeline writes to:
//! issue threads, branch refs and file blobs on a remote host.
//!
//! ## Key Components
//!
//! - `RepoHost`: async trait over the host's read/create/update operations
//! - `GithubRepoHost`: GitHub REST v3 implementation
//! - `MemoryRepoHost`: in-memory fake used by tests

mod error;
pub mod fakes;
pub mod github;
pub mod storage_traits;

pub use error::StorageError;
pub use github::{GithubRepoHost, RepoSlug};
pub use storage_traits::{
    BlobSha, BranchRef, CommitReceipt, CommitRecord, Identity, Issue, IssueComment, RepoHost,
    StorageResult,
};
