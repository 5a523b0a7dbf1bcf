//! In-memory fakes for storage traits (testing only)
//!
//! Provides `MemoryRepoHost`, which satisfies the `RepoHost` contract
//! without any network access and records every write for inspection.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;

use crate::error::StorageError;
use crate::storage_traits::*;

// ---------------------------------------------------------------------------
// MemoryRepoHost
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct HostState {
    issues: HashMap<u64, Issue>,
    comments: HashMap<u64, Vec<IssueComment>>,
    next_comment_id: u64,
    /// branch name -> head commit sha
    branches: HashMap<String, String>,
    /// (branch, path) -> content
    files: HashMap<(String, String), String>,
    commits: Vec<CommitRecord>,
    failing_paths: HashSet<String>,
}

/// In-memory repository host backed by plain maps.
///
/// Branch heads are synthetic SHA-256 values; creating a branch copies the
/// files of whichever branch currently points at the requested sha.
#[derive(Debug)]
pub struct MemoryRepoHost {
    login: String,
    default_branch: String,
    state: Mutex<HostState>,
}

impl MemoryRepoHost {
    /// Empty host authenticated as `login`, with a `main` default branch.
    pub fn new(login: &str) -> Self {
        let mut state = HostState {
            next_comment_id: 1,
            ..Default::default()
        };
        state
            .branches
            .insert("main".to_string(), synthetic_head("main", 0));
        Self {
            login: login.to_string(),
            default_branch: "main".to_string(),
            state: Mutex::new(state),
        }
    }

    pub fn with_issue(self, number: u64, body: Option<&str>) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            state.issues.insert(
                number,
                Issue {
                    number,
                    body: body.map(str::to_string),
                },
            );
            state.comments.entry(number).or_default();
        }
        self
    }

    pub fn with_comment(self, number: u64, author: &str, body: &str) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            push_comment(&mut state, number, author, body);
        }
        self
    }

    /// Seed a file on the default branch.
    pub fn with_file(self, path: &str, content: &str) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            state.files.insert(
                (self.default_branch.clone(), path.to_string()),
                content.to_string(),
            );
        }
        self
    }

    /// Make every `commit_file` for `path` fail with an API error.
    pub fn fail_commits_for(self, path: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .failing_paths
            .insert(path.to_string());
        self
    }

    /// Snapshot of an issue's comments, oldest first.
    pub fn comments(&self, number: u64) -> Vec<IssueComment> {
        let state = self.state.lock().unwrap();
        state.comments.get(&number).cloned().unwrap_or_default()
    }

    /// Every successful commit, in write order.
    pub fn commits(&self) -> Vec<CommitRecord> {
        self.state.lock().unwrap().commits.clone()
    }

    /// Names of all branches, sorted.
    pub fn branch_names(&self) -> Vec<String> {
        let state = self.state.lock().unwrap();
        let mut names: Vec<String> = state.branches.keys().cloned().collect();
        names.sort();
        names
    }

    /// Current content of `path` on `branch`.
    pub fn file(&self, branch: &str, path: &str) -> Option<String> {
        let state = self.state.lock().unwrap();
        state
            .files
            .get(&(branch.to_string(), path.to_string()))
            .cloned()
    }
}

fn synthetic_head(branch: &str, generation: usize) -> String {
    BlobSha::of_content(format!("head:{branch}:{generation}").as_bytes()).to_string()
}

fn push_comment(state: &mut HostState, number: u64, author: &str, body: &str) -> IssueComment {
    let comment = IssueComment {
        id: state.next_comment_id,
        author: author.to_string(),
        body: body.to_string(),
        created_at: Some(Utc::now()),
    };
    state.next_comment_id += 1;
    state
        .comments
        .entry(number)
        .or_default()
        .push(comment.clone());
    comment
}

#[async_trait]
impl RepoHost for MemoryRepoHost {
    async fn authenticated_login(&self) -> StorageResult<String> {
        Ok(self.login.clone())
    }

    async fn get_issue(&self, number: u64) -> StorageResult<Issue> {
        let state = self.state.lock().unwrap();
        state
            .issues
            .get(&number)
            .cloned()
            .ok_or_else(|| StorageError::not_found(format!("issue #{number}")))
    }

    async fn list_comments(&self, number: u64) -> StorageResult<Vec<IssueComment>> {
        let state = self.state.lock().unwrap();
        if !state.issues.contains_key(&number) {
            return Err(StorageError::not_found(format!("issue #{number}")));
        }
        Ok(state.comments.get(&number).cloned().unwrap_or_default())
    }

    async fn create_comment(&self, number: u64, body: &str) -> StorageResult<IssueComment> {
        let mut state = self.state.lock().unwrap();
        if !state.issues.contains_key(&number) {
            return Err(StorageError::not_found(format!("issue #{number}")));
        }
        let login = self.login.clone();
        Ok(push_comment(&mut state, number, &login, body))
    }

    async fn default_branch(&self) -> StorageResult<String> {
        Ok(self.default_branch.clone())
    }

    async fn branch_head(&self, branch: &str) -> StorageResult<String> {
        let state = self.state.lock().unwrap();
        state
            .branches
            .get(branch)
            .cloned()
            .ok_or_else(|| StorageError::not_found(format!("branch {branch}")))
    }

    async fn create_branch(&self, name: &str, sha: &str) -> StorageResult<BranchRef> {
        let mut state = self.state.lock().unwrap();
        if state.branches.contains_key(name) {
            return Err(StorageError::AlreadyExists {
                resource: format!("branch {name}"),
            });
        }
        let source = state
            .branches
            .iter()
            .find(|(_, head)| head.as_str() == sha)
            .map(|(branch, _)| branch.clone())
            .ok_or_else(|| StorageError::not_found(format!("commit {sha}")))?;

        let copied: Vec<((String, String), String)> = state
            .files
            .iter()
            .filter(|((branch, _), _)| *branch == source)
            .map(|((_, path), content)| ((name.to_string(), path.clone()), content.clone()))
            .collect();
        state.files.extend(copied);
        state.branches.insert(name.to_string(), sha.to_string());

        Ok(BranchRef {
            name: name.to_string(),
            base_sha: sha.to_string(),
        })
    }

    async fn file_sha(&self, path: &str, git_ref: &str) -> StorageResult<BlobSha> {
        let state = self.state.lock().unwrap();
        state
            .files
            .get(&(git_ref.to_string(), path.to_string()))
            .map(|content| BlobSha::of_content(content.as_bytes()))
            .ok_or_else(|| StorageError::not_found(format!("{path} at {git_ref}")))
    }

    async fn commit_file(&self, commit: &CommitRecord) -> StorageResult<CommitReceipt> {
        let mut state = self.state.lock().unwrap();
        if state.failing_paths.contains(&commit.path) {
            return Err(StorageError::Api {
                operation: "commit file".to_string(),
                status: 409,
                body: format!("injected failure for {}", commit.path),
            });
        }
        if !state.branches.contains_key(&commit.branch) {
            return Err(StorageError::not_found(format!("branch {}", commit.branch)));
        }

        let key = (commit.branch.clone(), commit.path.clone());
        let current = state
            .files
            .get(&key)
            .map(|content| BlobSha::of_content(content.as_bytes()))
            .ok_or_else(|| {
                StorageError::not_found(format!("{} at {}", commit.path, commit.branch))
            })?;
        if current != commit.base_file_sha {
            return Err(StorageError::StaleBlob {
                path: commit.path.clone(),
                expected: commit.base_file_sha.to_string(),
                actual: current.to_string(),
            });
        }

        state.files.insert(key, commit.new_content.clone());
        state.commits.push(commit.clone());
        let head = synthetic_head(&commit.branch, state.commits.len());
        state.branches.insert(commit.branch.clone(), head.clone());

        Ok(CommitReceipt {
            commit_sha: head,
            blob_sha: BlobSha::of_content(commit.new_content.as_bytes()),
        })
    }
}
