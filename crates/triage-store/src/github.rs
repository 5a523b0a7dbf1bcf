//! GitHub REST v3 implementation of `RepoHost`.
//!
//! One request per operation, no retries. Non-success statuses become
//! `StorageError::Api` (404 becomes `NotFound`, 422 on ref creation
//! becomes `AlreadyExists`).

use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::{RequestBuilder, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::error::StorageError;
use crate::storage_traits::*;

/// Default public API root.
pub const DEFAULT_API_BASE: &str = "https://api.github.com";

const COMMENTS_PER_PAGE: usize = 100;

/// `owner/name` repository identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoSlug {
    pub owner: String,
    pub name: String,
}

impl RepoSlug {
    pub fn parse(raw: &str) -> StorageResult<Self> {
        let trimmed = raw.trim().trim_matches('/');
        let mut parts = trimmed.split('/');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(owner), Some(name), None) if !owner.is_empty() && !name.is_empty() => {
                Ok(RepoSlug {
                    owner: owner.to_string(),
                    name: name.to_string(),
                })
            }
            _ => Err(StorageError::InvalidInput(format!(
                "repository must look like owner/name, got '{raw}'"
            ))),
        }
    }
}

impl std::fmt::Display for RepoSlug {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct ApiUser {
    login: String,
}

#[derive(Deserialize)]
struct ApiIssue {
    number: u64,
    body: Option<String>,
}

#[derive(Deserialize)]
struct ApiComment {
    id: u64,
    user: Option<ApiUser>,
    body: Option<String>,
    created_at: Option<DateTime<Utc>>,
}

impl From<ApiComment> for IssueComment {
    fn from(c: ApiComment) -> Self {
        IssueComment {
            id: c.id,
            author: c.user.map(|u| u.login).unwrap_or_default(),
            body: c.body.unwrap_or_default(),
            created_at: c.created_at,
        }
    }
}

#[derive(Deserialize)]
struct ApiRepo {
    default_branch: String,
}

#[derive(Deserialize)]
struct ApiRef {
    object: ApiObject,
}

#[derive(Deserialize)]
struct ApiObject {
    sha: String,
}

#[derive(Deserialize)]
struct ApiContent {
    sha: String,
}

#[derive(Deserialize)]
struct ApiContentWrite {
    content: ApiContent,
    commit: ApiObject,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Repository host backed by the GitHub REST API.
#[derive(Clone)]
pub struct GithubRepoHost {
    http: reqwest::Client,
    api_base: String,
    repo: RepoSlug,
}

impl GithubRepoHost {
    /// Build a client for `repo` authenticated with `token`.
    pub fn new(api_base: &str, token: &str, repo: RepoSlug) -> StorageResult<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static("issue-triage"));
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(
            "x-github-api-version",
            HeaderValue::from_static("2022-11-28"),
        );
        let auth = HeaderValue::from_str(&format!("Bearer {}", token.trim()))
            .map_err(|_| StorageError::InvalidInput("invalid github token".to_string()))?;
        headers.insert(AUTHORIZATION, auth);

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| StorageError::Transport {
                operation: "build github client".to_string(),
                message: e.to_string(),
            })?;

        Ok(Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
            repo,
        })
    }

    /// URL for `/repos/{owner}/{name}/{segments...}`, each segment escaped.
    fn repo_url(&self, segments: &[&str]) -> StorageResult<Url> {
        let mut url = self.api_url(&["repos", &self.repo.owner, &self.repo.name])?;
        url.path_segments_mut()
            .map_err(|_| StorageError::InvalidInput(format!("bad api base {}", self.api_base)))?
            .extend(segments.iter().flat_map(|s| s.split('/')));
        Ok(url)
    }

    fn api_url(&self, segments: &[&str]) -> StorageResult<Url> {
        let mut url = Url::parse(&self.api_base)
            .map_err(|e| StorageError::InvalidInput(format!("bad api base: {e}")))?;
        url.path_segments_mut()
            .map_err(|_| StorageError::InvalidInput(format!("bad api base {}", self.api_base)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn send(&self, operation: &str, request: RequestBuilder) -> StorageResult<reqwest::Response> {
        debug!(operation, "github request");
        let response = request.send().await.map_err(|e| StorageError::Transport {
            operation: operation.to_string(),
            message: e.to_string(),
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        if status == StatusCode::NOT_FOUND {
            return Err(StorageError::not_found(operation.to_string()));
        }
        Err(StorageError::Api {
            operation: operation.to_string(),
            status: status.as_u16(),
            body: truncate_for_error(&body, 800),
        })
    }

    async fn request_json<T: DeserializeOwned>(
        &self,
        operation: &str,
        request: RequestBuilder,
    ) -> StorageResult<T> {
        let response = self.send(operation, request).await?;
        response.json::<T>().await.map_err(|e| StorageError::Decode {
            operation: operation.to_string(),
            message: e.to_string(),
        })
    }
}

fn truncate_for_error(body: &str, max_chars: usize) -> String {
    if body.chars().count() <= max_chars {
        return body.to_string();
    }
    let mut out: String = body.chars().take(max_chars).collect();
    out.push_str("...");
    out
}

#[async_trait]
impl RepoHost for GithubRepoHost {
    async fn authenticated_login(&self) -> StorageResult<String> {
        let url = self.api_url(&["user"])?;
        let user: ApiUser = self
            .request_json("resolve bot login", self.http.get(url))
            .await?;
        Ok(user.login)
    }

    async fn get_issue(&self, number: u64) -> StorageResult<Issue> {
        let url = self.repo_url(&["issues", &number.to_string()])?;
        let issue: ApiIssue = self.request_json("get issue", self.http.get(url)).await?;
        Ok(Issue {
            number: issue.number,
            body: issue.body,
        })
    }

    async fn list_comments(&self, number: u64) -> StorageResult<Vec<IssueComment>> {
        let url = self.repo_url(&["issues", &number.to_string(), "comments"])?;
        let mut page = 1_u32;
        let mut rows = Vec::new();
        loop {
            let request = self.http.get(url.clone()).query(&[
                ("per_page", COMMENTS_PER_PAGE.to_string()),
                ("page", page.to_string()),
            ]);
            let chunk: Vec<ApiComment> = self.request_json("list issue comments", request).await?;
            let chunk_len = chunk.len();
            rows.extend(chunk.into_iter().map(IssueComment::from));
            if chunk_len < COMMENTS_PER_PAGE {
                break;
            }
            page = page.saturating_add(1);
        }
        Ok(rows)
    }

    async fn create_comment(&self, number: u64, body: &str) -> StorageResult<IssueComment> {
        let url = self.repo_url(&["issues", &number.to_string(), "comments"])?;
        let created: ApiComment = self
            .request_json(
                "create issue comment",
                self.http.post(url).json(&json!({ "body": body })),
            )
            .await?;
        Ok(created.into())
    }

    async fn default_branch(&self) -> StorageResult<String> {
        let url = self.repo_url(&[])?;
        let repo: ApiRepo = self.request_json("get repository", self.http.get(url)).await?;
        Ok(repo.default_branch)
    }

    async fn branch_head(&self, branch: &str) -> StorageResult<String> {
        let url = self.repo_url(&["git", "ref", "heads", branch])?;
        let git_ref: ApiRef = self.request_json("get branch ref", self.http.get(url)).await?;
        Ok(git_ref.object.sha)
    }

    async fn create_branch(&self, name: &str, sha: &str) -> StorageResult<BranchRef> {
        let url = self.repo_url(&["git", "refs"])?;
        let payload = json!({ "ref": format!("refs/heads/{name}"), "sha": sha });
        match self
            .send("create branch ref", self.http.post(url).json(&payload))
            .await
        {
            Ok(_) => Ok(BranchRef {
                name: name.to_string(),
                base_sha: sha.to_string(),
            }),
            Err(StorageError::Api { status: 422, .. }) => Err(StorageError::AlreadyExists {
                resource: format!("branch {name}"),
            }),
            Err(e) => Err(e),
        }
    }

    async fn file_sha(&self, path: &str, git_ref: &str) -> StorageResult<BlobSha> {
        let url = self.repo_url(&["contents", path])?;
        let content: ApiContent = self
            .request_json(
                "get file contents",
                self.http.get(url).query(&[("ref", git_ref)]),
            )
            .await?;
        Ok(BlobSha::new(content.sha))
    }

    async fn commit_file(&self, commit: &CommitRecord) -> StorageResult<CommitReceipt> {
        let url = self.repo_url(&["contents", &commit.path])?;
        let payload = json!({
            "message": commit.message,
            "content": STANDARD.encode(commit.new_content.as_bytes()),
            "sha": commit.base_file_sha.as_str(),
            "branch": commit.branch,
            "committer": { "name": commit.committer.name, "email": commit.committer.email },
            "author": { "name": commit.author.name, "email": commit.author.email },
        });
        let written: ApiContentWrite = match self
            .request_json("update file", self.http.put(url).json(&payload))
            .await
        {
            Err(StorageError::Api { status: 409, body, .. }) => {
                return Err(StorageError::StaleBlob {
                    path: commit.path.clone(),
                    expected: commit.base_file_sha.to_string(),
                    actual: body,
                })
            }
            other => other?,
        };
        Ok(CommitReceipt {
            commit_sha: written.commit.sha,
            blob_sha: BlobSha::new(written.content.sha),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repo_slug_parse() {
        let slug = RepoSlug::parse("octo/hello-world").unwrap();
        assert_eq!(slug.owner, "octo");
        assert_eq!(slug.name, "hello-world");
        assert_eq!(slug.to_string(), "octo/hello-world");
    }

    #[test]
    fn test_repo_slug_rejects_malformed() {
        assert!(RepoSlug::parse("just-a-name").is_err());
        assert!(RepoSlug::parse("a/b/c").is_err());
        assert!(RepoSlug::parse("/name").is_err());
    }

    #[test]
    fn test_repo_url_escapes_path_segments() {
        let host = GithubRepoHost::new(
            "https://api.github.com/",
            "t0ken",
            RepoSlug::parse("octo/hello").unwrap(),
        )
        .unwrap();
        let url = host.repo_url(&["contents", "docs/read me.md"]).unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.github.com/repos/octo/hello/contents/docs/read%20me.md"
        );
    }

    #[test]
    fn test_truncate_for_error() {
        assert_eq!(truncate_for_error("short", 10), "short");
        assert_eq!(truncate_for_error("abcdef", 3), "abc...");
    }
}
