//! Trait contract tests for RepoHost.
//!
//! These tests verify the behavioral contract of the host trait using the
//! in-memory fake. Any conforming implementation must pass these.

use triage_store::fakes::MemoryRepoHost;
use triage_store::storage_traits::*;
use triage_store::StorageError;

fn commit_for(path: &str, branch: &str, base: BlobSha, content: &str) -> CommitRecord {
    CommitRecord {
        path: path.to_string(),
        message: format!("update {path}"),
        new_content: content.to_string(),
        base_file_sha: base,
        branch: branch.to_string(),
        author: Identity::noreply("bot"),
        committer: Identity::noreply("bot"),
    }
}

// ===========================================================================
// Issues and comments
// ===========================================================================

#[tokio::test]
async fn test_comments_are_listed_oldest_first() {
    let host = MemoryRepoHost::new("bot")
        .with_issue(1, Some("crash on start"))
        .with_comment(1, "alice", "first")
        .with_comment(1, "bob", "second");

    let comments = host.list_comments(1).await.unwrap();
    let bodies: Vec<&str> = comments.iter().map(|c| c.body.as_str()).collect();
    assert_eq!(bodies, vec!["first", "second"]);
}

#[tokio::test]
async fn test_created_comment_is_authored_by_authenticated_login() {
    let host = MemoryRepoHost::new("bot").with_issue(3, None);
    let created = host.create_comment(3, "hello").await.unwrap();

    assert_eq!(created.author, host.authenticated_login().await.unwrap());
    assert_eq!(host.list_comments(3).await.unwrap().last().unwrap().body, "hello");
}

#[tokio::test]
async fn test_missing_issue_is_not_found() {
    let host = MemoryRepoHost::new("bot");
    let err = host.get_issue(404).await.unwrap_err();
    assert!(matches!(err, StorageError::NotFound { .. }));

    let err = host.create_comment(404, "x").await.unwrap_err();
    assert!(matches!(err, StorageError::NotFound { .. }));
}

#[tokio::test]
async fn test_issue_without_body_round_trips_none() {
    let host = MemoryRepoHost::new("bot").with_issue(9, None);
    assert_eq!(host.get_issue(9).await.unwrap().body, None);
}

// ===========================================================================
// Branches and file commits
// ===========================================================================

#[tokio::test]
async fn test_create_branch_from_default_head_copies_files() {
    let host = MemoryRepoHost::new("bot").with_file("src/lib.rs", "pub fn a() {}\n");
    let default = host.default_branch().await.unwrap();
    let head = host.branch_head(&default).await.unwrap();

    let branch = host.create_branch("work", &head).await.unwrap();
    assert_eq!(branch.base_sha, head);
    assert_eq!(
        host.file_sha("src/lib.rs", "work").await.unwrap(),
        host.file_sha("src/lib.rs", &default).await.unwrap()
    );
}

#[tokio::test]
async fn test_create_branch_twice_is_rejected() {
    let host = MemoryRepoHost::new("bot");
    let head = host.branch_head("main").await.unwrap();
    host.create_branch("dup", &head).await.unwrap();

    let err = host.create_branch("dup", &head).await.unwrap_err();
    assert!(matches!(err, StorageError::AlreadyExists { .. }));
}

#[tokio::test]
async fn test_commit_with_current_blob_sha_succeeds() {
    let host = MemoryRepoHost::new("bot").with_file("a.txt", "old\n");
    let head = host.branch_head("main").await.unwrap();
    host.create_branch("work", &head).await.unwrap();
    let base = host.file_sha("a.txt", "main").await.unwrap();

    let receipt = host
        .commit_file(&commit_for("a.txt", "work", base, "new\n"))
        .await
        .unwrap();

    assert_eq!(receipt.blob_sha, BlobSha::of_content(b"new\n"));
    assert_eq!(host.file("work", "a.txt").as_deref(), Some("new\n"));
    assert_eq!(host.file("main", "a.txt").as_deref(), Some("old\n"));
    assert_eq!(host.commits().len(), 1);
}

#[tokio::test]
async fn test_commit_with_stale_blob_sha_writes_nothing() {
    let host = MemoryRepoHost::new("bot").with_file("a.txt", "old\n");
    let head = host.branch_head("main").await.unwrap();
    host.create_branch("work", &head).await.unwrap();

    let err = host
        .commit_file(&commit_for("a.txt", "work", BlobSha::new("bogus"), "new\n"))
        .await
        .unwrap_err();

    assert!(matches!(err, StorageError::StaleBlob { .. }));
    assert_eq!(host.file("work", "a.txt").as_deref(), Some("old\n"));
    assert!(host.commits().is_empty());
}

#[tokio::test]
async fn test_commit_to_unknown_branch_is_not_found() {
    let host = MemoryRepoHost::new("bot").with_file("a.txt", "old\n");
    let base = host.file_sha("a.txt", "main").await.unwrap();
    let err = host
        .commit_file(&commit_for("a.txt", "nope", base, "new\n"))
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::NotFound { .. }));
}

#[tokio::test]
async fn test_injected_commit_failure_is_reported() {
    let host = MemoryRepoHost::new("bot")
        .with_file("a.txt", "old\n")
        .fail_commits_for("a.txt");
    let head = host.branch_head("main").await.unwrap();
    host.create_branch("work", &head).await.unwrap();
    let base = host.file_sha("a.txt", "main").await.unwrap();

    let err = host
        .commit_file(&commit_for("a.txt", "work", base, "new\n"))
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::Api { status: 409, .. }));
}
