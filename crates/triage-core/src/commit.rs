//! Branch creation and per-file commits for one triage run.

use rand::Rng;
use tracing::info;

use triage_store::{BranchRef, CommitReceipt, CommitRecord, Identity, RepoHost};

use crate::error::Result;
use crate::obs;

/// `{prefix}-{unix_ts}-{4 digit random}`. The random suffix keeps
/// concurrent runs in the same second apart.
pub fn branch_name<R: Rng + ?Sized>(prefix: &str, unix_ts: i64, rng: &mut R) -> String {
    let suffix: u16 = rng.gen_range(1000..=9999);
    format!("{prefix}-{unix_ts}-{suffix}")
}

pub fn commit_message(path: &str) -> String {
    format!("update {path}")
}

/// Cut a new branch from the head of the default branch.
///
/// Returns the default branch name alongside the new ref; file blob
/// identities are later read from the default branch.
pub async fn create_run_branch(host: &dyn RepoHost, name: &str) -> Result<(String, BranchRef)> {
    let default_branch = host.default_branch().await?;
    let head = host.branch_head(&default_branch).await?;
    let branch = host.create_branch(name, &head).await?;
    obs::emit_branch_created(&branch.name, &branch.base_sha);
    Ok((default_branch, branch))
}

/// Commit one file: read its blob identity on `base_branch`, then write
/// `content` on `target_branch` as `update <path>`.
pub async fn commit_one(
    host: &dyn RepoHost,
    identity: &Identity,
    base_branch: &str,
    target_branch: &str,
    path: &str,
    content: &str,
) -> Result<CommitReceipt> {
    let base_file_sha = host.file_sha(path, base_branch).await?;
    let record = CommitRecord {
        path: path.to_string(),
        message: commit_message(path),
        new_content: content.to_string(),
        base_file_sha,
        branch: target_branch.to_string(),
        author: identity.clone(),
        committer: identity.clone(),
    };
    let receipt = host.commit_file(&record).await?;
    info!(path = %path, commit = %receipt.commit_sha, "committed file");
    Ok(receipt)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use triage_store::fakes::MemoryRepoHost;

    #[test]
    fn test_branch_name_has_prefix_timestamp_and_suffix() {
        let mut rng = StdRng::seed_from_u64(11);
        let name = branch_name("llm-updates", 1_700_000_000, &mut rng);
        let parts: Vec<&str> = name.rsplitn(2, '-').collect();
        let suffix: u16 = parts[0].parse().unwrap();
        assert!((1000..=9999).contains(&suffix));
        assert_eq!(parts[1], "llm-updates-1700000000");
    }

    #[test]
    fn test_commit_message_names_the_path() {
        assert_eq!(commit_message("src/lib.rs"), "update src/lib.rs");
    }

    #[tokio::test]
    async fn test_run_branch_is_cut_from_default_head() {
        let host = MemoryRepoHost::new("bot").with_file("a.txt", "a");
        let (base, branch) = create_run_branch(&host, "llm-updates-1-1234").await.unwrap();
        assert_eq!(base, "main");
        assert_eq!(branch.name, "llm-updates-1-1234");
        assert_eq!(branch.base_sha, host.branch_head("main").await.unwrap());
        assert_eq!(host.file("llm-updates-1-1234", "a.txt").as_deref(), Some("a"));
    }

    #[tokio::test]
    async fn test_commit_reads_sha_from_default_branch_and_writes_run_branch() {
        let host = MemoryRepoHost::new("bot").with_file("c.txt", "c");
        let (base, branch) = create_run_branch(&host, "run").await.unwrap();
        commit_one(&host, &Identity::noreply("bot"), &base, &branch.name, "c.txt", "new c")
            .await
            .unwrap();

        let commits = host.commits();
        assert_eq!(commits.len(), 1);
        assert_eq!(commits[0].message, "update c.txt");
        assert_eq!(commits[0].branch, "run");
        assert_eq!(commits[0].author.email, "bot@users.noreply.github.com");
        assert_eq!(host.file("run", "c.txt").as_deref(), Some("new c"));
        assert_eq!(host.file("main", "c.txt").as_deref(), Some("c"));
    }

    #[tokio::test]
    async fn test_commit_of_unknown_file_fails() {
        let host = MemoryRepoHost::new("bot");
        let (base, branch) = create_run_branch(&host, "run").await.unwrap();
        let err = commit_one(&host, &Identity::noreply("bot"), &base, &branch.name, "nope.txt", "x")
            .await
            .unwrap_err();
        assert!(matches!(err, crate::TriageError::Storage(_)));
        assert!(host.commits().is_empty());
    }
}
