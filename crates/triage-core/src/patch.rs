//! Unified diff application through the system `patch` utility.
//!
//! Application is fail-open: any failure hands back the original text,
//! tagged so callers can tell it apart from a real change.

use std::path::Path;
use std::process::Stdio;

use tokio::process::Command;
use tracing::debug;

const PATCH_PROGRAM: &str = "patch";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatchOutcome {
    /// Diff applied cleanly
    Applied(String),
    /// Diff rejected; `content` is the untouched original
    FailedFallback { content: String, reason: String },
}

/// Apply `diff` to `original`. Never fails; see [`PatchOutcome`].
pub async fn apply_unified_diff(original: &str, diff: &str) -> PatchOutcome {
    match try_patch(original, diff).await {
        Ok(content) => PatchOutcome::Applied(content),
        Err(reason) => PatchOutcome::FailedFallback {
            content: original.to_string(),
            reason,
        },
    }
}

async fn try_patch(original: &str, diff: &str) -> Result<String, String> {
    let dir = tempfile::tempdir().map_err(|e| format!("create patch workdir: {e}"))?;
    let target = dir.path().join("original");
    let patch_file = dir.path().join("changes.diff");
    let rejects = dir.path().join("changes.rej");

    tokio::fs::write(&target, original)
        .await
        .map_err(|e| format!("write original: {e}"))?;
    let mut diff = diff.to_string();
    if !diff.ends_with('\n') {
        diff.push('\n');
    }
    tokio::fs::write(&patch_file, diff)
        .await
        .map_err(|e| format!("write diff: {e}"))?;

    run_patch(&target, &patch_file, &rejects).await?;

    tokio::fs::read_to_string(&target)
        .await
        .map_err(|e| format!("read patched file: {e}"))
}

async fn run_patch(target: &Path, patch_file: &Path, rejects: &Path) -> Result<(), String> {
    let output = Command::new(PATCH_PROGRAM)
        .arg("--batch")
        .arg("--forward")
        .arg("--silent")
        .arg("--reject-file")
        .arg(rejects)
        .arg(target)
        .arg(patch_file)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await
        .map_err(|e| format!("spawn {PATCH_PROGRAM}: {e}"))?;

    if output.status.success() {
        return Ok(());
    }
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    debug!(status = ?output.status.code(), "patch rejected the diff");
    Err(format!("{PATCH_PROGRAM} failed: {}{}", stdout.trim(), stderr.trim()))
}
