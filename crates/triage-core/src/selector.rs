//! File selection: render the checkout as a tree, ask the completion
//! model which files matter for the issue, load the chosen files.

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::path::{Component, Path};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

use crate::conversation::ConversationMessage;
use crate::error::Result;
use crate::oracle::CompletionOracle;

/// A selected file and its content at selection time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileCandidate {
    pub path: String,
    pub content: String,
}

// ---------------------------------------------------------------------------
// Tree
// ---------------------------------------------------------------------------

/// Directory tree with children ordered by name.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FileTree {
    children: BTreeMap<String, FileTree>,
}

impl FileTree {
    pub fn from_paths<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut tree = FileTree::default();
        for path in paths {
            tree.insert(path.as_ref());
        }
        tree
    }

    /// Insert a `/`-separated relative path, creating parents as needed.
    pub fn insert(&mut self, path: &str) {
        let mut node = self;
        for part in path.split('/').filter(|p| !p.is_empty()) {
            node = node.children.entry(part.to_string()).or_default();
        }
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    fn render_into(&self, prefix: &str, lines: &mut Vec<String>) {
        let last = self.children.len().saturating_sub(1);
        for (i, (name, child)) in self.children.iter().enumerate() {
            let is_last = i == last;
            let connector = if is_last { "└── " } else { "├── " };
            lines.push(format!("{prefix}{connector}{name}"));
            if !child.is_empty() {
                let continuation = if is_last { "    " } else { "│   " };
                child.render_into(&format!("{prefix}{continuation}"), lines);
            }
        }
    }
}

impl fmt::Display for FileTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut lines = Vec::new();
        self.render_into("", &mut lines);
        f.write_str(&lines.join("\n"))
    }
}

// ---------------------------------------------------------------------------
// Checkout walk
// ---------------------------------------------------------------------------

fn is_hidden(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry
            .file_name()
            .to_str()
            .map(|name| name.starts_with('.'))
            .unwrap_or(false)
}

/// Relative `/`-separated paths of every file under `root`, sorted.
///
/// Skips anything with a path component starting with `.` and files whose
/// extension equals `excluded_extension`. Entries that cannot be read are
/// logged and left out.
pub fn collect_repo_files(root: &Path, excluded_extension: &str) -> Result<Vec<String>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !is_hidden(e))
    {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(error = %e, "skipping unreadable checkout entry");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let excluded = entry
            .path()
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext == excluded_extension)
            .unwrap_or(false);
        if excluded {
            continue;
        }
        if let Ok(relative) = entry.path().strip_prefix(root) {
            let value = relative.to_string_lossy().replace('\\', "/");
            if !value.is_empty() {
                files.push(value);
            }
        }
    }
    Ok(files)
}

/// Tree of the checkout as sent to the selection model.
pub fn build_repo_tree(root: &Path, excluded_extension: &str) -> Result<FileTree> {
    Ok(FileTree::from_paths(collect_repo_files(
        root,
        excluded_extension,
    )?))
}

// ---------------------------------------------------------------------------
// Selection
// ---------------------------------------------------------------------------

pub fn selection_prompt(tree: &FileTree, issue_body: &str) -> String {
    format!(
        "{tree}\nRead this issue then determine which are the necessary files for the task, \
         based on the file tree. Reply with only a JSON array of file paths relative to the \
         repository root:\n{issue_body}"
    )
}

/// Parse the model reply as a strict JSON array of paths.
///
/// Anything else yields an empty selection. Duplicates are dropped,
/// first occurrence wins.
pub fn parse_selection(reply: &str) -> Vec<String> {
    match serde_json::from_str::<Vec<String>>(reply.trim()) {
        Ok(paths) => {
            let mut seen = HashSet::new();
            paths
                .into_iter()
                .filter(|p| seen.insert(p.clone()))
                .collect()
        }
        Err(e) => {
            warn!(error = %e, "file selection reply is not a JSON array, selecting nothing");
            Vec::new()
        }
    }
}

/// Ask the completion model which files the issue needs.
pub async fn select_files(
    oracle: &dyn CompletionOracle,
    tree: &FileTree,
    issue_body: &str,
) -> Result<Vec<String>> {
    let prompt = selection_prompt(tree, issue_body);
    let reply = oracle
        .complete(&[ConversationMessage::user(prompt)])
        .await?;
    debug!(reply = %reply.trim(), "file selection reply");
    Ok(parse_selection(&reply))
}

/// A relative path that cannot leave the checkout.
fn is_contained(path: &str) -> bool {
    let path = Path::new(path);
    !path.as_os_str().is_empty()
        && path
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}

/// Read every selected path under `root`.
///
/// Unreadable or escaping paths are logged and returned separately; they
/// never stop the others from loading.
pub async fn load_candidates(
    root: &Path,
    paths: &[String],
) -> (Vec<FileCandidate>, Vec<(String, String)>) {
    let mut candidates = Vec::new();
    let mut failures = Vec::new();
    for path in paths {
        if !is_contained(path) {
            warn!(path = %path, "selected path escapes the checkout, skipping");
            failures.push((path.clone(), "path escapes the checkout".to_string()));
            continue;
        }
        match tokio::fs::read_to_string(root.join(path)).await {
            Ok(content) => candidates.push(FileCandidate {
                path: path.clone(),
                content,
            }),
            Err(e) => {
                warn!(path = %path, error = %e, "error reading selected file");
                failures.push((path.clone(), e.to_string()));
            }
        }
    }
    (candidates, failures)
}
