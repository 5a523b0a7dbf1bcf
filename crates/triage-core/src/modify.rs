//! Per-file modification through the completion model.
//!
//! Small files are rewritten whole, large ones are changed through a
//! unified diff. The choice is made from the numbered content length,
//! never from what the model decides to send back.

use serde::{Deserialize, Serialize};

use crate::conversation::ConversationMessage;
use crate::error::{OracleError, Result};
use crate::oracle::CompletionOracle;
use crate::selector::FileCandidate;

/// Spacing between the line number and the line text.
const NUMBER_GAP: &str = "    ";

const FULL_REWRITE_INSTRUCTIONS: &str = "Modify this file as necessary. In your final response, \
give the ENTIRE file incorporating your changes. Please do not modify other aspects of the code. \
Your final response should start with a free form flowing text, explaining your changes, \
followed by a code block with the modified code.";

const UNIFIED_DIFF_INSTRUCTIONS: &str = "Modify this file as necessary. In your final response, \
give a udiff file incorporating your changes. Please create syntactically correct udiff files. \
Your response should start with a free form flowing text, explaining your changes, followed by \
a code block with the udiff.";

/// Output contract requested from the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    FullRewrite,
    UnifiedDiff,
}

impl Mode {
    /// Full rewrite strictly below `threshold` characters, diff otherwise.
    pub fn for_numbered(numbered: &str, threshold: usize) -> Self {
        if numbered.chars().count() < threshold {
            Mode::FullRewrite
        } else {
            Mode::UnifiedDiff
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Mode::FullRewrite => "full_rewrite",
            Mode::UnifiedDiff => "unified_diff",
        }
    }
}

/// What the model produced for one file, tagged by the requested mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModificationOutcome {
    FullContent(String),
    UnifiedDiff(String),
}

impl ModificationOutcome {
    pub fn mode(&self) -> Mode {
        match self {
            ModificationOutcome::FullContent(_) => Mode::FullRewrite,
            ModificationOutcome::UnifiedDiff(_) => Mode::UnifiedDiff,
        }
    }
}

/// Modification outcome plus the fence-stripped reply kept for audit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileModification {
    pub path: String,
    pub outcome: ModificationOutcome,
    pub description: String,
}

/// Prefix each line with its 1-based index.
pub fn number_lines(content: &str) -> String {
    content
        .split('\n')
        .enumerate()
        .map(|(i, line)| format!("{}{NUMBER_GAP}{line}", i + 1))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Drop every line that is exactly a bare code fence.
pub fn strip_code_fences(text: &str) -> String {
    text.split('\n')
        .filter(|line| line.trim() != "```")
        .collect::<Vec<_>>()
        .join("\n")
}

/// Prior turns restated as user turns, followed by the numbered file and
/// the instruction for `mode`.
pub fn build_file_messages(
    conversation: &[ConversationMessage],
    numbered: &str,
    mode: Mode,
) -> Vec<ConversationMessage> {
    let instructions = match mode {
        Mode::FullRewrite => FULL_REWRITE_INSTRUCTIONS,
        Mode::UnifiedDiff => UNIFIED_DIFF_INSTRUCTIONS,
    };
    let mut messages: Vec<ConversationMessage> = conversation
        .iter()
        .map(|m| ConversationMessage::user(m.content.clone()))
        .collect();
    messages.push(ConversationMessage::user(format!(
        "{numbered}\n{instructions}"
    )));
    messages
}

/// Ask the completion model to change one file.
pub async fn modify_file(
    oracle: &dyn CompletionOracle,
    conversation: &[ConversationMessage],
    candidate: &FileCandidate,
    threshold: usize,
) -> Result<FileModification> {
    let numbered = number_lines(&candidate.content);
    let mode = Mode::for_numbered(&numbered, threshold);
    let messages = build_file_messages(conversation, &numbered, mode);

    let reply = oracle.complete(&messages).await?;
    let description = strip_code_fences(reply.trim());
    if description.is_empty() {
        return Err(OracleError::EmptyResponse.into());
    }
    let outcome = match mode {
        Mode::FullRewrite => ModificationOutcome::FullContent(description.clone()),
        Mode::UnifiedDiff => ModificationOutcome::UnifiedDiff(description.clone()),
    };

    Ok(FileModification {
        path: candidate.path.clone(),
        outcome,
        description,
    })
}
