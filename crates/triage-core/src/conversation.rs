//! Conversation assembly for the decision model.
//!
//! The dialogue is rebuilt from the issue thread on every run:
//! issue body, a reconstructed offer, then every human comment. Long
//! threads keep only their head and tail before the fixed instruction
//! turn is appended.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use triage_store::{Issue, IssueComment};

/// Offer templates. Used both to greet a new issue and to recognise the
/// bot's own earlier activity.
pub const CANNED_MESSAGES: [&str; 4] = [
    "Would you like me to help with this?",
    "Can I assist you with this issue?",
    "I'm here to help with this issue. Let me know if you need any assistance.",
    "Let me know if you want me to assist you with this issue.",
];

/// Final user turn asking for a delimited thought and a yes/no verdict.
pub const DECISION_INSTRUCTIONS: &str = "Instructions:\n\
Read the conversation and determine whether the user would like you to help. \
Start with <think> include a short thinking about the conversation, end with </think> \
and then say either one of \"Yes\" or \"No\".\n\
Please do not have a very long thinking part, but keep it short.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationMessage {
    pub role: Role,
    pub content: String,
}

impl ConversationMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Whether `body`, trimmed, is exactly one of the offer templates.
pub fn is_canned(body: &str) -> bool {
    let body = body.trim();
    CANNED_MESSAGES.iter().any(|t| t.trim() == body)
}

/// Draw one offer template uniformly at random.
pub fn pick_canned<R: Rng + ?Sized>(rng: &mut R) -> &'static str {
    CANNED_MESSAGES
        .choose(rng)
        .copied()
        .unwrap_or(CANNED_MESSAGES[0])
}

/// Keep the first and last `keep` items when there are more than
/// `2 * keep`; otherwise return the input untouched.
pub fn trim_conversation<T>(messages: Vec<T>, keep: usize) -> Vec<T> {
    let len = messages.len();
    if len <= keep * 2 {
        return messages;
    }
    let mut iter = messages.into_iter();
    let mut out = Vec::with_capacity(keep * 2);
    out.extend(iter.by_ref().take(keep));
    out.extend(iter.skip(len - keep * 2));
    out
}

/// Build the ordered dialogue fed to the decision model.
///
/// The assistant turn is a fresh random template, not the comment that was
/// actually posted. Comments that are themselves templates are dropped so
/// the bot's own offers never re-enter the context.
pub fn build_conversation<R: Rng + ?Sized>(
    issue: &Issue,
    comments: &[IssueComment],
    keep: usize,
    rng: &mut R,
) -> Vec<ConversationMessage> {
    let mut conversation = Vec::with_capacity(comments.len() + 3);
    conversation.push(ConversationMessage::user(
        issue.body.clone().unwrap_or_default(),
    ));
    conversation.push(ConversationMessage::assistant(pick_canned(rng)));
    conversation.extend(
        comments
            .iter()
            .filter(|c| !is_canned(&c.body))
            .map(|c| ConversationMessage::user(c.body.clone())),
    );

    let mut conversation = trim_conversation(conversation, keep);
    conversation.push(ConversationMessage::user(DECISION_INSTRUCTIONS));
    conversation
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn comment(id: u64, author: &str, body: &str) -> IssueComment {
        IssueComment {
            id,
            author: author.to_string(),
            body: body.to_string(),
            created_at: None,
        }
    }

    #[test]
    fn test_trim_keeps_short_sequences_unchanged() {
        for n in 0..=10 {
            let input: Vec<usize> = (0..n).collect();
            assert_eq!(trim_conversation(input.clone(), 5), input);
        }
    }

    #[test]
    fn test_trim_keeps_first_five_and_last_five() {
        for n in 11..40 {
            let input: Vec<usize> = (0..n).collect();
            let mut expected: Vec<usize> = (0..5).collect();
            expected.extend(n - 5..n);
            assert_eq!(trim_conversation(input, 5), expected, "n = {n}");
        }
    }

    #[test]
    fn test_is_canned_matches_trimmed_templates_only() {
        assert!(is_canned("  Can I assist you with this issue?\n"));
        assert!(!is_canned("Can I assist you with this issue? Yes please"));
        assert!(!is_canned("yes"));
    }

    #[test]
    fn test_conversation_starts_with_issue_then_offer() {
        let issue = Issue {
            number: 1,
            body: Some("The parser panics on empty input".to_string()),
        };
        let mut rng = StdRng::seed_from_u64(7);
        let conv = build_conversation(&issue, &[], 5, &mut rng);

        assert_eq!(conv.len(), 3);
        assert_eq!(conv[0], ConversationMessage::user("The parser panics on empty input"));
        assert_eq!(conv[1].role, Role::Assistant);
        assert!(is_canned(&conv[1].content));
        assert_eq!(conv[2], ConversationMessage::user(DECISION_INSTRUCTIONS));
    }

    #[test]
    fn test_missing_issue_body_becomes_empty_turn() {
        let issue = Issue {
            number: 1,
            body: None,
        };
        let mut rng = StdRng::seed_from_u64(1);
        let conv = build_conversation(&issue, &[], 5, &mut rng);
        assert_eq!(conv[0].content, "");
    }

    #[test]
    fn test_canned_comments_are_excluded_and_order_kept() {
        let issue = Issue {
            number: 1,
            body: Some("bug".to_string()),
        };
        let comments = vec![
            comment(1, "bot", "Would you like me to help with this?"),
            comment(2, "alice", "yes please"),
            comment(3, "bob", "me too"),
        ];
        let mut rng = StdRng::seed_from_u64(3);
        let conv = build_conversation(&issue, &comments, 5, &mut rng);

        let users: Vec<&str> = conv[2..conv.len() - 1]
            .iter()
            .map(|m| m.content.as_str())
            .collect();
        assert_eq!(users, vec!["yes please", "me too"]);
    }

    #[test]
    fn test_long_threads_are_trimmed_before_instructions() {
        let issue = Issue {
            number: 1,
            body: Some("bug".to_string()),
        };
        let comments: Vec<IssueComment> = (0..20)
            .map(|i| comment(i, "alice", &format!("comment {i}")))
            .collect();
        let mut rng = StdRng::seed_from_u64(5);
        let conv = build_conversation(&issue, &comments, 5, &mut rng);

        // 22 turns trimmed to 10, plus instructions
        assert_eq!(conv.len(), 11);
        assert_eq!(conv[0].content, "bug");
        assert_eq!(conv[2].content, "comment 0");
        assert_eq!(conv[4].content, "comment 2");
        assert_eq!(conv[5].content, "comment 15");
        assert_eq!(conv[9].content, "comment 19");
        assert_eq!(conv[10].content, DECISION_INSTRUCTIONS);
    }
}
