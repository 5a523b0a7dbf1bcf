//! Idempotency check run before any comment is posted or any decision
//! conversation is built.

use triage_store::IssueComment;

/// Whether the bot has already acted on this thread.
///
/// Scans from newest to oldest and compares only the most recent comment
/// authored by `bot_login`: its trimmed body must equal one of `templates`.
/// Human replies after that comment do not matter. No bot comment at all
/// means no duplicate.
pub fn has_duplicate_comment(comments: &[IssueComment], bot_login: &str, templates: &[&str]) -> bool {
    comments
        .iter()
        .rev()
        .find(|c| c.author == bot_login)
        .map(|c| {
            let body = c.body.trim();
            templates.iter().any(|t| t.trim() == body)
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::CANNED_MESSAGES;

    fn comment(author: &str, body: &str) -> IssueComment {
        IssueComment {
            id: 0,
            author: author.to_string(),
            body: body.to_string(),
            created_at: None,
        }
    }

    #[test]
    fn test_no_bot_comment_is_not_a_duplicate() {
        let comments = vec![comment("alice", "Would you like me to help with this?")];
        assert!(!has_duplicate_comment(&comments, "bot", &CANNED_MESSAGES));
        assert!(!has_duplicate_comment(&[], "bot", &CANNED_MESSAGES));
    }

    #[test]
    fn test_latest_bot_offer_is_a_duplicate_even_after_human_replies() {
        let comments = vec![
            comment("bot", "Can I assist you with this issue?  "),
            comment("alice", "yes"),
            comment("bob", "+1"),
        ];
        assert!(has_duplicate_comment(&comments, "bot", &CANNED_MESSAGES));
    }

    #[test]
    fn test_only_the_most_recent_bot_comment_counts() {
        let comments = vec![
            comment("bot", "Would you like me to help with this?"),
            comment("alice", "sure"),
            comment("bot", "I opened a branch with the changes."),
        ];
        assert!(!has_duplicate_comment(&comments, "bot", &CANNED_MESSAGES));
    }

    #[test]
    fn test_other_authors_posting_templates_are_ignored() {
        let comments = vec![
            comment("bot", "Something custom"),
            comment("mallory", "Would you like me to help with this?"),
        ];
        assert!(!has_duplicate_comment(&comments, "bot", &CANNED_MESSAGES));
    }
}
