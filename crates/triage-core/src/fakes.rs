//! Scripted oracle fakes (testing only)
//!
//! Each fake replays canned replies and records every request it received
//! so tests can assert on the exact conversation a stage sent.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::conversation::ConversationMessage;
use crate::error::OracleError;
use crate::oracle::{CompletionOracle, OracleResult, StreamingOracle};

// ---------------------------------------------------------------------------
// ScriptedStreamingOracle
// ---------------------------------------------------------------------------

/// Streams a fixed list of fragments (already decoded) or fails.
#[derive(Debug, Default)]
pub struct ScriptedStreamingOracle {
    fragments: Vec<String>,
    fail_with: Option<String>,
    delay: Option<std::time::Duration>,
    requests: Mutex<Vec<Vec<ConversationMessage>>>,
}

impl ScriptedStreamingOracle {
    /// Reply with the concatenation of `fragments`.
    pub fn replying<I, S>(fragments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fragments: fragments.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    /// Fail every call with a transport error.
    pub fn failing(message: &str) -> Self {
        Self {
            fail_with: Some(message.to_string()),
            ..Default::default()
        }
    }

    /// Sleep before answering, to exercise the caller's timeout.
    pub fn with_delay(mut self, delay: std::time::Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn requests(&self) -> Vec<Vec<ConversationMessage>> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl StreamingOracle for ScriptedStreamingOracle {
    async fn stream_completion(&self, messages: &[ConversationMessage]) -> OracleResult<String> {
        self.requests.lock().unwrap().push(messages.to_vec());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(message) = &self.fail_with {
            return Err(OracleError::Transport(message.clone()));
        }
        Ok(self.fragments.concat())
    }
}

// ---------------------------------------------------------------------------
// ScriptedCompletionOracle
// ---------------------------------------------------------------------------

/// Pops one scripted reply per call; an exhausted script is an error.
#[derive(Debug, Default)]
pub struct ScriptedCompletionOracle {
    replies: Mutex<VecDeque<OracleResult<String>>>,
    requests: Mutex<Vec<Vec<ConversationMessage>>>,
}

impl ScriptedCompletionOracle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn then_reply(self, reply: &str) -> Self {
        self.replies
            .lock()
            .unwrap()
            .push_back(Ok(reply.to_string()));
        self
    }

    pub fn then_fail(self, error: OracleError) -> Self {
        self.replies.lock().unwrap().push_back(Err(error));
        self
    }

    pub fn requests(&self) -> Vec<Vec<ConversationMessage>> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionOracle for ScriptedCompletionOracle {
    async fn complete(&self, messages: &[ConversationMessage]) -> OracleResult<String> {
        self.requests.lock().unwrap().push(messages.to_vec());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(OracleError::EmptyResponse))
    }
}
