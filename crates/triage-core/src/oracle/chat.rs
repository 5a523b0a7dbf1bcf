use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{CompletionOracle, OracleResult};
use crate::config::CompletionConfig;
use crate::conversation::ConversationMessage;
use crate::error::OracleError;

// ── Wire types ────────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ConversationMessage],
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

// ── Client ────────────────────────────────────────────────────────────────────

/// OpenAI-compatible `/chat/completions` client.
pub struct ChatCompletionClient {
    http: reqwest::Client,
    api_key: String,
    config: CompletionConfig,
}

impl ChatCompletionClient {
    pub fn new(api_key: impl Into<String>, config: CompletionConfig) -> OracleResult<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(std::time::Duration::from_secs(10))
            .timeout(std::time::Duration::from_secs(300))
            .build()
            .map_err(|e| OracleError::Transport(e.to_string()))?;
        Ok(Self {
            http,
            api_key: api_key.into(),
            config,
        })
    }
}

#[async_trait]
impl CompletionOracle for ChatCompletionClient {
    async fn complete(&self, messages: &[ConversationMessage]) -> OracleResult<String> {
        let base_url = self.config.base_url.trim_end_matches('/');
        let body = ChatRequest {
            model: &self.config.model,
            messages,
        };

        let resp = self
            .http
            .post(format!("{base_url}/chat/completions"))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| OracleError::Transport(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(OracleError::Api { status, body });
        }

        let parsed: ChatResponse = resp
            .json()
            .await
            .map_err(|e| OracleError::Decode(e.to_string()))?;
        // An empty string is a reply; only a missing message is an error.
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or(OracleError::EmptyResponse)
    }
}
