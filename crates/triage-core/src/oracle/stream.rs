use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{OracleResult, StreamingOracle};
use crate::config::DecisionConfig;
use crate::conversation::ConversationMessage;
use crate::error::OracleError;

// ── Wire types ────────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct InferenceRequest<'a> {
    messages: &'a [ConversationMessage],
    lora: Option<String>,
    model: &'a str,
    max_tokens: u32,
    stream: bool,
}

#[derive(Deserialize)]
struct Fragment {
    response: Option<String>,
}

// ── Fragment parsing ──────────────────────────────────────────────────────────

/// Text carried by one newline-delimited JSON fragment.
///
/// An SSE style `data:` prefix and the `[DONE]` sentinel are tolerated.
/// Returns `None` for blank, sentinel or malformed lines.
pub fn parse_fragment(line: &str) -> Option<String> {
    let line = line.trim();
    let line = line
        .strip_prefix("data:")
        .map(str::trim_start)
        .unwrap_or(line);
    if line.is_empty() || line == "[DONE]" {
        return None;
    }
    match serde_json::from_str::<Fragment>(line) {
        Ok(fragment) => fragment.response,
        Err(e) => {
            debug!(error = %e, "skipping malformed stream fragment");
            None
        }
    }
}

/// Byte buffer that turns streamed chunks into merged fragment text.
///
/// Lines are split on raw bytes so a multi-byte character cut across two
/// chunks is decoded whole.
#[derive(Debug, Default)]
struct FragmentBuffer {
    pending: Vec<u8>,
    merged: String,
}

impl FragmentBuffer {
    /// Append a chunk and consume every complete line in it.
    fn push(&mut self, chunk: &[u8]) {
        self.pending.extend_from_slice(chunk);
        while let Some(pos) = self.pending.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=pos).collect();
            if let Some(text) = parse_fragment(&String::from_utf8_lossy(&line)) {
                self.merged.push_str(&text);
            }
        }
    }

    /// Merged text, including an unterminated last line.
    fn finish(mut self) -> String {
        if let Some(text) = parse_fragment(&String::from_utf8_lossy(&self.pending)) {
            self.merged.push_str(&text);
        }
        self.merged
    }
}

// ── Client ────────────────────────────────────────────────────────────────────

/// Streaming inference endpoint speaking `{messages, model, max_tokens, stream}`.
pub struct InferenceStreamClient {
    http: reqwest::Client,
    config: DecisionConfig,
}

impl InferenceStreamClient {
    pub fn new(config: DecisionConfig) -> OracleResult<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(std::time::Duration::from_secs(10))
            .build()
            .map_err(|e| OracleError::Transport(e.to_string()))?;
        Ok(Self { http, config })
    }
}

#[async_trait]
impl StreamingOracle for InferenceStreamClient {
    async fn stream_completion(&self, messages: &[ConversationMessage]) -> OracleResult<String> {
        let body = InferenceRequest {
            messages,
            lora: None,
            model: &self.config.model,
            max_tokens: self.config.max_tokens,
            stream: true,
        };

        let mut resp = self
            .http
            .post(&self.config.url)
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .header(reqwest::header::CACHE_CONTROL, "no-cache")
            .json(&body)
            .send()
            .await
            .map_err(|e| OracleError::Transport(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(OracleError::Api { status, body });
        }

        // A body cut short mid-stream fails the attempt.
        let mut buffer = FragmentBuffer::default();
        while let Some(chunk) = resp.chunk().await.map_err(|e| {
            warn!(error = %e, "decision stream interrupted");
            OracleError::Transport(format!("decision stream interrupted: {e}"))
        })? {
            buffer.push(&chunk);
        }

        Ok(buffer.finish())
    }
}
