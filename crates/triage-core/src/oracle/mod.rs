//! Language-model endpoints used by the pipeline.
//!
//! Two seams:
//! - [`StreamingOracle`]: the decision model, read as a stream of text fragments
//! - [`CompletionOracle`]: a plain chat-completion endpoint for file
//!   selection and file modification

pub mod chat;
pub mod stream;

use async_trait::async_trait;

use crate::conversation::ConversationMessage;
use crate::error::OracleError;

pub use chat::ChatCompletionClient;
pub use stream::{parse_fragment, InferenceStreamClient};

pub type OracleResult<T> = std::result::Result<T, OracleError>;

/// Streaming text completion. Implementations concatenate every fragment
/// in arrival order and return the merged reply.
#[async_trait]
pub trait StreamingOracle: Send + Sync {
    async fn stream_completion(&self, messages: &[ConversationMessage]) -> OracleResult<String>;
}

/// Single-shot chat completion returning the assistant message content.
#[async_trait]
pub trait CompletionOracle: Send + Sync {
    async fn complete(&self, messages: &[ConversationMessage]) -> OracleResult<String>;
}
