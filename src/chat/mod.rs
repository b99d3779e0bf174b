// 💬 Chat - OpenAI function-calling on top of the dispatcher
//
// ChatModel is the seam to the LLM: OpenAiClient in production, scripted
// mocks in tests. ChatOrchestrator runs one turn: first completion with the
// function list, dispatch on a function call, second completion without.

pub mod openai;
pub mod orchestrator;
pub mod types;

pub use openai::OpenAiClient;
pub use orchestrator::ChatOrchestrator;
pub use types::{ChatMessage, ChatReply, ExecutedCall, FunctionCall, ModelReply, Role};

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChatError {
    #[error("OpenAI API key is not configured")]
    NotConfigured,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("OpenAI API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("failed to decode completion: {0}")]
    Decode(String),

    #[error("completion contained no choices")]
    EmptyResponse,
}

#[async_trait]
pub trait ChatModel: Send + Sync {
    /// One completion. `functions` is None when the model must answer in text.
    async fn complete(&self, messages: &[ChatMessage], functions: Option<&[Value]>) -> Result<ModelReply, ChatError>;
}
