mod huggingface;
mod openai;

pub use huggingface::HuggingFace;
pub use openai::{normalize_tool_calls, OpenAiCompatible};

use crate::config::{LlmConfig, ProviderKind};
use crate::error::CompletionError;
use crate::message::{Completion, Message, ToolSpec};
use async_trait::async_trait;
use futures::stream::BoxStream;
use std::sync::Arc;

/// Lazily evaluated text fragments of one model reply. Nothing is sent
/// until the stream is first polled; dropping it closes the connection.
pub type TokenStream = BoxStream<'static, Result<String, CompletionError>>;

/// A language-model backend.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    async fn send(
        &self,
        messages: &[Message],
        tools: &[ToolSpec],
    ) -> Result<Completion, CompletionError>;

    fn stream(&self, messages: &[Message], tools: &[ToolSpec]) -> TokenStream;
}

/// Build the adapter selected by `llm.provider`.
pub fn from_config(config: &LlmConfig) -> Result<Arc<dyn CompletionProvider>, CompletionError> {
    let provider: Arc<dyn CompletionProvider> = match config.provider {
        ProviderKind::OpenAi | ProviderKind::Groq => {
            Arc::new(OpenAiCompatible::new(config.provider, config)?)
        }
        ProviderKind::HuggingFace => Arc::new(HuggingFace::new(config)?),
    };
    Ok(provider)
}
