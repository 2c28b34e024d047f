//! Completion providers
//!
//! A provider performs exactly one chat-completion round trip per call and
//! never retries; retry policy lives in the request executor.

mod error;
pub mod openai;

pub use error::ProviderError;
pub use openai::OpenAICompatibleProvider;

use crate::core::types::{ChatRequest, ChatResponse};
use async_trait::async_trait;

/// Chat-completion backend
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Short provider name for logs and errors
    fn name(&self) -> &'static str;

    /// Send one request and return the raw response
    async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse, ProviderError>;
}
