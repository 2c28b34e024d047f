//! OpenAI-compatible chat-completion client
//!
//! Works against OpenAI itself and against local servers that speak the same
//! protocol (llama.cpp, vLLM, Ollama's `/v1` endpoint).

use async_trait::async_trait;
use reqwest::{Client, header};
use std::time::Duration;
use tracing::debug;

use super::{CompletionProvider, ProviderError};
use crate::config::CompletionConfig;
use crate::core::types::{ChatRequest, ChatResponse};

const PROVIDER: &str = "openai";

/// Client for any `/chat/completions` endpoint
#[derive(Debug, Clone)]
pub struct OpenAICompatibleProvider {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl OpenAICompatibleProvider {
    /// Create a provider from configuration
    pub fn new(config: &CompletionConfig) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .user_agent(concat!("enrichment-rs/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ProviderError::configuration(PROVIDER, e.to_string()))?;

        Ok(Self::with_client(
            client,
            config.base_url.clone(),
            config.api_key.clone(),
        ))
    }

    /// Create a provider around an existing HTTP client
    pub fn with_client(client: Client, base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            api_key: api_key.filter(|key| !key.is_empty()),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl CompletionProvider for OpenAICompatibleProvider {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse, ProviderError> {
        let url = self.endpoint();
        debug!(url = %url, model = %request.model, "Sending chat completion request");

        let mut builder = self
            .client
            .post(&url)
            .header(header::CONTENT_TYPE, "application/json")
            .json(request);

        if let Some(api_key) = &self.api_key {
            builder = builder.bearer_auth(api_key);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| ProviderError::from_reqwest(PROVIDER, e))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| ProviderError::from_reqwest(PROVIDER, e))?;

        if !status.is_success() {
            let message = String::from_utf8_lossy(&body);
            return Err(ProviderError::from_status(
                PROVIDER,
                status.as_u16(),
                &crate::utils::truncate_string(&message, 512),
            ));
        }

        serde_json::from_slice::<ChatResponse>(&body)
            .map_err(|e| ProviderError::response_parsing(PROVIDER, e.to_string()))
    }
}
