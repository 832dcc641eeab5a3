// Nebius AI Studio serves an OpenAI-compatible endpoint.

use crate::llm::openai::OpenAIAdapter;
use crate::llm::provider::LLMAdapter;
use crate::types::{AppResult, LLMRequest, LLMResponse};
use async_trait::async_trait;
use std::time::Duration;

pub const NEBIUS_API_BASE: &str = "https://api.studio.nebius.com/v1";

pub struct NebiusAdapter {
    inner: OpenAIAdapter,
}

impl NebiusAdapter {
    pub fn new(api_key: &str) -> Self {
        Self {
            inner: OpenAIAdapter::new_with_api_base(api_key, NEBIUS_API_BASE),
        }
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        Self {
            inner: self.inner.with_timeout(timeout),
        }
    }
}

#[async_trait]
impl LLMAdapter for NebiusAdapter {
    async fn create_chat_completion(&self, request: &LLMRequest) -> AppResult<LLMResponse> {
        self.inner.create_chat_completion(request).await
    }
}
