use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::config::LLMConfig;
use crate::llm::{groq::GroqAdapter, nebius::NebiusAdapter, openai::OpenAIAdapter};
use crate::types::{AppResult, LLMMessage, LLMProvider, LLMRequest, LLMResponse, ResponseFormat};

#[async_trait]
pub trait LLMAdapter: Send + Sync {
    async fn create_chat_completion(&self, request: &LLMRequest) -> AppResult<LLMResponse>;
}

/// Text-generation capability used by the research workflow.
///
/// Wraps a provider adapter together with the model settings so callers only
/// deal in system/user prompt pairs. Two modes are offered: free text
/// ([`LLM::generate`]) and JSON-constrained output ([`LLM::generate_json`]).
#[derive(Clone)]
pub struct LLM {
    adapter: Arc<dyn LLMAdapter>,
    provider_name: String,
    model: String,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
}

impl LLM {
    pub fn new(config: &LLMConfig) -> Self {
        let timeout = Duration::from_secs(config.timeout_secs.max(1));

        let adapter: Arc<dyn LLMAdapter> = match (&config.base_url, config.provider) {
            (Some(base), _) => Arc::new(
                OpenAIAdapter::new_with_api_base(&config.api_key, base).with_timeout(timeout),
            ),
            (None, LLMProvider::Groq) => {
                Arc::new(GroqAdapter::new(&config.api_key).with_timeout(timeout))
            }
            (None, LLMProvider::Nebius) => {
                Arc::new(NebiusAdapter::new(&config.api_key).with_timeout(timeout))
            }
            (None, LLMProvider::OpenAI) => {
                Arc::new(OpenAIAdapter::new(&config.api_key).with_timeout(timeout))
            }
        };

        Self {
            adapter,
            provider_name: config.provider.to_string(),
            model: config.model.clone(),
            temperature: Some(config.temperature),
            max_tokens: config.max_tokens,
        }
    }

    /// Build around an existing adapter, e.g. a scripted one in tests.
    pub fn with_adapter(adapter: Arc<dyn LLMAdapter>, model: impl Into<String>) -> Self {
        Self {
            adapter,
            provider_name: "custom".to_string(),
            model: model.into(),
            temperature: Some(0.0),
            max_tokens: None,
        }
    }

    pub fn provider_name(&self) -> &str {
        &self.provider_name
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub async fn create_chat_completion(&self, request: &LLMRequest) -> AppResult<LLMResponse> {
        self.adapter.create_chat_completion(request).await
    }

    /// Free-form text generation.
    pub async fn generate(&self, system_prompt: &str, user_prompt: &str) -> AppResult<String> {
        self.complete(system_prompt, user_prompt, ResponseFormat::Text).await
    }

    /// Generation constrained to a single JSON object. The returned text is not
    /// validated here; callers parse it.
    pub async fn generate_json(&self, system_prompt: &str, user_prompt: &str) -> AppResult<String> {
        self.complete(system_prompt, user_prompt, ResponseFormat::JsonObject).await
    }

    async fn complete(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        response_format: ResponseFormat,
    ) -> AppResult<String> {
        let request = LLMRequest {
            model: self.model.clone(),
            messages: vec![LLMMessage::system(system_prompt), LLMMessage::user(user_prompt)],
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            response_format,
        };

        let response = self.create_chat_completion(&request).await?;
        debug!(
            provider = %self.provider_name,
            format = ?response_format,
            content_len = response.content.len(),
            "Generation complete"
        );
        Ok(response.content)
    }
}
