use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::config::LLMConfig;
use crate::types::{AppError, AppResult, LLMMessage, LLMProvider, LLMRequest, LLMResponse};

#[async_trait]
pub trait LLMAdapter: Send + Sync {
    async fn create_chat_completion(&self, request: &LLMRequest) -> AppResult<LLMResponse>;

    /// Whether the backend is reachable and serves the given model.
    async fn is_available(&self, _model: &str) -> bool {
        false
    }
}

/// Text completion capability used by the research pipeline.
///
/// Wraps one adapter plus the model name so callers only deal with
/// `complete(prompt, temperature, max_tokens)`.
#[derive(Clone)]
pub struct LLM {
    adapter: Arc<dyn LLMAdapter>,
    provider_name: String,
    model: String,
}

impl LLM {
    pub fn new(config: &LLMConfig) -> AppResult<Self> {
        let provider = LLMProvider::from_id(&config.provider).ok_or_else(|| {
            AppError::Configuration(format!("Unsupported LLM provider: {}", config.provider))
        })?;

        let adapter: Arc<dyn LLMAdapter> = match provider {
            LLMProvider::Ollama => Arc::new(crate::llm::ollama::OllamaAdapter::new(&config.ollama_base_url)),
            LLMProvider::OpenAI | LLMProvider::OpenRouter | LLMProvider::Groq => {
                if config.openai_api_key.is_empty() {
                    return Err(AppError::Configuration(format!(
                        "OPENAI_API_KEY must be set for provider {}",
                        provider
                    )));
                }
                let base = config
                    .openai_base_url
                    .clone()
                    .unwrap_or_else(|| crate::llm::openai::default_api_base(provider).to_string());
                Arc::new(crate::llm::openai::OpenAIAdapter::new_with_api_base(
                    &config.openai_api_key,
                    &base,
                ))
            }
        };

        Ok(Self {
            adapter,
            provider_name: provider.to_string(),
            model: config.model.clone(),
        })
    }

    pub fn from_adapter(adapter: Arc<dyn LLMAdapter>, model: impl Into<String>) -> Self {
        Self {
            adapter,
            provider_name: "custom".to_string(),
            model: model.into(),
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

    /// Single-prompt completion; returns the trimmed response text.
    pub async fn complete(&self, prompt: &str, temperature: f32, max_tokens: u32) -> AppResult<String> {
        let request = LLMRequest {
            model: self.model.clone(),
            messages: vec![LLMMessage::user(prompt)],
            max_tokens: Some(max_tokens),
            temperature: Some(temperature),
        };

        let response = self.adapter.create_chat_completion(&request).await?;
        debug!(
            provider = %self.provider_name,
            completion_tokens = response.usage.completion_tokens,
            "Completion received"
        );
        Ok(response.content.trim().to_string())
    }

    pub async fn check_availability(&self) -> bool {
        self.adapter.is_available(&self.model).await
    }
}
