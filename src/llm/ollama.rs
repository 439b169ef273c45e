// Ollama adapter implementation
// Talks to a local Ollama server through its native chat endpoint.
// API Reference: https://github.com/ollama/ollama/blob/main/docs/api.md

use crate::llm::provider::LLMAdapter;
use crate::types::{AppError, AppResult, LLMRequest, LLMResponse, TokenUsage};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::warn;

pub const OLLAMA_DEFAULT_BASE: &str = "http://localhost:11434";

pub struct OllamaAdapter {
    client: Client,
    base_url: String,
}

#[derive(Serialize)]
struct OllamaChatRequest<'a> {
    model: &'a str,
    messages: Vec<OllamaMessage<'a>>,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Serialize)]
struct OllamaMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct OllamaOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
}

#[derive(Deserialize)]
struct OllamaChatResponse {
    message: OllamaResponseMessage,
    #[serde(default)]
    done_reason: Option<String>,
    #[serde(default)]
    prompt_eval_count: Option<u32>,
    #[serde(default)]
    eval_count: Option<u32>,
}

#[derive(Deserialize)]
struct OllamaResponseMessage {
    #[serde(default)]
    content: String,
}

#[derive(Deserialize)]
struct OllamaTags {
    #[serde(default)]
    models: Vec<OllamaModel>,
}

#[derive(Deserialize)]
struct OllamaModel {
    name: String,
}

impl OllamaAdapter {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

impl Default for OllamaAdapter {
    fn default() -> Self {
        Self::new(OLLAMA_DEFAULT_BASE)
    }
}

#[async_trait]
impl LLMAdapter for OllamaAdapter {
    async fn create_chat_completion(&self, request: &LLMRequest) -> AppResult<LLMResponse> {
        let url = format!("{}/api/chat", self.base_url);

        let messages = request
            .messages
            .iter()
            .map(|m| OllamaMessage { role: &m.role, content: &m.content })
            .collect();

        let body = OllamaChatRequest {
            model: &request.model,
            messages,
            stream: false,
            options: OllamaOptions {
                temperature: request.temperature,
                num_predict: request.max_tokens,
            },
        };

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::LLMApi(format!("Ollama request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(AppError::LLMApi(format!("Ollama API error ({}): {}", status, error_text)));
        }

        let parsed: OllamaChatResponse = response
            .json()
            .await
            .map_err(|e| AppError::LLMApi(format!("Failed to parse Ollama response: {}", e)))?;

        let prompt_tokens = parsed.prompt_eval_count.unwrap_or(0);
        let completion_tokens = parsed.eval_count.unwrap_or(0);

        Ok(LLMResponse {
            content: parsed.message.content,
            finish_reason: parsed.done_reason.unwrap_or_else(|| "stop".to_string()),
            usage: TokenUsage {
                prompt_tokens,
                completion_tokens,
                total_tokens: prompt_tokens + completion_tokens,
            },
        })
    }

    async fn is_available(&self, model: &str) -> bool {
        let url = format!("{}/api/tags", self.base_url);
        let response = match self.client.get(&url).send().await {
            Ok(r) if r.status().is_success() => r,
            Ok(r) => {
                warn!(status = %r.status(), "Ollama tags endpoint returned an error");
                return false;
            }
            Err(e) => {
                warn!(error = %e, "Ollama not available");
                return false;
            }
        };

        match response.json::<OllamaTags>().await {
            Ok(tags) => tags.models.iter().any(|m| m.name.contains(model)),
            Err(e) => {
                warn!(error = %e, "Failed to parse Ollama tags");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::LLMMessage;

    fn request() -> LLMRequest {
        LLMRequest {
            model: "llama3.2".to_string(),
            messages: vec![LLMMessage::user("hello")],
            max_tokens: Some(64),
            temperature: Some(0.5),
        }
    }

    #[tokio::test]
    async fn test_chat_completion_parses_response() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/chat")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"model":"llama3.2","message":{"role":"assistant","content":"hi there"},
                   "done":true,"done_reason":"stop","prompt_eval_count":3,"eval_count":2}"#,
            )
            .create_async()
            .await;

        let adapter = OllamaAdapter::new(&server.url());
        let response = adapter.create_chat_completion(&request()).await.unwrap();

        mock.assert_async().await;
        assert_eq!(response.content, "hi there");
        assert_eq!(response.usage.total_tokens, 5);
    }

    #[tokio::test]
    async fn test_chat_completion_surfaces_http_errors() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/chat")
            .with_status(500)
            .with_body("model not loaded")
            .create_async()
            .await;

        let adapter = OllamaAdapter::new(&server.url());
        let err = adapter.create_chat_completion(&request()).await.unwrap_err();
        assert!(matches!(err, AppError::LLMApi(_)));
        assert!(err.to_string().contains("model not loaded"));
    }

    #[tokio::test]
    async fn test_availability_checks_model_list() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/tags")
            .with_status(200)
            .with_body(r#"{"models":[{"name":"llama3.2:latest"}]}"#)
            .create_async()
            .await;

        let adapter = OllamaAdapter::new(&server.url());
        assert!(adapter.is_available("llama3.2").await);
        assert!(!adapter.is_available("mistral").await);
    }
}
