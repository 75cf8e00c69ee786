//! OpenAI-compatible provider implementation.

use super::{build_client, ChatMessage, ChatRequest, ChatResponse, Provider, ProviderError, TokenUsage};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Instant;

const PROVIDER_NAME: &str = "openai";

/// OpenAI chat completions provider (also fits compatible gateways).
pub struct OpenAIProvider {
    client: reqwest::Client,
    base_url: String,
}

impl OpenAIProvider {
    /// Create with custom base URL (for Azure OpenAI or compatible APIs).
    pub fn with_base_url(api_key: Option<&str>, base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            client: build_client(api_key),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl Provider for OpenAIProvider {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, ProviderError> {
        let start = Instant::now();
        let url = format!("{}/v1/chat/completions", self.base_url);

        let openai_request = OpenAIRequest {
            model: &request.model,
            messages: &request.messages,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        };

        let response = self
            .client
            .post(&url)
            .json(&openai_request)
            .send()
            .await
            .map_err(|e| ProviderError::transport(PROVIDER_NAME, &request.model, &e))?;

        let status = response.status();
        let latency_ms = start.elapsed().as_millis() as u64;

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::new(
                PROVIDER_NAME,
                &request.model,
                format!("API error ({}): {}", status.as_u16(), body),
            )
            .with_status(status.as_u16()));
        }

        let openai_response: OpenAIResponse = response.json().await.map_err(|e| {
            ProviderError::new(
                PROVIDER_NAME,
                &request.model,
                format!("Failed to parse response: {}", e),
            )
        })?;

        let content = openai_response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| {
                ProviderError::new(PROVIDER_NAME, &request.model, "Response contained no choices")
            })?;

        Ok(ChatResponse {
            provider: PROVIDER_NAME.into(),
            model: openai_response.model.unwrap_or(request.model),
            content,
            usage: openai_response
                .usage
                .map(|u| TokenUsage {
                    input_tokens: u.prompt_tokens,
                    output_tokens: u.completion_tokens,
                    total_tokens: u.total_tokens,
                })
                .unwrap_or_default(),
            latency_ms,
        })
    }
}

// ============================================================================
// OpenAI API Types
// ============================================================================

#[derive(Debug, Serialize)]
struct OpenAIRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    max_tokens: u32,
    temperature: f64,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    #[serde(default)]
    model: Option<String>,
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<OpenAIUsage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAIUsage {
    prompt_tokens: i64,
    completion_tokens: i64,
    total_tokens: i64,
}
