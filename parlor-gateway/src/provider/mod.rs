//! Provider abstraction for remote text-generation APIs.
//!
//! Two wire formats are supported: the Workers AI style
//! (`{model, messages, max_tokens, temperature}` → `{response}`) and the
//! OpenAI-compatible chat completions API.

mod openai;
mod workers_ai;

pub use openai::OpenAIProvider;
pub use workers_ai::WorkersAiProvider;

use async_trait::async_trait;
use parlor_common::config::InferenceConfig;
use parlor_memory::Role;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

// ============================================================================
// Provider Trait
// ============================================================================

/// Unified interface for text-generation providers.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Get the provider name.
    fn name(&self) -> &str;

    /// Send a chat completion request. Exactly one outbound call.
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, ProviderError>;
}

/// Error from a provider.
#[derive(Debug, Clone)]
pub struct ProviderError {
    pub provider: String,
    pub model: String,
    pub message: String,
    pub status_code: Option<u16>,
}

impl ProviderError {
    pub(crate) fn new(provider: &str, model: &str, message: impl Into<String>) -> Self {
        Self {
            provider: provider.to_string(),
            model: model.to_string(),
            message: message.into(),
            status_code: None,
        }
    }

    pub(crate) fn with_status(mut self, status: u16) -> Self {
        self.status_code = Some(status);
        self
    }

    /// Build an error from a transport failure, tagging timeouts explicitly.
    pub(crate) fn transport(provider: &str, model: &str, err: &reqwest::Error) -> Self {
        let message = if err.is_timeout() {
            format!("Request timeout: {}", err)
        } else {
            format!("Request failed: {}", err)
        };
        Self::new(provider, model, message)
    }
}

impl std::fmt::Display for ProviderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}:{}] {}", self.provider, self.model, self.message)
    }
}

impl std::error::Error for ProviderError {}

// ============================================================================
// Request/Response Types
// ============================================================================

/// A message submitted to the generator. Timestamps are not sent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// Unified chat request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    /// Model to use
    pub model: String,
    /// Messages in the conversation, system preamble first
    pub messages: Vec<ChatMessage>,
    /// Maximum tokens to generate
    pub max_tokens: u32,
    /// Sampling temperature
    pub temperature: f64,
}

/// Unified chat response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    /// Provider name
    pub provider: String,
    /// Model used
    pub model: String,
    /// Response content
    pub content: String,
    /// Token usage, when the provider reports it
    pub usage: TokenUsage,
    /// Response latency in milliseconds
    pub latency_ms: u64,
}

/// Token usage information.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: i64,
    pub output_tokens: i64,
    pub total_tokens: i64,
}

/// Build an HTTP client with the default headers every provider needs.
pub(crate) fn build_client(api_key: Option<&str>) -> reqwest::Client {
    use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};

    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    if let Some(key) = api_key.filter(|k| !k.is_empty()) {
        if let Ok(value) = HeaderValue::from_str(&format!("Bearer {}", key)) {
            headers.insert(AUTHORIZATION, value);
        }
    }

    reqwest::Client::builder()
        .default_headers(headers)
        .connect_timeout(Duration::from_secs(10))
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}

/// Create the provider named by the inference configuration.
pub fn create_provider(config: &InferenceConfig) -> Arc<dyn Provider> {
    let api_key = config.api_key.as_deref();
    match config.provider.as_str() {
        "openai" => Arc::new(OpenAIProvider::with_base_url(api_key, &config.endpoint)),
        _ => Arc::new(WorkersAiProvider::new(&config.endpoint, api_key)),
    }
}
