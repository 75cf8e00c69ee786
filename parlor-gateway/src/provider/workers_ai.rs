//! Workers AI style provider.
//!
//! Request: `{model, messages, max_tokens, temperature}`.
//! Response: `{response}` directly, or wrapped as `{result: {response}}` by the
//! REST envelope.

use super::{build_client, ChatMessage, ChatRequest, ChatResponse, Provider, ProviderError, TokenUsage};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Instant;

const PROVIDER_NAME: &str = "workers-ai";

/// Provider for endpoints speaking the Workers AI text-generation format.
pub struct WorkersAiProvider {
    client: reqwest::Client,
    endpoint: String,
}

impl WorkersAiProvider {
    /// Create a provider posting to the given run URL.
    pub fn new(endpoint: impl Into<String>, api_key: Option<&str>) -> Self {
        Self {
            client: build_client(api_key),
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl Provider for WorkersAiProvider {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, ProviderError> {
        let start = Instant::now();

        let body = WorkersAiRequest {
            model: &request.model,
            messages: &request.messages,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&body)
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

        let parsed: WorkersAiResponse = response.json().await.map_err(|e| {
            ProviderError::new(
                PROVIDER_NAME,
                &request.model,
                format!("Failed to parse response: {}", e),
            )
        })?;

        let content = parsed.into_content().map_err(|message| {
            ProviderError::new(PROVIDER_NAME, &request.model, message)
        })?;

        Ok(ChatResponse {
            provider: PROVIDER_NAME.into(),
            model: request.model,
            content,
            usage: TokenUsage::default(),
            latency_ms,
        })
    }
}

// ============================================================================
// Workers AI API Types
// ============================================================================

#[derive(Debug, Serialize)]
struct WorkersAiRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    max_tokens: u32,
    temperature: f64,
}

#[derive(Debug, Deserialize)]
struct WorkersAiResponse {
    #[serde(default)]
    response: Option<String>,
    #[serde(default)]
    result: Option<WorkersAiResult>,
    #[serde(default)]
    errors: Vec<WorkersAiError>,
}

#[derive(Debug, Deserialize)]
struct WorkersAiResult {
    #[serde(default)]
    response: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WorkersAiError {
    #[serde(default)]
    code: Option<i64>,
    #[serde(default)]
    message: String,
}

impl WorkersAiResponse {
    fn into_content(self) -> Result<String, String> {
        if let Some(text) = self.response {
            return Ok(text);
        }
        if let Some(text) = self.result.and_then(|r| r.response) {
            return Ok(text);
        }
        if !self.errors.is_empty() {
            let joined = self
                .errors
                .iter()
                .map(|e| match e.code {
                    Some(code) => format!("{}: {}", code, e.message),
                    None => e.message.clone(),
                })
                .collect::<Vec<_>>()
                .join("; ");
            return Err(format!("API error: {}", joined));
        }
        Err("Response missing 'response' field".into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parlor_memory::Role;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request() -> ChatRequest {
        ChatRequest {
            model: "@cf/meta/llama-3.1-8b-instruct".into(),
            messages: vec![
                ChatMessage::new(Role::System, "Be brief"),
                ChatMessage::new(Role::User, "hi"),
            ],
            max_tokens: 500,
            temperature: 0.7,
        }
    }

    #[test]
    fn test_response_shapes() {
        let direct: WorkersAiResponse = serde_json::from_value(json!({"response": "a"})).unwrap();
        assert_eq!(direct.into_content().unwrap(), "a");

        let wrapped: WorkersAiResponse =
            serde_json::from_value(json!({"result": {"response": "b"}, "success": true})).unwrap();
        assert_eq!(wrapped.into_content().unwrap(), "b");

        let failed: WorkersAiResponse = serde_json::from_value(
            json!({"success": false, "errors": [{"code": 3036, "message": "daily quota used"}]}),
        )
        .unwrap();
        assert!(failed.into_content().unwrap_err().contains("quota"));

        let empty: WorkersAiResponse = serde_json::from_value(json!({})).unwrap();
        assert!(empty.into_content().is_err());
    }

    #[tokio::test]
    async fn test_chat_sends_fixed_shape() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/ai/run"))
            .and(header("authorization", "Bearer token-1"))
            .and(body_partial_json(json!({
                "model": "@cf/meta/llama-3.1-8b-instruct",
                "max_tokens": 500,
                "temperature": 0.7,
                "messages": [
                    {"role": "system", "content": "Be brief"},
                    {"role": "user", "content": "hi"}
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"response": "hello!"})))
            .expect(1)
            .mount(&server)
            .await;

        let provider = WorkersAiProvider::new(format!("{}/ai/run", server.uri()), Some("token-1"));
        let response = provider.chat(request()).await.unwrap();

        assert_eq!(response.content, "hello!");
        assert_eq!(response.provider, "workers-ai");
    }

    #[tokio::test]
    async fn test_chat_surfaces_error_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_string("quota exceeded for today"))
            .mount(&server)
            .await;

        let provider = WorkersAiProvider::new(server.uri(), None);
        let err = provider.chat(request()).await.unwrap_err();

        assert_eq!(err.status_code, Some(429));
        assert!(err.message.contains("quota exceeded for today"));
    }

    #[tokio::test]
    async fn test_chat_rejects_unparseable_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let provider = WorkersAiProvider::new(server.uri(), None);
        let err = provider.chat(request()).await.unwrap_err();
        assert!(err.message.starts_with("Failed to parse response"));
    }
}
