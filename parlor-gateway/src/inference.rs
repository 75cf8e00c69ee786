//! Inference gateway - one bounded call to the remote generator.
//!
//! Generation parameters are fixed at construction. Each `generate` makes
//! exactly one attempt: no retry, no backoff, no caching. Failures are
//! classified by inspecting their description against an ordered rule table.

use crate::error::{ErrorKind, SessionError, GENERIC_MESSAGE, QUOTA_MESSAGE, TIMEOUT_MESSAGE};
use crate::provider::{ChatMessage, ChatRequest, Provider};
use parlor_common::config::InferenceConfig;
use std::sync::Arc;
use std::time::Duration;

/// Ordered classification rules: first substring match wins.
///
/// The remote capability exposes no structured failure taxonomy, so the
/// description text is the only signal.
const CLASSIFICATION_RULES: &[(&str, ErrorKind, &str)] = &[
    ("quota", ErrorKind::Quota, QUOTA_MESSAGE),
    ("timeout", ErrorKind::Timeout, TIMEOUT_MESSAGE),
];

/// Fixed generation parameters.
#[derive(Debug, Clone)]
pub struct GenerationParams {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f64,
    pub timeout: Duration,
}

impl From<&InferenceConfig> for GenerationParams {
    fn from(config: &InferenceConfig) -> Self {
        Self {
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }
}

/// A classified generation failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InferenceError {
    /// Quota, Timeout, or Other
    pub kind: ErrorKind,
    /// Caller-facing text
    pub message: String,
    /// Raw failure description, for logs only
    pub detail: String,
}

impl From<InferenceError> for SessionError {
    fn from(err: InferenceError) -> Self {
        SessionError::new(err.kind, err.message)
    }
}

/// Classify a failure description using the ordered rule table.
pub fn classify(description: &str) -> InferenceError {
    let lowered = description.to_lowercase();
    let (kind, message) = CLASSIFICATION_RULES
        .iter()
        .find(|(needle, _, _)| lowered.contains(needle))
        .map(|(_, kind, message)| (*kind, *message))
        .unwrap_or((ErrorKind::Other, GENERIC_MESSAGE));

    InferenceError {
        kind,
        message: message.to_string(),
        detail: description.to_string(),
    }
}

/// Wraps a provider with fixed parameters, a time bound, and classification.
pub struct InferenceGateway {
    provider: Arc<dyn Provider>,
    params: GenerationParams,
}

impl InferenceGateway {
    pub fn new(provider: Arc<dyn Provider>, params: GenerationParams) -> Self {
        Self { provider, params }
    }

    /// Submit a prompt window and return the generated text.
    pub async fn generate(&self, window: Vec<ChatMessage>) -> Result<String, InferenceError> {
        let request = ChatRequest {
            model: self.params.model.clone(),
            messages: window,
            max_tokens: self.params.max_tokens,
            temperature: self.params.temperature,
        };

        let outcome = tokio::time::timeout(self.params.timeout, self.provider.chat(request)).await;

        match outcome {
            Ok(Ok(response)) => {
                tracing::debug!(
                    provider = %response.provider,
                    model = %response.model,
                    latency_ms = response.latency_ms,
                    output_tokens = response.usage.output_tokens,
                    "Generation succeeded"
                );
                Ok(response.content)
            }
            Ok(Err(e)) => {
                let err = classify(&e.message);
                tracing::warn!(
                    provider = %e.provider,
                    status = ?e.status_code,
                    kind = %err.kind,
                    error = %e,
                    "Generation failed"
                );
                Err(err)
            }
            Err(_) => {
                let err = classify(&format!(
                    "inference timeout after {}ms",
                    self.params.timeout.as_millis()
                ));
                tracing::warn!(
                    provider = self.provider.name(),
                    timeout_ms = self.params.timeout.as_millis() as u64,
                    "Generation timed out"
                );
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{ChatResponse, ProviderError, TokenUsage};
    use async_trait::async_trait;
    use parlor_memory::Role;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct ScriptedProvider {
        calls: AtomicUsize,
        result: Result<&'static str, &'static str>,
        delay: Duration,
        seen: Mutex<Option<ChatRequest>>,
    }

    impl ScriptedProvider {
        fn new(result: Result<&'static str, &'static str>) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                result,
                delay: Duration::ZERO,
                seen: Mutex::new(None),
            }
        }
    }

    #[async_trait]
    impl Provider for ScriptedProvider {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.seen.lock().unwrap() = Some(request.clone());
            tokio::time::sleep(self.delay).await;
            match self.result {
                Ok(text) => Ok(ChatResponse {
                    provider: "scripted".into(),
                    model: request.model,
                    content: text.into(),
                    usage: TokenUsage::default(),
                    latency_ms: 1,
                }),
                Err(msg) => Err(ProviderError::new("scripted", &request.model, msg)),
            }
        }
    }

    fn params(timeout: Duration) -> GenerationParams {
        GenerationParams {
            model: "test-model".into(),
            max_tokens: 500,
            temperature: 0.7,
            timeout,
        }
    }

    fn window() -> Vec<ChatMessage> {
        vec![
            ChatMessage::new(Role::System, "preamble"),
            ChatMessage::new(Role::User, "hi"),
        ]
    }

    #[test]
    fn test_classify_priority() {
        assert_eq!(classify("quota exceeded").kind, ErrorKind::Quota);
        assert_eq!(classify("Request timeout: deadline").kind, ErrorKind::Timeout);
        // quota outranks timeout when both appear
        assert_eq!(classify("timeout while checking quota").kind, ErrorKind::Quota);
        assert_eq!(classify("connection refused").kind, ErrorKind::Other);
    }

    #[test]
    fn test_classify_messages() {
        let quota = classify("Daily QUOTA used");
        assert_eq!(quota.message, QUOTA_MESSAGE);
        assert!(quota.message.starts_with("Daily AI usage limit reached"));
        assert_eq!(quota.detail, "Daily QUOTA used");

        assert_eq!(classify("timeout").message, TIMEOUT_MESSAGE);
        assert_eq!(classify("boom").message, GENERIC_MESSAGE);
    }

    #[tokio::test]
    async fn test_generate_uses_fixed_params() {
        let provider = Arc::new(ScriptedProvider::new(Ok("hello")));
        let gateway = InferenceGateway::new(provider.clone(), params(Duration::from_secs(5)));

        let text = gateway.generate(window()).await.unwrap();
        assert_eq!(text, "hello");

        let seen = provider.seen.lock().unwrap().clone().unwrap();
        assert_eq!(seen.model, "test-model");
        assert_eq!(seen.max_tokens, 500);
        assert!((seen.temperature - 0.7).abs() < f64::EPSILON);
        assert_eq!(seen.messages, window());
    }

    #[tokio::test]
    async fn test_generate_classifies_without_retry() {
        let provider = Arc::new(ScriptedProvider::new(Err("You have exceeded your quota")));
        let gateway = InferenceGateway::new(provider.clone(), params(Duration::from_secs(5)));

        let err = gateway.generate(window()).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Quota);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_generate_times_out() {
        let mut slow = ScriptedProvider::new(Ok("too late"));
        slow.delay = Duration::from_secs(10);
        let gateway = InferenceGateway::new(Arc::new(slow), params(Duration::from_millis(20)));

        let err = gateway.generate(window()).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Timeout);
        assert_eq!(err.message, TIMEOUT_MESSAGE);
    }

    #[test]
    fn test_params_from_config() {
        let params = GenerationParams::from(&InferenceConfig::default());
        assert_eq!(params.max_tokens, 500);
        assert_eq!(params.timeout, Duration::from_secs(30));
    }
}
