//! Session actor - the serialization boundary for one conversation.
//!
//! Every operation on a session (send, clear, history) first takes the
//! session's slot, a fair FIFO lock, so callers are served strictly in
//! arrival order and never observe each other's intermediate state. Once the
//! slot is held, the operation runs on its own task and completes even if the
//! caller goes away.

use super::window::ContextWindow;
use crate::error::SessionError;
use crate::inference::InferenceGateway;
use chrono::{DateTime, Utc};
use parlor_memory::{ConversationStore, Message, StoreError};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Number of messages returned by a history query.
pub const DEFAULT_HISTORY_LIMIT: usize = 10;

/// Collaborators shared by every actor.
pub struct SessionContext {
    pub store: Arc<dyn ConversationStore>,
    pub gateway: Arc<InferenceGateway>,
    pub window: ContextWindow,
    pub history_limit: usize,
}

/// Successful reply to a sent message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendReply {
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

/// Exclusive mutator of one session's history.
pub struct SessionActor {
    session_id: String,
    ctx: Arc<SessionContext>,
    slot: Arc<Mutex<()>>,
}

/// Reject blank input before anything is read or written.
fn validate_message(text: &str) -> Result<(), SessionError> {
    if text.trim().is_empty() {
        return Err(SessionError::validation("Message is required"));
    }
    Ok(())
}

impl SessionActor {
    pub fn new(session_id: impl Into<String>, ctx: Arc<SessionContext>) -> Self {
        Self {
            session_id: session_id.into(),
            ctx,
            slot: Arc::new(Mutex::new(())),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Append a user turn, ask the generator, and append its reply.
    pub async fn send(self: &Arc<Self>, text: &str) -> Result<SendReply, SessionError> {
        validate_message(text)?;
        let text = text.to_string();
        let actor = Arc::clone(self);
        self.serialized(async move { actor.send_locked(text).await })
            .await
    }

    /// Replace the history with an empty sequence. Idempotent.
    pub async fn clear(self: &Arc<Self>) -> Result<(), SessionError> {
        let actor = Arc::clone(self);
        self.serialized(async move { actor.clear_locked().await }).await
    }

    /// Last `history_limit` messages, oldest first.
    ///
    /// Best effort: any internal failure reads as an empty history.
    pub async fn history(self: &Arc<Self>) -> Vec<Message> {
        let actor = Arc::clone(self);
        self.serialized(async move { Ok(actor.history_locked().await) })
            .await
            .unwrap_or_default()
    }

    /// Wait for the slot in arrival order, then run `op` to completion on
    /// its own task while holding it.
    async fn serialized<T, F>(&self, op: F) -> Result<T, SessionError>
    where
        T: Send + 'static,
        F: Future<Output = Result<T, SessionError>> + Send + 'static,
    {
        let slot: OwnedMutexGuard<()> = Arc::clone(&self.slot).lock_owned().await;

        tokio::spawn(async move {
            let _slot = slot;
            op.await
        })
        .await
        .unwrap_or_else(|e| {
            tracing::error!(session_id = %self.session_id, error = %e, "Session operation aborted");
            Err(SessionError::other())
        })
    }

    async fn send_locked(&self, text: String) -> Result<SendReply, SessionError> {
        let mut history = self.load().await?;
        history.push(Message::user(text));

        let window = self.ctx.window.build(&history);

        match self.ctx.gateway.generate(window).await {
            Ok(content) => {
                let reply = Message::assistant(content);
                let timestamp = reply.created_at;
                let content = reply.content.clone();
                history.push(reply);
                self.persist(&history).await?;

                tracing::info!(
                    session_id = %self.session_id,
                    history_len = history.len(),
                    "Message answered"
                );
                Ok(SendReply { content, timestamp })
            }
            Err(err) => {
                // The user turn is kept even though no reply was produced.
                self.persist(&history).await?;

                tracing::warn!(
                    session_id = %self.session_id,
                    history_len = history.len(),
                    kind = %err.kind,
                    detail = %err.detail,
                    "Message not answered"
                );
                Err(err.into())
            }
        }
    }

    async fn clear_locked(&self) -> Result<(), SessionError> {
        self.persist(&[]).await?;
        tracing::info!(session_id = %self.session_id, "Conversation cleared");
        Ok(())
    }

    async fn history_locked(&self) -> Vec<Message> {
        match self.ctx.store.get(&self.session_id).await {
            Ok(history) => {
                let start = history.len().saturating_sub(self.ctx.history_limit);
                history[start..].to_vec()
            }
            Err(e) => {
                tracing::warn!(session_id = %self.session_id, error = %e, "History unavailable");
                Vec::new()
            }
        }
    }

    async fn load(&self) -> Result<Vec<Message>, SessionError> {
        self.ctx
            .store
            .get(&self.session_id)
            .await
            .map_err(|e| self.storage_failure("load", e))
    }

    async fn persist(&self, history: &[Message]) -> Result<(), SessionError> {
        self.ctx
            .store
            .put(&self.session_id, history)
            .await
            .map_err(|e| self.storage_failure("persist", e))
    }

    fn storage_failure(&self, op: &str, err: StoreError) -> SessionError {
        tracing::error!(
            session_id = %self.session_id,
            store = self.ctx.store.name(),
            op,
            error = %err,
            "Conversation store failed"
        );
        SessionError::other()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ErrorKind, QUOTA_MESSAGE};
    use crate::inference::GenerationParams;
    use crate::provider::{ChatRequest, ChatResponse, Provider, ProviderError, TokenUsage};
    use async_trait::async_trait;
    use parlor_memory::{InMemoryConversationStore, Role};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Replies "echo: <last user message>" or fails with a fixed description.
    struct EchoProvider {
        failure: Option<&'static str>,
        delay: Duration,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Provider for EchoProvider {
        fn name(&self) -> &str {
            "echo"
        }

        async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            if let Some(msg) = self.failure {
                return Err(ProviderError::new("echo", &request.model, msg));
            }
            let last = request.messages.last().map(|m| m.content.clone()).unwrap_or_default();
            Ok(ChatResponse {
                provider: "echo".into(),
                model: request.model,
                content: format!("echo: {last}"),
                usage: TokenUsage::default(),
                latency_ms: 0,
            })
        }
    }

    /// Store whose writes always fail.
    struct BrokenStore;

    #[async_trait]
    impl ConversationStore for BrokenStore {
        fn name(&self) -> &str {
            "broken"
        }

        async fn get(&self, _session_id: &str) -> Result<Vec<Message>, StoreError> {
            Err(StoreError::storage("database is locked"))
        }

        async fn put(&self, _session_id: &str, _history: &[Message]) -> Result<(), StoreError> {
            Err(StoreError::storage("database is locked"))
        }

        async fn health_check(&self) -> bool {
            false
        }
    }

    fn actor_with(
        store: Arc<dyn ConversationStore>,
        failure: Option<&'static str>,
        delay: Duration,
        timeout: Duration,
    ) -> (Arc<SessionActor>, Arc<EchoProvider>) {
        let provider = Arc::new(EchoProvider {
            failure,
            delay,
            calls: AtomicUsize::new(0),
        });
        let gateway = InferenceGateway::new(
            provider.clone(),
            GenerationParams {
                model: "m".into(),
                max_tokens: 500,
                temperature: 0.7,
                timeout,
            },
        );
        let ctx = Arc::new(SessionContext {
            store,
            gateway: Arc::new(gateway),
            window: ContextWindow::new("sys", 8),
            history_limit: DEFAULT_HISTORY_LIMIT,
        });
        (Arc::new(SessionActor::new("s1", ctx)), provider)
    }

    fn echo_actor() -> (Arc<SessionActor>, Arc<InMemoryConversationStore>) {
        let store = Arc::new(InMemoryConversationStore::new());
        let (actor, _) = actor_with(store.clone(), None, Duration::ZERO, Duration::from_secs(5));
        (actor, store)
    }

    #[tokio::test]
    async fn send_appends_user_and_assistant() {
        let (actor, _) = echo_actor();

        let reply = actor.send("hi").await.unwrap();
        assert_eq!(reply.content, "echo: hi");

        let history = actor.history().await;
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].role, Role::User);
        assert_eq!(history[0].content, "hi");
        assert_eq!(history[1].role, Role::Assistant);
        assert_eq!(history[1].content, "echo: hi");
        assert_eq!(history[1].created_at, reply.timestamp);
    }

    #[tokio::test]
    async fn blank_message_is_rejected_before_any_io() {
        let (actor, provider) = actor_with(
            Arc::new(BrokenStore),
            None,
            Duration::ZERO,
            Duration::from_secs(5),
        );

        let err = actor.send("   \n\t").await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn quota_failure_keeps_user_message() {
        let store = Arc::new(InMemoryConversationStore::new());
        let (actor, _) = actor_with(
            store.clone(),
            Some("quota exceeded for account"),
            Duration::ZERO,
            Duration::from_secs(5),
        );

        let err = actor.send("hello").await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Quota);
        assert_eq!(err.message, QUOTA_MESSAGE);

        let history = store.get("s1").await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].role, Role::User);
        assert_eq!(history[0].content, "hello");
    }

    #[tokio::test]
    async fn timeout_keeps_user_message_and_releases_slot() {
        let store = Arc::new(InMemoryConversationStore::new());
        let (actor, _) = actor_with(
            store.clone(),
            None,
            Duration::from_secs(10),
            Duration::from_millis(30),
        );

        let err = actor.send("slow").await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Timeout);

        // The slot is free again: clear and history complete promptly.
        tokio::time::timeout(Duration::from_secs(2), actor.clear())
            .await
            .expect("slot released")
            .unwrap();
        assert!(store.get("s1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn storage_failure_surfaces_as_other() {
        let (actor, provider) = actor_with(
            Arc::new(BrokenStore),
            None,
            Duration::ZERO,
            Duration::from_secs(5),
        );

        let err = actor.send("hi").await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Other);
        // Load failed, so the generator was never called.
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);

        assert_eq!(actor.clear().await.unwrap_err().kind, ErrorKind::Other);
        assert!(actor.history().await.is_empty());
    }

    #[tokio::test]
    async fn clear_is_idempotent() {
        let (actor, _) = echo_actor();

        actor.clear().await.unwrap();
        assert!(actor.history().await.is_empty());

        actor.send("hi").await.unwrap();
        actor.clear().await.unwrap();
        assert!(actor.history().await.is_empty());
    }

    #[tokio::test]
    async fn history_is_capped_at_limit() {
        let (actor, store) = echo_actor();
        let long: Vec<Message> = (0..25).map(|i| Message::user(format!("m{i}"))).collect();
        store.put("s1", &long).await.unwrap();

        let history = actor.history().await;
        assert_eq!(history.len(), DEFAULT_HISTORY_LIMIT);
        assert_eq!(history[0].content, "m15");
        assert_eq!(history[9].content, "m24");
    }

    #[tokio::test]
    async fn window_includes_new_user_message() {
        let (actor, _) = echo_actor();
        // Echo replies with the last window entry, which must be the new turn.
        let reply = actor.send("latest").await.unwrap();
        assert_eq!(reply.content, "echo: latest");
    }
}
