//! In-process conversation store.
//!
//! Lives only as long as the process. Used by tests and by deployments that
//! accept losing history on restart (`memory.backend = "memory"`).

use crate::traits::{ConversationStore, Message, StoreError};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Conversation store backed by a map.
#[derive(Default)]
pub struct InMemoryConversationStore {
    sessions: RwLock<HashMap<String, Vec<Message>>>,
}

impl InMemoryConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of sessions ever written (including cleared ones).
    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

#[async_trait]
impl ConversationStore for InMemoryConversationStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn get(&self, session_id: &str) -> Result<Vec<Message>, StoreError> {
        Ok(self
            .sessions
            .read()
            .await
            .get(session_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn put(&self, session_id: &str, history: &[Message]) -> Result<(), StoreError> {
        self.sessions
            .write()
            .await
            .insert(session_id.to_string(), history.to_vec());
        Ok(())
    }

    async fn health_check(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_session_is_empty() {
        let store = InMemoryConversationStore::new();
        assert!(store.get("s1").await.unwrap().is_empty());
        assert_eq!(store.session_count().await, 0);
    }

    #[tokio::test]
    async fn put_replaces() {
        let store = InMemoryConversationStore::new();
        store
            .put("s1", &[Message::user("a"), Message::assistant("b")])
            .await
            .unwrap();
        store.put("s1", &[Message::user("c")]).await.unwrap();

        let loaded = store.get("s1").await.unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].content, "c");
    }

    #[tokio::test]
    async fn sessions_are_isolated() {
        let store = InMemoryConversationStore::new();
        store.put("a", &[Message::user("x")]).await.unwrap();
        assert!(store.get("b").await.unwrap().is_empty());
        assert_eq!(store.name(), "memory");
        assert!(store.health_check().await);
    }
}
