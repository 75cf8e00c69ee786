//! Conversation store trait and message types.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Fixed preamble placed ahead of the conversation
    System,
    /// A turn typed by the caller
    User,
    /// A reply produced by the generator
    Assistant,
}

impl Role {
    /// Wire name of the role.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single message in a conversation. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// Create a message stamped with the current time.
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self::at(role, content, Utc::now())
    }

    /// Create a message with an explicit timestamp.
    pub fn at(role: Role, content: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            role,
            content: content.into(),
            created_at,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// Error from a conversation store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The persistence layer could not complete the operation.
    #[error("storage failure: {0}")]
    StorageFailure(String),
}

impl StoreError {
    pub fn storage(err: impl std::fmt::Display) -> Self {
        Self::StorageFailure(err.to_string())
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        Self::storage(err)
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::storage(err)
    }
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        Self::storage(err)
    }
}

impl From<tokio::task::JoinError> for StoreError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::storage(err)
    }
}

/// Durable storage of one ordered message sequence per session id.
///
/// Implementations hold no business logic. A missing session reads as an
/// empty history, and `put` replaces the stored sequence wholesale.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Backend name (e.g., "sqlite", "memory")
    fn name(&self) -> &str;

    /// Load the full history of a session, oldest first.
    async fn get(&self, session_id: &str) -> Result<Vec<Message>, StoreError>;

    /// Replace the stored history of a session.
    ///
    /// Once this returns `Ok`, the write survives a process restart (for
    /// durable backends) and is visible to the next `get`.
    async fn put(&self, session_id: &str, history: &[Message]) -> Result<(), StoreError>;

    /// Returns true if the backend is operational.
    async fn health_check(&self) -> bool;
}
