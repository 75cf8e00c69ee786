//! Parlor Memory - Conversation store for the Parlor service.
//!
//! One ordered message log per session id, replaced wholesale on every write:
//! - SQLite for durable storage across restarts
//! - An in-process map for tests and ephemeral deployments
//!
//! ```text
//! Session Actor ── get(id) ──→ ConversationStore ──→ Vec<Message>
//!               ── put(id, history) ──→ (full replacement)
//! ```

#![warn(clippy::all)]
#![allow(clippy::pedantic)]

pub mod in_memory;
pub mod sqlite;
pub mod traits;

// Re-export commonly used types
pub use in_memory::InMemoryConversationStore;
pub use sqlite::SqliteConversationStore;
pub use traits::{ConversationStore, Message, Role, StoreError};
