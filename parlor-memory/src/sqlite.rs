//! SQLite-backed conversation store.
//!
//! One row per session holding the JSON-encoded message log. Writes are a
//! single upsert, so a reader sees either the previous or the new history,
//! never a mix. The database runs in WAL mode with `synchronous=FULL` so a
//! committed write survives a crash.

use crate::traits::{ConversationStore, Message, StoreError};
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};

/// Durable conversation store on SQLite.
pub struct SqliteConversationStore {
    db_path: PathBuf,
}

impl SqliteConversationStore {
    /// Create a store in the given directory.
    ///
    /// Creates the database at `{dir}/conversations.db`.
    pub fn new(dir: &Path) -> Result<Self, StoreError> {
        std::fs::create_dir_all(dir)?;

        let db_path = dir.join("conversations.db");
        let conn = Connection::open(&db_path)?;

        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get::<_, String>(0))?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS conversations (
                session_id TEXT PRIMARY KEY,
                messages TEXT NOT NULL,
                message_count INTEGER NOT NULL,
                updated_at TEXT NOT NULL
            );
            "#,
        )?;

        tracing::debug!(path = %db_path.display(), "Conversation store ready");

        Ok(Self { db_path })
    }

    /// Path of the underlying database file.
    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    fn open(db_path: &Path) -> Result<Connection, StoreError> {
        let conn = Connection::open(db_path)?;
        conn.pragma_update(None, "synchronous", "FULL")?;
        conn.busy_timeout(std::time::Duration::from_secs(5))?;
        Ok(conn)
    }

    /// Number of sessions with a stored row.
    pub async fn session_count(&self) -> Result<usize, StoreError> {
        let db_path = self.db_path.clone();

        tokio::task::spawn_blocking(move || -> Result<usize, StoreError> {
            let conn = Self::open(&db_path)?;
            let count: i64 =
                conn.query_row("SELECT COUNT(*) FROM conversations", [], |row| row.get(0))?;
            Ok(count as usize)
        })
        .await?
    }
}

#[async_trait]
impl ConversationStore for SqliteConversationStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn get(&self, session_id: &str) -> Result<Vec<Message>, StoreError> {
        let db_path = self.db_path.clone();
        let session_id = session_id.to_string();

        tokio::task::spawn_blocking(move || -> Result<Vec<Message>, StoreError> {
            let conn = Self::open(&db_path)?;
            let raw: Option<String> = conn
                .query_row(
                    "SELECT messages FROM conversations WHERE session_id = ?1",
                    params![session_id],
                    |row| row.get(0),
                )
                .optional()?;

            match raw {
                Some(json) => Ok(serde_json::from_str(&json)?),
                None => Ok(Vec::new()),
            }
        })
        .await?
    }

    async fn put(&self, session_id: &str, history: &[Message]) -> Result<(), StoreError> {
        let db_path = self.db_path.clone();
        let session_id = session_id.to_string();
        let json = serde_json::to_string(history)?;
        let count = history.len() as i64;

        tokio::task::spawn_blocking(move || -> Result<(), StoreError> {
            let conn = Self::open(&db_path)?;
            let now = chrono::Utc::now().to_rfc3339();

            conn.execute(
                r#"
                INSERT INTO conversations (session_id, messages, message_count, updated_at)
                VALUES (?1, ?2, ?3, ?4)
                ON CONFLICT(session_id) DO UPDATE SET
                    messages = excluded.messages,
                    message_count = excluded.message_count,
                    updated_at = excluded.updated_at
                "#,
                params![session_id, json, count, now],
            )?;

            Ok(())
        })
        .await?
    }

    async fn health_check(&self) -> bool {
        let db_path = self.db_path.clone();

        tokio::task::spawn_blocking(move || {
            Self::open(&db_path)
                .and_then(|conn| {
                    conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
                        .map_err(StoreError::from)
                })
                .is_ok()
        })
        .await
        .unwrap_or(false)
    }
}
