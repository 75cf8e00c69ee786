//! Session registry - maps session ids to their actors.
//!
//! Actors are created lazily on first reference. Each session has its own
//! slot, so there is no lock shared between sessions; the map itself is
//! sharded and only touched for lookup.

use super::actor::{SendReply, SessionActor, SessionContext};
use crate::error::SessionError;
use dashmap::DashMap;
use parlor_memory::Message;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Lookup table from session id to actor.
pub struct SessionRegistry {
    actors: DashMap<String, Arc<SessionActor>>,
    ctx: Arc<SessionContext>,
}

impl SessionRegistry {
    pub fn new(ctx: SessionContext) -> Self {
        Self {
            actors: DashMap::new(),
            ctx: Arc::new(ctx),
        }
    }

    /// Get the actor for a session, creating it on first use.
    pub fn actor(&self, session_id: &str) -> Arc<SessionActor> {
        let entry = self
            .actors
            .entry(session_id.to_string())
            .or_insert_with(|| Arc::new(SessionActor::new(session_id, Arc::clone(&self.ctx))));
        Arc::clone(entry.value())
    }

    pub async fn send(&self, session_id: &str, text: &str) -> Result<SendReply, SessionError> {
        self.actor(session_id).send(text).await
    }

    pub async fn clear(&self, session_id: &str) -> Result<(), SessionError> {
        self.actor(session_id).clear().await
    }

    pub async fn history(&self, session_id: &str) -> Vec<Message> {
        self.actor(session_id).history().await
    }

    /// Number of sessions with a live actor.
    pub fn active_sessions(&self) -> usize {
        self.actors.len()
    }

    /// Drop actors that nobody is using. Returns how many were released.
    ///
    /// Callers and in-flight operations hold their own `Arc`, so an actor
    /// whose only reference is the map has no queued or running work.
    pub fn prune_idle(&self) -> usize {
        let before = self.actors.len();
        self.actors.retain(|_, actor| Arc::strong_count(actor) > 1);
        let released = before.saturating_sub(self.actors.len());
        if released > 0 {
            tracing::debug!(released, remaining = self.actors.len(), "Released idle sessions");
        }
        released
    }

    /// Periodically release idle actors.
    pub fn spawn_idle_sweeper(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let registry = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                match registry.upgrade() {
                    Some(registry) => {
                        registry.prune_idle();
                    }
                    None => break,
                }
            }
        })
    }

    /// Shared collaborators.
    pub fn context(&self) -> &SessionContext {
        &self.ctx
    }
}
