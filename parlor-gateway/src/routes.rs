//! Route definitions for the Parlor gateway.
//!
//! The router resolves which session a request addresses, validates the body
//! once into a [`SessionCommand`], and hands it to that session's actor.

use crate::error::SessionError;
use crate::session::SessionRegistry;
use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use parlor_memory::{Message, Role};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<SessionRegistry>,
    /// Session used by `/api/v1/chat` when the caller names none.
    pub default_session: String,
}

// ============================================================================
// Inbound requests
// ============================================================================

/// Body of `POST /api/v1/sessions/:id`. Exactly one field must be set.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SessionRequest {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub action: Option<SessionAction>,
}

/// Named actions a session accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionAction {
    Clear,
}

/// Body of `POST /api/v1/chat`.
#[derive(Debug, Deserialize)]
pub struct ChatRequestBody {
    pub message: String,
    #[serde(default, alias = "sessionId")]
    pub session_id: Option<String>,
}

/// A validated operation for one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCommand {
    Send { text: String },
    Clear,
}

impl SessionCommand {
    /// Parse and validate a raw body.
    pub fn parse(body: &[u8]) -> Result<Self, SessionError> {
        let malformed =
            || SessionError::validation("Request must be {\"message\": string} or {\"action\": \"clear\"}");

        let request: SessionRequest = serde_json::from_slice(body).map_err(|_| malformed())?;

        match (request.message, request.action) {
            (None, Some(SessionAction::Clear)) => Ok(Self::Clear),
            (Some(message), None) => {
                if message.trim().is_empty() {
                    return Err(SessionError::validation("Message is required"));
                }
                Ok(Self::Send { text: message })
            }
            _ => Err(malformed()),
        }
    }
}

// ============================================================================
// Responses
// ============================================================================

/// Successful send.
#[derive(Debug, Serialize, Deserialize)]
pub struct SendResponse {
    pub success: bool,
    pub response: String,
    pub timestamp: String,
}

/// Successful clear.
#[derive(Debug, Serialize, Deserialize)]
pub struct ClearResponse {
    pub success: bool,
    pub message: String,
}

/// Any failed mutation.
#[derive(Debug, Serialize, Deserialize)]
pub struct FailureResponse {
    pub success: bool,
    pub error: String,
}

/// One message of a history listing.
#[derive(Debug, Serialize, Deserialize)]
pub struct HistoryMessage {
    pub role: Role,
    pub content: String,
    pub timestamp: String,
}

impl From<Message> for HistoryMessage {
    fn from(message: Message) -> Self {
        Self {
            role: message.role,
            content: message.content,
            timestamp: message.created_at.to_rfc3339(),
        }
    }
}

/// History listing.
#[derive(Debug, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub messages: Vec<HistoryMessage>,
}

/// Health check response.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub service: String,
    pub store: String,
    pub active_sessions: usize,
}

impl IntoResponse for SessionError {
    fn into_response(self) -> Response {
        let message = self.message.clone();
        let status = StatusCode::from_u16(parlor_common::Error::from(self).status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (
            status,
            Json(FailureResponse {
                success: false,
                error: message,
            }),
        )
            .into_response()
    }
}

// ============================================================================
// Router
// ============================================================================

/// Build the session routes.
pub fn session_routes(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/sessions/:id", post(session_handler))
        .route("/api/v1/sessions/:id/history", get(history_handler))
        .route("/api/v1/chat", post(chat_handler))
        .route("/health", get(health_handler))
        .route("/api/v1/health", get(health_handler))
        .with_state(state)
}

// ============================================================================
// Handlers
// ============================================================================

async fn session_handler(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    body: Bytes,
) -> Response {
    match SessionCommand::parse(&body) {
        Ok(command) => execute(&state, &session_id, command).await,
        Err(err) => err.into_response(),
    }
}

/// Router-level convenience: applies the default-session policy.
async fn chat_handler(State(state): State<AppState>, body: Bytes) -> Response {
    let request: ChatRequestBody = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(_) => return SessionError::validation("Message is required").into_response(),
    };

    let session_id = request
        .session_id
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(|| state.default_session.clone());

    if request.message.trim().is_empty() {
        return SessionError::validation("Message is required").into_response();
    }

    execute(
        &state,
        &session_id,
        SessionCommand::Send {
            text: request.message,
        },
    )
    .await
}

async fn execute(state: &AppState, session_id: &str, command: SessionCommand) -> Response {
    let request_id = parlor_common::logging::generate_request_id();
    tracing::debug!(%request_id, session_id, command = command_kind(&command), "Session request");

    match command {
        SessionCommand::Send { text } => match state.registry.send(session_id, &text).await {
            Ok(reply) => Json(SendResponse {
                success: true,
                response: reply.content,
                timestamp: reply.timestamp.to_rfc3339(),
            })
            .into_response(),
            Err(err) => {
                tracing::debug!(%request_id, kind = %err.kind, "Send failed");
                err.into_response()
            }
        },
        SessionCommand::Clear => match state.registry.clear(session_id).await {
            Ok(()) => Json(ClearResponse {
                success: true,
                message: "Conversation cleared".into(),
            })
            .into_response(),
            Err(err) => err.into_response(),
        },
    }
}

fn command_kind(command: &SessionCommand) -> &'static str {
    match command {
        SessionCommand::Send { .. } => "send",
        SessionCommand::Clear => "clear",
    }
}

async fn history_handler(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Json<HistoryResponse> {
    let messages = state
        .registry
        .history(&session_id)
        .await
        .into_iter()
        .map(HistoryMessage::from)
        .collect();

    Json(HistoryResponse { messages })
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let store = state.registry.context().store.clone();
    let status = if store.health_check().await {
        "healthy"
    } else {
        "degraded"
    };

    Json(HealthResponse {
        status: status.into(),
        version: env!("CARGO_PKG_VERSION").into(),
        service: "parlor-gateway".into(),
        store: store.name().into(),
        active_sessions: state.registry.active_sessions(),
    })
}
