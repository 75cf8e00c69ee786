//! Parlor Gateway - conversational memory over a remote text generator.
//!
//! This crate provides the conversation service:
//! - One serialized actor per session
//! - Bounded context windows (preamble + last 8 messages)
//! - A single-attempt inference gateway with failure classification
//! - HTTP routes for send, clear, history, and health
//!
//! ## Architecture
//!
//! ```text
//! Client → Router → Registry → SessionActor (FIFO slot)
//!                                   ├── ConversationStore (load / persist)
//!                                   └── InferenceGateway → Provider
//! ```

#![warn(clippy::all)]
#![allow(clippy::pedantic)]

pub mod error;
pub mod inference;
pub mod provider;
pub mod routes;
pub mod session;

pub use error::{ErrorKind, SessionError};
pub use inference::{GenerationParams, InferenceError, InferenceGateway};
pub use provider::{create_provider, ChatMessage, ChatRequest, ChatResponse, Provider, ProviderError};
pub use routes::AppState;
pub use session::{ContextWindow, SendReply, SessionActor, SessionContext, SessionRegistry};

use axum::Router;
use parlor_common::config::Config;
use parlor_memory::{ConversationStore, InMemoryConversationStore, SqliteConversationStore};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Build the router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    routes::session_routes(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

/// Open the configured conversation store.
pub fn create_store(config: &Config) -> anyhow::Result<Arc<dyn ConversationStore>> {
    match config.memory.backend.as_str() {
        "memory" => Ok(Arc::new(InMemoryConversationStore::new())),
        _ => {
            let dir = config.memory.resolved_path();
            let store = SqliteConversationStore::new(&dir)?;
            tracing::info!(path = %store.db_path().display(), "Opened conversation store");
            Ok(Arc::new(store))
        }
    }
}

/// Wire a registry around an already-built store and provider.
pub fn build_registry(
    config: &Config,
    store: Arc<dyn ConversationStore>,
    provider: Arc<dyn Provider>,
) -> SessionRegistry {
    let gateway = InferenceGateway::new(provider, GenerationParams::from(&config.inference));
    SessionRegistry::new(SessionContext {
        store,
        gateway: Arc::new(gateway),
        window: ContextWindow::new(
            config.session.system_prompt.clone(),
            config.session.window_size,
        ),
        history_limit: config.session.history_limit,
    })
}

/// Build application state from configuration.
pub fn build_state(config: &Config) -> anyhow::Result<AppState> {
    let store = create_store(config)?;
    let provider = create_provider(&config.inference);
    tracing::info!(
        provider = provider.name(),
        model = %config.inference.model,
        store = store.name(),
        "Inference configured"
    );

    Ok(AppState {
        registry: Arc::new(build_registry(config, store, provider)),
        default_session: config.session.default_session.clone(),
    })
}

/// Start the gateway server and run until Ctrl-C.
pub async fn start_server(config: &Config) -> anyhow::Result<()> {
    let addr = SocketAddr::from((
        config.network.bind.parse::<std::net::IpAddr>()?,
        config.network.port,
    ));

    let state = build_state(config)?;
    let sweeper = (config.session.idle_sweep_secs > 0).then(|| {
        state
            .registry
            .spawn_idle_sweeper(Duration::from_secs(config.session.idle_sweep_secs))
    });

    let router = build_router(state);

    tracing::info!("Starting Parlor Gateway on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(sweeper) = sweeper {
        sweeper.abort();
    }
    tracing::info!("Parlor Gateway stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
