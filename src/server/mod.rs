//! HTTP backend: ephemeral session minting and the knowledge search proxy.
//!
//! # Routes
//! - `GET /api/session` mints an ephemeral realtime session
//! - `POST /api/knowledge/search` proxies to the retrieval service

mod handlers;

use crate::config::ServerConfig;
use crate::knowledge::KnowledgeClient;
use crate::protocol::models::SessionConfig;
use crate::sdk::{ToolRegistry, DEFAULT_INSTRUCTIONS};
use crate::transport::rest::RealtimeRestAdapter;
use crate::{Error, Result};
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Shared state behind every handler.
pub struct AppState {
    /// `None` when no API key is configured.
    realtime: Option<RealtimeRestAdapter>,
    session: SessionConfig,
    knowledge: KnowledgeClient,
}

impl AppState {
    /// # Errors
    /// Returns an error if a configured URL is invalid or the API key is not a valid header.
    #[allow(clippy::result_large_err)]
    pub fn from_config(config: &ServerConfig) -> Result<Self> {
        let realtime = match &config.api_key {
            Some(key) => Some(RealtimeRestAdapter::new(key, &config.realtime_base)?),
            None => {
                tracing::warn!("OPENAI_API_KEY is not set; session requests will fail");
                None
            }
        };
        let tools = ToolRegistry::whiteboard().try_as_tools()?;
        let session = SessionConfig::for_creation(&config.model, config.voice.as_str(), DEFAULT_INSTRUCTIONS, tools);
        let knowledge = KnowledgeClient::new(&config.knowledge_url, config.image_base.clone())?;
        Ok(Self { realtime, session, knowledge })
    }

    async fn mint_session(&self) -> Result<serde_json::Value> {
        let adapter = self.realtime.as_ref().ok_or_else(|| {
            Error::InvalidConfig("OPENAI_API_KEY environment variable is not set".to_string())
        })?;
        adapter.create_session(&self.session).await
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/session", get(handlers::create_session))
        .route("/api/knowledge/search", post(handlers::search_knowledge))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind `config.bind_addr` and serve until Ctrl-C.
///
/// # Errors
/// Returns an error if the state cannot be built or the listener fails.
pub async fn serve(config: ServerConfig) -> Result<()> {
    let state = Arc::new(AppState::from_config(&config)?);
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!(addr = %listener.local_addr()?, model = %config.model, "Server listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {err}");
        std::future::pending::<()>().await;
    }
}
