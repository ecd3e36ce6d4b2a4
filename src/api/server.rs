//! HTTP API server

use super::error::ApiError;
use super::{items, query};
use crate::services::BrainService;
use crate::storage::KnowledgeStore;
use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::{net::SocketAddr, sync::Arc};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

/// API server configuration
#[derive(Debug, Clone)]
pub struct ApiServerConfig {
    /// Server address
    pub addr: SocketAddr,
}

impl Default for ApiServerConfig {
    fn default() -> Self {
        Self {
            addr: ([127, 0, 0, 1], 3000).into(),
        }
    }
}

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    /// Item persistence
    pub store: Arc<dyn KnowledgeStore>,
    /// Capture and query orchestration
    pub brain: BrainService,
}

impl AppState {
    pub fn new(brain: BrainService) -> Self {
        Self {
            store: brain.store().clone(),
            brain,
        }
    }
}

/// API server
pub struct ApiServer {
    config: ApiServerConfig,
    state: AppState,
}

impl ApiServer {
    pub fn new(config: ApiServerConfig, state: AppState) -> Self {
        Self { config, state }
    }

    /// Build the router with every endpoint and middleware
    pub fn build_router(state: AppState) -> Router {
        Router::new()
            // Items
            .route("/items", get(items::list_items))
            .route("/items/create", post(items::create_item))
            .route(
                "/items/:id",
                get(items::get_item)
                    .patch(items::patch_item)
                    .delete(items::delete_item),
            )
            .route("/tags", get(items::list_tags))
            // Queries
            .route("/query", post(query::query_brain))
            .route("/public/brain/query", get(query::public_query))
            // Admin
            .route("/init-db", get(init_db_handler))
            .route("/health", get(health_handler))
            .with_state(state)
            .layer(CorsLayer::permissive())
            .layer(TraceLayer::new_for_http())
    }

    /// Bind and serve until Ctrl-C or SIGTERM
    pub async fn serve(self) -> anyhow::Result<()> {
        let router = Self::build_router(self.state);

        let listener = tokio::net::TcpListener::bind(self.config.addr).await?;
        info!("API server listening on http://{}", listener.local_addr()?);

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        info!("API server stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}

/// Health check response
#[derive(Debug, Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

/// Health check handler
async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

#[derive(Debug, Serialize)]
struct InitDbResponse {
    success: bool,
    message: String,
}

/// GET /init-db
async fn init_db_handler(State(state): State<AppState>) -> Result<Json<InitDbResponse>, ApiError> {
    state
        .store
        .init_schema()
        .await
        .map_err(|e| ApiError::from_brain(e, "Database initialization failed"))?;

    info!("Schema initialized via /init-db");
    Ok(Json(InitDbResponse {
        success: true,
        message: "Database initialized successfully! Your Second Brain is ready to use."
            .to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_health_handler() {
        let Json(health) = health_handler().await;
        assert_eq!(health.status, "ok");
        assert_eq!(health.version, env!("CARGO_PKG_VERSION"));
    }

    #[test]
    fn test_default_config() {
        assert_eq!(ApiServerConfig::default().addr.port(), 3000);
    }
}
