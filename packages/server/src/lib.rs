//! Flow Tree HTTP server
//!
//! Exposes `NodeService` as a JSON REST API under `/api`. Browsers are
//! assigned a workspace through the `workspace_id` cookie; every request only
//! sees the nodes of its own workspace.
//!
//! # Layers (outermost first)
//!
//! - CORS for the configured frontend origin, with credentials
//! - HTTP request tracing
//! - Workspace cookie resolution
//!
//! # Usage
//!
//! ```bash
//! FLOWTREE_PORT=8000 cargo run --bin flowtree-server
//! ```

use anyhow::Context;
use axum::{
    http::{header, HeaderValue, Method},
    middleware, Router,
};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use flowtree_core::db::{DatabaseService, TursoStore};
use flowtree_core::services::NodeService;

pub mod config;
mod http_error;
mod node_endpoints;
pub mod workspace;

pub use config::ServerConfig;
pub use http_error::HttpError;
pub use workspace::{WorkspaceId, WORKSPACE_COOKIE};

/// Application state shared across all endpoints
#[derive(Clone)]
pub struct AppState {
    pub node_service: NodeService,
}

impl AppState {
    /// Open (or create) the database at `db_path` and build the services on top
    pub async fn open(db_path: PathBuf) -> anyhow::Result<Self> {
        let db = DatabaseService::new(db_path.clone())
            .await
            .with_context(|| format!("Failed to open database at {}", db_path.display()))?;
        let store = TursoStore::new(Arc::new(db));

        Ok(Self {
            node_service: NodeService::new(Arc::new(store)),
        })
    }
}

/// Create the application router with all layers applied
pub fn create_router(state: AppState, cors_origin: &str) -> anyhow::Result<Router> {
    Ok(node_endpoints::routes(state)
        .layer(middleware::from_fn(workspace::workspace_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(cors_origin)?))
}

/// Create CORS layer for the frontend origin
///
/// Credentials are allowed so the browser sends the workspace cookie, which
/// rules out wildcard origins and headers.
fn cors_layer(origin: &str) -> anyhow::Result<CorsLayer> {
    let origin = origin
        .parse::<HeaderValue>()
        .with_context(|| format!("Invalid CORS_ALLOW_ORIGIN '{}'", origin))?;

    Ok(CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE])
        .allow_credentials(true))
}

/// Start the HTTP server and run until the listener fails
///
/// # Errors
///
/// Returns error if the database cannot be opened or the server fails to bind.
pub async fn start_server(config: ServerConfig) -> anyhow::Result<()> {
    let state = AppState::open(config.db_path.clone()).await?;
    let app = create_router(state, &config.cors_origin)?;

    let addr = config.socket_addr();
    tracing::info!("Flow Tree server starting on http://{}", addr);
    tracing::info!("Database: {}", config.db_path.display());
    tracing::info!("CORS enabled for {}", config.cors_origin);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app).await?;

    Ok(())
}
