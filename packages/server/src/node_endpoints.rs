//! Node Endpoints
//!
//! REST surface over `NodeService`. Every handler runs in the workspace
//! resolved by the workspace middleware.
//!
//! # Endpoints
//!
//! - `GET /api/health` - Health check endpoint
//! - `GET /api/nodes` - List all nodes in the workspace
//! - `POST /api/nodes` - Create a new node
//! - `GET /api/nodes/:id` - Get a node by ID
//! - `PATCH /api/nodes/:id` - Update a node
//! - `DELETE /api/nodes/:id` - Delete a node

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};
use serde::Serialize;

use crate::http_error::HttpError;
use crate::workspace::WorkspaceId;
use crate::AppState;
use flowtree_core::models::{CreateNodeInput, Node, NodeId, NodeUpdate};

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: String,
    pub version: String,
}

/// Delete response
#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub ok: bool,
}

/// Health check endpoint
///
/// # Example
///
/// ```bash
/// curl http://localhost:8000/api/health
/// ```
async fn health_check() -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// List every node of the caller's workspace, ascending by id
async fn list_nodes(
    State(state): State<AppState>,
    workspace: WorkspaceId,
) -> Result<Json<Vec<Node>>, HttpError> {
    let nodes = state.node_service.list_all(workspace.as_str()).await?;
    Ok(Json(nodes))
}

/// Create a node
///
/// # Example
///
/// ```bash
/// curl -X POST http://localhost:8000/api/nodes \
///   -H "Content-Type: application/json" \
///   -b cookies.txt -c cookies.txt \
///   -d '{"value": 5, "type": "input"}'
/// ```
async fn create_node(
    State(state): State<AppState>,
    workspace: WorkspaceId,
    Json(input): Json<CreateNodeInput>,
) -> Result<(StatusCode, Json<Node>), HttpError> {
    let node = state
        .node_service
        .create(workspace.as_str(), input)
        .await?;

    tracing::debug!("Created node {} via HTTP", node.id);

    Ok((StatusCode::CREATED, Json(node)))
}

async fn get_node(
    State(state): State<AppState>,
    workspace: WorkspaceId,
    Path(id): Path<NodeId>,
) -> Result<Json<Node>, HttpError> {
    let node = state.node_service.get(workspace.as_str(), id).await?;
    Ok(Json(node))
}

/// Partially update a node
///
/// Omitted fields are left unchanged; `null` clears a nullable field.
///
/// # Example
///
/// ```bash
/// curl -X PATCH http://localhost:8000/api/nodes/3 \
///   -H "Content-Type: application/json" \
///   -b cookies.txt \
///   -d '{"left_child_id": null}'
/// ```
async fn update_node(
    State(state): State<AppState>,
    workspace: WorkspaceId,
    Path(id): Path<NodeId>,
    Json(update): Json<NodeUpdate>,
) -> Result<Json<Node>, HttpError> {
    let node = state
        .node_service
        .update(workspace.as_str(), id, update)
        .await?;
    Ok(Json(node))
}

async fn delete_node(
    State(state): State<AppState>,
    workspace: WorkspaceId,
    Path(id): Path<NodeId>,
) -> Result<Json<DeleteResponse>, HttpError> {
    let deleted = state.node_service.delete(workspace.as_str(), id).await?;

    tracing::debug!(
        "Deleted node {} via HTTP ({} references cleared)",
        id,
        deleted.cleared_references
    );

    Ok(Json(DeleteResponse { ok: true }))
}

/// Create node routes
pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health_check))
        .route("/api/nodes", get(list_nodes).post(create_node))
        .route(
            "/api/nodes/:id",
            get(get_node).patch(update_node).delete(delete_node),
        )
        .with_state(state)
}
