//! TursoStore - NodeStore Implementation for the libsql Backend
//!
//! This module implements the store traits on top of `DatabaseService`.
//!
//! # Design Principles
//!
//! 1. **No business rules**: Reference validation lives in the service layer
//! 2. **Row Conversion**: Handles libsql::Row → Node model conversion
//! 3. **Shared SQL**: Autocommit reads and transactional reads run the same queries
//! 4. **Constraint mapping**: Store-level rejections surface as `ConstraintViolation`
//!
//! # Transactions
//!
//! `begin()` opens a dedicated connection and issues `BEGIN IMMEDIATE`, which
//! takes the database write lock before the first read. Two concurrent
//! transactions therefore never validate against the same snapshot.

use crate::db::database::CHILD_CLAIM_CONFLICT;
use crate::db::node_store::{NodeReader, NodeStore, NodeTransaction};
use crate::db::{DatabaseError, DatabaseService};
use crate::models::{ChildPointers, CreateNodeInput, DeleteResult, Node, NodeId, NodeType};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use libsql::{Connection, Row};
use std::sync::Arc;

const NODE_COLUMNS: &str =
    "id, workspace_id, value, name, type, parent_id, left_child_id, right_child_id, created_at";

/// TursoStore implements NodeStore for the libsql backend
///
/// A thin wrapper around DatabaseService. Reads use a fresh autocommit
/// connection; writes go through [`TursoTransaction`].
#[derive(Debug, Clone)]
pub struct TursoStore {
    db: Arc<DatabaseService>,
}

impl TursoStore {
    /// Create a new TursoStore wrapping a DatabaseService
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// # use flowtree_core::db::{TursoStore, DatabaseService};
    /// # use std::sync::Arc;
    /// # use std::path::PathBuf;
    /// # #[tokio::main]
    /// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let db = Arc::new(DatabaseService::new(PathBuf::from("./test.db")).await?);
    /// let store = TursoStore::new(db);
    /// # Ok(())
    /// # }
    /// ```
    pub fn new(db: Arc<DatabaseService>) -> Self {
        Self { db }
    }
}

/// An open `BEGIN IMMEDIATE` transaction on its own connection
///
/// If the value is dropped without `commit`, closing the connection rolls
/// the transaction back.
pub struct TursoTransaction {
    conn: Connection,
}

/// Parse timestamp from database - handles both SQLite and RFC3339 formats
///
/// SQLite CURRENT_TIMESTAMP returns: "YYYY-MM-DD HH:MM:SS"
fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, DatabaseError> {
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Ok(naive.and_utc());
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }

    Err(DatabaseError::row_decode(format!(
        "Unable to parse timestamp '{}' as SQLite or RFC3339 format",
        s
    )))
}

/// Convert libsql::Row to Node model
///
/// # Row Format
///
/// Expected columns (in order), see `NODE_COLUMNS`:
/// - id (INTEGER)
/// - workspace_id (TEXT)
/// - value (INTEGER)
/// - name (TEXT, nullable)
/// - type (TEXT, nullable)
/// - parent_id, left_child_id, right_child_id (INTEGER, nullable)
/// - created_at (TEXT)
fn row_to_node(row: &Row) -> Result<Node, DatabaseError> {
    let decode = |column: &str, e: libsql::Error| {
        DatabaseError::row_decode(format!("Failed to get {}: {}", column, e))
    };

    let id: i64 = row.get(0).map_err(|e| decode("id", e))?;
    let workspace_id: String = row.get(1).map_err(|e| decode("workspace_id", e))?;
    let value: i64 = row.get(2).map_err(|e| decode("value", e))?;
    let name: Option<String> = row.get(3).map_err(|e| decode("name", e))?;
    let node_type: Option<String> = row.get(4).map_err(|e| decode("type", e))?;
    let parent_id: Option<i64> = row.get(5).map_err(|e| decode("parent_id", e))?;
    let left_child_id: Option<i64> = row.get(6).map_err(|e| decode("left_child_id", e))?;
    let right_child_id: Option<i64> = row.get(7).map_err(|e| decode("right_child_id", e))?;
    let created_at_str: String = row.get(8).map_err(|e| decode("created_at", e))?;

    let node_type = node_type
        .map(|t| t.parse::<NodeType>())
        .transpose()
        .map_err(|e| DatabaseError::row_decode(format!("Node {}: {}", id, e)))?;

    Ok(Node {
        id,
        workspace_id,
        value,
        name,
        node_type,
        parent_id,
        left_child_id,
        right_child_id,
        created_at: parse_timestamp(&created_at_str)?,
    })
}

/// Classify a failed write
///
/// Trigger aborts and CHECK/FOREIGN KEY failures become `ConstraintViolation`
/// so callers can tell a rejected write from a broken database.
fn map_write_error(context: &str, e: libsql::Error) -> DatabaseError {
    let message = e.to_string();
    if message.contains(CHILD_CLAIM_CONFLICT) || message.contains("constraint failed") {
        DatabaseError::constraint_violation(format!("{}: {}", context, message))
    } else {
        DatabaseError::sql_execution(format!("{}: {}", context, message))
    }
}

async fn select_node(
    conn: &Connection,
    workspace_id: &str,
    id: NodeId,
) -> Result<Option<Node>, DatabaseError> {
    let sql = format!(
        "SELECT {} FROM number_nodes WHERE workspace_id = ? AND id = ?",
        NODE_COLUMNS
    );
    let mut rows = conn
        .query(&sql, (workspace_id, id))
        .await
        .map_err(|e| DatabaseError::sql_execution(format!("Failed to get node {}: {}", id, e)))?;

    match rows.next().await? {
        Some(row) => Ok(Some(row_to_node(&row)?)),
        None => Ok(None),
    }
}

async fn select_child_pointers(
    conn: &Connection,
    workspace_id: &str,
    id: NodeId,
) -> Result<Option<ChildPointers>, DatabaseError> {
    let mut rows = conn
        .query(
            "SELECT left_child_id, right_child_id FROM number_nodes
             WHERE workspace_id = ? AND id = ?",
            (workspace_id, id),
        )
        .await
        .map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to get children of {}: {}", id, e))
        })?;

    match rows.next().await? {
        Some(row) => Ok(Some(ChildPointers {
            left_child_id: row.get(0)?,
            right_child_id: row.get(1)?,
        })),
        None => Ok(None),
    }
}

async fn select_child_owner(
    conn: &Connection,
    workspace_id: &str,
    child_id: NodeId,
    excluding: Option<NodeId>,
) -> Result<Option<NodeId>, DatabaseError> {
    let mut rows = conn
        .query(
            "SELECT id FROM number_nodes
             WHERE workspace_id = ?1
               AND (left_child_id = ?2 OR right_child_id = ?2)
               AND (?3 IS NULL OR id <> ?3)
             ORDER BY id
             LIMIT 1",
            (workspace_id, child_id, excluding),
        )
        .await
        .map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to find owner of {}: {}", child_id, e))
        })?;

    match rows.next().await? {
        Some(row) => Ok(Some(row.get(0)?)),
        None => Ok(None),
    }
}

async fn select_all_nodes(conn: &Connection, workspace_id: &str) -> Result<Vec<Node>, DatabaseError> {
    let sql = format!(
        "SELECT {} FROM number_nodes WHERE workspace_id = ? ORDER BY id",
        NODE_COLUMNS
    );
    let mut rows = conn
        .query(&sql, [workspace_id])
        .await
        .map_err(|e| DatabaseError::sql_execution(format!("Failed to list nodes: {}", e)))?;

    let mut nodes = Vec::new();
    while let Some(row) = rows.next().await? {
        nodes.push(row_to_node(&row)?);
    }
    Ok(nodes)
}

#[async_trait]
impl NodeReader for TursoStore {
    async fn get_node(
        &self,
        workspace_id: &str,
        id: NodeId,
    ) -> Result<Option<Node>, DatabaseError> {
        let conn = self.db.connect_with_timeout().await?;
        select_node(&conn, workspace_id, id).await
    }

    async fn get_child_pointers(
        &self,
        workspace_id: &str,
        id: NodeId,
    ) -> Result<Option<ChildPointers>, DatabaseError> {
        let conn = self.db.connect_with_timeout().await?;
        select_child_pointers(&conn, workspace_id, id).await
    }

    async fn find_child_owner(
        &self,
        workspace_id: &str,
        child_id: NodeId,
        excluding: Option<NodeId>,
    ) -> Result<Option<NodeId>, DatabaseError> {
        let conn = self.db.connect_with_timeout().await?;
        select_child_owner(&conn, workspace_id, child_id, excluding).await
    }

    async fn list_nodes(&self, workspace_id: &str) -> Result<Vec<Node>, DatabaseError> {
        let conn = self.db.connect_with_timeout().await?;
        select_all_nodes(&conn, workspace_id).await
    }
}

#[async_trait]
impl NodeStore for TursoStore {
    async fn begin(&self) -> Result<Box<dyn NodeTransaction>, DatabaseError> {
        let conn = self.db.connect_with_timeout().await?;

        conn.execute("BEGIN IMMEDIATE", ()).await.map_err(|e| {
            DatabaseError::transaction_failed(format!("Failed to begin transaction: {}", e))
        })?;

        Ok(Box::new(TursoTransaction { conn }))
    }
}

#[async_trait]
impl NodeReader for TursoTransaction {
    async fn get_node(
        &self,
        workspace_id: &str,
        id: NodeId,
    ) -> Result<Option<Node>, DatabaseError> {
        select_node(&self.conn, workspace_id, id).await
    }

    async fn get_child_pointers(
        &self,
        workspace_id: &str,
        id: NodeId,
    ) -> Result<Option<ChildPointers>, DatabaseError> {
        select_child_pointers(&self.conn, workspace_id, id).await
    }

    async fn find_child_owner(
        &self,
        workspace_id: &str,
        child_id: NodeId,
        excluding: Option<NodeId>,
    ) -> Result<Option<NodeId>, DatabaseError> {
        select_child_owner(&self.conn, workspace_id, child_id, excluding).await
    }

    async fn list_nodes(&self, workspace_id: &str) -> Result<Vec<Node>, DatabaseError> {
        select_all_nodes(&self.conn, workspace_id).await
    }
}

#[async_trait]
impl NodeTransaction for TursoTransaction {
    async fn insert_node(
        &self,
        workspace_id: &str,
        input: &CreateNodeInput,
    ) -> Result<Node, DatabaseError> {
        self.conn
            .execute(
                "INSERT INTO number_nodes
                     (workspace_id, value, name, type, parent_id, left_child_id, right_child_id)
                 VALUES (?, ?, ?, ?, ?, ?, ?)",
                (
                    workspace_id,
                    input.value,
                    input.name.as_deref(),
                    input.node_type.map(|t| t.as_str()),
                    input.parent_id,
                    input.left_child_id,
                    input.right_child_id,
                ),
            )
            .await
            .map_err(|e| map_write_error("Failed to insert node", e))?;

        let id = self.conn.last_insert_rowid();
        select_node(&self.conn, workspace_id, id)
            .await?
            .ok_or_else(|| {
                DatabaseError::sql_execution(format!("Inserted node {} could not be read back", id))
            })
    }

    async fn update_node_fields(
        &self,
        workspace_id: &str,
        node: &Node,
    ) -> Result<Node, DatabaseError> {
        let changed = self
            .conn
            .execute(
                "UPDATE number_nodes
                 SET value = ?, name = ?, type = ?,
                     parent_id = ?, left_child_id = ?, right_child_id = ?
                 WHERE workspace_id = ? AND id = ?",
                (
                    node.value,
                    node.name.as_deref(),
                    node.node_type.map(|t| t.as_str()),
                    node.parent_id,
                    node.left_child_id,
                    node.right_child_id,
                    workspace_id,
                    node.id,
                ),
            )
            .await
            .map_err(|e| map_write_error(&format!("Failed to update node {}", node.id), e))?;

        if changed == 0 {
            return Err(DatabaseError::sql_execution(format!(
                "Node {} not found during update",
                node.id
            )));
        }

        select_node(&self.conn, workspace_id, node.id)
            .await?
            .ok_or_else(|| {
                DatabaseError::sql_execution(format!(
                    "Updated node {} could not be read back",
                    node.id
                ))
            })
    }

    async fn delete_node(
        &self,
        workspace_id: &str,
        id: NodeId,
    ) -> Result<Option<DeleteResult>, DatabaseError> {
        let Some(node) = select_node(&self.conn, workspace_id, id).await? else {
            return Ok(None);
        };

        let mut cleared_references = 0;
        for column in ["parent_id", "left_child_id", "right_child_id"] {
            let sql = format!(
                "UPDATE number_nodes SET {column} = NULL WHERE workspace_id = ? AND {column} = ?"
            );
            cleared_references += self
                .conn
                .execute(&sql, (workspace_id, id))
                .await
                .map_err(|e| map_write_error(&format!("Failed to clear {}", column), e))?;
        }

        self.conn
            .execute(
                "DELETE FROM number_nodes WHERE workspace_id = ? AND id = ?",
                (workspace_id, id),
            )
            .await
            .map_err(|e| map_write_error(&format!("Failed to delete node {}", id), e))?;

        Ok(Some(DeleteResult {
            node,
            cleared_references,
        }))
    }

    async fn commit(self: Box<Self>) -> Result<(), DatabaseError> {
        if let Err(e) = self.conn.execute("COMMIT", ()).await {
            if let Err(rollback_err) = self.conn.execute("ROLLBACK", ()).await {
                tracing::warn!(
                    "Failed to roll back after failed commit: {}",
                    rollback_err
                );
            }
            return Err(DatabaseError::transaction_failed(format!(
                "Failed to commit transaction: {}",
                e
            )));
        }
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), DatabaseError> {
        self.conn.execute("ROLLBACK", ()).await.map_err(|e| {
            DatabaseError::transaction_failed(format!("Failed to roll back transaction: {}", e))
        })?;
        Ok(())
    }
}
