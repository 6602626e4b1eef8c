//! NodeStore Traits - Database Abstraction Layer
//!
//! This module defines the traits that separate `NodeService` (business
//! rules) from the libsql implementation.
//!
//! # Architecture
//!
//! - [`NodeReader`]: point reads and scans used by validation and listing
//! - [`NodeTransaction`]: a reader that can also write, committed or rolled back as a unit
//! - [`NodeStore`]: autocommit reads plus `begin()` for a write transaction
//!
//! Every method takes the workspace explicitly. A node that exists in another
//! workspace is indistinguishable from one that does not exist.
//!
//! # Design Decisions
//!
//! 1. **Async-First**: All methods are async
//! 2. **One writer at a time**: `begin()` acquires the write lock up front, so
//!    a validation read and the write that follows it see the same state
//! 3. **Error Handling**: Uses `DatabaseError`; business errors live in `NodeServiceError`
//!
//! # Examples
//!
//! ```rust,no_run
//! use flowtree_core::db::{DatabaseService, NodeReader, NodeStore, NodeTransaction, TursoStore};
//! use flowtree_core::models::CreateNodeInput;
//! use std::path::PathBuf;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let db = Arc::new(DatabaseService::new(PathBuf::from("./data/flowtree.db")).await?);
//!     let store: Arc<dyn NodeStore> = Arc::new(TursoStore::new(db));
//!
//!     let tx = store.begin().await?;
//!     let node = tx.insert_node("ws-1", &CreateNodeInput::new(5)).await?;
//!     tx.commit().await?;
//!
//!     assert!(store.get_node("ws-1", node.id).await?.is_some());
//!     Ok(())
//! }
//! ```

use crate::db::DatabaseError;
use crate::models::{ChildPointers, CreateNodeInput, DeleteResult, Node, NodeId};
use async_trait::async_trait;

/// Read access to nodes of a workspace
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync` to allow usage in async contexts where
/// futures may be moved between threads.
#[async_trait]
pub trait NodeReader: Send + Sync {
    /// Fetch a node by id
    ///
    /// Returns `Ok(None)` when the id does not exist in `workspace_id`.
    async fn get_node(&self, workspace_id: &str, id: NodeId)
        -> Result<Option<Node>, DatabaseError>;

    /// Fetch only the left/right pointers of a node
    ///
    /// Used by the cycle walk, which visits many nodes and needs nothing else.
    async fn get_child_pointers(
        &self,
        workspace_id: &str,
        id: NodeId,
    ) -> Result<Option<ChildPointers>, DatabaseError>;

    /// Find a node that holds `child_id` in its left or right column
    ///
    /// `excluding` skips one node, typically the node being updated.
    async fn find_child_owner(
        &self,
        workspace_id: &str,
        child_id: NodeId,
        excluding: Option<NodeId>,
    ) -> Result<Option<NodeId>, DatabaseError>;

    /// All nodes of a workspace, ordered by id
    async fn list_nodes(&self, workspace_id: &str) -> Result<Vec<Node>, DatabaseError>;
}

/// A write transaction
///
/// Dropping a transaction without calling `commit` discards its writes.
#[async_trait]
pub trait NodeTransaction: NodeReader {
    /// Insert a node and return it with its assigned id and timestamp
    ///
    /// # Errors
    ///
    /// `DatabaseError::ConstraintViolation` if the store rejects the row
    /// (a child already claimed elsewhere, equal children, dangling reference).
    async fn insert_node(
        &self,
        workspace_id: &str,
        input: &CreateNodeInput,
    ) -> Result<Node, DatabaseError>;

    /// Overwrite the mutable columns of `node` and return the stored row
    ///
    /// `id`, `workspace_id` and `created_at` are never written.
    async fn update_node_fields(
        &self,
        workspace_id: &str,
        node: &Node,
    ) -> Result<Node, DatabaseError>;

    /// Delete a node after clearing every reference other nodes hold to it
    ///
    /// Returns `Ok(None)` if the node does not exist in `workspace_id`.
    async fn delete_node(
        &self,
        workspace_id: &str,
        id: NodeId,
    ) -> Result<Option<DeleteResult>, DatabaseError>;

    /// Make all writes of this transaction visible
    async fn commit(self: Box<Self>) -> Result<(), DatabaseError>;

    /// Discard all writes of this transaction
    async fn rollback(self: Box<Self>) -> Result<(), DatabaseError>;
}

/// Entry point to node persistence
#[async_trait]
pub trait NodeStore: NodeReader {
    /// Open a write transaction
    ///
    /// Blocks (up to the busy timeout) while another write transaction is open.
    async fn begin(&self) -> Result<Box<dyn NodeTransaction>, DatabaseError>;
}
