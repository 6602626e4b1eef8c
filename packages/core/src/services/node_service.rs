//! Node Service - Core CRUD Operations
//!
//! This module provides the business logic layer for node operations:
//!
//! - CRUD operations (create, get, update, delete, list_all)
//! - Reference validation for the parent hierarchy and the left/right structure
//! - Set-null-on-delete for incoming references
//!
//! # Transactions
//!
//! Every write runs inside one store transaction. Validation reads go through
//! that transaction, so a check and the write it guards cannot interleave with
//! another writer. Any error rolls the transaction back; nothing is written
//! unless every check passed.
//!
//! # Workspaces
//!
//! Each call takes the workspace explicitly. Nodes in other workspaces are
//! invisible: they cannot be fetched, referenced, or reported as conflicting.

use crate::db::{NodeReader, NodeStore, NodeTransaction};
use crate::models::{
    CreateNodeInput, DeleteResult, Node, NodeId, NodeUpdate, ReferenceField,
};
use crate::services::error::NodeServiceError;
use crate::services::reference_validator::ReferenceValidator;
use std::sync::Arc;

const CHILD_FIELDS: [ReferenceField; 2] = [ReferenceField::LeftChild, ReferenceField::RightChild];

/// Core service for node CRUD operations
///
/// # Examples
///
/// ```no_run
/// use flowtree_core::db::{DatabaseService, TursoStore};
/// use flowtree_core::models::CreateNodeInput;
/// use flowtree_core::services::NodeService;
/// use std::path::PathBuf;
/// use std::sync::Arc;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let db = Arc::new(DatabaseService::new(PathBuf::from("./data/flowtree.db")).await?);
///     let service = NodeService::new(Arc::new(TursoStore::new(db)));
///
///     let leaf = service.create("ws-1", CreateNodeInput::new(1)).await?;
///     let root = service
///         .create("ws-1", CreateNodeInput::new(2).with_left_child(leaf.id))
///         .await?;
///     assert_eq!(root.left_child_id, Some(leaf.id));
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct NodeService {
    store: Arc<dyn NodeStore>,
}

impl NodeService {
    /// Create a new NodeService over a store
    pub fn new(store: Arc<dyn NodeStore>) -> Self {
        Self { store }
    }

    /// Every node of the workspace, ascending by id
    pub async fn list_all(&self, workspace_id: &str) -> Result<Vec<Node>, NodeServiceError> {
        Ok(self.store.list_nodes(workspace_id).await?)
    }

    /// Fetch one node
    ///
    /// # Errors
    ///
    /// `NotFound` if the node does not exist in `workspace_id`.
    pub async fn get(&self, workspace_id: &str, id: NodeId) -> Result<Node, NodeServiceError> {
        self.store
            .get_node(workspace_id, id)
            .await?
            .ok_or_else(|| NodeServiceError::node_not_found(id))
    }

    /// Create a node
    ///
    /// All references are validated with no self id: there is nothing to
    /// self-reference yet and a fresh node cannot be part of a cycle.
    ///
    /// # Errors
    ///
    /// - `ValidationFailed`: name too long
    /// - `DuplicateChildren`: both children supplied and equal
    /// - `NotFound` / `AlreadyChild`: from reference validation
    pub async fn create(
        &self,
        workspace_id: &str,
        input: CreateNodeInput,
    ) -> Result<Node, NodeServiceError> {
        input.validate()?;

        if input.left_child_id.is_some() && input.left_child_id == input.right_child_id {
            return Err(NodeServiceError::DuplicateChildren);
        }

        let tx = self.store.begin().await?;
        let result = Self::create_in(tx.as_ref(), workspace_id, &input).await;
        let node = Self::finish(tx, result).await?;

        tracing::info!("Created node {} in workspace {}", node.id, workspace_id);
        Ok(node)
    }

    async fn create_in(
        tx: &dyn NodeTransaction,
        workspace_id: &str,
        input: &CreateNodeInput,
    ) -> Result<Node, NodeServiceError> {
        let validator = ReferenceValidator::new(tx);

        validator
            .validate_parent(workspace_id, input.parent_id, None)
            .await?;
        validator
            .validate_child_reference(
                workspace_id,
                input.left_child_id,
                None,
                ReferenceField::LeftChild,
            )
            .await?;
        validator
            .validate_child_reference(
                workspace_id,
                input.right_child_id,
                None,
                ReferenceField::RightChild,
            )
            .await?;

        Ok(tx.insert_node(workspace_id, input).await?)
    }

    /// Apply a partial update
    ///
    /// Only fields present in `update` change. An explicit null clears a
    /// field; an omitted field keeps its stored value. Reference fields in the
    /// patch are validated against the node's own id, so self-reference and
    /// cycle checks apply. An empty patch writes nothing and returns the
    /// stored node.
    ///
    /// # Errors
    ///
    /// - `NotFound`: the node does not exist in `workspace_id`
    /// - `ValidationFailed`: name too long
    /// - `DuplicateChildren`: the effective left and right child would be equal
    /// - any reference validation error
    pub async fn update(
        &self,
        workspace_id: &str,
        id: NodeId,
        update: NodeUpdate,
    ) -> Result<Node, NodeServiceError> {
        if update.is_empty() {
            tracing::debug!("Empty patch for node {}, nothing to write", id);
            return self.get(workspace_id, id).await;
        }

        let tx = self.store.begin().await?;
        let result = Self::update_in(tx.as_ref(), workspace_id, id, &update).await;
        let node = Self::finish(tx, result).await?;

        tracing::info!("Updated node {} in workspace {}", id, workspace_id);
        Ok(node)
    }

    async fn update_in(
        tx: &dyn NodeTransaction,
        workspace_id: &str,
        id: NodeId,
        update: &NodeUpdate,
    ) -> Result<Node, NodeServiceError> {
        let mut node = tx
            .get_node(workspace_id, id)
            .await?
            .ok_or_else(|| NodeServiceError::node_not_found(id))?;

        update.validate()?;

        let left = update.left_child_id.unwrap_or(node.left_child_id);
        let right = update.right_child_id.unwrap_or(node.right_child_id);
        if left.is_some() && left == right {
            return Err(NodeServiceError::DuplicateChildren);
        }

        if let Some(value) = update.value {
            node.value = value;
        }
        if let Some(name) = &update.name {
            node.name = name.clone();
        }
        if let Some(node_type) = update.node_type {
            node.node_type = node_type;
        }

        let validator = ReferenceValidator::new(tx);

        if let Some(parent_id) = update.parent_id {
            validator
                .validate_parent(workspace_id, parent_id, Some(id))
                .await?;
            node.parent_id = parent_id;
        }

        for field in CHILD_FIELDS {
            if let Some(child_id) = update.reference(field) {
                validator
                    .validate_child_reference(workspace_id, child_id, Some(id), field)
                    .await?;
                node.set_reference(field, child_id);
            }
        }

        Ok(tx.update_node_fields(workspace_id, &node).await?)
    }

    /// Delete a node
    ///
    /// Every reference to the node held by other nodes is cleared in the same
    /// transaction. Children are not deleted.
    ///
    /// # Errors
    ///
    /// `NotFound` if the node does not exist in `workspace_id`.
    pub async fn delete(
        &self,
        workspace_id: &str,
        id: NodeId,
    ) -> Result<DeleteResult, NodeServiceError> {
        let tx = self.store.begin().await?;
        let result = match tx.delete_node(workspace_id, id).await {
            Ok(Some(deleted)) => Ok(deleted),
            Ok(None) => Err(NodeServiceError::node_not_found(id)),
            Err(e) => Err(e.into()),
        };
        let deleted = Self::finish(tx, result).await?;

        tracing::info!(
            "Deleted node {} in workspace {} ({} references cleared)",
            id,
            workspace_id,
            deleted.cleared_references
        );
        Ok(deleted)
    }

    /// Commit on success, roll back on error
    ///
    /// A failed rollback is logged and the original error is returned.
    async fn finish<T>(
        tx: Box<dyn NodeTransaction>,
        result: Result<T, NodeServiceError>,
    ) -> Result<T, NodeServiceError> {
        match result {
            Ok(value) => {
                tx.commit().await?;
                Ok(value)
            }
            Err(e) => {
                if let Err(rollback_err) = tx.rollback().await {
                    tracing::warn!("Failed to roll back transaction: {}", rollback_err);
                }
                Err(e)
            }
        }
    }
}
