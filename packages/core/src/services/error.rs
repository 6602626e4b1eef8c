//! Service Layer Error Types
//!
//! This module defines error types for service-layer operations. Errors fall
//! into two classes:
//!
//! - **Validation**: the request was rejected and nothing was written
//! - **Database**: the store failed; the caller should treat it as internal

use crate::db::DatabaseError;
use crate::models::{NodeId, ReferenceField, ValidationError};
use std::fmt;
use thiserror::Error;

/// What a `NotFound` error refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    /// The node addressed by the operation
    Node,
    /// A node named by one of the reference fields
    Reference(ReferenceField),
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::Node => f.write_str("Node"),
            EntityKind::Reference(field) => write!(f, "Node referenced by {}", field),
        }
    }
}

/// Service operation errors
#[derive(Error, Debug)]
pub enum NodeServiceError {
    /// Node (or referenced node) not found in the workspace
    #[error("{entity} not found: {id}")]
    NotFound { entity: EntityKind, id: NodeId },

    /// A node cannot reference itself
    #[error("Node cannot reference itself as {field}")]
    SelfReference { field: ReferenceField },

    /// Left and right child would be the same node
    #[error("left_child_id and right_child_id cannot be the same node")]
    DuplicateChildren,

    /// The left/right edge would close a cycle
    #[error("Circular reference detected via {field}")]
    Cycle { field: ReferenceField },

    /// The proposed child already has a different parent in the left/right structure
    #[error("Node {child_id} is already a child of node {parent_id} (via {field})")]
    AlreadyChild {
        field: ReferenceField,
        child_id: NodeId,
        parent_id: NodeId,
    },

    /// Validation failed for node input
    #[error("Node validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),

    /// Database operation failed
    #[error("Database operation failed: {0}")]
    DatabaseError(#[from] DatabaseError),
}

impl NodeServiceError {
    /// Create a node not found error
    pub fn node_not_found(id: NodeId) -> Self {
        Self::NotFound {
            entity: EntityKind::Node,
            id,
        }
    }

    /// Create a not found error for a referenced node
    pub fn reference_not_found(field: ReferenceField, id: NodeId) -> Self {
        Self::NotFound {
            entity: EntityKind::Reference(field),
            id,
        }
    }

    /// Create a self reference error
    pub fn self_reference(field: ReferenceField) -> Self {
        Self::SelfReference { field }
    }

    /// Create a cycle error
    pub fn cycle(field: ReferenceField) -> Self {
        Self::Cycle { field }
    }

    /// Create an already-child error
    pub fn already_child(field: ReferenceField, child_id: NodeId, parent_id: NodeId) -> Self {
        Self::AlreadyChild {
            field,
            child_id,
            parent_id,
        }
    }

    /// Whether this is a rejected request (as opposed to a storage failure)
    pub fn is_validation(&self) -> bool {
        !matches!(self, Self::DatabaseError(_))
    }

    /// Whether this error means the addressed or referenced node does not exist
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Stable machine-readable error code
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "NODE_NOT_FOUND",
            Self::SelfReference { .. } => "SELF_REFERENCE",
            Self::DuplicateChildren => "DUPLICATE_CHILDREN",
            Self::Cycle { .. } => "CIRCULAR_REFERENCE",
            Self::AlreadyChild { .. } => "ALREADY_CHILD",
            Self::ValidationFailed(_) => "VALIDATION_ERROR",
            Self::DatabaseError(_) => "DATABASE_ERROR",
        }
    }

    /// Reference field involved in the error, if any
    pub fn field(&self) -> Option<ReferenceField> {
        match self {
            Self::NotFound {
                entity: EntityKind::Reference(field),
                ..
            }
            | Self::SelfReference { field }
            | Self::Cycle { field }
            | Self::AlreadyChild { field, .. } => Some(*field),
            _ => None,
        }
    }
}
