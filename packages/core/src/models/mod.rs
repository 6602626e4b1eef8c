//! Data Models
//!
//! This module contains the core data structures used throughout Flow Tree:
//!
//! - `Node` - Workspace-scoped record with a value and three reference fields
//! - `CreateNodeInput` / `NodeUpdate` - Create and patch payloads
//!
//! Patch payloads use the double-`Option` pattern so an omitted field and an
//! explicit `null` stay distinguishable all the way down to the store.

mod node;

pub use node::{
    ChildPointers, CreateNodeInput, DeleteResult, Node, NodeId, NodeType, NodeUpdate,
    ReferenceField, ValidationError, MAX_NAME_LENGTH,
};
