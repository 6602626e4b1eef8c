//! Node Data Structures
//!
//! This module defines the `Node` record stored per workspace and the input
//! types used to create and patch it.
//!
//! # Reference Fields
//!
//! Every node carries three optional references to other nodes in the same
//! workspace:
//!
//! - `parent_id`: free-form hierarchy pointer (existence and self-reference checked only)
//! - `left_child_id` / `right_child_id`: binary forest edges (acyclic, one owner per child)
//!
//! # Examples
//!
//! ```rust
//! use flowtree_core::models::{CreateNodeInput, NodeType, NodeUpdate};
//!
//! let input = CreateNodeInput::new(42)
//!     .with_name("root")
//!     .with_node_type(NodeType::Input);
//!
//! // Clear the left child, leave everything else untouched
//! let patch = NodeUpdate {
//!     left_child_id: Some(None),
//!     ..Default::default()
//! };
//! assert!(!patch.is_empty());
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Store-assigned node identifier
pub type NodeId = i64;

/// Maximum length of a node name (matches the original column width)
pub const MAX_NAME_LENGTH: usize = 255;

/// Validation errors for node input shape
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Invalid node type: {0} (expected 'input', 'process', or 'output')")]
    InvalidNodeType(String),

    #[error("Name too long: {length} characters (max {max})")]
    NameTooLong { length: usize, max: usize },
}

/// Role of a node in a flow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeType {
    Input,
    Process,
    Output,
}

impl NodeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeType::Input => "input",
            NodeType::Process => "process",
            NodeType::Output => "output",
        }
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NodeType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "input" => Ok(NodeType::Input),
            "process" => Ok(NodeType::Process),
            "output" => Ok(NodeType::Output),
            other => Err(ValidationError::InvalidNodeType(other.to_string())),
        }
    }
}

/// The three reference columns a node can hold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReferenceField {
    #[serde(rename = "parent_id")]
    Parent,
    #[serde(rename = "left_child_id")]
    LeftChild,
    #[serde(rename = "right_child_id")]
    RightChild,
}

impl ReferenceField {
    /// Column / JSON field name
    pub fn as_str(&self) -> &'static str {
        match self {
            ReferenceField::Parent => "parent_id",
            ReferenceField::LeftChild => "left_child_id",
            ReferenceField::RightChild => "right_child_id",
        }
    }
}

impl fmt::Display for ReferenceField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A node record scoped to one workspace.
///
/// # Fields
///
/// - `id`: Store-assigned identifier, never reused
/// - `workspace_id`: Owning workspace (immutable after creation)
/// - `value`: Required numeric payload
/// - `name` / `node_type`: Optional descriptive fields
/// - `parent_id`: Optional hierarchy pointer
/// - `left_child_id` / `right_child_id`: Optional binary forest edges
/// - `created_at`: Set by the store at insert time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,

    /// Workspace namespace; never serialized back to clients
    #[serde(skip_serializing, default)]
    pub workspace_id: String,

    pub value: i64,

    pub name: Option<String>,

    #[serde(rename = "type")]
    pub node_type: Option<NodeType>,

    pub parent_id: Option<NodeId>,

    pub left_child_id: Option<NodeId>,

    pub right_child_id: Option<NodeId>,

    pub created_at: DateTime<Utc>,
}

impl Node {
    /// Assign one of the reference columns
    pub fn set_reference(&mut self, field: ReferenceField, target: Option<NodeId>) {
        match field {
            ReferenceField::Parent => self.parent_id = target,
            ReferenceField::LeftChild => self.left_child_id = target,
            ReferenceField::RightChild => self.right_child_id = target,
        }
    }

    /// Whether any reference column points at `id`
    pub fn references(&self, id: NodeId) -> bool {
        self.parent_id == Some(id)
            || self.left_child_id == Some(id)
            || self.right_child_id == Some(id)
    }
}

/// Left/right pointers of a node, as read by the cycle walk
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChildPointers {
    pub left_child_id: Option<NodeId>,
    pub right_child_id: Option<NodeId>,
}

impl ChildPointers {
    /// Non-null children, left first
    pub fn iter(&self) -> impl Iterator<Item = NodeId> {
        self.left_child_id.into_iter().chain(self.right_child_id)
    }
}

fn validate_name(name: Option<&str>) -> Result<(), ValidationError> {
    if let Some(name) = name {
        let length = name.chars().count();
        if length > MAX_NAME_LENGTH {
            return Err(ValidationError::NameTooLong {
                length,
                max: MAX_NAME_LENGTH,
            });
        }
    }
    Ok(())
}

/// Input for creating a node
///
/// All reference fields are optional and validated before insert.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CreateNodeInput {
    pub value: i64,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default, rename = "type")]
    pub node_type: Option<NodeType>,

    #[serde(default)]
    pub parent_id: Option<NodeId>,

    #[serde(default)]
    pub left_child_id: Option<NodeId>,

    #[serde(default)]
    pub right_child_id: Option<NodeId>,
}

impl CreateNodeInput {
    pub fn new(value: i64) -> Self {
        Self {
            value,
            ..Default::default()
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_node_type(mut self, node_type: NodeType) -> Self {
        self.node_type = Some(node_type);
        self
    }

    pub fn with_parent(mut self, parent_id: NodeId) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    pub fn with_left_child(mut self, child_id: NodeId) -> Self {
        self.left_child_id = Some(child_id);
        self
    }

    pub fn with_right_child(mut self, child_id: NodeId) -> Self {
        self.right_child_id = Some(child_id);
        self
    }

    /// Shape checks the store cannot express as a column type
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_name(self.name.as_deref())
    }
}

/// Custom deserializer for optional fields that accepts both plain values and nulls
///
/// Maps three input formats to the double-Option pattern:
/// - Missing field → None (don't update)
/// - null → Some(None) (set to NULL)
/// - value → Some(Some(value)) (set to value)
fn deserialize_optional_field<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    // Missing field is handled by #[serde(default)] on the struct field
    Ok(Some(Option::<T>::deserialize(deserializer)?))
}

/// Deserializer for fields that may be omitted but never null
fn deserialize_present_value<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

/// Partial node update structure for PATCH operations
///
/// Only provided fields are changed.
///
/// # Double-Option Pattern for Nullable Fields
///
/// `name`, `node_type`, `parent_id`, `left_child_id` and `right_child_id` use a
/// double `Option` to distinguish three states:
///
/// - `None`: Don't change this field (omitted from the patch)
/// - `Some(None)`: Set the field to NULL (clears the reference)
/// - `Some(Some(value))`: Set the field to the specified value
///
/// `value` is a required column, so it is a single `Option`: omitted leaves it
/// unchanged and an explicit JSON `null` is a deserialization error.
///
/// # Examples
///
/// ```rust
/// # use flowtree_core::models::NodeUpdate;
/// let patch: NodeUpdate =
///     serde_json::from_str(r#"{"value": 7, "parent_id": null}"#).unwrap();
/// assert_eq!(patch.value, Some(7));
/// assert_eq!(patch.parent_id, Some(None));
/// assert_eq!(patch.left_child_id, None);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeUpdate {
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_present_value"
    )]
    pub value: Option<i64>,

    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_optional_field"
    )]
    pub name: Option<Option<String>>,

    #[serde(
        default,
        rename = "type",
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_optional_field"
    )]
    pub node_type: Option<Option<NodeType>>,

    /// Update parent reference
    ///
    /// - `None`: Don't change parent_id
    /// - `Some(None)`: Set parent_id to NULL
    /// - `Some(Some(id))`: Set parent_id to the specified ID
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_optional_field"
    )]
    pub parent_id: Option<Option<NodeId>>,

    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_optional_field"
    )]
    pub left_child_id: Option<Option<NodeId>>,

    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_optional_field"
    )]
    pub right_child_id: Option<Option<NodeId>>,
}

impl NodeUpdate {
    /// Create a new empty NodeUpdate
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(mut self, value: i64) -> Self {
        self.value = Some(value);
        self
    }

    pub fn with_name(mut self, name: Option<String>) -> Self {
        self.name = Some(name);
        self
    }

    pub fn with_node_type(mut self, node_type: Option<NodeType>) -> Self {
        self.node_type = Some(node_type);
        self
    }

    pub fn with_parent(mut self, parent_id: Option<NodeId>) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    pub fn with_left_child(mut self, child_id: Option<NodeId>) -> Self {
        self.left_child_id = Some(child_id);
        self
    }

    pub fn with_right_child(mut self, child_id: Option<NodeId>) -> Self {
        self.right_child_id = Some(child_id);
        self
    }

    /// Patch entry for a reference column, if the patch mentions it
    pub fn reference(&self, field: ReferenceField) -> Option<Option<NodeId>> {
        match field {
            ReferenceField::Parent => self.parent_id,
            ReferenceField::LeftChild => self.left_child_id,
            ReferenceField::RightChild => self.right_child_id,
        }
    }

    /// Check if update contains any changes
    pub fn is_empty(&self) -> bool {
        self.value.is_none()
            && self.name.is_none()
            && self.node_type.is_none()
            && self.parent_id.is_none()
            && self.left_child_id.is_none()
            && self.right_child_id.is_none()
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_name(self.name.as_ref().and_then(|n| n.as_deref()))
    }
}

/// Result of a delete operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeleteResult {
    /// The record as it was just before deletion
    pub node: Node,

    /// Number of reference columns on other nodes that were set to NULL
    pub cleared_references: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_distinguishes_missing_and_null() {
        let patch: NodeUpdate = serde_json::from_str(r#"{"left_child_id": null}"#).unwrap();
        assert_eq!(patch.left_child_id, Some(None));
        assert_eq!(patch.right_child_id, None);
        assert_eq!(patch.parent_id, None);

        let patch: NodeUpdate = serde_json::from_str(r#"{"right_child_id": 12}"#).unwrap();
        assert_eq!(patch.right_child_id, Some(Some(12)));
        assert_eq!(patch.left_child_id, None);
    }

    #[test]
    fn test_update_null_name_and_type_clear() {
        let patch: NodeUpdate = serde_json::from_str(r#"{"name": null, "type": null}"#).unwrap();
        assert_eq!(patch.name, Some(None));
        assert_eq!(patch.node_type, Some(None));
    }

    #[test]
    fn test_update_rejects_null_value() {
        let result: Result<NodeUpdate, _> = serde_json::from_str(r#"{"value": null}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_update_rejects_unknown_type_literal() {
        let result: Result<NodeUpdate, _> = serde_json::from_str(r#"{"type": "sink"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_empty_update() {
        let patch: NodeUpdate = serde_json::from_str("{}").unwrap();
        assert!(patch.is_empty());
        assert!(!NodeUpdate::new().with_value(3).is_empty());
    }

    #[test]
    fn test_create_input_requires_value() {
        let result: Result<CreateNodeInput, _> = serde_json::from_str(r#"{"name": "x"}"#);
        assert!(result.is_err());

        let input: CreateNodeInput =
            serde_json::from_str(r#"{"value": 5, "type": "process"}"#).unwrap();
        assert_eq!(input.value, 5);
        assert_eq!(input.node_type, Some(NodeType::Process));
        assert_eq!(input.left_child_id, None);
    }

    #[test]
    fn test_name_length_limit() {
        let ok = CreateNodeInput::new(1).with_name("a".repeat(MAX_NAME_LENGTH));
        assert!(ok.validate().is_ok());

        let too_long = CreateNodeInput::new(1).with_name("a".repeat(MAX_NAME_LENGTH + 1));
        assert_eq!(
            too_long.validate(),
            Err(ValidationError::NameTooLong {
                length: MAX_NAME_LENGTH + 1,
                max: MAX_NAME_LENGTH
            })
        );
    }

    #[test]
    fn test_node_type_parse() {
        assert_eq!("output".parse::<NodeType>().unwrap(), NodeType::Output);
        assert!(matches!(
            "sink".parse::<NodeType>(),
            Err(ValidationError::InvalidNodeType(_))
        ));
    }

    #[test]
    fn test_node_serializes_without_workspace() {
        let node = Node {
            id: 1,
            workspace_id: "ws-secret".to_string(),
            value: 10,
            name: None,
            node_type: Some(NodeType::Input),
            parent_id: None,
            left_child_id: Some(2),
            right_child_id: None,
            created_at: Utc::now(),
        };
        let json = serde_json::to_value(&node).unwrap();
        assert!(json.get("workspace_id").is_none());
        assert_eq!(json["type"], "input");
        assert_eq!(json["left_child_id"], 2);
    }

    #[test]
    fn test_child_pointers_iter() {
        let pointers = ChildPointers {
            left_child_id: None,
            right_child_id: Some(9),
        };
        assert_eq!(pointers.iter().collect::<Vec<_>>(), vec![9]);
    }
}
