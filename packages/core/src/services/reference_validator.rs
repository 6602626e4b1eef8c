//! Reference Validation
//!
//! Checks a proposed reference value against the current store contents
//! before it is written. Every lookup is scoped to the caller's workspace, so
//! a node in another workspace is reported as not found.
//!
//! The validator reads through a [`NodeReader`]. `NodeService` passes its open
//! transaction, which means the checks and the write that follows them see the
//! same state.

use crate::db::NodeReader;
use crate::models::{NodeId, ReferenceField};
use crate::services::error::NodeServiceError;
use std::collections::HashSet;

/// Validates `parent_id`, `left_child_id` and `right_child_id` values
///
/// Generic over the reader so it accepts both a store and an open
/// `dyn NodeTransaction`.
pub struct ReferenceValidator<'a, R: NodeReader + ?Sized> {
    reader: &'a R,
}

impl<'a, R: NodeReader + ?Sized> ReferenceValidator<'a, R> {
    pub fn new(reader: &'a R) -> Self {
        Self { reader }
    }

    /// Validate a `parent_id` value
    ///
    /// The parent hierarchy is free-form: only existence and self-reference
    /// are checked. Cycles and shared parents are allowed.
    pub async fn validate_parent(
        &self,
        workspace_id: &str,
        parent_id: Option<NodeId>,
        self_id: Option<NodeId>,
    ) -> Result<(), NodeServiceError> {
        let Some(parent_id) = parent_id else {
            return Ok(());
        };

        if Some(parent_id) == self_id {
            return Err(NodeServiceError::self_reference(ReferenceField::Parent));
        }

        if self.reader.get_node(workspace_id, parent_id).await?.is_none() {
            return Err(NodeServiceError::reference_not_found(
                ReferenceField::Parent,
                parent_id,
            ));
        }

        Ok(())
    }

    /// Validate a `left_child_id` or `right_child_id` value
    ///
    /// Checks run in a fixed order and the first failure wins:
    ///
    /// 1. `None` is always accepted
    /// 2. self-reference
    /// 3. existence in the workspace
    /// 4. cycle (only when `self_id` is known)
    /// 5. dual-occupancy: no other node may already hold `child_id`
    pub async fn validate_child_reference(
        &self,
        workspace_id: &str,
        child_id: Option<NodeId>,
        self_id: Option<NodeId>,
        field: ReferenceField,
    ) -> Result<(), NodeServiceError> {
        let Some(child_id) = child_id else {
            return Ok(());
        };

        if Some(child_id) == self_id {
            return Err(NodeServiceError::self_reference(field));
        }

        if self.reader.get_node(workspace_id, child_id).await?.is_none() {
            return Err(NodeServiceError::reference_not_found(field, child_id));
        }

        if let Some(self_id) = self_id {
            if self.reaches(workspace_id, child_id, self_id).await? {
                tracing::debug!(
                    "Rejecting {} = {} on node {}: cycle",
                    field,
                    child_id,
                    self_id
                );
                return Err(NodeServiceError::cycle(field));
            }
        }

        if let Some(owner) = self
            .reader
            .find_child_owner(workspace_id, child_id, self_id)
            .await?
        {
            tracing::debug!(
                "Rejecting {} = {}: already a child of {}",
                field,
                child_id,
                owner
            );
            return Err(NodeServiceError::already_child(field, child_id, owner));
        }

        Ok(())
    }

    /// Whether `target` is reachable from `start` over left/right edges
    ///
    /// Iterative with a visited set, so it terminates on malformed data that
    /// already contains a cycle.
    async fn reaches(
        &self,
        workspace_id: &str,
        start: NodeId,
        target: NodeId,
    ) -> Result<bool, NodeServiceError> {
        let mut worklist = vec![start];
        let mut visited = HashSet::new();

        while let Some(current) = worklist.pop() {
            if current == target {
                return Ok(true);
            }
            if !visited.insert(current) {
                continue;
            }

            if let Some(pointers) = self
                .reader
                .get_child_pointers(workspace_id, current)
                .await?
            {
                worklist.extend(pointers.iter().filter(|id| !visited.contains(id)));
            }
        }

        Ok(false)
    }
}

#[cfg(test)]
#[path = "reference_validator_test.rs"]
mod reference_validator_test;
