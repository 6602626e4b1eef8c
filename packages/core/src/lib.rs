//! Flow Tree Core Business Logic Layer
//!
//! This crate provides the data model, persistence and validation rules for
//! Flow Tree: per-workspace numeric nodes linked by a free-form parent
//! hierarchy and a binary left/right structure.
//!
//! # Architecture
//!
//! - **Workspace scoping**: every store, validator and service call takes the workspace id
//! - **Transactional validation**: checks and writes share one `BEGIN IMMEDIATE` transaction
//! - **libsql**: Embedded SQLite-compatible database with triggers as a last line of defence
//!
//! # Modules
//!
//! - [`models`] - Data structures (Node, CreateNodeInput, NodeUpdate)
//! - [`services`] - NodeService and ReferenceValidator
//! - [`db`] - Database layer with libsql integration

pub mod db;
pub mod models;
pub mod services;

// Re-export commonly used types
pub use models::*;
pub use services::*;
