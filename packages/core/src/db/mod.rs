//! Database Layer
//!
//! This module handles all database interactions using libsql:
//!
//! - Database initialization and connection management
//! - The `number_nodes` table with store-level structural constraints
//! - The `NodeStore` abstraction the service layer is written against
//!
//! # Architecture
//!
//! Flow Tree uses an embedded libsql (SQLite-compatible) database file.
//! Writes are serialized with `BEGIN IMMEDIATE` transactions so that
//! validation and the write it guards run against the same state.

mod database;
mod error;
mod node_store;
mod turso_store;

pub use database::{DatabaseService, BUSY_TIMEOUT_MS};
pub use error::DatabaseError;
pub use node_store::{NodeReader, NodeStore, NodeTransaction};
pub use turso_store::{TursoStore, TursoTransaction};
