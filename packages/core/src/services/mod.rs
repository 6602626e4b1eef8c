//! Business Services
//!
//! This module contains the core business logic:
//!
//! - `NodeService` - CRUD operations with transactional reference validation
//! - `ReferenceValidator` - Existence, self-reference, cycle and ownership checks
//!
//! Services coordinate between the database layer and application logic,
//! implementing business rules on top of the `NodeStore` traits.

pub mod error;
pub mod node_service;
pub mod reference_validator;

pub use error::{EntityKind, NodeServiceError};
pub use node_service::NodeService;
pub use reference_validator::ReferenceValidator;
