//! HTTP error handling
//!
//! Every failed request gets a JSON body `{message, code, details?}`; the
//! status code is derived from `code`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use flowtree_core::services::NodeServiceError;
use serde::{Deserialize, Serialize};

/// HTTP error response
#[derive(Debug, Serialize, Deserialize)]
pub struct HttpError {
    /// User-facing error message
    pub message: String,
    /// Machine-readable error code
    pub code: String,
    /// Optional detailed error information
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl HttpError {
    /// Create a new HTTP error
    pub fn new(message: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: code.into(),
            details: None,
        }
    }

    /// Create a new HTTP error with details
    pub fn with_details(
        message: impl Into<String>,
        code: impl Into<String>,
        details: impl Into<String>,
    ) -> Self {
        Self {
            message: message.into(),
            code: code.into(),
            details: Some(details.into()),
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(message, "INTERNAL_ERROR")
    }

    pub fn status(&self) -> StatusCode {
        match self.code.as_str() {
            "NODE_NOT_FOUND" => StatusCode::NOT_FOUND,
            "SELF_REFERENCE" | "DUPLICATE_CHILDREN" | "CIRCULAR_REFERENCE" | "ALREADY_CHILD"
            | "VALIDATION_ERROR" => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        (self.status(), Json(self)).into_response()
    }
}

impl From<NodeServiceError> for HttpError {
    fn from(err: NodeServiceError) -> Self {
        match &err {
            NodeServiceError::AlreadyChild {
                field,
                child_id,
                parent_id,
            } => HttpError::with_details(
                err.to_string(),
                err.code(),
                format!(
                    "field: {}, child_id: {}, parent_id: {}",
                    field, child_id, parent_id
                ),
            ),
            NodeServiceError::DatabaseError(db_err) => {
                tracing::error!("Database failure: {}", db_err);
                HttpError::new("Internal database error", err.code())
            }
            _ => match err.field() {
                Some(field) => {
                    HttpError::with_details(err.to_string(), err.code(), format!("field: {}", field))
                }
                None => HttpError::new(err.to_string(), err.code()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowtree_core::db::DatabaseError;
    use flowtree_core::models::{ReferenceField, ValidationError};

    #[test]
    fn test_status_mapping() {
        let cases = [
            (NodeServiceError::node_not_found(1), StatusCode::NOT_FOUND),
            (
                NodeServiceError::reference_not_found(ReferenceField::Parent, 1),
                StatusCode::NOT_FOUND,
            ),
            (
                NodeServiceError::self_reference(ReferenceField::LeftChild),
                StatusCode::BAD_REQUEST,
            ),
            (NodeServiceError::DuplicateChildren, StatusCode::BAD_REQUEST),
            (
                NodeServiceError::cycle(ReferenceField::RightChild),
                StatusCode::BAD_REQUEST,
            ),
            (
                NodeServiceError::already_child(ReferenceField::LeftChild, 2, 1),
                StatusCode::BAD_REQUEST,
            ),
            (
                NodeServiceError::from(ValidationError::NameTooLong { length: 300, max: 255 }),
                StatusCode::BAD_REQUEST,
            ),
            (
                NodeServiceError::from(DatabaseError::constraint_violation("child already claimed")),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, expected) in cases {
            let http_err = HttpError::from(err);
            assert_eq!(http_err.status(), expected, "code {}", http_err.code);
        }
    }

    #[test]
    fn test_already_child_details() {
        let http_err =
            HttpError::from(NodeServiceError::already_child(ReferenceField::RightChild, 5, 3));
        assert_eq!(http_err.code, "ALREADY_CHILD");
        assert_eq!(
            http_err.details.as_deref(),
            Some("field: right_child_id, child_id: 5, parent_id: 3")
        );
    }

    #[test]
    fn test_database_error_hides_internals() {
        let http_err = HttpError::from(NodeServiceError::from(DatabaseError::sql_execution(
            "UPDATE number_nodes SET left_child_id = NULL in /var/lib/flowtree/flowtree.db",
        )));
        assert_eq!(http_err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(http_err.code, "DATABASE_ERROR");
        assert_eq!(http_err.message, "Internal database error");
        assert!(http_err.details.is_none());
    }

    #[test]
    fn test_details_omitted_when_absent() {
        let json = serde_json::to_value(HttpError::new("gone", "NODE_NOT_FOUND")).unwrap();
        assert!(json.get("details").is_none());
        assert_eq!(json["code"], "NODE_NOT_FOUND");
    }
}
