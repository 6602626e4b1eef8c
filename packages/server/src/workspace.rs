//! Workspace cookie middleware
//!
//! Each browser gets an opaque workspace id stored in the `workspace_id`
//! cookie. The middleware:
//!
//! 1. Reads the cookie, or mints a fresh UUID v4 when it is missing or empty
//! 2. Injects [`WorkspaceId`] into request extensions
//! 3. (Re)sets the cookie on every response so its lifetime keeps sliding
//!
//! # Usage
//!
//! ```rust,ignore
//! let app = Router::new()
//!     .route("/api/nodes", get(list_nodes))
//!     .layer(middleware::from_fn(workspace_middleware));
//! ```

use axum::{
    async_trait,
    extract::{FromRequestParts, Request},
    http::{
        header::{COOKIE, SET_COOKIE},
        request::Parts,
        HeaderMap, HeaderValue,
    },
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::http_error::HttpError;

/// Cookie carrying the workspace id
pub const WORKSPACE_COOKIE: &str = "workspace_id";

/// One year
pub const WORKSPACE_COOKIE_MAX_AGE_SECS: u64 = 60 * 60 * 24 * 365;

/// The workspace the current request belongs to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceId(pub String);

impl WorkspaceId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Find the workspace cookie among all `Cookie` headers
fn workspace_from_cookies(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == WORKSPACE_COOKIE && !value.is_empty())
        .map(|(_, value)| value.to_string())
}

fn set_cookie_value(workspace_id: &str) -> String {
    format!(
        "{}={}; HttpOnly; SameSite=Lax; Max-Age={}; Path=/",
        WORKSPACE_COOKIE, workspace_id, WORKSPACE_COOKIE_MAX_AGE_SECS
    )
}

/// Resolve the workspace for a request and persist it in the response cookie
pub async fn workspace_middleware(mut request: Request, next: Next) -> Response {
    let workspace_id = match workspace_from_cookies(request.headers()) {
        Some(existing) => existing,
        None => {
            let minted = Uuid::new_v4().to_string();
            tracing::debug!("Issued new workspace {}", minted);
            minted
        }
    };

    request
        .extensions_mut()
        .insert(WorkspaceId(workspace_id.clone()));

    let mut response = next.run(request).await;

    match HeaderValue::from_str(&set_cookie_value(&workspace_id)) {
        Ok(cookie) => {
            response.headers_mut().append(SET_COOKIE, cookie);
        }
        Err(e) => tracing::warn!("Could not encode workspace cookie: {}", e),
    }

    response
}

#[async_trait]
impl<S> FromRequestParts<S> for WorkspaceId
where
    S: Send + Sync,
{
    type Rejection = HttpError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<WorkspaceId>()
            .cloned()
            .ok_or_else(|| {
                HttpError::internal(
                    "WorkspaceId not found in request extensions. \
                     Ensure workspace_middleware is applied to this route.",
                )
            })
    }
}
