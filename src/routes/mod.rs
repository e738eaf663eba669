//! HTTP routes for Agora
//!
//! Route modules parse their own sub-paths and share the JSON, auth, and
//! pagination helpers defined here. Reads are public; mutations require an
//! authenticated principal.

pub mod comments;
pub mod health;
pub mod leaderboard;
pub mod posts;
pub mod users;

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::{Request, Response, StatusCode};
use serde::{Deserialize, Serialize};

use crate::auth::{extract_token_from_header, Principal};
use crate::db::schemas::UserDoc;
use crate::server::AppState;
use crate::types::{FeedError, Result};

pub type BoxBody = http_body_util::combinators::BoxBody<Bytes, hyper::Error>;

/// Default page size for list endpoints
pub const DEFAULT_PAGE_SIZE: i64 = 20;

/// Hard cap on page size
pub const MAX_PAGE_SIZE: i64 = 100;

/// Maximum accepted request body, in bytes
const MAX_BODY_BYTES: usize = 65536;

// =============================================================================
// Response Types
// =============================================================================

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

/// Action outcome body, e.g. {"status": "post liked"}
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: String,
}

/// Page envelope for list endpoints
#[derive(Debug, Serialize)]
pub struct Paginated<T: Serialize> {
    pub count: u64,
    pub page: u64,
    pub page_size: i64,
    pub results: Vec<T>,
}

// =============================================================================
// Response Helpers
// =============================================================================

pub fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response<BoxBody> {
    let json = serde_json::to_string(body).unwrap_or_else(|_| "{}".to_string());

    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .header("Access-Control-Allow-Methods", "GET, POST, PUT, DELETE, OPTIONS")
        .header("Access-Control-Allow-Headers", "Content-Type, Authorization")
        .body(full_body(json))
        .unwrap()
}

/// Map an error to its JSON response
pub fn error_response(err: &FeedError) -> Response<BoxBody> {
    json_response(
        err.status_code(),
        &ErrorResponse {
            error: err.to_string(),
            code: Some(err.code().to_string()),
        },
    )
}

pub fn status_response(status: StatusCode, message: &str) -> Response<BoxBody> {
    json_response(
        status,
        &StatusResponse {
            status: message.to_string(),
        },
    )
}

pub fn method_not_allowed() -> Response<BoxBody> {
    json_response(
        StatusCode::METHOD_NOT_ALLOWED,
        &ErrorResponse {
            error: "Method not allowed".into(),
            code: None,
        },
    )
}

pub fn not_found(path: &str) -> Response<BoxBody> {
    json_response(
        StatusCode::NOT_FOUND,
        &ErrorResponse {
            error: format!("No route for {}", path),
            code: Some("NOT_FOUND".into()),
        },
    )
}

pub fn no_content() -> Response<BoxBody> {
    Response::builder()
        .status(StatusCode::NO_CONTENT)
        .header("Access-Control-Allow-Origin", "*")
        .body(empty_body())
        .unwrap()
}

pub fn cors_preflight() -> Response<BoxBody> {
    Response::builder()
        .status(StatusCode::NO_CONTENT)
        .header("Access-Control-Allow-Origin", "*")
        .header("Access-Control-Allow-Methods", "GET, POST, PUT, DELETE, OPTIONS")
        .header("Access-Control-Allow-Headers", "Content-Type, Authorization")
        .header("Access-Control-Max-Age", "86400")
        .body(empty_body())
        .unwrap()
}

pub fn full_body(data: impl Into<Bytes>) -> BoxBody {
    Full::new(data.into())
        .map_err(|never| match never {})
        .boxed()
}

pub fn empty_body() -> BoxBody {
    Full::new(Bytes::new())
        .map_err(|never| match never {})
        .boxed()
}

// =============================================================================
// Request Helpers
// =============================================================================

pub async fn parse_json_body<T: for<'de> Deserialize<'de>>(
    req: Request<hyper::body::Incoming>,
) -> Result<T> {
    let body = req
        .collect()
        .await
        .map_err(|e| FeedError::Http(format!("Failed to read body: {}", e)))?;

    let bytes = body.to_bytes();
    if bytes.len() > MAX_BODY_BYTES {
        return Err(FeedError::Http("Request body too large".into()));
    }

    serde_json::from_slice(&bytes).map_err(|e| FeedError::Http(format!("Invalid JSON: {}", e)))
}

pub fn get_auth_header(req: &Request<hyper::body::Incoming>) -> Option<&str> {
    req.headers()
        .get(hyper::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
}

/// Authenticate the request and resolve (provisioning on first login) the
/// caller's user record. Mutating endpoints start here.
pub async fn require_user(
    req: &Request<hyper::body::Incoming>,
    state: &AppState,
) -> Result<UserDoc> {
    let token = extract_token_from_header(get_auth_header(req))
        .ok_or_else(|| FeedError::Unauthorized("Missing bearer token".into()))?;

    let claims = state.verifier.verify(token).await?;
    let principal = Principal::from(claims);
    state.store.find_or_create_user(&principal).await
}

/// Owner-only mutation guard: only the entity's author may proceed
pub fn ensure_author(user_id: &str, author_id: &str, message: &str) -> Result<()> {
    if user_id != author_id {
        return Err(FeedError::Forbidden(message.to_string()));
    }
    Ok(())
}

/// Extract a single query parameter value
pub fn query_param<'a>(query: Option<&'a str>, name: &str) -> Option<&'a str> {
    let query = query?;
    for pair in query.split('&') {
        if let Some((key, value)) = pair.split_once('=') {
            if key == name {
                return Some(value);
            }
        }
    }
    None
}

/// Page-number pagination parsed from the query string
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    /// 1-based page number
    pub page: u64,
    pub page_size: i64,
}

impl Pagination {
    /// Parse `?page=` and `?page_size=` with defaults and bounds.
    /// Garbage values fall back to the defaults.
    pub fn from_query(query: Option<&str>) -> Self {
        let page = query_param(query, "page")
            .and_then(|v| v.parse::<u64>().ok())
            .filter(|p| *p >= 1)
            .unwrap_or(1);

        let page_size = query_param(query, "page_size")
            .and_then(|v| v.parse::<i64>().ok())
            .filter(|s| *s >= 1)
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .min(MAX_PAGE_SIZE);

        Self { page, page_size }
    }

    pub fn skip(&self) -> u64 {
        (self.page - 1) * self.page_size as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_defaults() {
        let page = Pagination::from_query(None);
        assert_eq!(page, Pagination { page: 1, page_size: 20 });
        assert_eq!(page.skip(), 0);
    }

    #[test]
    fn test_pagination_parses_and_caps() {
        let page = Pagination::from_query(Some("page=3&page_size=50"));
        assert_eq!(page, Pagination { page: 3, page_size: 50 });
        assert_eq!(page.skip(), 100);

        let capped = Pagination::from_query(Some("page_size=500"));
        assert_eq!(capped.page_size, MAX_PAGE_SIZE);
    }

    #[test]
    fn test_pagination_rejects_garbage() {
        let page = Pagination::from_query(Some("page=0&page_size=-4"));
        assert_eq!(page, Pagination { page: 1, page_size: 20 });

        let junk = Pagination::from_query(Some("page=abc&page_size=xyz"));
        assert_eq!(junk, Pagination { page: 1, page_size: 20 });
    }

    #[test]
    fn test_query_param() {
        assert_eq!(query_param(Some("a=1&b=2"), "b"), Some("2"));
        assert_eq!(query_param(Some("a=1"), "b"), None);
        assert_eq!(query_param(None, "a"), None);
    }

    #[test]
    fn test_ensure_author() {
        assert!(ensure_author("u-1", "u-1", "nope").is_ok());

        let err = ensure_author("u-2", "u-1", "You can only edit your own posts.").unwrap_err();
        assert!(matches!(err, FeedError::Forbidden(_)));
    }
}
