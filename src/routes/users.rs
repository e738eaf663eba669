//! User profile endpoints
//!
//! - GET /api/users/       - paginated profile listing
//! - GET /api/users/{id}/  - one profile

use hyper::{Method, Request, Response, StatusCode};
use std::sync::Arc;

use crate::routes::{
    error_response, json_response, method_not_allowed, not_found, Paginated, Pagination, BoxBody,
};
use crate::server::AppState;
use crate::types::{FeedError, Result};

/// Parsed user route
#[derive(Debug, PartialEq, Eq)]
enum UserRoute<'a> {
    Collection,
    Item(&'a str),
}

impl<'a> UserRoute<'a> {
    fn parse(path: &'a str) -> Option<Self> {
        let rest = path.strip_prefix("/api/users")?;
        let segments: Vec<&str> = rest.split('/').filter(|s| !s.is_empty()).collect();

        match segments.as_slice() {
            [] => Some(Self::Collection),
            [id] => Some(Self::Item(*id)),
            _ => None,
        }
    }
}

/// Handle /api/users/* requests
pub async fn handle(req: Request<hyper::body::Incoming>, state: Arc<AppState>) -> Response<BoxBody> {
    let path = req.uri().path().to_string();
    let query = req.uri().query().map(|q| q.to_string());
    let method = req.method().clone();

    let result = match (method, UserRoute::parse(&path)) {
        (Method::GET, Some(UserRoute::Collection)) => list_users(&state, query.as_deref()).await,
        (Method::GET, Some(UserRoute::Item(id))) => get_user(&state, id).await,
        (_, Some(_)) => return method_not_allowed(),
        (_, None) => return not_found(&path),
    };

    result.unwrap_or_else(|e| error_response(&e))
}

async fn list_users(state: &AppState, query: Option<&str>) -> Result<Response<BoxBody>> {
    let page = Pagination::from_query(query);
    let (count, users) = state.store.list_users(page.skip(), page.page_size).await?;

    let results: Vec<_> = users.iter().map(|u| u.profile()).collect();

    Ok(json_response(
        StatusCode::OK,
        &Paginated {
            count,
            page: page.page,
            page_size: page.page_size,
            results,
        },
    ))
}

async fn get_user(state: &AppState, id: &str) -> Result<Response<BoxBody>> {
    let user = state
        .store
        .get_user(id)
        .await?
        .ok_or_else(|| FeedError::NotFound("user not found".into()))?;

    Ok(json_response(StatusCode::OK, &user.profile()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_route() {
        assert_eq!(UserRoute::parse("/api/users"), Some(UserRoute::Collection));
        assert_eq!(UserRoute::parse("/api/users/"), Some(UserRoute::Collection));
        assert_eq!(
            UserRoute::parse("/api/users/abc-123"),
            Some(UserRoute::Item("abc-123"))
        );
        assert_eq!(
            UserRoute::parse("/api/users/abc-123/"),
            Some(UserRoute::Item("abc-123"))
        );
        assert_eq!(UserRoute::parse("/api/users/a/b"), None);
        assert_eq!(UserRoute::parse("/api/posts"), None);
    }
}
