//! Comment endpoints
//!
//! - GET    /api/comments/              - paginated listing (?post= filters)
//! - POST   /api/comments/              - create (auth)
//! - GET    /api/comments/{id}/         - detail with like listing
//! - PUT    /api/comments/{id}/         - update (author only)
//! - DELETE /api/comments/{id}/         - delete (author only)
//! - POST   /api/comments/{id}/like/    - like (auth, idempotent)
//! - POST   /api/comments/{id}/unlike/  - unlike (auth)

use chrono::{DateTime, Utc};
use hyper::{Method, Request, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::db::schemas::{CommentDoc, LikeView, UserProfile};
use crate::routes::posts::LikeAction;
use crate::routes::{
    ensure_author, error_response, json_response, method_not_allowed, no_content, not_found,
    parse_json_body, require_user, status_response, ErrorResponse, Paginated, Pagination, BoxBody,
};
use crate::server::AppState;
use crate::store::LikeOutcome;
use crate::types::{FeedError, Result};

// =============================================================================
// Request/Response Types
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct CreateCommentInput {
    /// Target post ID
    pub post: String,
    pub content: String,
    /// Parent comment ID for a threaded reply
    #[serde(default)]
    pub parent: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateCommentInput {
    pub content: String,
}

/// Flat comment view for listings and detail
#[derive(Debug, Serialize)]
pub struct CommentView {
    pub id: String,
    pub post: String,
    pub author: Option<UserProfile>,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    pub likes_count: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub likes: Option<Vec<LikeView>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

fn view(
    comment: &CommentDoc,
    author: Option<UserProfile>,
    likes_count: i64,
    likes: Option<Vec<LikeView>>,
) -> CommentView {
    CommentView {
        id: comment.id.clone(),
        post: comment.post_id.clone(),
        author,
        content: comment.body.clone(),
        parent: comment.parent_id.clone(),
        likes_count,
        likes,
        created_at: comment.metadata.created_at.map(|dt| dt.to_chrono()),
        updated_at: comment.metadata.updated_at.map(|dt| dt.to_chrono()),
    }
}

// =============================================================================
// Routing
// =============================================================================

/// Parsed comment route
#[derive(Debug, PartialEq, Eq)]
enum CommentRoute<'a> {
    Collection,
    Item(&'a str),
    Action(&'a str, LikeAction),
}

impl<'a> CommentRoute<'a> {
    fn parse(path: &'a str) -> Option<Self> {
        let rest = path.strip_prefix("/api/comments")?;
        let segments: Vec<&str> = rest.split('/').filter(|s| !s.is_empty()).collect();

        match segments.as_slice() {
            [] => Some(Self::Collection),
            [id] => Some(Self::Item(*id)),
            [id, "like"] => Some(Self::Action(*id, LikeAction::Like)),
            [id, "unlike"] => Some(Self::Action(*id, LikeAction::Unlike)),
            _ => None,
        }
    }
}

/// Handle /api/comments/* requests
pub async fn handle(req: Request<hyper::body::Incoming>, state: Arc<AppState>) -> Response<BoxBody> {
    let path = req.uri().path().to_string();
    let query = req.uri().query().map(|q| q.to_string());
    let method = req.method().clone();

    let result = match (method, CommentRoute::parse(&path)) {
        (Method::GET, Some(CommentRoute::Collection)) => {
            list_comments(&state, query.as_deref()).await
        }
        (Method::POST, Some(CommentRoute::Collection)) => create_comment(req, &state).await,
        (Method::GET, Some(CommentRoute::Item(id))) => get_comment(&state, id).await,
        (Method::PUT, Some(CommentRoute::Item(id))) => {
            let id = id.to_string();
            update_comment(req, &state, &id).await
        }
        (Method::DELETE, Some(CommentRoute::Item(id))) => {
            let id = id.to_string();
            delete_comment(req, &state, &id).await
        }
        (Method::POST, Some(CommentRoute::Action(id, action))) => {
            let id = id.to_string();
            like_action(req, &state, &id, action).await
        }
        (_, Some(_)) => return method_not_allowed(),
        (_, None) => return not_found(&path),
    };

    result.unwrap_or_else(|e| error_response(&e))
}

// =============================================================================
// Handlers
// =============================================================================

async fn list_comments(state: &AppState, query: Option<&str>) -> Result<Response<BoxBody>> {
    let page = Pagination::from_query(query);
    let post_filter = crate::routes::query_param(query, "post");

    let (count, comments) = state
        .store
        .list_comments(post_filter, page.skip(), page.page_size)
        .await?;

    let comment_ids: Vec<String> = comments.iter().map(|c| c.id.clone()).collect();
    let author_ids: Vec<String> = comments.iter().map(|c| c.author_id.clone()).collect();

    let authors = state.store.get_users_by_ids(&author_ids).await?;
    let like_counts = state
        .store
        .count_comment_likes_for_comments(&comment_ids)
        .await?;

    let results: Vec<CommentView> = comments
        .iter()
        .map(|comment| {
            view(
                comment,
                authors.get(&comment.author_id).map(|u| u.profile()),
                like_counts.get(&comment.id).copied().unwrap_or(0),
                None,
            )
        })
        .collect();

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

async fn create_comment(
    req: Request<hyper::body::Incoming>,
    state: &AppState,
) -> Result<Response<BoxBody>> {
    let user = require_user(&req, state).await?;
    let input: CreateCommentInput = parse_json_body(req).await?;

    if input.content.trim().is_empty() {
        return Err(FeedError::BadRequest("Missing required field: content".into()));
    }

    // The target post must exist
    let post = state
        .store
        .get_post(&input.post)
        .await?
        .ok_or_else(|| FeedError::BadRequest("unknown post".into()))?;

    // A threaded reply must point at an existing comment on the same post.
    // Acyclic by construction: the parent already exists, so it was created
    // strictly before this comment.
    if let Some(ref parent_id) = input.parent {
        let parent = state
            .store
            .get_comment(parent_id)
            .await?
            .ok_or_else(|| FeedError::BadRequest("unknown parent comment".into()))?;
        if parent.post_id != post.id {
            return Err(FeedError::BadRequest(
                "parent comment must belong to the same post".into(),
            ));
        }
    }

    let comment = state
        .store
        .insert_comment(CommentDoc::new(
            post.id.clone(),
            user.id.clone(),
            input.content,
            input.parent,
        ))
        .await?;

    Ok(json_response(
        StatusCode::CREATED,
        &view(&comment, Some(user.profile()), 0, None),
    ))
}

async fn get_comment(state: &AppState, id: &str) -> Result<Response<BoxBody>> {
    let comment = fetch_comment(state, id).await?;

    let author = state.store.get_user(&comment.author_id).await?;
    let likes = state.store.list_comment_likes(&comment.id).await?;

    Ok(json_response(
        StatusCode::OK,
        &view(
            &comment,
            author.map(|u| u.profile()),
            likes.len() as i64,
            Some(likes.iter().map(|l| l.view()).collect()),
        ),
    ))
}

async fn update_comment(
    req: Request<hyper::body::Incoming>,
    state: &AppState,
    id: &str,
) -> Result<Response<BoxBody>> {
    let user = require_user(&req, state).await?;
    let comment = fetch_comment(state, id).await?;

    ensure_author(&user.id, &comment.author_id, "You can only edit your own comments.")?;

    let input: UpdateCommentInput = parse_json_body(req).await?;
    if input.content.trim().is_empty() {
        return Err(FeedError::BadRequest("Missing required field: content".into()));
    }

    state.store.update_comment(id, &input.content).await?;

    let updated = fetch_comment(state, id).await?;
    let like_counts = state
        .store
        .count_comment_likes_for_comments(&[updated.id.clone()])
        .await?;

    Ok(json_response(
        StatusCode::OK,
        &view(
            &updated,
            Some(user.profile()),
            like_counts.get(&updated.id).copied().unwrap_or(0),
            None,
        ),
    ))
}

async fn delete_comment(
    req: Request<hyper::body::Incoming>,
    state: &AppState,
    id: &str,
) -> Result<Response<BoxBody>> {
    let user = require_user(&req, state).await?;
    let comment = fetch_comment(state, id).await?;

    ensure_author(&user.id, &comment.author_id, "You can only delete your own comments.")?;

    state.store.delete_comment(id).await?;
    Ok(no_content())
}

async fn like_action(
    req: Request<hyper::body::Incoming>,
    state: &AppState,
    id: &str,
    action: LikeAction,
) -> Result<Response<BoxBody>> {
    let user = require_user(&req, state).await?;
    let comment = fetch_comment(state, id).await?;

    match action {
        LikeAction::Like => match state.ledger.record_comment_like(&user, &comment).await? {
            LikeOutcome::Created => Ok(status_response(StatusCode::CREATED, "comment liked")),
            LikeOutcome::AlreadyLiked => Ok(status_response(StatusCode::OK, "already liked")),
        },
        LikeAction::Unlike => match state.ledger.remove_comment_like(&user, &comment).await {
            Ok(()) => Ok(status_response(StatusCode::OK, "comment unliked")),
            Err(FeedError::NotFound(_)) => Ok(json_response(
                StatusCode::NOT_FOUND,
                &ErrorResponse {
                    error: "comment not liked".into(),
                    code: None,
                },
            )),
            Err(e) => Err(e),
        },
    }
}

async fn fetch_comment(state: &AppState, id: &str) -> Result<CommentDoc> {
    state
        .store
        .get_comment(id)
        .await?
        .ok_or_else(|| FeedError::NotFound("comment not found".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_route() {
        assert_eq!(
            CommentRoute::parse("/api/comments"),
            Some(CommentRoute::Collection)
        );
        assert_eq!(
            CommentRoute::parse("/api/comments/c-9/"),
            Some(CommentRoute::Item("c-9"))
        );
        assert_eq!(
            CommentRoute::parse("/api/comments/c-9/like"),
            Some(CommentRoute::Action("c-9", LikeAction::Like))
        );
        assert_eq!(
            CommentRoute::parse("/api/comments/c-9/unlike"),
            Some(CommentRoute::Action("c-9", LikeAction::Unlike))
        );
        assert_eq!(CommentRoute::parse("/api/comments/c-9/flag"), None);
    }
}
