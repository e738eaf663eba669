//! Post endpoints
//!
//! - GET    /api/posts/              - paginated post summaries
//! - POST   /api/posts/              - create (auth)
//! - GET    /api/posts/{id}/         - detail with nested comment tree
//! - PUT    /api/posts/{id}/         - update (author only)
//! - DELETE /api/posts/{id}/         - delete (author only)
//! - POST   /api/posts/{id}/like/    - like (auth, idempotent)
//! - POST   /api/posts/{id}/unlike/  - unlike (auth)

use chrono::{DateTime, Utc};
use hyper::{Method, Request, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

use crate::db::schemas::{LikeView, PostDoc, UserProfile, MAX_TITLE_LEN};
use crate::feed::{build_comment_tree, CommentNode};
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
pub struct PostInput {
    pub title: String,
    pub content: String,
}

/// Post listing entry: counts but no nested payloads
#[derive(Debug, Serialize)]
pub struct PostSummary {
    pub id: String,
    pub author: Option<UserProfile>,
    pub title: String,
    pub content: String,
    pub comments_count: i64,
    pub likes_count: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Full post detail: summary fields plus the assembled comment tree and
/// the like listing
#[derive(Debug, Serialize)]
pub struct PostDetail {
    pub id: String,
    pub author: Option<UserProfile>,
    pub title: String,
    pub content: String,
    pub comments_count: i64,
    pub likes_count: i64,
    pub comments: Vec<CommentNode>,
    pub likes: Vec<LikeView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

fn summarize(
    post: &PostDoc,
    author: Option<UserProfile>,
    comments_count: i64,
    likes_count: i64,
) -> PostSummary {
    PostSummary {
        id: post.id.clone(),
        author,
        title: post.title.clone(),
        content: post.body.clone(),
        comments_count,
        likes_count,
        created_at: post.metadata.created_at.map(|dt| dt.to_chrono()),
        updated_at: post.metadata.updated_at.map(|dt| dt.to_chrono()),
    }
}

// =============================================================================
// Routing
// =============================================================================

/// Like/unlike sub-resource actions, dispatched by explicit tag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LikeAction {
    Like,
    Unlike,
}

/// Parsed post route
#[derive(Debug, PartialEq, Eq)]
enum PostRoute<'a> {
    Collection,
    Item(&'a str),
    Action(&'a str, LikeAction),
}

impl<'a> PostRoute<'a> {
    fn parse(path: &'a str) -> Option<Self> {
        let rest = path.strip_prefix("/api/posts")?;
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

/// Handle /api/posts/* requests
pub async fn handle(req: Request<hyper::body::Incoming>, state: Arc<AppState>) -> Response<BoxBody> {
    let path = req.uri().path().to_string();
    let query = req.uri().query().map(|q| q.to_string());
    let method = req.method().clone();

    let result = match (method, PostRoute::parse(&path)) {
        (Method::GET, Some(PostRoute::Collection)) => list_posts(&state, query.as_deref()).await,
        (Method::POST, Some(PostRoute::Collection)) => create_post(req, &state).await,
        (Method::GET, Some(PostRoute::Item(id))) => get_post(&state, id).await,
        (Method::PUT, Some(PostRoute::Item(id))) => {
            let id = id.to_string();
            update_post(req, &state, &id).await
        }
        (Method::DELETE, Some(PostRoute::Item(id))) => {
            let id = id.to_string();
            delete_post(req, &state, &id).await
        }
        (Method::POST, Some(PostRoute::Action(id, action))) => {
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

async fn list_posts(state: &AppState, query: Option<&str>) -> Result<Response<BoxBody>> {
    let page = Pagination::from_query(query);
    let (count, posts) = state.store.list_posts(page.skip(), page.page_size).await?;

    let post_ids: Vec<String> = posts.iter().map(|p| p.id.clone()).collect();
    let author_ids: Vec<String> = posts.iter().map(|p| p.author_id.clone()).collect();

    let authors = state.store.get_users_by_ids(&author_ids).await?;
    let comment_counts = state.store.count_comments_for_posts(&post_ids).await?;
    let like_counts = state.store.count_post_likes_for_posts(&post_ids).await?;

    let results: Vec<PostSummary> = posts
        .iter()
        .map(|post| {
            summarize(
                post,
                authors.get(&post.author_id).map(|u| u.profile()),
                comment_counts.get(&post.id).copied().unwrap_or(0),
                like_counts.get(&post.id).copied().unwrap_or(0),
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

async fn create_post(
    req: Request<hyper::body::Incoming>,
    state: &AppState,
) -> Result<Response<BoxBody>> {
    let user = require_user(&req, state).await?;
    let input: PostInput = parse_json_body(req).await?;
    validate_post_input(&input)?;

    let post = state
        .store
        .insert_post(PostDoc::new(user.id.clone(), input.title, input.content))
        .await?;

    Ok(json_response(
        StatusCode::CREATED,
        &summarize(&post, Some(user.profile()), 0, 0),
    ))
}

/// Post detail with the nested comment tree
async fn get_post(state: &AppState, id: &str) -> Result<Response<BoxBody>> {
    let post = fetch_post(state, id).await?;

    let comments = state.store.list_comments_for_post(&post.id).await?;
    let comment_ids: Vec<String> = comments.iter().map(|c| c.id.clone()).collect();

    // Resolve everyone appearing in the payload in one batch
    let mut author_ids: Vec<String> = comments.iter().map(|c| c.author_id.clone()).collect();
    author_ids.push(post.author_id.clone());
    let users = state.store.get_users_by_ids(&author_ids).await?;
    let profiles: HashMap<String, UserProfile> = users
        .iter()
        .map(|(id, user)| (id.clone(), user.profile()))
        .collect();

    let comment_like_counts = state
        .store
        .count_comment_likes_for_comments(&comment_ids)
        .await?;
    let likes = state.store.list_post_likes(&post.id).await?;

    let comments_count = comments.len() as i64;
    let tree = build_comment_tree(comments, &comment_like_counts, &profiles);

    let detail = PostDetail {
        id: post.id.clone(),
        author: profiles.get(&post.author_id).cloned(),
        title: post.title.clone(),
        content: post.body.clone(),
        comments_count,
        likes_count: likes.len() as i64,
        comments: tree,
        likes: likes.iter().map(|l| l.view()).collect(),
        created_at: post.metadata.created_at.map(|dt| dt.to_chrono()),
        updated_at: post.metadata.updated_at.map(|dt| dt.to_chrono()),
    };

    Ok(json_response(StatusCode::OK, &detail))
}

async fn update_post(
    req: Request<hyper::body::Incoming>,
    state: &AppState,
    id: &str,
) -> Result<Response<BoxBody>> {
    let user = require_user(&req, state).await?;
    let post = fetch_post(state, id).await?;

    ensure_author(&user.id, &post.author_id, "You can only edit your own posts.")?;

    let input: PostInput = parse_json_body(req).await?;
    validate_post_input(&input)?;

    state.store.update_post(id, &input.title, &input.content).await?;

    let updated = fetch_post(state, id).await?;
    let counts = state
        .store
        .count_comments_for_posts(&[updated.id.clone()])
        .await?;
    let likes = state
        .store
        .count_post_likes_for_posts(&[updated.id.clone()])
        .await?;

    Ok(json_response(
        StatusCode::OK,
        &summarize(
            &updated,
            Some(user.profile()),
            counts.get(&updated.id).copied().unwrap_or(0),
            likes.get(&updated.id).copied().unwrap_or(0),
        ),
    ))
}

async fn delete_post(
    req: Request<hyper::body::Incoming>,
    state: &AppState,
    id: &str,
) -> Result<Response<BoxBody>> {
    let user = require_user(&req, state).await?;
    let post = fetch_post(state, id).await?;

    ensure_author(&user.id, &post.author_id, "You can only delete your own posts.")?;

    state.store.delete_post(id).await?;
    Ok(no_content())
}

async fn like_action(
    req: Request<hyper::body::Incoming>,
    state: &AppState,
    id: &str,
    action: LikeAction,
) -> Result<Response<BoxBody>> {
    let user = require_user(&req, state).await?;
    let post = fetch_post(state, id).await?;

    match action {
        LikeAction::Like => match state.ledger.record_post_like(&user, &post).await? {
            LikeOutcome::Created => Ok(status_response(StatusCode::CREATED, "post liked")),
            LikeOutcome::AlreadyLiked => Ok(status_response(StatusCode::OK, "already liked")),
        },
        LikeAction::Unlike => match state.ledger.remove_post_like(&user, &post).await {
            Ok(()) => Ok(status_response(StatusCode::OK, "post unliked")),
            Err(FeedError::NotFound(_)) => Ok(json_response(
                StatusCode::NOT_FOUND,
                &ErrorResponse {
                    error: "post not liked".into(),
                    code: None,
                },
            )),
            Err(e) => Err(e),
        },
    }
}

// =============================================================================
// Helpers
// =============================================================================

async fn fetch_post(state: &AppState, id: &str) -> Result<PostDoc> {
    state
        .store
        .get_post(id)
        .await?
        .ok_or_else(|| FeedError::NotFound("post not found".into()))
}

fn validate_post_input(input: &PostInput) -> Result<()> {
    if input.title.trim().is_empty() || input.content.trim().is_empty() {
        return Err(FeedError::BadRequest(
            "Missing required fields: title, content".into(),
        ));
    }
    if input.title.chars().count() > MAX_TITLE_LEN {
        return Err(FeedError::BadRequest(format!(
            "Title exceeds {} characters",
            MAX_TITLE_LEN
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_route() {
        assert_eq!(PostRoute::parse("/api/posts"), Some(PostRoute::Collection));
        assert_eq!(PostRoute::parse("/api/posts/"), Some(PostRoute::Collection));
        assert_eq!(
            PostRoute::parse("/api/posts/p-1"),
            Some(PostRoute::Item("p-1"))
        );
        assert_eq!(
            PostRoute::parse("/api/posts/p-1/like"),
            Some(PostRoute::Action("p-1", LikeAction::Like))
        );
        assert_eq!(
            PostRoute::parse("/api/posts/p-1/unlike/"),
            Some(PostRoute::Action("p-1", LikeAction::Unlike))
        );
        assert_eq!(PostRoute::parse("/api/posts/p-1/share"), None);
        assert_eq!(PostRoute::parse("/api/comments"), None);
    }

    /// A non-author's delete is refused before any store mutation, so the
    /// post row stays present and unchanged.
    #[tokio::test]
    async fn test_forbidden_delete_leaves_post_intact() {
        use crate::auth::Principal;
        use crate::store::FeedStore;

        let store = FeedStore::memory_only();
        let author = store
            .find_or_create_user(&Principal::with_email("idp|d", "d@example.com"))
            .await
            .unwrap();
        let intruder = store
            .find_or_create_user(&Principal::with_email("idp|c", "c@example.com"))
            .await
            .unwrap();
        let post = store
            .insert_post(PostDoc::new(author.id.clone(), "Keep me".into(), "body".into()))
            .await
            .unwrap();

        let err = ensure_author(
            &intruder.id,
            &post.author_id,
            "You can only delete your own posts.",
        )
        .unwrap_err();
        assert!(matches!(err, FeedError::Forbidden(_)));

        let fetched = store.get_post(&post.id).await.unwrap().unwrap();
        assert_eq!(fetched.title, "Keep me");
        assert_eq!(fetched.author_id, author.id);
    }

    #[test]
    fn test_validate_post_input() {
        let ok = PostInput {
            title: "A title".into(),
            content: "Some body".into(),
        };
        assert!(validate_post_input(&ok).is_ok());

        let empty = PostInput {
            title: "  ".into(),
            content: "body".into(),
        };
        assert!(validate_post_input(&empty).is_err());

        let long = PostInput {
            title: "x".repeat(MAX_TITLE_LEN + 1),
            content: "body".into(),
        };
        assert!(validate_post_input(&long).is_err());
    }
}
