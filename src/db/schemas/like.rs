//! Like document schemas
//!
//! PostLike and CommentLike rows are the source of truth for both "current
//! like count" (live rows) and the windowed leaderboard (row timestamps).
//! The karma beneficiary (`author_id`) and the liker's email are stamped on
//! the row at creation so both queries read like rows alone, without joins.
//!
//! Like rows are hard-deleted on unlike: a soft-deleted row would still
//! occupy the unique (user, target) index and block a later re-like.

use bson::{doc, oid::ObjectId, DateTime, Document};
use chrono::{DateTime as ChronoDateTime, Utc};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

/// Collection name for post likes
pub const POST_LIKE_COLLECTION: &str = "post_likes";

/// Collection name for comment likes
pub const COMMENT_LIKE_COLLECTION: &str = "comment_likes";

/// A user's like on a post. At most one per (user, post).
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct PostLikeDoc {
    /// MongoDB document ID
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub mongo_id: Option<ObjectId>,

    /// Common metadata
    #[serde(default)]
    pub metadata: Metadata,

    /// Like ID (UUID string)
    pub id: String,

    /// The liking user
    pub user_id: String,

    /// Liking user's email, denormalized for like listings
    pub user_email: String,

    /// The liked post
    pub post_id: String,

    /// The post's author - the karma beneficiary
    pub author_id: String,

    /// When the like was created (drives the leaderboard window)
    pub created_at: DateTime,
}

impl PostLikeDoc {
    /// Create a new post like
    pub fn new(user_id: String, user_email: String, post_id: String, author_id: String) -> Self {
        Self {
            mongo_id: None,
            metadata: Metadata::new(),
            id: Uuid::new_v4().to_string(),
            user_id,
            user_email,
            post_id,
            author_id,
            created_at: DateTime::now(),
        }
    }

    pub fn view(&self) -> LikeView {
        LikeView {
            user_email: self.user_email.clone(),
            created_at: self.created_at.to_chrono(),
        }
    }
}

impl IntoIndexes for PostLikeDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            // At most one like per (user, post)
            (
                doc! { "user_id": 1, "post_id": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("user_post_unique".to_string())
                        .build(),
                ),
            ),
            // Windowed karma aggregation
            (doc! { "author_id": 1, "created_at": -1 }, None),
            // Like listings per post
            (doc! { "post_id": 1, "created_at": -1 }, None),
        ]
    }
}

impl MutMetadata for PostLikeDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}

/// A user's like on a comment. At most one per (user, comment).
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct CommentLikeDoc {
    /// MongoDB document ID
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub mongo_id: Option<ObjectId>,

    /// Common metadata
    #[serde(default)]
    pub metadata: Metadata,

    /// Like ID (UUID string)
    pub id: String,

    /// The liking user
    pub user_id: String,

    /// Liking user's email, denormalized for like listings
    pub user_email: String,

    /// The liked comment
    pub comment_id: String,

    /// The comment's author - the karma beneficiary
    pub author_id: String,

    /// When the like was created (drives the leaderboard window)
    pub created_at: DateTime,
}

impl CommentLikeDoc {
    /// Create a new comment like
    pub fn new(
        user_id: String,
        user_email: String,
        comment_id: String,
        author_id: String,
    ) -> Self {
        Self {
            mongo_id: None,
            metadata: Metadata::new(),
            id: Uuid::new_v4().to_string(),
            user_id,
            user_email,
            comment_id,
            author_id,
            created_at: DateTime::now(),
        }
    }

    pub fn view(&self) -> LikeView {
        LikeView {
            user_email: self.user_email.clone(),
            created_at: self.created_at.to_chrono(),
        }
    }
}

impl IntoIndexes for CommentLikeDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            // At most one like per (user, comment)
            (
                doc! { "user_id": 1, "comment_id": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("user_comment_unique".to_string())
                        .build(),
                ),
            ),
            // Windowed karma aggregation
            (doc! { "author_id": 1, "created_at": -1 }, None),
            // Like listings per comment
            (doc! { "comment_id": 1, "created_at": -1 }, None),
        ]
    }
}

impl MutMetadata for CommentLikeDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}

/// Serialized like entry for API responses
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct LikeView {
    pub user_email: String,
    pub created_at: ChronoDateTime<Utc>,
}
