//! Comment document schema

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

/// Collection name for comments
pub const COMMENT_COLLECTION: &str = "comments";

/// Comment on a post, optionally threaded under a parent comment.
///
/// `parent_id`, when present, must reference a comment on the same post.
/// Threads are acyclic by construction: a comment can only reference
/// comments created strictly before it.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct CommentDoc {
    /// MongoDB document ID
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub mongo_id: Option<ObjectId>,

    /// Common metadata (created_at, updated_at, is_deleted)
    #[serde(default)]
    pub metadata: Metadata,

    /// Comment ID (UUID string)
    pub id: String,

    /// Post this comment belongs to
    pub post_id: String,

    /// Internal ID of the authoring user
    pub author_id: String,

    /// Body text
    pub body: String,

    /// Parent comment on the same post (None = top-level/root)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
}

impl CommentDoc {
    /// Create a new comment document
    pub fn new(
        post_id: String,
        author_id: String,
        body: String,
        parent_id: Option<String>,
    ) -> Self {
        Self {
            mongo_id: None,
            metadata: Metadata::new(),
            id: Uuid::new_v4().to_string(),
            post_id,
            author_id,
            body,
            parent_id,
        }
    }
}

impl IntoIndexes for CommentDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            // Index on comment ID for lookups
            (
                doc! { "id": 1 },
                Some(IndexOptions::builder().name("id_index".to_string()).build()),
            ),
            // All comments of a post, newest first
            (doc! { "post_id": 1, "metadata.created_at": -1 }, None),
            // Index by author
            (
                doc! { "author_id": 1 },
                Some(
                    IndexOptions::builder()
                        .name("author_index".to_string())
                        .build(),
                ),
            ),
            // Replies of a comment
            (
                doc! { "parent_id": 1 },
                Some(IndexOptions::builder().sparse(true).build()),
            ),
        ]
    }
}

impl MutMetadata for CommentDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
