//! Post document schema

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

/// Collection name for posts
pub const POST_COLLECTION: &str = "posts";

/// Maximum post title length, matching the API contract
pub const MAX_TITLE_LEN: usize = 300;

/// Feed post created by an authenticated user.
///
/// Owned exclusively by its author for mutation purposes.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct PostDoc {
    /// MongoDB document ID
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub mongo_id: Option<ObjectId>,

    /// Common metadata (created_at, updated_at, is_deleted)
    #[serde(default)]
    pub metadata: Metadata,

    /// Post ID (UUID string)
    pub id: String,

    /// Internal ID of the authoring user
    pub author_id: String,

    /// Title (max 300 chars)
    pub title: String,

    /// Body text
    pub body: String,
}

impl PostDoc {
    /// Create a new post document
    pub fn new(author_id: String, title: String, body: String) -> Self {
        Self {
            mongo_id: None,
            metadata: Metadata::new(),
            id: Uuid::new_v4().to_string(),
            author_id,
            title,
            body,
        }
    }
}

impl IntoIndexes for PostDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            // Index on post ID for lookups
            (
                doc! { "id": 1 },
                Some(IndexOptions::builder().name("id_index".to_string()).build()),
            ),
            // Index by author
            (
                doc! { "author_id": 1 },
                Some(
                    IndexOptions::builder()
                        .name("author_index".to_string())
                        .build(),
                ),
            ),
            // Newest-first listings
            (doc! { "metadata.created_at": -1 }, None),
        ]
    }
}

impl MutMetadata for PostDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
