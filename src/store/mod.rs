//! Entity store for Agora
//!
//! All reads and writes go through `FeedStore`. Two storage paths share one
//! API: MongoDB when configured, and an in-memory DashMap path used in dev
//! mode and by tests. The memory path mirrors every query so the feed
//! invariants hold identically in both.

mod comments;
mod likes;
mod posts;
mod users;

pub use likes::LikeOutcome;

use bson::Document;
use dashmap::DashMap;
use tracing::warn;

use crate::db::schemas::{
    CommentDoc, CommentLikeDoc, PostDoc, PostLikeDoc, UserDoc, COMMENT_COLLECTION,
    COMMENT_LIKE_COLLECTION, POST_COLLECTION, POST_LIKE_COLLECTION, USER_COLLECTION,
};
use crate::db::{MongoClient, MongoCollection};
use crate::types::Result;

/// MongoDB-backed collections
pub(crate) struct MongoBackend {
    pub(crate) client: MongoClient,
    pub(crate) users: MongoCollection<UserDoc>,
    pub(crate) posts: MongoCollection<PostDoc>,
    pub(crate) comments: MongoCollection<CommentDoc>,
    pub(crate) post_likes: MongoCollection<PostLikeDoc>,
    pub(crate) comment_likes: MongoCollection<CommentLikeDoc>,
}

/// In-memory collections (dev mode and tests)
///
/// Like rows are keyed by "{user_id}:{target_id}" so the occupied-entry
/// check enforces the same uniqueness the Mongo compound index does.
#[derive(Default)]
pub(crate) struct MemStore {
    pub(crate) users: DashMap<String, UserDoc>,
    pub(crate) posts: DashMap<String, PostDoc>,
    pub(crate) comments: DashMap<String, CommentDoc>,
    pub(crate) post_likes: DashMap<String, PostLikeDoc>,
    pub(crate) comment_likes: DashMap<String, CommentLikeDoc>,
}

/// Unified entity store
pub struct FeedStore {
    pub(crate) mongo: Option<MongoBackend>,
    pub(crate) mem: MemStore,
}

impl FeedStore {
    /// Create a store backed by MongoDB. Applies schema indexes up front.
    pub async fn new(client: MongoClient) -> Result<Self> {
        let users = client.collection::<UserDoc>(USER_COLLECTION).await?;
        let posts = client.collection::<PostDoc>(POST_COLLECTION).await?;
        let comments = client.collection::<CommentDoc>(COMMENT_COLLECTION).await?;
        let post_likes = client
            .collection::<PostLikeDoc>(POST_LIKE_COLLECTION)
            .await?;
        let comment_likes = client
            .collection::<CommentLikeDoc>(COMMENT_LIKE_COLLECTION)
            .await?;

        Ok(Self {
            mongo: Some(MongoBackend {
                client,
                users,
                posts,
                comments,
                post_likes,
                comment_likes,
            }),
            mem: MemStore::default(),
        })
    }

    /// Create a store without MongoDB (dev mode and tests)
    pub fn memory_only() -> Self {
        warn!("FeedStore running in memory-only mode (no MongoDB)");

        Self {
            mongo: None,
            mem: MemStore::default(),
        }
    }

    /// Check if MongoDB is available
    pub fn has_mongodb(&self) -> bool {
        self.mongo.is_some()
    }
}

/// Read a counter field out of an aggregation result document.
///
/// `$sum` yields Int32 or Int64 depending on magnitude.
pub(crate) fn doc_count(doc: &Document, key: &str) -> i64 {
    match doc.get(key) {
        Some(bson::Bson::Int32(n)) => *n as i64,
        Some(bson::Bson::Int64(n)) => *n,
        Some(bson::Bson::Double(n)) => *n as i64,
        _ => 0,
    }
}
