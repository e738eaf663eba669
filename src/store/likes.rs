//! Like store operations
//!
//! "Create like" is a single unit pairing the like-row insert with the
//! author's karma credit, so a like is never recorded without its karma
//! effect. On MongoDB the pair runs inside a session transaction when the
//! deployment supports one (replica set); on a standalone deployment the
//! pairing is kept with a compensating delete. Either way the unique
//! (user, target) index turns a concurrent duplicate into a no-op on
//! exactly one side. The memory path gets the same guarantee from the
//! occupied-entry check.
//!
//! Unlike is a hard delete of the row alone - karma is never reversed.

use std::collections::HashMap;

use bson::{doc, DateTime, Document};
use dashmap::mapref::entry::Entry;
use futures_util::StreamExt;
use mongodb::ClientSession;
use tracing::{debug, error, warn};

use crate::db::mongo::is_duplicate_key_error;
use crate::db::schemas::{CommentLikeDoc, PostLikeDoc};
use crate::types::{FeedError, Result};

use super::{doc_count, FeedStore, MongoBackend};

/// Result of a create-like operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LikeOutcome {
    /// The like row was newly inserted and karma was credited
    Created,
    /// The (user, target) pair already had a like; nothing changed
    AlreadyLiked,
}

impl FeedStore {
    /// Record a post like and credit the post author's karma, as one unit.
    /// A duplicate like is reported as `AlreadyLiked` and credits nothing.
    pub async fn create_post_like(&self, like: PostLikeDoc, karma: i64) -> Result<LikeOutcome> {
        if let Some(ref mongo) = self.mongo {
            let author_id = like.author_id.clone();
            let like_id = like.id.clone();

            match try_start_transaction(mongo).await {
                Some(mut session) => {
                    let insert = mongo
                        .post_likes
                        .inner()
                        .insert_one(&like)
                        .session(&mut session)
                        .await;
                    match insert {
                        Ok(_) => {
                            if let Err(e) =
                                credit_karma(mongo, Some(&mut session), &author_id, karma).await
                            {
                                let _ = session.abort_transaction().await;
                                return Err(e.into());
                            }
                            session.commit_transaction().await?;
                            Ok(LikeOutcome::Created)
                        }
                        Err(e) if is_duplicate_key_error(&e) => {
                            let _ = session.abort_transaction().await;
                            Ok(LikeOutcome::AlreadyLiked)
                        }
                        Err(e) => {
                            let _ = session.abort_transaction().await;
                            Err(e.into())
                        }
                    }
                }
                None => match mongo.post_likes.inner().insert_one(&like).await {
                    Ok(_) => {
                        if let Err(e) = credit_karma(mongo, None, &author_id, karma).await {
                            // Roll the row back by hand so the pairing holds
                            if let Err(del) = mongo
                                .post_likes
                                .inner()
                                .delete_one(doc! { "id": &like_id })
                                .await
                            {
                                warn!("Failed to roll back like {}: {}", like_id, del);
                            }
                            return Err(e.into());
                        }
                        Ok(LikeOutcome::Created)
                    }
                    Err(e) if is_duplicate_key_error(&e) => Ok(LikeOutcome::AlreadyLiked),
                    Err(e) => Err(e.into()),
                },
            }
        } else {
            let key = format!("{}:{}", like.user_id, like.post_id);
            let author_id = like.author_id.clone();
            match self.mem.post_likes.entry(key) {
                Entry::Occupied(_) => Ok(LikeOutcome::AlreadyLiked),
                Entry::Vacant(slot) => {
                    slot.insert(like);
                    if let Some(mut user) = self.mem.users.get_mut(&author_id) {
                        user.total_karma += karma;
                    }
                    Ok(LikeOutcome::Created)
                }
            }
        }
    }

    /// Remove a post like row. Returns false if the pair was never liked.
    /// The author's karma total is left untouched.
    pub async fn delete_post_like(&self, user_id: &str, post_id: &str) -> Result<bool> {
        if let Some(ref mongo) = self.mongo {
            let removed = mongo
                .post_likes
                .delete_one(doc! { "user_id": user_id, "post_id": post_id })
                .await?;
            Ok(removed > 0)
        } else {
            let key = format!("{}:{}", user_id, post_id);
            Ok(self.mem.post_likes.remove(&key).is_some())
        }
    }

    /// Record a comment like and credit the comment author's karma, as one
    /// unit. A duplicate like is reported as `AlreadyLiked`.
    pub async fn create_comment_like(
        &self,
        like: CommentLikeDoc,
        karma: i64,
    ) -> Result<LikeOutcome> {
        if let Some(ref mongo) = self.mongo {
            let author_id = like.author_id.clone();
            let like_id = like.id.clone();

            match try_start_transaction(mongo).await {
                Some(mut session) => {
                    let insert = mongo
                        .comment_likes
                        .inner()
                        .insert_one(&like)
                        .session(&mut session)
                        .await;
                    match insert {
                        Ok(_) => {
                            if let Err(e) =
                                credit_karma(mongo, Some(&mut session), &author_id, karma).await
                            {
                                let _ = session.abort_transaction().await;
                                return Err(e.into());
                            }
                            session.commit_transaction().await?;
                            Ok(LikeOutcome::Created)
                        }
                        Err(e) if is_duplicate_key_error(&e) => {
                            let _ = session.abort_transaction().await;
                            Ok(LikeOutcome::AlreadyLiked)
                        }
                        Err(e) => {
                            let _ = session.abort_transaction().await;
                            Err(e.into())
                        }
                    }
                }
                None => match mongo.comment_likes.inner().insert_one(&like).await {
                    Ok(_) => {
                        if let Err(e) = credit_karma(mongo, None, &author_id, karma).await {
                            if let Err(del) = mongo
                                .comment_likes
                                .inner()
                                .delete_one(doc! { "id": &like_id })
                                .await
                            {
                                warn!("Failed to roll back like {}: {}", like_id, del);
                            }
                            return Err(e.into());
                        }
                        Ok(LikeOutcome::Created)
                    }
                    Err(e) if is_duplicate_key_error(&e) => Ok(LikeOutcome::AlreadyLiked),
                    Err(e) => Err(e.into()),
                },
            }
        } else {
            let key = format!("{}:{}", like.user_id, like.comment_id);
            let author_id = like.author_id.clone();
            match self.mem.comment_likes.entry(key) {
                Entry::Occupied(_) => Ok(LikeOutcome::AlreadyLiked),
                Entry::Vacant(slot) => {
                    slot.insert(like);
                    if let Some(mut user) = self.mem.users.get_mut(&author_id) {
                        user.total_karma += karma;
                    }
                    Ok(LikeOutcome::Created)
                }
            }
        }
    }

    /// Remove a comment like row. Returns false if the pair was never
    /// liked. The author's karma total is left untouched.
    pub async fn delete_comment_like(&self, user_id: &str, comment_id: &str) -> Result<bool> {
        if let Some(ref mongo) = self.mongo {
            let removed = mongo
                .comment_likes
                .delete_one(doc! { "user_id": user_id, "comment_id": comment_id })
                .await?;
            Ok(removed > 0)
        } else {
            let key = format!("{}:{}", user_id, comment_id);
            Ok(self.mem.comment_likes.remove(&key).is_some())
        }
    }

    /// Live likes on one post, newest first
    pub async fn list_post_likes(&self, post_id: &str) -> Result<Vec<PostLikeDoc>> {
        if let Some(ref mongo) = self.mongo {
            mongo
                .post_likes
                .find_page(
                    doc! { "post_id": post_id },
                    Some(doc! { "created_at": -1 }),
                    None,
                    None,
                )
                .await
        } else {
            let mut likes: Vec<PostLikeDoc> = self
                .mem
                .post_likes
                .iter()
                .filter(|l| l.post_id == post_id)
                .map(|l| l.value().clone())
                .collect();
            likes.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
            Ok(likes)
        }
    }

    /// Live likes on one comment, newest first
    pub async fn list_comment_likes(&self, comment_id: &str) -> Result<Vec<CommentLikeDoc>> {
        if let Some(ref mongo) = self.mongo {
            mongo
                .comment_likes
                .find_page(
                    doc! { "comment_id": comment_id },
                    Some(doc! { "created_at": -1 }),
                    None,
                    None,
                )
                .await
        } else {
            let mut likes: Vec<CommentLikeDoc> = self
                .mem
                .comment_likes
                .iter()
                .filter(|l| l.comment_id == comment_id)
                .map(|l| l.value().clone())
                .collect();
            likes.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
            Ok(likes)
        }
    }

    /// Live like counts per post
    pub async fn count_post_likes_for_posts(
        &self,
        post_ids: &[String],
    ) -> Result<HashMap<String, i64>> {
        if post_ids.is_empty() {
            return Ok(HashMap::new());
        }

        if let Some(ref mongo) = self.mongo {
            let pipeline = vec![
                doc! { "$match": { "post_id": { "$in": post_ids } } },
                doc! { "$group": { "_id": "$post_id", "count": { "$sum": 1 } } },
            ];
            grouped_counts(mongo.post_likes.inner(), pipeline).await
        } else {
            let mut counts = HashMap::new();
            for like in self.mem.post_likes.iter() {
                if post_ids.iter().any(|id| id == &like.post_id) {
                    *counts.entry(like.post_id.clone()).or_insert(0) += 1;
                }
            }
            Ok(counts)
        }
    }

    /// Live like counts per comment
    pub async fn count_comment_likes_for_comments(
        &self,
        comment_ids: &[String],
    ) -> Result<HashMap<String, i64>> {
        if comment_ids.is_empty() {
            return Ok(HashMap::new());
        }

        if let Some(ref mongo) = self.mongo {
            let pipeline = vec![
                doc! { "$match": { "comment_id": { "$in": comment_ids } } },
                doc! { "$group": { "_id": "$comment_id", "count": { "$sum": 1 } } },
            ];
            grouped_counts(mongo.comment_likes.inner(), pipeline).await
        } else {
            let mut counts = HashMap::new();
            for like in self.mem.comment_likes.iter() {
                if comment_ids.iter().any(|id| id == &like.comment_id) {
                    *counts.entry(like.comment_id.clone()).or_insert(0) += 1;
                }
            }
            Ok(counts)
        }
    }

    /// Post likes created at or after `since`, counted per beneficiary
    /// author. One half of the leaderboard's windowed karma.
    pub async fn windowed_post_like_counts(
        &self,
        since: DateTime,
    ) -> Result<HashMap<String, i64>> {
        if let Some(ref mongo) = self.mongo {
            let pipeline = vec![
                doc! { "$match": { "created_at": { "$gte": since } } },
                doc! { "$group": { "_id": "$author_id", "count": { "$sum": 1 } } },
            ];
            grouped_counts(mongo.post_likes.inner(), pipeline).await
        } else {
            let mut counts = HashMap::new();
            for like in self.mem.post_likes.iter() {
                if like.created_at >= since {
                    *counts.entry(like.author_id.clone()).or_insert(0) += 1;
                }
            }
            Ok(counts)
        }
    }

    /// Comment likes created at or after `since`, counted per beneficiary
    /// author. The other half of the leaderboard's windowed karma.
    pub async fn windowed_comment_like_counts(
        &self,
        since: DateTime,
    ) -> Result<HashMap<String, i64>> {
        if let Some(ref mongo) = self.mongo {
            let pipeline = vec![
                doc! { "$match": { "created_at": { "$gte": since } } },
                doc! { "$group": { "_id": "$author_id", "count": { "$sum": 1 } } },
            ];
            grouped_counts(mongo.comment_likes.inner(), pipeline).await
        } else {
            let mut counts = HashMap::new();
            for like in self.mem.comment_likes.iter() {
                if like.created_at >= since {
                    *counts.entry(like.author_id.clone()).or_insert(0) += 1;
                }
            }
            Ok(counts)
        }
    }
}

/// Start a transaction if the deployment supports one
async fn try_start_transaction(mongo: &MongoBackend) -> Option<ClientSession> {
    let mut session = match mongo.client.inner().start_session().await {
        Ok(s) => s,
        Err(e) => {
            debug!("Session unavailable, falling back to unpaired writes: {}", e);
            return None;
        }
    };

    match session.start_transaction().await {
        Ok(()) => Some(session),
        Err(e) => {
            debug!("Transactions unavailable (standalone deployment?): {}", e);
            None
        }
    }
}

/// Increment a user's lifetime karma, optionally inside a session
async fn credit_karma(
    mongo: &MongoBackend,
    session: Option<&mut ClientSession>,
    author_id: &str,
    karma: i64,
) -> mongodb::error::Result<()> {
    let users = mongo.users.inner();
    let filter = doc! { "id": author_id };
    let update = doc! { "$inc": { "total_karma": karma } };

    match session {
        Some(s) => users.update_one(filter, update).session(s).await.map(|_| ()),
        None => users.update_one(filter, update).await.map(|_| ()),
    }
}

/// Run a `$group`-by-id counting pipeline and collect the counts
async fn grouped_counts<T: Send + Sync>(
    collection: &mongodb::Collection<T>,
    pipeline: Vec<Document>,
) -> Result<HashMap<String, i64>> {
    let mut cursor = collection
        .aggregate(pipeline)
        .await
        .map_err(|e| FeedError::Database(format!("Aggregation failed: {}", e)))?;

    let mut counts = HashMap::new();
    while let Some(row) = cursor.next().await {
        match row {
            Ok(row) => {
                if let Ok(id) = row.get_str("_id") {
                    counts.insert(id.to_string(), doc_count(&row, "count"));
                }
            }
            Err(e) => error!("Error reading aggregation row: {}", e),
        }
    }
    Ok(counts)
}
