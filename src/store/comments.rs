//! Comment store operations

use std::collections::HashMap;

use bson::{doc, DateTime};
use futures_util::StreamExt;
use tracing::error;

use crate::db::schemas::CommentDoc;
use crate::types::{FeedError, Result};

use super::{doc_count, FeedStore};

impl FeedStore {
    /// Insert a new comment
    pub async fn insert_comment(&self, comment: CommentDoc) -> Result<CommentDoc> {
        if let Some(ref mongo) = self.mongo {
            mongo.comments.insert_one(comment.clone()).await?;
        } else {
            self.mem
                .comments
                .insert(comment.id.clone(), comment.clone());
        }
        Ok(comment)
    }

    /// Get a comment by ID (soft-deleted comments are invisible)
    pub async fn get_comment(&self, id: &str) -> Result<Option<CommentDoc>> {
        if let Some(ref mongo) = self.mongo {
            mongo.comments.find_one(doc! { "id": id }).await
        } else {
            Ok(self
                .mem
                .comments
                .get(id)
                .filter(|c| !c.metadata.is_deleted)
                .map(|c| c.value().clone()))
        }
    }

    /// Paged comment listing, newest first, optionally filtered to one
    /// post. Returns (total, page).
    pub async fn list_comments(
        &self,
        post_id: Option<&str>,
        skip: u64,
        limit: i64,
    ) -> Result<(u64, Vec<CommentDoc>)> {
        if let Some(ref mongo) = self.mongo {
            let filter = match post_id {
                Some(pid) => doc! { "post_id": pid },
                None => doc! {},
            };
            let total = mongo.comments.count(filter.clone()).await?;
            let page = mongo
                .comments
                .find_page(
                    filter,
                    Some(doc! { "metadata.created_at": -1 }),
                    Some(skip),
                    Some(limit),
                )
                .await?;
            Ok((total, page))
        } else {
            let mut comments = self.mem_comments_filtered(post_id);
            sort_newest_first(&mut comments);
            let total = comments.len() as u64;
            let page = comments
                .into_iter()
                .skip(skip as usize)
                .take(limit.max(0) as usize)
                .collect();
            Ok((total, page))
        }
    }

    /// The full comment set of one post, newest first - the tree builder's
    /// input.
    pub async fn list_comments_for_post(&self, post_id: &str) -> Result<Vec<CommentDoc>> {
        if let Some(ref mongo) = self.mongo {
            mongo
                .comments
                .find_page(
                    doc! { "post_id": post_id },
                    Some(doc! { "metadata.created_at": -1 }),
                    None,
                    None,
                )
                .await
        } else {
            let mut comments = self.mem_comments_filtered(Some(post_id));
            sort_newest_first(&mut comments);
            Ok(comments)
        }
    }

    /// Live comment counts per post, for listing summaries
    pub async fn count_comments_for_posts(
        &self,
        post_ids: &[String],
    ) -> Result<HashMap<String, i64>> {
        if post_ids.is_empty() {
            return Ok(HashMap::new());
        }

        if let Some(ref mongo) = self.mongo {
            let pipeline = vec![
                doc! { "$match": {
                    "post_id": { "$in": post_ids },
                    "metadata.is_deleted": { "$ne": true },
                } },
                doc! { "$group": { "_id": "$post_id", "count": { "$sum": 1 } } },
            ];

            let mut cursor = mongo
                .comments
                .inner()
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
        } else {
            let mut counts = HashMap::new();
            for comment in self.mem.comments.iter() {
                if !comment.metadata.is_deleted
                    && post_ids.iter().any(|id| id == &comment.post_id)
                {
                    *counts.entry(comment.post_id.clone()).or_insert(0) += 1;
                }
            }
            Ok(counts)
        }
    }

    /// Replace a comment's body
    pub async fn update_comment(&self, id: &str, body: &str) -> Result<()> {
        if let Some(ref mongo) = self.mongo {
            mongo
                .comments
                .update_one(
                    doc! { "id": id },
                    doc! { "$set": {
                        "body": body,
                        "metadata.updated_at": DateTime::now(),
                    } },
                )
                .await?;
            Ok(())
        } else {
            if let Some(mut comment) = self.mem.comments.get_mut(id) {
                comment.body = body.to_string();
                comment.metadata.touch();
            }
            Ok(())
        }
    }

    /// Soft-delete a comment
    pub async fn delete_comment(&self, id: &str) -> Result<()> {
        if let Some(ref mongo) = self.mongo {
            mongo.comments.soft_delete(doc! { "id": id }).await?;
            Ok(())
        } else {
            if let Some(mut comment) = self.mem.comments.get_mut(id) {
                comment.metadata.is_deleted = true;
                comment.metadata.deleted_at = Some(DateTime::now());
                comment.metadata.touch();
            }
            Ok(())
        }
    }

    fn mem_comments_filtered(&self, post_id: Option<&str>) -> Vec<CommentDoc> {
        self.mem
            .comments
            .iter()
            .filter(|c| !c.metadata.is_deleted)
            .filter(|c| post_id.map_or(true, |pid| c.post_id == pid))
            .map(|c| c.value().clone())
            .collect()
    }
}

fn sort_newest_first(comments: &mut [CommentDoc]) {
    comments.sort_by(|a, b| {
        b.metadata
            .created_at
            .cmp(&a.metadata.created_at)
            .then_with(|| a.id.cmp(&b.id))
    });
}
