//! Post store operations

use bson::{doc, DateTime};

use crate::db::schemas::PostDoc;
use crate::types::Result;

use super::FeedStore;

impl FeedStore {
    /// Insert a new post
    pub async fn insert_post(&self, post: PostDoc) -> Result<PostDoc> {
        if let Some(ref mongo) = self.mongo {
            mongo.posts.insert_one(post.clone()).await?;
        } else {
            self.mem.posts.insert(post.id.clone(), post.clone());
        }
        Ok(post)
    }

    /// Get a post by ID (soft-deleted posts are invisible)
    pub async fn get_post(&self, id: &str) -> Result<Option<PostDoc>> {
        if let Some(ref mongo) = self.mongo {
            mongo.posts.find_one(doc! { "id": id }).await
        } else {
            Ok(self
                .mem
                .posts
                .get(id)
                .filter(|p| !p.metadata.is_deleted)
                .map(|p| p.value().clone()))
        }
    }

    /// Paged post listing, newest first. Returns (total, page).
    pub async fn list_posts(&self, skip: u64, limit: i64) -> Result<(u64, Vec<PostDoc>)> {
        if let Some(ref mongo) = self.mongo {
            let total = mongo.posts.count(doc! {}).await?;
            let page = mongo
                .posts
                .find_page(
                    doc! {},
                    Some(doc! { "metadata.created_at": -1 }),
                    Some(skip),
                    Some(limit),
                )
                .await?;
            Ok((total, page))
        } else {
            let mut posts: Vec<PostDoc> = self
                .mem
                .posts
                .iter()
                .filter(|p| !p.metadata.is_deleted)
                .map(|p| p.value().clone())
                .collect();
            posts.sort_by(|a, b| {
                b.metadata
                    .created_at
                    .cmp(&a.metadata.created_at)
                    .then_with(|| a.id.cmp(&b.id))
            });
            let total = posts.len() as u64;
            let page = posts
                .into_iter()
                .skip(skip as usize)
                .take(limit.max(0) as usize)
                .collect();
            Ok((total, page))
        }
    }

    /// Replace a post's title and body
    pub async fn update_post(&self, id: &str, title: &str, body: &str) -> Result<()> {
        if let Some(ref mongo) = self.mongo {
            mongo
                .posts
                .update_one(
                    doc! { "id": id },
                    doc! { "$set": {
                        "title": title,
                        "body": body,
                        "metadata.updated_at": DateTime::now(),
                    } },
                )
                .await?;
            Ok(())
        } else {
            if let Some(mut post) = self.mem.posts.get_mut(id) {
                post.title = title.to_string();
                post.body = body.to_string();
                post.metadata.touch();
            }
            Ok(())
        }
    }

    /// Soft-delete a post
    pub async fn delete_post(&self, id: &str) -> Result<()> {
        if let Some(ref mongo) = self.mongo {
            mongo.posts.soft_delete(doc! { "id": id }).await?;
            Ok(())
        } else {
            if let Some(mut post) = self.mem.posts.get_mut(id) {
                post.metadata.is_deleted = true;
                post.metadata.deleted_at = Some(DateTime::now());
                post.metadata.touch();
            }
            Ok(())
        }
    }
}
