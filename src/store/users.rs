//! User store operations
//!
//! Users are provisioned on first authentication and looked up by internal
//! ID everywhere else.

use std::collections::HashMap;

use bson::doc;
use tracing::info;

use crate::auth::Principal;
use crate::db::schemas::UserDoc;
use crate::types::{FeedError, Result};

use super::FeedStore;

impl FeedStore {
    /// Find the user for an authenticated principal, creating one on first
    /// login. Lookup is by the provider's stable subject ID.
    pub async fn find_or_create_user(&self, principal: &Principal) -> Result<UserDoc> {
        if let Some(ref mongo) = self.mongo {
            if let Some(user) = mongo
                .users
                .find_one(doc! { "external_id": &principal.external_id })
                .await?
            {
                return Ok(user);
            }

            let user = principal.provision();
            match mongo.users.insert_one(user.clone()).await {
                Ok(_) => {
                    info!("Provisioned user {} ({})", user.id, user.email);
                    Ok(user)
                }
                Err(FeedError::Database(msg))
                    if msg.contains("E11000") || msg.contains("duplicate key") =>
                {
                    // Lost a provisioning race; the winner's row is there now
                    mongo
                        .users
                        .find_one(doc! { "external_id": &principal.external_id })
                        .await?
                        .ok_or_else(|| {
                            FeedError::Database("User vanished after duplicate insert".into())
                        })
                }
                Err(e) => Err(e),
            }
        } else {
            if let Some(user) = self
                .mem
                .users
                .iter()
                .find(|u| u.external_id == principal.external_id)
            {
                return Ok(user.value().clone());
            }

            let user = principal.provision();
            self.mem.users.insert(user.id.clone(), user.clone());
            info!("Provisioned user {} ({})", user.id, user.email);
            Ok(user)
        }
    }

    /// Get a user by internal ID
    pub async fn get_user(&self, id: &str) -> Result<Option<UserDoc>> {
        if let Some(ref mongo) = self.mongo {
            mongo.users.find_one(doc! { "id": id }).await
        } else {
            Ok(self.mem.users.get(id).map(|u| u.value().clone()))
        }
    }

    /// Batch-resolve users by internal ID (author lookups for listings)
    pub async fn get_users_by_ids(&self, ids: &[String]) -> Result<HashMap<String, UserDoc>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        if let Some(ref mongo) = self.mongo {
            let users = mongo.users.find_many(doc! { "id": { "$in": ids } }).await?;
            Ok(users.into_iter().map(|u| (u.id.clone(), u)).collect())
        } else {
            Ok(ids
                .iter()
                .filter_map(|id| self.mem.users.get(id).map(|u| (id.clone(), u.value().clone())))
                .collect())
        }
    }

    /// Paged user listing, newest first. Returns (total, page).
    pub async fn list_users(&self, skip: u64, limit: i64) -> Result<(u64, Vec<UserDoc>)> {
        if let Some(ref mongo) = self.mongo {
            let total = mongo.users.count(doc! {}).await?;
            let page = mongo
                .users
                .find_page(
                    doc! {},
                    Some(doc! { "metadata.created_at": -1 }),
                    Some(skip),
                    Some(limit),
                )
                .await?;
            Ok((total, page))
        } else {
            let mut users: Vec<UserDoc> = self.mem.users.iter().map(|u| u.value().clone()).collect();
            users.sort_by(|a, b| {
                b.metadata
                    .created_at
                    .cmp(&a.metadata.created_at)
                    .then_with(|| a.id.cmp(&b.id))
            });
            let total = users.len() as u64;
            let page = users
                .into_iter()
                .skip(skip as usize)
                .take(limit.max(0) as usize)
                .collect();
            Ok((total, page))
        }
    }

    /// Credit karma to a user's lifetime total.
    ///
    /// Only the karma ledger calls this; on the Mongo path the increment
    /// normally rides inside the like transaction instead (store::likes).
    pub async fn increment_total_karma(&self, user_id: &str, delta: i64) -> Result<()> {
        if let Some(ref mongo) = self.mongo {
            mongo
                .users
                .update_one(
                    doc! { "id": user_id },
                    doc! { "$inc": { "total_karma": delta } },
                )
                .await?;
            Ok(())
        } else {
            if let Some(mut user) = self.mem.users.get_mut(user_id) {
                user.total_karma += delta;
            }
            Ok(())
        }
    }
}
