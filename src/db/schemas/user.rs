//! User document schema
//!
//! Users are provisioned on first successful authentication against the
//! external identity provider. `total_karma` is only ever adjusted by the
//! karma ledger.

use bson::{doc, oid::ObjectId, Document};
use chrono::{DateTime as ChronoDateTime, Utc};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

/// Collection name for users
pub const USER_COLLECTION: &str = "users";

/// User document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct UserDoc {
    /// MongoDB document ID
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub mongo_id: Option<ObjectId>,

    /// Common metadata (created_at, updated_at, is_deleted)
    #[serde(default)]
    pub metadata: Metadata,

    /// Internal user ID (UUID string)
    pub id: String,

    /// Stable subject ID issued by the external identity provider
    pub external_id: String,

    /// Email address (unique)
    pub email: String,

    /// Display username
    pub username: String,

    /// First name
    #[serde(default)]
    pub first_name: String,

    /// Last name
    #[serde(default)]
    pub last_name: String,

    /// Lifetime karma total. Monotonically non-decreasing: credited when a
    /// like is newly created, never reversed by an unlike.
    #[serde(default)]
    pub total_karma: i64,
}

impl UserDoc {
    /// Create a new user document
    pub fn new(external_id: String, email: String, username: String) -> Self {
        Self {
            mongo_id: None,
            metadata: Metadata::new(),
            id: Uuid::new_v4().to_string(),
            external_id,
            email,
            username,
            first_name: String::new(),
            last_name: String::new(),
            total_karma: 0,
        }
    }

    /// Public profile projection used in API responses
    pub fn profile(&self) -> UserProfile {
        UserProfile {
            id: self.id.clone(),
            email: self.email.clone(),
            username: self.username.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            total_karma: self.total_karma,
            created_at: self.metadata.created_at.map(|dt| dt.to_chrono()),
        }
    }
}

/// Serialized user profile for API responses
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct UserProfile {
    pub id: String,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub total_karma: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<ChronoDateTime<Utc>>,
}

impl IntoIndexes for UserDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            // Unique index on the provider subject ID
            (
                doc! { "external_id": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("external_id_unique".to_string())
                        .build(),
                ),
            ),
            // Unique index on email
            (
                doc! { "email": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("email_unique".to_string())
                        .build(),
                ),
            ),
            // Index on internal ID for lookups
            (
                doc! { "id": 1 },
                Some(IndexOptions::builder().name("id_index".to_string()).build()),
            ),
        ]
    }
}

impl MutMetadata for UserDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
