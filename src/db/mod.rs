//! Database layer for Agora
//!
//! Provides MongoDB storage for users, posts, comments, and likes.

pub mod mongo;
pub mod schemas;

pub use mongo::{is_duplicate_key_error, IntoIndexes, MongoClient, MongoCollection, MutMetadata};
pub use schemas::Metadata;
