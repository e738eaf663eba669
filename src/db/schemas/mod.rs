//! Database schemas for Agora
//!
//! Defines MongoDB document structures for users, posts, comments, and
//! like rows.

mod comment;
mod like;
mod metadata;
mod post;
mod user;

pub use comment::{CommentDoc, COMMENT_COLLECTION};
pub use like::{
    CommentLikeDoc, LikeView, PostLikeDoc, COMMENT_LIKE_COLLECTION, POST_LIKE_COLLECTION,
};
pub use metadata::Metadata;
pub use post::{PostDoc, MAX_TITLE_LEN, POST_COLLECTION};
pub use user::{UserDoc, UserProfile, USER_COLLECTION};
