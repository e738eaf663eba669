//! Karma ledger
//!
//! The explicit record-like-and-credit-karma operations. Each call is
//! invoked at the moment a like is attempted: a new (user, target) pair
//! inserts the like row and credits the target author's lifetime total in
//! one unit; a duplicate pair is a no-op and never double-awards.
//!
//! Unlike removes the like row only. `total_karma` is a lifetime-cumulative
//! counter, deliberately decoupled from the current like count (which is
//! always derived by counting live rows).

use std::sync::Arc;

use tracing::debug;

use crate::db::schemas::{CommentDoc, CommentLikeDoc, PostDoc, PostLikeDoc, UserDoc};
use crate::store::{FeedStore, LikeOutcome};
use crate::types::{FeedError, Result};

/// Karma credited to a post's author when the post is liked
pub const POST_LIKE_KARMA: i64 = 5;

/// Karma credited to a comment's author when the comment is liked
pub const COMMENT_LIKE_KARMA: i64 = 1;

/// Applies karma credits when likes are newly created
#[derive(Clone)]
pub struct KarmaLedger {
    store: Arc<FeedStore>,
}

impl KarmaLedger {
    pub fn new(store: Arc<FeedStore>) -> Self {
        Self { store }
    }

    /// Record `user` liking `post`. Credits the post's author
    /// `POST_LIKE_KARMA` iff the like is new.
    pub async fn record_post_like(&self, user: &UserDoc, post: &PostDoc) -> Result<LikeOutcome> {
        let like = PostLikeDoc::new(
            user.id.clone(),
            user.email.clone(),
            post.id.clone(),
            post.author_id.clone(),
        );

        let outcome = self.store.create_post_like(like, POST_LIKE_KARMA).await?;
        if outcome == LikeOutcome::Created {
            debug!(
                "Post like: {} -> {} (+{} karma to {})",
                user.id, post.id, POST_LIKE_KARMA, post.author_id
            );
        }
        Ok(outcome)
    }

    /// Remove `user`'s like on `post`. Karma is not reversed. Errors with
    /// NotFound if the pair was never liked.
    pub async fn remove_post_like(&self, user: &UserDoc, post: &PostDoc) -> Result<()> {
        if self.store.delete_post_like(&user.id, &post.id).await? {
            Ok(())
        } else {
            Err(FeedError::NotFound("post not liked".into()))
        }
    }

    /// Record `user` liking `comment`. Credits the comment's author
    /// `COMMENT_LIKE_KARMA` iff the like is new.
    pub async fn record_comment_like(
        &self,
        user: &UserDoc,
        comment: &CommentDoc,
    ) -> Result<LikeOutcome> {
        let like = CommentLikeDoc::new(
            user.id.clone(),
            user.email.clone(),
            comment.id.clone(),
            comment.author_id.clone(),
        );

        let outcome = self
            .store
            .create_comment_like(like, COMMENT_LIKE_KARMA)
            .await?;
        if outcome == LikeOutcome::Created {
            debug!(
                "Comment like: {} -> {} (+{} karma to {})",
                user.id, comment.id, COMMENT_LIKE_KARMA, comment.author_id
            );
        }
        Ok(outcome)
    }

    /// Remove `user`'s like on `comment`. Karma is not reversed. Errors
    /// with NotFound if the pair was never liked.
    pub async fn remove_comment_like(&self, user: &UserDoc, comment: &CommentDoc) -> Result<()> {
        if self.store.delete_comment_like(&user.id, &comment.id).await? {
            Ok(())
        } else {
            Err(FeedError::NotFound("comment not liked".into()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Principal;

    async fn seeded_store() -> (Arc<FeedStore>, UserDoc, UserDoc, PostDoc) {
        let store = Arc::new(FeedStore::memory_only());

        let author = store
            .find_or_create_user(&Principal::with_email("idp|author", "author@example.com"))
            .await
            .unwrap();
        let liker = store
            .find_or_create_user(&Principal::with_email("idp|liker", "liker@example.com"))
            .await
            .unwrap();

        let post = store
            .insert_post(PostDoc::new(
                author.id.clone(),
                "First post".into(),
                "hello".into(),
            ))
            .await
            .unwrap();

        (store, author, liker, post)
    }

    async fn karma_of(store: &FeedStore, user_id: &str) -> i64 {
        store.get_user(user_id).await.unwrap().unwrap().total_karma
    }

    #[tokio::test]
    async fn test_post_like_awards_once() {
        let (store, author, liker, post) = seeded_store().await;
        let ledger = KarmaLedger::new(Arc::clone(&store));

        // First like creates the row and credits +5
        let outcome = ledger.record_post_like(&liker, &post).await.unwrap();
        assert_eq!(outcome, LikeOutcome::Created);
        assert_eq!(karma_of(&store, &author.id).await, POST_LIKE_KARMA);

        // Repeats are no-ops regardless of how often they arrive
        for _ in 0..3 {
            let outcome = ledger.record_post_like(&liker, &post).await.unwrap();
            assert_eq!(outcome, LikeOutcome::AlreadyLiked);
        }
        assert_eq!(karma_of(&store, &author.id).await, POST_LIKE_KARMA);

        // Exactly one row exists
        assert_eq!(store.list_post_likes(&post.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unlike_then_relike_is_lifetime_cumulative() {
        let (store, author, liker, post) = seeded_store().await;
        let ledger = KarmaLedger::new(Arc::clone(&store));

        ledger.record_post_like(&liker, &post).await.unwrap();
        assert_eq!(karma_of(&store, &author.id).await, 5);

        // Unlike removes the row but leaves karma at +5
        ledger.remove_post_like(&liker, &post).await.unwrap();
        assert_eq!(karma_of(&store, &author.id).await, 5);
        assert!(store.list_post_likes(&post.id).await.unwrap().is_empty());

        // Re-like creates a fresh row and credits again
        let outcome = ledger.record_post_like(&liker, &post).await.unwrap();
        assert_eq!(outcome, LikeOutcome::Created);
        assert_eq!(karma_of(&store, &author.id).await, 10);
        assert_eq!(store.list_post_likes(&post.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unlike_without_like_is_not_found() {
        let (store, _author, liker, post) = seeded_store().await;
        let ledger = KarmaLedger::new(Arc::clone(&store));

        let err = ledger.remove_post_like(&liker, &post).await.unwrap_err();
        assert!(matches!(err, FeedError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_comment_like_weight() {
        let (store, author, liker, post) = seeded_store().await;
        let ledger = KarmaLedger::new(Arc::clone(&store));

        let comment = store
            .insert_comment(CommentDoc::new(
                post.id.clone(),
                author.id.clone(),
                "a comment".into(),
                None,
            ))
            .await
            .unwrap();

        ledger.record_comment_like(&liker, &comment).await.unwrap();
        assert_eq!(karma_of(&store, &author.id).await, COMMENT_LIKE_KARMA);

        let outcome = ledger.record_comment_like(&liker, &comment).await.unwrap();
        assert_eq!(outcome, LikeOutcome::AlreadyLiked);
        assert_eq!(karma_of(&store, &author.id).await, COMMENT_LIKE_KARMA);
    }
}
