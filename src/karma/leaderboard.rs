//! Rolling 24-hour karma leaderboard
//!
//! Ranks users by karma earned from likes created inside the trailing
//! window, independent of lifetime totals. Each relation's windowed count
//! is computed on its own and the two are combined by weight here - never
//! in a single combined query.
//!
//! The query reads like-row timestamps alone, so it stays correct even if
//! the stored lifetime counter ever drifted.

use std::collections::HashMap;

use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::store::FeedStore;
use crate::types::Result;

use super::ledger::{COMMENT_LIKE_KARMA, POST_LIKE_KARMA};

/// Default number of leaderboard entries
pub const DEFAULT_LEADERBOARD_LIMIT: usize = 5;

/// Hard cap on leaderboard entries
pub const MAX_LEADERBOARD_LIMIT: usize = 100;

/// Trailing window size in hours
pub const LEADERBOARD_WINDOW_HOURS: i64 = 24;

/// One ranked leaderboard entry
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct LeaderboardEntry {
    pub id: String,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    /// Karma earned inside the trailing window
    pub karma_24h: i64,
    /// Lifetime total, for context
    pub total_karma: i64,
}

/// Top users by karma earned in the trailing 24-hour window.
///
/// `limit` defaults to 5 at the API layer and is capped at 100 here.
pub async fn leaderboard(store: &FeedStore, limit: usize) -> Result<Vec<LeaderboardEntry>> {
    let limit = limit.min(MAX_LEADERBOARD_LIMIT);
    if limit == 0 {
        return Ok(Vec::new());
    }

    let since =
        bson::DateTime::from_chrono(Utc::now() - Duration::hours(LEADERBOARD_WINDOW_HOURS));

    // Two independent windowed counts, weighted and merged in code
    let post_counts = store.windowed_post_like_counts(since).await?;
    let comment_counts = store.windowed_comment_like_counts(since).await?;

    let ranked = rank_windowed_karma(&post_counts, &comment_counts, limit);

    let ids: Vec<String> = ranked.iter().map(|(id, _)| id.clone()).collect();
    let users = store.get_users_by_ids(&ids).await?;

    Ok(ranked
        .into_iter()
        .filter_map(|(id, karma_24h)| {
            users.get(&id).map(|user| LeaderboardEntry {
                id: user.id.clone(),
                email: user.email.clone(),
                username: user.username.clone(),
                first_name: user.first_name.clone(),
                last_name: user.last_name.clone(),
                karma_24h,
                total_karma: user.total_karma,
            })
        })
        .collect())
}

/// Merge per-relation windowed like counts into a ranked karma listing.
///
/// Weighting: post likes x5, comment likes x1. Users with zero windowed
/// karma are excluded. Order is windowed karma descending, then user id
/// ascending so ties are deterministic.
pub fn rank_windowed_karma(
    post_counts: &HashMap<String, i64>,
    comment_counts: &HashMap<String, i64>,
    limit: usize,
) -> Vec<(String, i64)> {
    let mut karma: HashMap<String, i64> = HashMap::new();

    for (user_id, count) in post_counts {
        *karma.entry(user_id.clone()).or_insert(0) += count * POST_LIKE_KARMA;
    }
    for (user_id, count) in comment_counts {
        *karma.entry(user_id.clone()).or_insert(0) += count * COMMENT_LIKE_KARMA;
    }

    let mut ranked: Vec<(String, i64)> = karma.into_iter().filter(|(_, k)| *k > 0).collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked.truncate(limit);
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Principal;
    use crate::db::schemas::{PostDoc, PostLikeDoc, UserDoc};
    use std::sync::Arc;

    fn counts(pairs: &[(&str, i64)]) -> HashMap<String, i64> {
        pairs.iter().map(|(id, n)| (id.to_string(), *n)).collect()
    }

    #[test]
    fn test_rank_weights_and_merge() {
        // 3 post likes (15) + 2 comment likes (2) for alice; 4 comment
        // likes (4) for bob
        let ranked = rank_windowed_karma(
            &counts(&[("alice", 3)]),
            &counts(&[("alice", 2), ("bob", 4)]),
            10,
        );

        assert_eq!(
            ranked,
            vec![("alice".to_string(), 17), ("bob".to_string(), 4)]
        );
    }

    #[test]
    fn test_rank_excludes_zero_karma() {
        let ranked = rank_windowed_karma(&counts(&[("alice", 0)]), &counts(&[]), 10);
        assert!(ranked.is_empty());
    }

    #[test]
    fn test_rank_tie_break_is_id_ascending() {
        let ranked = rank_windowed_karma(
            &counts(&[("b-user", 1), ("a-user", 1), ("c-user", 1)]),
            &counts(&[]),
            10,
        );

        let ids: Vec<&str> = ranked.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(ids, vec!["a-user", "b-user", "c-user"]);
    }

    #[test]
    fn test_rank_truncates_to_limit() {
        let ranked = rank_windowed_karma(
            &counts(&[("a", 5), ("b", 4), ("c", 3), ("d", 2)]),
            &counts(&[]),
            2,
        );

        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].0, "a");
        assert_eq!(ranked[1].0, "b");
    }

    #[test]
    fn test_rank_is_deterministic() {
        let posts = counts(&[("a", 2), ("b", 2), ("c", 1)]);
        let comments = counts(&[("c", 5), ("d", 1)]);

        let first = rank_windowed_karma(&posts, &comments, 10);
        let second = rank_windowed_karma(&posts, &comments, 10);
        assert_eq!(first, second);
    }

    async fn seed_user(store: &FeedStore, ext: &str, email: &str) -> UserDoc {
        store
            .find_or_create_user(&Principal::with_email(ext, email))
            .await
            .unwrap()
    }

    /// Likes inside the window count toward karma_24h; older likes only
    /// show up in total_karma.
    #[tokio::test]
    async fn test_windowed_vs_lifetime_karma() {
        let store = Arc::new(FeedStore::memory_only());

        let author = seed_user(&store, "idp|a", "a@example.com").await;
        let post = store
            .insert_post(PostDoc::new(author.id.clone(), "t".into(), "b".into()))
            .await
            .unwrap();

        // 3 fresh likes within the window, 2 stale ones from 48h ago
        let stale = bson::DateTime::from_chrono(Utc::now() - Duration::hours(48));
        for i in 0..5 {
            let mut like = PostLikeDoc::new(
                format!("liker-{}", i),
                format!("liker{}@example.com", i),
                post.id.clone(),
                author.id.clone(),
            );
            if i >= 3 {
                like.created_at = stale;
            }
            store.create_post_like(like, POST_LIKE_KARMA).await.unwrap();
        }

        let entries = leaderboard(&store, DEFAULT_LEADERBOARD_LIMIT).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].karma_24h, 15);
        assert_eq!(entries[0].total_karma, 25);
    }

    #[tokio::test]
    async fn test_leaderboard_excludes_stale_only_users() {
        let store = Arc::new(FeedStore::memory_only());

        let author = seed_user(&store, "idp|stale", "stale@example.com").await;
        let post = store
            .insert_post(PostDoc::new(author.id.clone(), "t".into(), "b".into()))
            .await
            .unwrap();

        let mut like = PostLikeDoc::new(
            "liker".into(),
            "liker@example.com".into(),
            post.id.clone(),
            author.id.clone(),
        );
        like.created_at = bson::DateTime::from_chrono(Utc::now() - Duration::hours(48));
        store.create_post_like(like, POST_LIKE_KARMA).await.unwrap();

        // Lifetime karma exists, but nothing inside the window
        let entries = leaderboard(&store, DEFAULT_LEADERBOARD_LIMIT).await.unwrap();
        assert!(entries.is_empty());
    }
}
