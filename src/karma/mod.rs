//! Karma accounting and the rolling leaderboard

pub mod leaderboard;
pub mod ledger;

pub use leaderboard::{
    leaderboard, LeaderboardEntry, DEFAULT_LEADERBOARD_LIMIT, LEADERBOARD_WINDOW_HOURS,
    MAX_LEADERBOARD_LIMIT,
};
pub use ledger::{KarmaLedger, COMMENT_LIKE_KARMA, POST_LIKE_KARMA};
