//! Shared types for Agora

pub mod error;

pub use error::{FeedError, Result};
