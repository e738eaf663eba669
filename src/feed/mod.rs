//! Feed read-model assembly

pub mod tree;

pub use tree::{build_comment_tree, CommentNode};
