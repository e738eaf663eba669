//! Comment tree builder
//!
//! Converts the flat comment set of one post into a rooted forest using
//! the parent references. Built as an arena plus an id index: one pass
//! fills the index, a second records child edges, and assembly walks an
//! explicit stack - no call-stack recursion, and every node is visited at
//! most once, so malformed data (missing parents, even a cycle) can drop
//! nodes but never duplicate them or crash the request.
//!
//! Ordering is creation time descending (newest first) at the root level
//! and inside every reply list, matching the global comment ordering.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::db::schemas::{CommentDoc, UserProfile};

/// One node of the assembled comment forest
#[derive(Serialize, Clone, Debug)]
pub struct CommentNode {
    pub id: String,
    /// Author profile; None if the author record is missing
    pub author: Option<UserProfile>,
    pub content: String,
    pub likes_count: i64,
    pub replies: Vec<CommentNode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Build the nested comment forest for one post.
///
/// `like_counts` maps comment id to live like count; `authors` maps user
/// id to profile. A non-root whose parent is absent from the input set is
/// dropped (stale reference - the data is inconsistent but the request
/// must not fail).
pub fn build_comment_tree(
    comments: Vec<CommentDoc>,
    like_counts: &HashMap<String, i64>,
    authors: &HashMap<String, UserProfile>,
) -> Vec<CommentNode> {
    // Newest first; stable secondary order on id keeps equal timestamps
    // deterministic
    let mut comments = comments;
    comments.sort_by(|a, b| {
        b.metadata
            .created_at
            .cmp(&a.metadata.created_at)
            .then_with(|| a.id.cmp(&b.id))
    });

    // Pass 1: id -> arena slot
    let index: HashMap<String, usize> = comments
        .iter()
        .enumerate()
        .map(|(slot, c)| (c.id.clone(), slot))
        .collect();

    // Pass 2: partition into roots and child edges
    let mut children: Vec<Vec<usize>> = vec![Vec::new(); comments.len()];
    let mut roots: Vec<usize> = Vec::new();

    for (slot, comment) in comments.iter().enumerate() {
        match comment.parent_id.as_deref() {
            None => roots.push(slot),
            Some(parent_id) => match index.get(parent_id) {
                Some(&parent_slot) if parent_slot != slot => {
                    children[parent_slot].push(slot);
                }
                // Parent missing from the input set (or self-referential):
                // drop the orphan rather than fail the request
                _ => {}
            },
        }
    }

    // Arena of unassembled nodes
    let mut nodes: Vec<Option<CommentNode>> = comments
        .into_iter()
        .map(|comment| {
            Some(CommentNode {
                author: authors.get(&comment.author_id).cloned(),
                content: comment.body,
                likes_count: like_counts.get(&comment.id).copied().unwrap_or(0),
                replies: Vec::new(),
                created_at: comment.metadata.created_at.map(|dt| dt.to_chrono()),
                id: comment.id,
            })
        })
        .collect();

    // Walk the forest with an explicit stack, recording parents before
    // children; the visited marks make cycle safety explicit.
    let mut order: Vec<usize> = Vec::with_capacity(nodes.len());
    let mut visited = vec![false; nodes.len()];
    let mut stack: Vec<usize> = roots.clone();

    while let Some(slot) = stack.pop() {
        if visited[slot] {
            continue;
        }
        visited[slot] = true;
        order.push(slot);
        stack.extend(children[slot].iter().copied());
    }

    // Assemble children-first: iterating the discovery order in reverse
    // guarantees every child subtree is complete before its parent takes it
    for &slot in order.iter().rev() {
        let replies: Vec<CommentNode> = children[slot]
            .iter()
            .filter_map(|&child| nodes[child].take())
            .collect();
        if let Some(node) = nodes[slot].as_mut() {
            node.replies = replies;
        }
    }

    roots
        .into_iter()
        .filter_map(|slot| nodes[slot].take())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::DateTime as BsonDateTime;
    use chrono::Duration;

    fn comment_at(
        id: &str,
        parent: Option<&str>,
        minutes_ago: i64,
    ) -> CommentDoc {
        let mut comment = CommentDoc::new(
            "post-1".into(),
            format!("author-{}", id),
            format!("body of {}", id),
            parent.map(|p| p.to_string()),
        );
        comment.id = id.to_string();
        let ts = Utc::now() - Duration::minutes(minutes_ago);
        comment.metadata.created_at = Some(BsonDateTime::from_chrono(ts));
        comment
    }

    fn ids(nodes: &[CommentNode]) -> Vec<&str> {
        nodes.iter().map(|n| n.id.as_str()).collect()
    }

    #[test]
    fn test_roots_and_replies_newest_first() {
        // c1 oldest ... c3 newest; r1/r2 replies of c1 with r2 newer
        let comments = vec![
            comment_at("c1", None, 30),
            comment_at("c2", None, 20),
            comment_at("c3", None, 10),
            comment_at("r1", Some("c1"), 25),
            comment_at("r2", Some("c1"), 5),
        ];

        let tree = build_comment_tree(comments, &HashMap::new(), &HashMap::new());

        assert_eq!(ids(&tree), vec!["c3", "c2", "c1"]);
        let c1 = &tree[2];
        assert_eq!(ids(&c1.replies), vec!["r2", "r1"]);
    }

    #[test]
    fn test_every_comment_appears_exactly_once() {
        let comments = vec![
            comment_at("c1", None, 40),
            comment_at("r1", Some("c1"), 30),
            comment_at("rr1", Some("r1"), 20),
            comment_at("c2", None, 10),
        ];

        let tree = build_comment_tree(comments, &HashMap::new(), &HashMap::new());

        let mut seen = Vec::new();
        let mut stack: Vec<&CommentNode> = tree.iter().collect();
        while let Some(node) = stack.pop() {
            seen.push(node.id.clone());
            stack.extend(node.replies.iter());
        }
        seen.sort();
        assert_eq!(seen, vec!["c1", "c2", "r1", "rr1"]);
    }

    #[test]
    fn test_orphan_with_missing_parent_is_dropped() {
        let comments = vec![
            comment_at("c1", None, 20),
            comment_at("ghost-child", Some("deleted-parent"), 10),
        ];

        let tree = build_comment_tree(comments, &HashMap::new(), &HashMap::new());

        assert_eq!(ids(&tree), vec!["c1"]);
        assert!(tree[0].replies.is_empty());
    }

    #[test]
    fn test_deep_thread_does_not_recurse() {
        // A 5000-deep chain would overflow a recursive builder's stack
        let mut comments = vec![comment_at("n0", None, 10_000)];
        for i in 1..5000 {
            comments.push(comment_at(
                &format!("n{}", i),
                Some(&format!("n{}", i - 1)),
                10_000 - i,
            ));
        }

        let tree = build_comment_tree(comments, &HashMap::new(), &HashMap::new());

        assert_eq!(tree.len(), 1);
        let mut depth = 0;
        let mut node = &tree[0];
        while let Some(child) = node.replies.first() {
            depth += 1;
            node = child;
        }
        assert_eq!(depth, 4999);
    }

    #[test]
    fn test_like_counts_and_authors_attach() {
        let mut authors = HashMap::new();
        let profile = UserProfile {
            id: "author-c1".into(),
            email: "c1@example.com".into(),
            username: "c1_author".into(),
            first_name: "C".into(),
            last_name: "One".into(),
            total_karma: 7,
            created_at: None,
        };
        authors.insert("author-c1".to_string(), profile);

        let mut likes = HashMap::new();
        likes.insert("c1".to_string(), 3);

        let tree = build_comment_tree(vec![comment_at("c1", None, 1)], &likes, &authors);

        assert_eq!(tree[0].likes_count, 3);
        assert_eq!(
            tree[0].author.as_ref().map(|a| a.email.as_str()),
            Some("c1@example.com")
        );
    }

    #[test]
    fn test_empty_input_is_empty_forest() {
        let tree = build_comment_tree(Vec::new(), &HashMap::new(), &HashMap::new());
        assert!(tree.is_empty());
    }
}
