//! Comment thread data model shared by the store and the TUI.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An identity-bearing content origin: the author (or voter) behind a comment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Drive {
    pub url: String,
    #[serde(default)]
    pub title: String,
}

impl Drive {
    pub fn new(url: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: title.into(),
        }
    }

    /// Title for display; falls back to the URL when the drive is untitled.
    pub fn display_title(&self) -> &str {
        if self.title.trim().is_empty() {
            &self.url
        } else {
            &self.title
        }
    }
}

/// Tabulated votes for one comment.
///
/// A voter appears in at most one of the two lists; the store enforces that.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteSet {
    #[serde(default)]
    pub upvotes: Vec<Drive>,
    #[serde(default)]
    pub downvotes: Vec<Drive>,
}

/// One comment plus its nested replies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    /// Unique identity across the whole tree.
    pub url: String,
    pub drive: Drive,
    pub content: String,
    pub ctime: DateTime<Utc>,
    /// Resource the comment is attached to.
    #[serde(default)]
    pub href: Option<String>,
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default)]
    pub votes: Option<VoteSet>,
    #[serde(default)]
    pub replies: Vec<Comment>,
}

impl Comment {
    pub fn has_replies(&self) -> bool {
        !self.replies.is_empty()
    }
}

/// Find a comment anywhere in the tree by URL.
pub fn find_comment<'a>(comments: &'a [Comment], url: &str) -> Option<&'a Comment> {
    for c in comments {
        if c.url == url {
            return Some(c);
        }
        if let Some(found) = find_comment(&c.replies, url) {
            return Some(found);
        }
    }
    None
}

/// Replace the `VoteSet` of the comment identified by `url`.
///
/// Only that one node changes; the tree shape is left alone.  Returns `false`
/// when no comment matched (e.g. the thread was reloaded in the meantime).
pub fn patch_votes(comments: &mut [Comment], url: &str, votes: VoteSet) -> bool {
    fn walk(comments: &mut [Comment], url: &str, votes: &mut Option<VoteSet>) -> bool {
        for c in comments.iter_mut() {
            if c.url == url {
                c.votes = votes.take();
                return true;
            }
            if walk(&mut c.replies, url, votes) {
                return true;
            }
        }
        false
    }
    walk(comments, url, &mut Some(votes))
}

/// Count every comment in the tree, replies included.
pub fn count_comments(comments: &[Comment]) -> usize {
    comments
        .iter()
        .map(|c| 1 + count_comments(&c.replies))
        .sum()
}
