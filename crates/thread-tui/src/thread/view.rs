//! Recursive thread renderer: comments in, a keyed node tree out.
//!
//! The tree is plain data (`PartialEq`), so the same comments and interaction
//! state always produce the same nodes.  Terminal layout happens later in
//! `layout`.
//!
//! Depth is whatever the comment tree has; callers are expected to hand in
//! threads of reasonable depth.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use thread_proto::model::{Comment, Drive};
use thread_proto::time::time_difference;
use thread_proto::votes::{karma_of, user_vote_of, Vote};

use crate::dispatch::RenderHint;

/// Everything besides the comments that a render depends on.
pub struct RenderContext<'a> {
    pub user_url: &'a str,
    /// Fallback target for reply composers when a comment has no `href`.
    pub href: &'a str,
    pub open_replies: &'a HashMap<String, bool>,
    pub vote_hints: &'a HashMap<String, RenderHint>,
    pub now: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VoteControl {
    pub user_vote: Vote,
    pub karma: Option<i64>,
    pub hint: RenderHint,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NodeHeader {
    pub author_title: String,
    /// In-app link to the author's drive.
    pub author_link: String,
    pub permalink: String,
    pub time_ago: String,
    /// The current user wrote this comment.
    pub own: bool,
}

/// Where an open reply composer posts to.
#[derive(Debug, Clone, PartialEq)]
pub struct ComposerSlot {
    pub href: String,
    pub parent: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ThreadNode {
    /// Comment URL; stable across renders.
    pub key: String,
    pub depth: usize,
    pub vote: VoteControl,
    pub header: NodeHeader,
    pub body: String,
    pub reply_open: bool,
    pub composer: Option<ComposerSlot>,
    pub children: Vec<ThreadNode>,
}

/// Render a comment list.  An empty list renders nothing at all.
pub fn render_thread(comments: &[Comment], ctx: &RenderContext) -> Vec<ThreadNode> {
    render_level(comments, ctx, 0)
}

fn render_level(comments: &[Comment], ctx: &RenderContext, depth: usize) -> Vec<ThreadNode> {
    if comments.is_empty() {
        return Vec::new();
    }
    comments
        .iter()
        .map(|c| render_comment(c, ctx, depth))
        .collect()
}

fn render_comment(comment: &Comment, ctx: &RenderContext, depth: usize) -> ThreadNode {
    let reply_open = ctx.open_replies.get(&comment.url).copied().unwrap_or(false);
    let composer = reply_open.then(|| ComposerSlot {
        href: comment.href.clone().unwrap_or_else(|| ctx.href.to_string()),
        parent: comment.url.clone(),
    });
    let children = if comment.has_replies() {
        render_level(&comment.replies, ctx, depth + 1)
    } else {
        Vec::new()
    };

    ThreadNode {
        key: comment.url.clone(),
        depth,
        vote: VoteControl {
            user_vote: user_vote_of(Some(comment), ctx.user_url),
            karma: karma_of(Some(comment)),
            hint: ctx
                .vote_hints
                .get(&comment.url)
                .copied()
                .unwrap_or(RenderHint::Normal),
        },
        header: NodeHeader {
            author_title: comment.drive.display_title().to_string(),
            author_link: drive_link(&comment.drive),
            permalink: comment.url.clone(),
            time_ago: time_difference(comment.ctime, ctx.now, true, "ago"),
            own: comment.drive.url == ctx.user_url,
        },
        body: comment.content.clone(),
        reply_open,
        composer,
        children,
    }
}

/// `hyper://abc/` → `/abc/`: drives open inside the app, not by scheme.
pub fn drive_link(drive: &Drive) -> String {
    match drive.url.split_once("://") {
        Some((_, rest)) => format!("/{}", rest),
        None => format!("/{}", drive.url),
    }
}

/// Comment URLs in display order (pre-order).
pub fn flat_keys(nodes: &[ThreadNode]) -> Vec<String> {
    let mut out = Vec::new();
    fn walk(nodes: &[ThreadNode], out: &mut Vec<String>) {
        for n in nodes {
            out.push(n.key.clone());
            walk(&n.children, out);
        }
    }
    walk(nodes, &mut out);
    out
}
