//! Flatten a rendered thread into terminal rows with click targets.
//!
//! Each comment takes a header row, one row per wrapped body line and a footer
//! row.  A narrow vote column runs down the left edge of the first three:
//!
//! ```text
//!  ▲   Ada /ada · 5 minutes ago  ⋯
//!  3    First line of the comment body
//!  ▼    ↩ Reply
//!     │  ▲   Grace /grace · just now  ⋯
//! ```

use std::ops::Range;

use ratatui::{
    style::{Modifier, Style},
    text::{Line, Span},
};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use thread_proto::votes::Vote;

use super::view::ThreadNode;
use crate::dispatch::RenderHint;
use crate::theme::{
    depth_color, style_default, style_link, style_muted, style_secondary, C_ACCENT, C_DOWNVOTED,
    C_MUTED, C_PENDING, C_PRIMARY, C_UPVOTED,
};

/// Columns added per nesting level.
pub const INDENT: u16 = 4;
/// Width of the vote column.
pub const GUTTER: u16 = 5;

const MENU_GLYPH: &str = "⋯";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HitTarget {
    Upvote(String),
    Downvote(String),
    Menu(String),
    ToggleReply(String),
    Select(String),
}

/// A clickable column range within a row, relative to the row's left edge.
#[derive(Debug, Clone, PartialEq)]
pub struct Hit {
    pub cols: Range<u16>,
    pub target: HitTarget,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowKind {
    Header,
    Body,
    Footer,
    /// Placeholder line; the reply composer is drawn over it.
    Composer,
    Spacer,
}

#[derive(Debug, Clone)]
pub struct Row {
    pub line: Line<'static>,
    /// Owning comment URL (`None` for spacers).
    pub key: Option<String>,
    pub kind: RowKind,
    /// Column where the row's text starts (after guides and vote column).
    pub indent: u16,
    pub hits: Vec<Hit>,
}

impl Row {
    /// First target under `col`.  Specific targets come before `Select`.
    pub fn target_at(&self, col: u16) -> Option<&HitTarget> {
        self.hits
            .iter()
            .find(|h| h.cols.contains(&col))
            .map(|h| &h.target)
    }

    #[cfg(test)]
    pub fn text(&self) -> String {
        self.line.spans.iter().map(|s| s.content.as_ref()).collect()
    }
}

pub fn layout_rows(nodes: &[ThreadNode], width: u16) -> Vec<Row> {
    let mut rows = Vec::new();
    for node in nodes {
        push_node(node, width, &mut rows);
        rows.push(Row {
            line: Line::from(""),
            key: None,
            kind: RowKind::Spacer,
            indent: 0,
            hits: Vec::new(),
        });
    }
    rows
}

/// Indentation for `depth`, never more than half the pane.
pub fn indent_for(depth: usize, width: u16) -> u16 {
    let wanted = (depth as u32 * INDENT as u32).min(u16::MAX as u32) as u16;
    wanted.min(width / 2)
}

fn push_node(node: &ThreadNode, width: u16, rows: &mut Vec<Row>) {
    let indent = indent_for(node.depth, width);
    let text_col = indent + GUTTER;
    let text_width = width.saturating_sub(text_col).max(1) as usize;
    let key = node.key.clone();
    let whole_row = 0..width.max(text_col + 1);

    let mut body = wrap(&node.body, text_width);
    if body.is_empty() {
        body.push(String::new());
    }

    // Header
    let mut spans = guide(node.depth, indent);
    spans.push(gutter_span(0, node));
    let author_style = if node.header.own {
        style_link().add_modifier(Modifier::UNDERLINED)
    } else {
        style_link()
    };
    spans.push(Span::styled(node.header.author_title.clone(), author_style));
    spans.push(Span::styled(format!(" {}", node.header.author_link), style_muted()));
    spans.push(Span::styled(
        format!(" · {}  ", node.header.time_ago),
        style_secondary(),
    ));
    let header_w = UnicodeWidthStr::width(node.header.author_title.as_str())
        + UnicodeWidthStr::width(node.header.author_link.as_str())
        + UnicodeWidthStr::width(node.header.time_ago.as_str())
        + 6;
    let menu_col = text_col.saturating_add(u16::try_from(header_w).unwrap_or(u16::MAX));
    spans.push(Span::styled(MENU_GLYPH, style_secondary()));
    rows.push(Row {
        line: Line::from(spans),
        key: Some(key.clone()),
        kind: RowKind::Header,
        indent: text_col,
        hits: vec![
            Hit {
                cols: indent..indent + GUTTER,
                target: HitTarget::Upvote(key.clone()),
            },
            Hit {
                cols: menu_col..menu_col.saturating_add(1),
                target: HitTarget::Menu(node.header.permalink.clone()),
            },
            Hit {
                cols: whole_row.clone(),
                target: HitTarget::Select(key.clone()),
            },
        ],
    });

    // Body, then footer; the vote column continues down the first rows.
    let mut gutter_row = 1;
    for line in body {
        let mut spans = guide(node.depth, indent);
        spans.push(gutter_span(gutter_row, node));
        spans.push(Span::styled(line, style_default()));
        rows.push(Row {
            line: Line::from(spans),
            key: Some(key.clone()),
            kind: RowKind::Body,
            indent: text_col,
            hits: gutter_hits(gutter_row, indent, &key, &whole_row),
        });
        gutter_row += 1;
    }

    let label = if node.reply_open {
        "✕ Cancel reply"
    } else {
        "↩ Reply"
    };
    let mut spans = guide(node.depth, indent);
    spans.push(gutter_span(gutter_row, node));
    spans.push(Span::styled(label, style_secondary()));
    let label_w = UnicodeWidthStr::width(label) as u16;
    let mut hits = vec![Hit {
        cols: text_col..text_col + label_w,
        target: HitTarget::ToggleReply(key.clone()),
    }];
    hits.extend(gutter_hits(gutter_row, indent, &key, &whole_row));
    rows.push(Row {
        line: Line::from(spans),
        key: Some(key.clone()),
        kind: RowKind::Footer,
        indent: text_col,
        hits,
    });

    if node.composer.is_some() {
        rows.push(Row {
            line: Line::from(guide(node.depth, indent)),
            key: Some(key.clone()),
            kind: RowKind::Composer,
            indent: text_col,
            hits: Vec::new(),
        });
    }

    for child in &node.children {
        push_node(child, width, rows);
    }
}

/// Leading spaces plus a coloured thread guide for nested comments.
fn guide(depth: usize, indent: u16) -> Vec<Span<'static>> {
    if depth == 0 || indent < 2 {
        return vec![Span::raw(" ".repeat(indent as usize))];
    }
    vec![
        Span::raw(" ".repeat(indent as usize - 2)),
        Span::styled("│ ", Style::default().fg(depth_color(depth))),
    ]
}

/// Vote column cell for the `n`th row of a comment.
fn gutter_span(n: usize, node: &ThreadNode) -> Span<'static> {
    let cell = |s: &str| format!("{:^4} ", s);
    match n {
        0 => {
            let style = if node.vote.user_vote == Vote::Up {
                Style::default().fg(C_UPVOTED).add_modifier(Modifier::BOLD)
            } else {
                style_muted()
            };
            Span::styled(cell("▲"), style)
        }
        1 => {
            let text = match node.vote.karma {
                Some(k) => k.to_string(),
                None => "·".to_string(),
            };
            let style = match node.vote.hint {
                RenderHint::Normal => Style::default().fg(C_PRIMARY),
                RenderHint::PendingVisible => {
                    Style::default().fg(C_PENDING).add_modifier(Modifier::BOLD)
                }
                RenderHint::PendingHidden => Style::default().fg(C_MUTED),
                RenderHint::TimedOut => Style::default().fg(C_ACCENT),
            };
            Span::styled(cell(&text), style)
        }
        2 => {
            let style = if node.vote.user_vote == Vote::Down {
                Style::default().fg(C_DOWNVOTED).add_modifier(Modifier::BOLD)
            } else {
                style_muted()
            };
            Span::styled(cell("▼"), style)
        }
        _ => Span::raw(" ".repeat(GUTTER as usize)),
    }
}

fn gutter_hits(n: usize, indent: u16, key: &str, whole_row: &Range<u16>) -> Vec<Hit> {
    let mut hits = Vec::new();
    if n == 2 {
        hits.push(Hit {
            cols: indent..indent + GUTTER,
            target: HitTarget::Downvote(key.to_string()),
        });
    }
    hits.push(Hit {
        cols: whole_row.clone(),
        target: HitTarget::Select(key.to_string()),
    });
    hits
}

/// Greedy word wrap by display width.  Explicit newlines are kept and words
/// longer than `width` are split.
pub fn wrap(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut out = Vec::new();
    for para in text.lines() {
        let mut line = String::new();
        let mut line_w = 0;
        for word in para.split_whitespace() {
            let word_w = UnicodeWidthStr::width(word);
            if line_w > 0 && line_w + 1 + word_w <= width {
                line.push(' ');
                line.push_str(word);
                line_w += 1 + word_w;
                continue;
            }
            if line_w > 0 {
                out.push(std::mem::take(&mut line));
                line_w = 0;
            }
            if word_w <= width {
                line.push_str(word);
                line_w = word_w;
                continue;
            }
            for ch in word.chars() {
                let ch_w = UnicodeWidthChar::width(ch).unwrap_or(0);
                if line_w + ch_w > width && line_w > 0 {
                    out.push(std::mem::take(&mut line));
                    line_w = 0;
                }
                line.push(ch);
                line_w += ch_w;
            }
        }
        out.push(line);
    }
    out
}
