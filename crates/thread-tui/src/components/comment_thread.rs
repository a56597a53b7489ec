//! CommentThread component — the nested comment list with votes, reply
//! composers and the per-comment menu.

use std::collections::HashMap;

use ratatui::crossterm::event::{
    KeyCode, KeyEvent, KeyEventKind, MouseButton, MouseEvent, MouseEventKind,
};
use ratatui::{
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use thread_proto::model::{count_comments, find_comment, Comment};
use thread_proto::votes::{user_vote_of, Vote};

use crate::{
    action::{Action, ComponentId},
    app_state::AppState,
    component::Component,
    theme::{C_ACCENT, C_MUTED, C_SECONDARY, C_SELECTION_BG, C_SEPARATOR},
    thread::{
        layout_rows, render_thread,
        view::flat_keys,
        HitTarget, RenderContext, ReplyState, Row, RowKind, ThreadNode,
    },
    widgets::{
        composer::{Composer, ComposerEvent},
        confirm::{ConfirmDialog, ConfirmEvent},
        context_menu::{ContextMenu, MenuEvent, MenuItem},
        hit,
        pane_chrome::{pane_chrome, Badge},
        status_bar::InputMode,
    },
};

const DEFAULT_PLACEHOLDER: &str = "Add a comment";

/// What the host tells the thread about itself.
#[derive(Debug, Clone)]
pub struct ThreadProps {
    /// Resource the thread is attached to; top-level comments post here.
    pub href: String,
    pub user_url: String,
    pub composer_placeholder: Option<String>,
}

/// Where keyboard input goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ThreadFocus {
    List,
    TopComposer,
    Reply(String),
}

pub struct CommentThread {
    props: ThreadProps,
    replies: ReplyState,
    /// Reply drafts, keyed by the comment being replied to.
    composers: HashMap<String, Composer>,
    top_composer: Composer,
    focus: ThreadFocus,
    selected: Option<String>,
    scroll: usize,
    menu: Option<ContextMenu>,
    confirm: Option<ConfirmDialog<Comment>>,
    /// Layout from the last draw, for mouse hit-testing.
    rows: Vec<Row>,
    list_area: Rect,
    composer_area: Rect,
}

impl CommentThread {
    pub fn new(props: ThreadProps) -> Self {
        let placeholder = props
            .composer_placeholder
            .clone()
            .unwrap_or_else(|| DEFAULT_PLACEHOLDER.to_string());
        let top_composer = Composer::new(props.href.clone(), None, placeholder);
        Self {
            props,
            replies: ReplyState::new(),
            composers: HashMap::new(),
            top_composer,
            focus: ThreadFocus::List,
            selected: None,
            scroll: 0,
            menu: None,
            confirm: None,
            rows: Vec::new(),
            list_area: Rect::default(),
            composer_area: Rect::default(),
        }
    }

    pub fn input_mode(&self) -> InputMode {
        if self.menu.is_some() || self.confirm.is_some() {
            return InputMode::Menu;
        }
        match self.focus {
            ThreadFocus::List => InputMode::Normal,
            ThreadFocus::TopComposer | ThreadFocus::Reply(_) => InputMode::Compose,
        }
    }

    /// Move keyboard focus into a composer that was opened since the last
    /// frame.  The host calls this right after drawing.
    /// The request stays pending until that composer exists.
    pub fn apply_focus_request(&mut self) {
        let ready = self
            .replies
            .focus_request()
            .is_some_and(|url| self.replies.is_open(url) && self.composers.contains_key(url));
        if !ready {
            return;
        }
        if let Some(url) = self.replies.take_focus_request() {
            self.focus = ThreadFocus::Reply(url);
        }
    }

    fn comment_keys(&self, state: &AppState) -> Vec<String> {
        let ctx = RenderContext {
            user_url: &self.props.user_url,
            href: &self.props.href,
            open_replies: self.replies.open_map(),
            vote_hints: &state.vote_hints,
            now: state.now,
        };
        flat_keys(&render_thread(&state.comments, &ctx))
    }

    /// Keep the selection on an existing comment.
    fn sync_selection(&mut self, keys: &[String]) {
        let valid = self
            .selected
            .as_ref()
            .map(|s| keys.contains(s))
            .unwrap_or(false);
        if !valid {
            self.selected = keys.first().cloned();
        }
    }

    fn move_selection(&mut self, delta: isize, state: &AppState) {
        let keys = self.comment_keys(state);
        self.sync_selection(&keys);
        let Some(cur) = self
            .selected
            .as_ref()
            .and_then(|s| keys.iter().position(|k| k == s))
        else {
            return;
        };
        let next = (cur as isize + delta).clamp(0, keys.len() as isize - 1) as usize;
        self.selected = keys.get(next).cloned();
    }

    fn select_edge(&mut self, last: bool, state: &AppState) {
        let keys = self.comment_keys(state);
        self.selected = if last {
            keys.last().cloned()
        } else {
            keys.first().cloned()
        };
    }

    fn current_selection(&mut self, state: &AppState) -> Option<String> {
        let keys = self.comment_keys(state);
        self.sync_selection(&keys);
        self.selected.clone()
    }

    /// Vote `clicked` on `url`; clicking the active direction retracts it.
    fn vote(&self, url: &str, clicked: Vote, state: &AppState) -> Action {
        let current = user_vote_of(find_comment(&state.comments, url), &self.props.user_url);
        Action::Vote {
            url: url.to_string(),
            direction: Vote::toggled(current, clicked),
        }
    }

    /// Open or close the reply composer under `url`.  The composer itself is
    /// created on the next draw, from the rendered slot.
    fn toggle_reply(&mut self, url: &str) {
        if !self.replies.toggle(url) {
            self.close_reply(url);
        }
    }

    /// Make sure every open reply slot has a composer to draw, and drop
    /// reply state for comments that are no longer in the thread.
    fn sync_composers(&mut self, nodes: &[ThreadNode], keys: &[String]) {
        self.composers.retain(|url, _| keys.contains(url));
        self.replies.retain(keys);
        if let ThreadFocus::Reply(url) = &self.focus {
            if !self.composers.contains_key(url) {
                self.focus = ThreadFocus::List;
            }
        }
        self.add_composers(nodes);
    }

    fn add_composers(&mut self, nodes: &[ThreadNode]) {
        for node in nodes {
            if let Some(slot) = &node.composer {
                self.composers
                    .entry(slot.parent.clone())
                    .or_insert_with(|| Composer::reply(slot.href.clone(), slot.parent.clone()));
            }
            self.add_composers(&node.children);
        }
    }

    fn close_reply(&mut self, url: &str) {
        self.replies.close(url);
        self.composers.remove(url);
        if self.focus == ThreadFocus::Reply(url.to_string()) {
            self.focus = ThreadFocus::List;
        }
    }

    fn open_menu(&mut self, url: &str, anchor: (u16, u16), state: &AppState) {
        let Some(comment) = find_comment(&state.comments, url) else {
            return;
        };
        let mut items = vec![MenuItem::new(
            "⧉",
            "Copy comment URL",
            Action::CopyToClipboard(comment.url.clone()),
        )];
        if comment.drive.url == self.props.user_url {
            items.push(MenuItem::new(
                "✕",
                "Delete comment",
                Action::ConfirmDelete(comment.clone()),
            ));
        }
        self.menu = Some(ContextMenu::new(anchor, items));
    }

    /// Screen position of the menu trigger for `url`, one row below it.
    fn menu_anchor(&self, url: &str) -> (u16, u16) {
        let header = self
            .rows
            .iter()
            .position(|r| r.kind == RowKind::Header && r.key.as_deref() == Some(url));
        let Some(idx) = header else {
            return (self.list_area.x, self.list_area.y);
        };
        let col = self.rows[idx]
            .hits
            .iter()
            .find(|h| matches!(h.target, HitTarget::Menu(_)))
            .map(|h| h.cols.start)
            .unwrap_or(0);
        let row = idx.saturating_sub(self.scroll) as u16;
        (self.list_area.x + col, self.list_area.y + row + 1)
    }

    fn handle_composer_key(&mut self, key: KeyEvent) -> Vec<Action> {
        match self.focus.clone() {
            ThreadFocus::Reply(url) => {
                let Some(composer) = self.composers.get_mut(&url) else {
                    self.focus = ThreadFocus::List;
                    return vec![];
                };
                match composer.handle_key(key) {
                    ComposerEvent::Submitted(content) => {
                        let href = composer.href().to_string();
                        let parent = composer.parent().map(str::to_string);
                        self.close_reply(&url);
                        vec![Action::SubmitComment {
                            href,
                            parent,
                            content,
                        }]
                    }
                    ComposerEvent::Cancelled => {
                        self.close_reply(&url);
                        vec![]
                    }
                    ComposerEvent::Changed | ComposerEvent::None => vec![],
                }
            }
            ThreadFocus::TopComposer => match self.top_composer.handle_key(key) {
                ComposerEvent::Submitted(content) => {
                    self.focus = ThreadFocus::List;
                    vec![Action::SubmitComment {
                        href: self.top_composer.href().to_string(),
                        parent: self.top_composer.parent().map(str::to_string),
                        content,
                    }]
                }
                ComposerEvent::Cancelled => {
                    self.focus = ThreadFocus::List;
                    vec![]
                }
                ComposerEvent::Changed | ComposerEvent::None => vec![],
            },
            ThreadFocus::List => vec![],
        }
    }

    fn scroll_to_selection(&mut self, height: usize) {
        if height == 0 {
            return;
        }
        let sel_row = self.selected.as_ref().and_then(|s| {
            self.rows
                .iter()
                .position(|r| r.key.as_deref() == Some(s.as_str()))
        });
        if let Some(row) = sel_row {
            if row < self.scroll {
                self.scroll = row;
            } else if row >= self.scroll + height {
                self.scroll = row + 1 - height;
            }
        }
        self.scroll = self.scroll.min(self.rows.len().saturating_sub(height));
    }
}

impl Component for CommentThread {
    fn id(&self) -> ComponentId {
        ComponentId::Thread
    }

    fn handle_key(&mut self, key: KeyEvent, state: &AppState) -> Vec<Action> {
        if key.kind == KeyEventKind::Release {
            return vec![];
        }

        if let Some(dialog) = &self.confirm {
            match dialog.handle_key(key) {
                ConfirmEvent::Confirmed => {
                    if let Some(dialog) = self.confirm.take() {
                        return vec![Action::DeleteRequested(dialog.into_subject())];
                    }
                }
                ConfirmEvent::Declined => self.confirm = None,
                ConfirmEvent::None => {}
            }
            return vec![];
        }

        if let Some(menu) = &mut self.menu {
            match menu.handle_key(key) {
                MenuEvent::Selected(action) => {
                    self.menu = None;
                    return vec![action];
                }
                MenuEvent::Dismissed => self.menu = None,
                MenuEvent::None => {}
            }
            return vec![];
        }

        if self.focus != ThreadFocus::List {
            return self.handle_composer_key(key);
        }

        match key.code {
            KeyCode::Up | KeyCode::Char('k') => self.move_selection(-1, state),
            KeyCode::Down | KeyCode::Char('j') => self.move_selection(1, state),
            KeyCode::PageUp => self.move_selection(-10, state),
            KeyCode::PageDown => self.move_selection(10, state),
            KeyCode::Home | KeyCode::Char('g') => self.select_edge(false, state),
            KeyCode::End | KeyCode::Char('G') => self.select_edge(true, state),

            KeyCode::Char('u') | KeyCode::Char('+') => {
                if let Some(url) = self.current_selection(state) {
                    return vec![self.vote(&url, Vote::Up, state)];
                }
            }
            KeyCode::Char('d') | KeyCode::Char('-') => {
                if let Some(url) = self.current_selection(state) {
                    return vec![self.vote(&url, Vote::Down, state)];
                }
            }
            KeyCode::Char('r') => {
                if let Some(url) = self.current_selection(state) {
                    self.toggle_reply(&url);
                }
            }
            KeyCode::Tab => {
                // Jump into the selected comment's open reply, else the top composer.
                match self.current_selection(state) {
                    Some(url) if self.composers.contains_key(&url) => {
                        self.focus = ThreadFocus::Reply(url);
                    }
                    _ => self.focus = ThreadFocus::TopComposer,
                }
            }
            KeyCode::Char('m') | KeyCode::Enter => {
                if let Some(url) = self.current_selection(state) {
                    let anchor = self.menu_anchor(&url);
                    self.open_menu(&url, anchor, state);
                }
            }
            KeyCode::Char('y') => {
                if let Some(url) = self.current_selection(state) {
                    return vec![Action::CopyToClipboard(url)];
                }
            }
            KeyCode::Char('c') | KeyCode::Char('a') => self.focus = ThreadFocus::TopComposer,
            KeyCode::Char('R') => return vec![Action::Reload],
            _ => {}
        }

        vec![]
    }

    fn handle_mouse(&mut self, event: MouseEvent, _area: Rect, state: &AppState) -> Vec<Action> {
        let (col, row) = (event.column, event.row);
        match event.kind {
            MouseEventKind::ScrollUp if self.menu.is_none() && self.confirm.is_none() => {
                self.move_selection(-1, state);
            }
            MouseEventKind::ScrollDown if self.menu.is_none() && self.confirm.is_none() => {
                self.move_selection(1, state);
            }
            MouseEventKind::Down(MouseButton::Left) => {
                if let Some(dialog) = &self.confirm {
                    match dialog.handle_click(col, row) {
                        ConfirmEvent::Confirmed => {
                            if let Some(dialog) = self.confirm.take() {
                                return vec![Action::DeleteRequested(dialog.into_subject())];
                            }
                        }
                        ConfirmEvent::Declined => self.confirm = None,
                        ConfirmEvent::None => {}
                    }
                    return vec![];
                }
                if let Some(menu) = &mut self.menu {
                    match menu.handle_click(col, row) {
                        MenuEvent::Selected(action) => {
                            self.menu = None;
                            return vec![action];
                        }
                        MenuEvent::Dismissed => self.menu = None,
                        MenuEvent::None => {}
                    }
                    return vec![];
                }

                if hit(self.composer_area, col, row) {
                    self.focus = ThreadFocus::TopComposer;
                    return vec![];
                }
                if !hit(self.list_area, col, row) {
                    return vec![];
                }

                let idx = self.scroll + (row - self.list_area.y) as usize;
                let Some(clicked) = self.rows.get(idx) else {
                    return vec![];
                };
                if clicked.kind == RowKind::Composer {
                    if let Some(url) = clicked.key.clone() {
                        self.selected = Some(url.clone());
                        self.focus = ThreadFocus::Reply(url);
                    }
                    return vec![];
                }
                let Some(target) = clicked.target_at(col - self.list_area.x).cloned() else {
                    return vec![];
                };
                self.focus = ThreadFocus::List;
                match target {
                    HitTarget::Upvote(url) => {
                        self.selected = Some(url.clone());
                        return vec![self.vote(&url, Vote::Up, state)];
                    }
                    HitTarget::Downvote(url) => {
                        self.selected = Some(url.clone());
                        return vec![self.vote(&url, Vote::Down, state)];
                    }
                    HitTarget::Menu(url) => {
                        self.selected = Some(url.clone());
                        self.open_menu(&url, (col, row + 1), state);
                    }
                    HitTarget::ToggleReply(url) => {
                        self.selected = Some(url.clone());
                        self.toggle_reply(&url);
                    }
                    HitTarget::Select(url) => self.selected = Some(url),
                }
            }
            _ => {}
        }
        vec![]
    }

    fn on_action(&mut self, action: &Action, _state: &AppState) -> Vec<Action> {
        if let Action::ConfirmDelete(comment) = action {
            self.menu = None;
            self.confirm = Some(ConfirmDialog::new("Are you sure?", comment.clone()));
        }
        vec![]
    }

    fn draw(&mut self, frame: &mut Frame, area: Rect, focused: bool, state: &AppState) {
        let count = count_comments(&state.comments);
        let badge_text = match count {
            1 => "1 comment".to_string(),
            n => format!("{} comments", n),
        };
        let title = format!("thread · {}", state.user.display_title());
        let block = pane_chrome(
            &title,
            focused,
            Some(Badge {
                text: &badge_text,
                color: C_SECONDARY,
            }),
        );
        let inner = block.inner(area);
        frame.render_widget(block, area);
        if inner.height < 3 || inner.width < 8 {
            return;
        }

        self.list_area = Rect {
            height: inner.height - 2,
            ..inner
        };
        let separator = Rect {
            y: inner.y + inner.height - 2,
            height: 1,
            ..inner
        };
        self.composer_area = Rect {
            y: inner.y + inner.height - 1,
            height: 1,
            ..inner
        };

        let ctx = RenderContext {
            user_url: &self.props.user_url,
            href: &self.props.href,
            open_replies: self.replies.open_map(),
            vote_hints: &state.vote_hints,
            now: state.now,
        };
        let nodes = render_thread(&state.comments, &ctx);
        let keys = flat_keys(&nodes);
        self.rows = layout_rows(&nodes, self.list_area.width);
        self.sync_composers(&nodes, &keys);
        self.sync_selection(&keys);
        let height = self.list_area.height as usize;
        self.scroll_to_selection(height);

        if let Some(err) = &state.error_message {
            frame.render_widget(
                Paragraph::new(Span::styled(
                    format!("  {}", err),
                    Style::default().fg(C_ACCENT),
                )),
                self.list_area,
            );
        } else if !state.loaded {
            frame.render_widget(
                Paragraph::new(Span::styled("  loading thread…", Style::default().fg(C_MUTED))),
                self.list_area,
            );
        } else if nodes.is_empty() {
            frame.render_widget(
                Paragraph::new(Span::styled(
                    "  no comments yet, press c to add one",
                    Style::default().fg(C_MUTED),
                )),
                self.list_area,
            );
        } else {
            let selected = self.selected.as_deref();
            let lines: Vec<Line> = self
                .rows
                .iter()
                .skip(self.scroll)
                .take(height)
                .map(|r| {
                    let line = r.line.clone();
                    if r.kind != RowKind::Spacer && r.key.as_deref() == selected {
                        line.style(Style::default().bg(C_SELECTION_BG))
                    } else {
                        line
                    }
                })
                .collect();
            frame.render_widget(Paragraph::new(lines), self.list_area);

            for (i, row) in self.rows.iter().enumerate().skip(self.scroll).take(height) {
                if row.kind != RowKind::Composer {
                    continue;
                }
                let Some(composer) = row.key.as_ref().and_then(|k| self.composers.get(k)) else {
                    continue;
                };
                let slot = Rect {
                    x: self.list_area.x + row.indent,
                    y: self.list_area.y + (i - self.scroll) as u16,
                    width: self.list_area.width.saturating_sub(row.indent),
                    height: 1,
                };
                let has_focus = focused
                    && matches!(&self.focus, ThreadFocus::Reply(u) if Some(u) == row.key.as_ref());
                composer.draw(frame, slot, has_focus);
            }
        }

        frame.render_widget(
            Paragraph::new(Span::styled(
                "─".repeat(separator.width as usize),
                Style::default().fg(C_SEPARATOR),
            )),
            separator,
        );
        self.top_composer.draw(
            frame,
            self.composer_area,
            focused && self.focus == ThreadFocus::TopComposer,
        );

        let screen = frame.area();
        if let Some(menu) = &mut self.menu {
            menu.draw(frame, screen);
        }
        if let Some(dialog) = &mut self.confirm {
            dialog.draw(frame, screen);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::crossterm::event::KeyModifiers;
    use ratatui::{backend::TestBackend, Terminal};
    use thread_proto::model::{Drive, VoteSet};

    use crate::thread::view::tests::{comment, sample_tree};

    const ME: &str = "hyper://me";

    fn props() -> ThreadProps {
        ThreadProps {
            href: "hyper://site/post.md".into(),
            user_url: ME.into(),
            composer_placeholder: None,
        }
    }

    fn state_with(comments: Vec<Comment>) -> AppState {
        let mut state = AppState::new("hyper://site/post.md".into(), Drive::new(ME, "Me"));
        state.comments = comments;
        state.loaded = true;
        state
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn draw(t: &mut CommentThread, state: &AppState) {
        let mut terminal = Terminal::new(TestBackend::new(60, 30)).unwrap();
        terminal
            .draw(|f| t.draw(f, Rect::new(0, 0, 60, 30), true, state))
            .unwrap();
    }

    fn press(t: &mut CommentThread, code: KeyCode, state: &AppState) -> Vec<Action> {
        t.handle_key(key(code), state)
    }

    #[test]
    fn test_delete_entry_only_for_author() {
        let state = state_with(sample_tree());
        let mut t = CommentThread::new(props());
        press(&mut t, KeyCode::Char('m'), &state);
        let menu = t.menu.as_ref().expect("menu open");
        assert_eq!(menu.labels(), vec!["Copy comment URL"]);

        let own = comment("hyper://me/9", "me", vec![]);
        let state = state_with(vec![own]);
        let mut t = CommentThread::new(props());
        press(&mut t, KeyCode::Char('m'), &state);
        let menu = t.menu.as_ref().expect("menu open");
        assert_eq!(menu.labels(), vec!["Copy comment URL", "Delete comment"]);
        assert_eq!(t.input_mode(), InputMode::Menu);
    }

    #[test]
    fn test_confirm_emits_exactly_one_delete() {
        let own = comment("hyper://me/9", "me", vec![]);
        let state = state_with(vec![own.clone()]);
        let mut t = CommentThread::new(props());

        press(&mut t, KeyCode::Char('m'), &state);
        press(&mut t, KeyCode::Char('j'), &state);
        let actions = press(&mut t, KeyCode::Enter, &state);
        assert_eq!(actions, vec![Action::ConfirmDelete(own.clone())]);
        assert!(t.menu.is_none());

        t.on_action(&actions[0], &state);
        assert_eq!(t.confirm.as_ref().map(|d| d.prompt()), Some("Are you sure?"));

        let actions = press(&mut t, KeyCode::Char('y'), &state);
        assert_eq!(actions, vec![Action::DeleteRequested(own)]);
        let again = press(&mut t, KeyCode::Char('y'), &state);
        assert!(!again
            .iter()
            .any(|a| matches!(a, Action::DeleteRequested(_))));
    }

    #[test]
    fn test_declined_confirm_is_silent() {
        let own = comment("hyper://me/9", "me", vec![]);
        let state = state_with(vec![own.clone()]);
        let mut t = CommentThread::new(props());
        t.on_action(&Action::ConfirmDelete(own), &state);
        assert!(press(&mut t, KeyCode::Char('n'), &state).is_empty());
        assert!(t.confirm.is_none());
        assert_eq!(t.input_mode(), InputMode::Normal);
    }

    #[test]
    fn test_vote_keys_toggle_against_current_vote() {
        let mut c = comment("hyper://a/1", "a", vec![]);
        c.votes = Some(VoteSet {
            upvotes: vec![Drive::new(ME, "Me")],
            downvotes: vec![],
        });
        let state = state_with(vec![c]);
        let mut t = CommentThread::new(props());

        assert_eq!(
            press(&mut t, KeyCode::Char('u'), &state),
            vec![Action::Vote {
                url: "hyper://a/1".into(),
                direction: Vote::Neutral
            }]
        );
        assert_eq!(
            press(&mut t, KeyCode::Char('d'), &state),
            vec![Action::Vote {
                url: "hyper://a/1".into(),
                direction: Vote::Down
            }]
        );
    }

    #[test]
    fn test_reply_submit_closes_composer() {
        let state = state_with(sample_tree());
        let mut t = CommentThread::new(props());
        press(&mut t, KeyCode::Char('j'), &state);
        assert_eq!(t.selected.as_deref(), Some("hyper://b/2"));

        press(&mut t, KeyCode::Char('r'), &state);
        assert!(t.replies.is_open("hyper://b/2"));
        // Focus moves only once the frame with the composer has been drawn.
        assert_eq!(t.focus, ThreadFocus::List);
        assert!(!t.composers.contains_key("hyper://b/2"));
        draw(&mut t, &state);
        t.apply_focus_request();
        assert_eq!(t.focus, ThreadFocus::Reply("hyper://b/2".into()));
        assert_eq!(t.input_mode(), InputMode::Compose);

        press(&mut t, KeyCode::Char('h'), &state);
        press(&mut t, KeyCode::Char('i'), &state);
        let actions = press(&mut t, KeyCode::Enter, &state);
        assert_eq!(
            actions,
            vec![Action::SubmitComment {
                href: "hyper://site/post.md".into(),
                parent: Some("hyper://b/2".into()),
                content: "hi".into(),
            }]
        );
        assert!(!t.replies.is_open("hyper://b/2"));
        assert!(!t.replies.is_open("hyper://c/3"));
        assert_eq!(t.input_mode(), InputMode::Normal);
    }

    #[test]
    fn test_focus_waits_for_composer() {
        let state = state_with(sample_tree());
        let mut t = CommentThread::new(props());
        press(&mut t, KeyCode::Char('r'), &state);

        // Too short to lay out the list, so no composer is created yet.
        let mut terminal = Terminal::new(TestBackend::new(60, 4)).unwrap();
        terminal
            .draw(|f| t.draw(f, Rect::new(0, 0, 60, 4), true, &state))
            .unwrap();
        t.apply_focus_request();
        assert_eq!(t.focus, ThreadFocus::List);

        draw(&mut t, &state);
        t.apply_focus_request();
        assert_eq!(t.focus, ThreadFocus::Reply("hyper://a/1".into()));
    }

    #[test]
    fn test_reload_prunes_reply_state() {
        let state = state_with(sample_tree());
        let mut t = CommentThread::new(props());
        press(&mut t, KeyCode::Char('j'), &state);
        press(&mut t, KeyCode::Char('r'), &state);
        draw(&mut t, &state);
        t.apply_focus_request();
        assert!(t.composers.contains_key("hyper://b/2"));

        // B was deleted elsewhere; only D is left.
        let d = sample_tree().pop().unwrap();
        let state = state_with(vec![d]);
        draw(&mut t, &state);
        assert!(t.composers.is_empty());
        assert!(!t.replies.open_map().contains_key("hyper://b/2"));
        assert_eq!(t.focus, ThreadFocus::List);
    }

    #[test]
    fn test_top_composer_posts_without_parent() {
        let state = state_with(vec![]);
        let mut t = CommentThread::new(props());
        press(&mut t, KeyCode::Char('c'), &state);
        for ch in "first".chars() {
            press(&mut t, KeyCode::Char(ch), &state);
        }
        assert_eq!(
            press(&mut t, KeyCode::Enter, &state),
            vec![Action::SubmitComment {
                href: "hyper://site/post.md".into(),
                parent: None,
                content: "first".into(),
            }]
        );
    }

    #[test]
    fn test_draw_then_click_upvote() {
        let state = state_with(sample_tree());
        let mut t = CommentThread::new(props());
        let mut terminal = Terminal::new(TestBackend::new(60, 30)).unwrap();
        let area = Rect::new(0, 0, 60, 30);
        terminal
            .draw(|f| t.draw(f, area, true, &state))
            .unwrap();

        // Inside the border: first row is A's header, the ▲ column starts at x=1.
        let click = MouseEvent {
            kind: MouseEventKind::Down(MouseButton::Left),
            column: 2,
            row: 1,
            modifiers: KeyModifiers::NONE,
        };
        assert_eq!(
            t.handle_mouse(click, area, &state),
            vec![Action::Vote {
                url: "hyper://a/1".into(),
                direction: Vote::Up
            }]
        );

        // A's footer row holds the reply toggle after the vote column.
        let toggle = MouseEvent {
            column: 1 + crate::thread::layout::GUTTER,
            row: 3,
            ..click
        };
        assert!(t.handle_mouse(toggle, area, &state).is_empty());
        assert!(t.replies.is_open("hyper://a/1"));
    }

    fn menu_trigger_col(t: &CommentThread) -> u16 {
        let header = &t.rows[0];
        let menu = header
            .hits
            .iter()
            .find(|h| matches!(h.target, HitTarget::Menu(_)))
            .expect("menu trigger on header");
        t.list_area.x + menu.cols.start
    }

    #[test]
    fn test_menu_click_anchors_below_trigger() {
        let state = state_with(sample_tree());
        let mut t = CommentThread::new(props());
        let area = Rect::new(0, 0, 60, 30);
        draw(&mut t, &state);

        let col = menu_trigger_col(&t);
        let click = MouseEvent {
            kind: MouseEventKind::Down(MouseButton::Left),
            column: col,
            row: 1,
            modifiers: KeyModifiers::NONE,
        };
        assert!(t.handle_mouse(click, area, &state).is_empty());
        let menu = t.menu.as_ref().expect("menu open");
        let placed = menu.placement(area);
        assert_eq!((placed.x, placed.y), (col, 2));
    }

    #[test]
    fn test_menu_key_anchors_below_trigger() {
        let state = state_with(sample_tree());
        let mut t = CommentThread::new(props());
        let area = Rect::new(0, 0, 60, 30);
        draw(&mut t, &state);

        let col = menu_trigger_col(&t);
        press(&mut t, KeyCode::Char('m'), &state);
        let menu = t.menu.as_ref().expect("menu open");
        let placed = menu.placement(area);
        assert_eq!((placed.x, placed.y), (col, 2));
    }
}
