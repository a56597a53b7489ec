//! App — component-based event loop.
//!
//! Architecture:
//! - `App` owns the components and `AppState` (shared read-only data for components).
//! - A `tokio::mpsc` channel carries `AppMessage` events in from background tasks.
//! - The event loop draws each frame, then awaits the next message.
//! - Components return `Vec<Action>`; App dispatches each Action.
//! - Store calls run in spawned tasks and report back over the same channel.

use std::future::Future;
use std::io;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use ratatui::crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
        KeyModifiers, MouseEvent,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    Terminal,
};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use thread_proto::model::{patch_votes, Comment, VoteSet};
use thread_proto::store::SocialStore;

use crate::{
    action::Action,
    app_state::AppState,
    component::Component,
    components::{
        comment_thread::{CommentThread, ThreadProps},
        help_overlay::HelpOverlay,
    },
    dispatch::VoteDispatcher,
    widgets::{status_bar, toast::ToastManager},
};

// ── Internal event bus ────────────────────────────────────────────────────────

#[derive(Debug)]
enum AppMessage {
    Event(Event),
    ThreadLoaded(Vec<Comment>),
    LoadFailed(String),
    VotesTabulated { url: String, votes: VoteSet },
    VoteFailed { url: String, error: String },
    CommentPosted(Comment),
    CommentRemoved(String),
    StoreFailed(String),
}

pub struct App {
    state: AppState,
    store: Arc<dyn SocialStore>,
    votes: VoteDispatcher,

    // ── Components ────────────────────────────────────────────────────────────
    thread: CommentThread,
    help_overlay: HelpOverlay,
    toast: ToastManager,

    show_keys_bar: bool,
    should_quit: bool,
    thread_area: Rect,

    tx: mpsc::Sender<AppMessage>,
    rx: Option<mpsc::Receiver<AppMessage>>,
}

impl App {
    pub fn new(store: Arc<dyn SocialStore>, props: ThreadProps) -> Self {
        let (tx, rx) = mpsc::channel::<AppMessage>(1024);
        Self {
            state: AppState::new(props.href.clone(), store.user().clone()),
            votes: VoteDispatcher::new(Arc::clone(&store)),
            store,
            thread: CommentThread::new(props),
            help_overlay: HelpOverlay::new(),
            toast: ToastManager::new(),
            show_keys_bar: true,
            should_quit: false,
            thread_area: Rect::default(),
            tx,
            rx: Some(rx),
        }
    }

    // ── Main run loop ─────────────────────────────────────────────────────────

    pub async fn run(mut self) -> anyhow::Result<()> {
        let Some(mut rx) = self.rx.take() else {
            anyhow::bail!("app event loop already started");
        };

        debug!("run(): enabling raw mode");
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;
        debug!("run(): terminal created, size={:?}", terminal.size());

        // ── Background task: keyboard/mouse events ────────────────────────────
        let event_tx = self.tx.clone();
        tokio::task::spawn_blocking(move || loop {
            match event::read() {
                Ok(ev) => {
                    if event_tx.blocking_send(AppMessage::Event(ev)).is_err() {
                        break;
                    }
                }
                Err(_) => break,
            }
        });

        self.reload();

        // Toasts, vote pulses and "time ago" labels.
        let mut ui_tick = tokio::time::interval(Duration::from_millis(100));
        ui_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        // ── Main loop ─────────────────────────────────────────────────────────
        loop {
            terminal.draw(|f| self.draw(f))?;
            // A composer opened during this frame now exists on screen.
            let before = self.thread.input_mode();
            self.thread.apply_focus_request();
            if self.thread.input_mode() != before {
                self.sync_input_mode();
                terminal.draw(|f| self.draw(f))?;
            }

            if self.should_quit {
                break;
            }

            tokio::select! {
                Some(msg) = rx.recv() => {
                    self.handle_message(msg).await;
                    // Drain whatever else is queued before redrawing.
                    while let Ok(next) = rx.try_recv() {
                        self.handle_message(next).await;
                    }
                }

                _ = ui_tick.tick() => {
                    let tick_actions: Vec<Action> = {
                        let s = &self.state;
                        let mut all = Vec::new();
                        all.extend(self.thread.tick(s));
                        all.extend(self.help_overlay.tick(s));
                        all
                    };
                    for action in tick_actions {
                        self.dispatch(action).await;
                    }
                    self.on_tick();
                }
            }

            if self.should_quit {
                break;
            }
        }

        // ── Teardown ──────────────────────────────────────────────────────────
        disable_raw_mode()?;
        execute!(
            terminal.backend_mut(),
            LeaveAlternateScreen,
            DisableMouseCapture
        )?;
        terminal.show_cursor()?;
        info!("threadview exiting");

        Ok(())
    }

    fn on_tick(&mut self) {
        self.toast.tick();
        self.state.vote_hints = self.votes.hints();
        self.state.now = Utc::now();
    }

    // ── Message handler ───────────────────────────────────────────────────────

    async fn handle_message(&mut self, msg: AppMessage) {
        match msg {
            AppMessage::Event(ev) => match ev {
                Event::Key(key) => {
                    if key.kind == KeyEventKind::Release {
                        return;
                    }
                    let actions = self.handle_key(key);
                    for a in actions {
                        self.dispatch(a).await;
                    }
                    self.sync_input_mode();
                }
                Event::Mouse(mouse) => {
                    let actions = self.handle_mouse(mouse);
                    for a in actions {
                        self.dispatch(a).await;
                    }
                    self.sync_input_mode();
                }
                Event::Resize(w, h) => {
                    self.dispatch(Action::Resize(w, h)).await;
                }
                _ => {}
            },

            AppMessage::ThreadLoaded(comments) => {
                debug!("thread loaded: {} top-level comments", comments.len());
                self.state.comments = comments;
                self.state.loaded = true;
                self.state.error_message = None;
            }
            AppMessage::LoadFailed(e) => {
                error!("failed to load thread {}: {}", self.state.href, e);
                self.state.loaded = true;
                self.state.error_message = Some(format!("could not load thread: {}", e));
            }

            AppMessage::VotesTabulated { url, votes } => {
                self.votes.finish(&url);
                if !patch_votes(&mut self.state.comments, &url, votes) {
                    debug!("tabulated votes for {} which is no longer shown", url);
                }
                self.state.vote_hints = self.votes.hints();
            }
            AppMessage::VoteFailed { url, error } => {
                self.votes.finish(&url);
                self.state.vote_hints = self.votes.hints();
                warn!("vote on {} failed: {}", url, error);
                self.toast.error(format!("Vote failed: {}", error));
            }

            AppMessage::CommentPosted(comment) => {
                info!("posted comment {}", comment.url);
                self.toast.success("Comment posted");
                self.reload();
            }
            AppMessage::CommentRemoved(url) => {
                info!("removed comment {}", url);
                self.toast.info("Comment deleted");
                self.reload();
            }
            AppMessage::StoreFailed(e) => {
                warn!("store error: {}", e);
                self.toast.warning(e);
            }
        }
    }

    // ── Input routing ─────────────────────────────────────────────────────────

    fn handle_key(&mut self, key: KeyEvent) -> Vec<Action> {
        if key.code == KeyCode::Char('c') && key.modifiers == KeyModifiers::CONTROL {
            return vec![Action::Quit];
        }

        // Help overlay captures all keys when visible
        if self.help_overlay.visible {
            return self.help_overlay.handle_key(key, &self.state);
        }

        // Global keys — only while no composer or popup is taking input
        if self.state.input_mode == status_bar::InputMode::Normal {
            match key.code {
                KeyCode::Char('q') if key.modifiers == KeyModifiers::NONE => {
                    return vec![Action::Quit];
                }
                KeyCode::Char('?') => return vec![Action::ToggleHelp],
                KeyCode::Char('K') => return vec![Action::ToggleKeys],
                _ => {}
            }
        }

        let actions = self.thread.handle_key(key, &self.state);
        if !actions.is_empty() {
            debug!("{:?} key {:?} -> {:?}", self.thread.id(), key.code, actions);
        }
        actions
    }

    fn handle_mouse(&mut self, event: MouseEvent) -> Vec<Action> {
        if self.help_overlay.visible {
            return vec![];
        }
        self.thread.handle_mouse(event, self.thread_area, &self.state)
    }

    fn sync_input_mode(&mut self) {
        self.state.input_mode = self.thread.input_mode();
    }

    // ── Action dispatch ───────────────────────────────────────────────────────

    async fn dispatch(&mut self, action: Action) {
        // Broadcast action to all components first
        let secondary: Vec<Action> = {
            let s = &self.state;
            let mut out = Vec::new();
            out.extend(self.thread.on_action(&action, s));
            out.extend(self.help_overlay.on_action(&action, s));
            out
        };

        self.apply_action(action).await;

        // Dispatch any secondary actions (depth-limited to 1 level)
        for a in secondary {
            self.apply_action(a).await;
        }
    }

    async fn apply_action(&mut self, action: Action) {
        if !matches!(action, Action::Resize(_, _)) {
            debug!("apply_action: {:?}", action);
        }
        match action {
            // ── Thread ────────────────────────────────────────────────────────
            Action::Vote { url, direction } => {
                let Some(round_trip) = self.votes.dispatch(url, direction) else {
                    self.toast.warning("Previous vote still in progress");
                    return;
                };
                self.spawn_store(async move {
                    let outcome = round_trip.await;
                    match outcome.result {
                        Ok(votes) => AppMessage::VotesTabulated {
                            url: outcome.url,
                            votes,
                        },
                        Err(e) => AppMessage::VoteFailed {
                            url: outcome.url,
                            error: e.to_string(),
                        },
                    }
                });
                self.state.vote_hints = self.votes.hints();
            }
            Action::SubmitComment {
                href,
                parent,
                content,
            } => {
                let store = Arc::clone(&self.store);
                self.spawn_store(async move {
                    match store.add_comment(&href, parent.as_deref(), &content).await {
                        Ok(comment) => AppMessage::CommentPosted(comment),
                        Err(e) => AppMessage::StoreFailed(format!("Could not post: {}", e)),
                    }
                });
            }
            Action::DeleteRequested(comment) => {
                let store = Arc::clone(&self.store);
                self.spawn_store(async move {
                    match store.remove_comment(&comment.url).await {
                        Ok(()) => AppMessage::CommentRemoved(comment.url),
                        Err(e) => AppMessage::StoreFailed(format!("Could not delete: {}", e)),
                    }
                });
            }
            Action::Reload => self.reload(),

            // ── UI ────────────────────────────────────────────────────────────
            Action::ToggleKeys => self.show_keys_bar = !self.show_keys_bar,
            Action::CopyToClipboard(text) => {
                match arboard::Clipboard::new().and_then(|mut cb| cb.set_text(text)) {
                    Ok(()) => self.toast.success("Copied to your clipboard"),
                    Err(e) => {
                        warn!("clipboard error: {}", e);
                        self.toast.error(format!("clipboard error: {}", e));
                    }
                }
            }

            Action::Quit => self.should_quit = true,

            // Handled by components in `on_action`.
            Action::ConfirmDelete(_) | Action::ToggleHelp | Action::Resize(_, _) => {}
        }
    }

    // ── Store calls ───────────────────────────────────────────────────────────

    fn reload(&self) {
        let store = Arc::clone(&self.store);
        let href = self.state.href.clone();
        self.spawn_store(async move {
            match store.list_thread(&href).await {
                Ok(comments) => AppMessage::ThreadLoaded(comments),
                Err(e) => AppMessage::LoadFailed(e.to_string()),
            }
        });
    }

    /// Run `call` in the background and feed its message back into the loop.
    fn spawn_store<F>(&self, call: F)
    where
        F: Future<Output = AppMessage> + Send + 'static,
    {
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let _ = tx.send(call.await).await;
        });
    }

    // ── Drawing ───────────────────────────────────────────────────────────────

    fn draw(&mut self, frame: &mut ratatui::Frame) {
        use crate::theme::C_BG;
        use ratatui::widgets::Block;
        let area = frame.area();

        frame.render_widget(
            Block::default().style(ratatui::style::Style::default().bg(C_BG)),
            area,
        );

        let status_h = if self.show_keys_bar { 1u16 } else { 0 };
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(3), Constraint::Length(status_h)])
            .split(area);

        self.thread_area = chunks[0];
        self.thread
            .draw(frame, chunks[0], !self.help_overlay.visible, &self.state);

        if self.show_keys_bar {
            status_bar::draw_keys_bar(frame, chunks[1], self.state.input_mode);
        }

        self.help_overlay.draw(frame, area, true, &self.state);
        self.toast.draw(frame, area);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use thread_proto::model::Drive;
    use thread_proto::store::LocalStore;
    use thread_proto::votes::Vote;

    const HREF: &str = "hyper://site/post.md";

    fn me() -> Drive {
        Drive::new("hyper://me", "Me")
    }

    fn app_with(store: Arc<LocalStore>) -> App {
        App::new(
            store,
            ThreadProps {
                href: HREF.into(),
                user_url: me().url,
                composer_placeholder: None,
            },
        )
    }

    async fn pump(app: &mut App) {
        let msg = match app.rx.as_mut() {
            Some(rx) => rx.recv().await.expect("message"),
            None => panic!("receiver taken"),
        };
        app.handle_message(msg).await;
    }

    #[tokio::test]
    async fn test_load_then_vote_patches_karma() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(LocalStore::open(dir.path().join("s.json"), me()).unwrap());
        let ada = Drive::new("hyper://ada", "Ada");
        let url = store
            .insert_comment_as(&ada, HREF, None, "hello", Utc::now())
            .await
            .unwrap();

        let mut app = app_with(Arc::clone(&store));
        app.reload();
        pump(&mut app).await;
        assert!(app.state.loaded);
        assert_eq!(app.state.comments.len(), 1);

        app.dispatch(Action::Vote {
            url: url.clone(),
            direction: Vote::Up,
        })
        .await;
        assert!(app.votes.is_pending(&url));
        assert!(app.state.vote_hints.contains_key(&url));

        // A second click while the first is in flight is dropped.
        app.dispatch(Action::Vote {
            url: url.clone(),
            direction: Vote::Down,
        })
        .await;

        pump(&mut app).await;
        assert!(!app.votes.is_pending(&url));
        assert!(app.state.vote_hints.is_empty());
        let votes = app.state.comments[0].votes.as_ref().unwrap();
        assert_eq!(votes.upvotes.len(), 1);
        assert!(votes.downvotes.is_empty());
    }

    #[tokio::test]
    async fn test_post_and_delete_reload_thread() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(LocalStore::open(dir.path().join("s.json"), me()).unwrap());
        let mut app = app_with(Arc::clone(&store));

        app.dispatch(Action::SubmitComment {
            href: HREF.into(),
            parent: None,
            content: "mine".into(),
        })
        .await;
        pump(&mut app).await; // CommentPosted
        pump(&mut app).await; // ThreadLoaded
        assert_eq!(app.state.comments.len(), 1);
        assert_eq!(app.toast.messages(), vec!["Comment posted"]);

        let mine = app.state.comments[0].clone();
        app.dispatch(Action::DeleteRequested(mine)).await;
        pump(&mut app).await; // CommentRemoved
        pump(&mut app).await; // ThreadLoaded
        assert!(app.state.comments.is_empty());
    }

    #[tokio::test]
    async fn test_vote_failure_is_surfaced() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(LocalStore::open(dir.path().join("s.json"), me()).unwrap());
        let mut app = app_with(store);
        assert!(app.votes.dispatch("hyper://x/1".into(), Vote::Up).is_some());

        app.handle_message(AppMessage::VoteFailed {
            url: "hyper://x/1".into(),
            error: "offline".into(),
        })
        .await;
        assert!(!app.votes.is_pending("hyper://x/1"));
        assert_eq!(app.toast.messages(), vec!["Vote failed: offline"]);
    }

    #[tokio::test]
    async fn test_quit_key_ignored_while_composing() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(LocalStore::open(dir.path().join("s.json"), me()).unwrap());
        let mut app = app_with(store);
        let key = |c| KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE);

        app.handle_message(AppMessage::Event(Event::Key(key('c')))).await;
        assert_eq!(app.state.input_mode, status_bar::InputMode::Compose);
        app.handle_message(AppMessage::Event(Event::Key(key('q')))).await;
        assert!(!app.should_quit);

        app.handle_message(AppMessage::Event(Event::Key(KeyEvent::new(
            KeyCode::Esc,
            KeyModifiers::NONE,
        ))))
        .await;
        app.handle_message(AppMessage::Event(Event::Key(key('q')))).await;
        assert!(app.should_quit);
    }
}
