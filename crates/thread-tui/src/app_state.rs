//! AppState — shared read-only data passed to all components during render/event.
//!
//! Components read this but never mutate it.
//! The App event-loop is the only thing that writes to AppState.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use thread_proto::model::{Comment, Drive};

use crate::dispatch::RenderHint;
use crate::widgets::status_bar::InputMode;

pub struct AppState {
    // ── Thread ──────────────────────────────────────────────────────────────
    /// Snapshot of the thread as last loaded from the store.  Only vote sets
    /// are patched in place between reloads.
    pub comments: Vec<Comment>,
    /// Resource the thread is attached to.
    pub href: String,
    pub user: Drive,
    /// False until the first load completes.
    pub loaded: bool,
    pub error_message: Option<String>,

    // ── Votes in flight ─────────────────────────────────────────────────────
    pub vote_hints: HashMap<String, RenderHint>,

    // ── UI mode ─────────────────────────────────────────────────────────────
    pub input_mode: InputMode,
    /// Clock used for "time ago" labels; advanced on tick.
    pub now: DateTime<Utc>,
}

impl AppState {
    pub fn new(href: String, user: Drive) -> Self {
        Self {
            comments: Vec::new(),
            href,
            user,
            loaded: false,
            error_message: None,
            vote_hints: HashMap::new(),
            input_mode: InputMode::Normal,
            now: Utc::now(),
        }
    }
}
