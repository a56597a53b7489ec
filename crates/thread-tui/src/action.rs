//! Action enum — all user-initiated intents and internal events.

use thread_proto::model::Comment;
use thread_proto::votes::Vote;

/// Unique identifier for a focusable component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentId {
    Thread,
    HelpOverlay,
}

/// All actions that can flow through the system.
/// Components produce Actions; the App dispatches them.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    // ── Thread ───────────────────────────────────────────────────────────────
    /// Write `direction` as the user's vote on `url`, then re-tabulate.
    Vote { url: String, direction: Vote },
    /// Publish a comment; `parent` is set for replies.
    SubmitComment {
        href: String,
        parent: Option<String>,
        content: String,
    },
    /// Ask the user to confirm deleting this comment.
    ConfirmDelete(Comment),
    /// The user confirmed; the host removes the comment.
    DeleteRequested(Comment),
    /// Re-fetch the thread from the store.
    Reload,

    // ── UI toggles ───────────────────────────────────────────────────────────
    ToggleHelp,
    ToggleKeys,
    CopyToClipboard(String), // text to copy

    // ── System ───────────────────────────────────────────────────────────────
    Quit,
    Resize(u16, u16),
}
