//! Status bar — bottom line with the input mode and keybindings.

use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use crate::theme::{C_MODE_COMPOSE, C_MODE_MENU, C_MODE_NORMAL, C_MUTED, C_SECONDARY};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    /// Typing into a composer.
    Compose,
    /// A context menu or confirmation is open.
    Menu,
}

impl InputMode {
    pub fn label(self) -> &'static str {
        match self {
            Self::Normal => "THREAD",
            Self::Compose => "COMPOSE",
            Self::Menu => "MENU",
        }
    }

    pub fn color(self) -> ratatui::style::Color {
        match self {
            Self::Normal => C_MODE_NORMAL,
            Self::Compose => C_MODE_COMPOSE,
            Self::Menu => C_MODE_MENU,
        }
    }

    fn keys(self) -> &'static [(&'static str, &'static str)] {
        match self {
            Self::Normal => &[
                ("j/k", "move"),
                ("u/d", "vote"),
                ("r", "reply"),
                ("m", "menu"),
                ("y", "copy url"),
                ("c", "comment"),
                ("?", "help"),
                ("q", "quit"),
            ],
            Self::Compose => &[("enter", "post"), ("esc", "cancel")],
            Self::Menu => &[("j/k", "move"), ("enter", "select"), ("esc", "close")],
        }
    }
}

/// Draw the keybindings footer bar (one row).
pub fn draw_keys_bar(frame: &mut Frame, area: Rect, mode: InputMode) {
    let mut spans = vec![Span::styled(
        format!(" {} ", mode.label()),
        Style::default().fg(mode.color()).add_modifier(Modifier::BOLD),
    )];
    for (key, desc) in mode.keys() {
        spans.push(Span::styled(format!(" {}", key), Style::default().fg(C_SECONDARY)));
        spans.push(Span::styled(format!(" {} ", desc), Style::default().fg(C_MUTED)));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}
