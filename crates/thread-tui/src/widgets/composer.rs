//! Composer — single-line comment/reply input built on tui-input.
//!
//! The composer knows where its text goes (`href`, optional `parent`) but not
//! how it is published; submitting just hands the text back to the caller.

use ratatui::crossterm::event::{Event, KeyCode, KeyEvent};
use ratatui::{
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};
use tui_input::{backend::crossterm::EventHandler, Input};

use crate::theme::{C_INPUT_BG, C_INPUT_FG, C_MUTED, C_SECONDARY};

#[derive(Debug, Clone, PartialEq)]
pub enum ComposerEvent {
    Changed,
    /// Enter with non-blank text.  The input is cleared.
    Submitted(String),
    Cancelled,
    None,
}

pub struct Composer {
    input: Input,
    href: String,
    parent: Option<String>,
    placeholder: String,
}

impl Composer {
    pub fn new(href: impl Into<String>, parent: Option<String>, placeholder: impl Into<String>) -> Self {
        Self {
            input: Input::default(),
            href: href.into(),
            parent,
            placeholder: placeholder.into(),
        }
    }

    /// Composer for a reply to `parent`, published against `href`.
    pub fn reply(href: impl Into<String>, parent: impl Into<String>) -> Self {
        Self::new(href, Some(parent.into()), "Write a reply")
    }

    pub fn href(&self) -> &str {
        &self.href
    }

    pub fn parent(&self) -> Option<&str> {
        self.parent.as_deref()
    }

    #[cfg(test)]
    pub fn text(&self) -> &str {
        self.input.value()
    }

    pub fn clear(&mut self) {
        self.input = Input::default();
    }

    #[cfg(test)]
    pub fn set_value(&mut self, value: &str) {
        self.input = Input::new(value.to_string());
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> ComposerEvent {
        match key.code {
            KeyCode::Esc => ComposerEvent::Cancelled,
            KeyCode::Enter => {
                let text = self.input.value().trim().to_string();
                if text.is_empty() {
                    return ComposerEvent::None;
                }
                self.clear();
                ComposerEvent::Submitted(text)
            }
            _ => {
                self.input.handle_event(&Event::Key(key));
                ComposerEvent::Changed
            }
        }
    }

    /// Render the input bar into `area`; places the cursor when `focused`.
    pub fn draw(&self, frame: &mut Frame, area: Rect, focused: bool) {
        if area.width < 4 || area.height == 0 {
            return;
        }
        let prompt = if self.parent.is_some() { "↳ " } else { "› " };
        let scroll = self
            .input
            .visual_scroll(area.width.saturating_sub(3) as usize);
        let value = self.input.value();
        let display = if value.is_empty() {
            Span::styled(
                format!("{}{}", prompt, self.placeholder),
                Style::default().fg(if focused { C_SECONDARY } else { C_MUTED }),
            )
        } else {
            let visible: String = value.chars().skip(scroll).collect();
            Span::styled(format!("{}{}", prompt, visible), Style::default().fg(C_INPUT_FG))
        };

        let paragraph =
            Paragraph::new(Line::from(vec![display])).style(Style::default().bg(C_INPUT_BG));
        frame.render_widget(paragraph, Rect { height: 1, ..area });

        if focused {
            let cursor_x = area.x + 2 + (self.input.visual_cursor().saturating_sub(scroll)) as u16;
            frame.set_cursor_position((cursor_x.min(area.x + area.width - 1), area.y));
        }
    }
}
