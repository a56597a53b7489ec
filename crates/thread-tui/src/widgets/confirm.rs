//! ConfirmDialog — yes/no popup that holds on to what it is confirming.

use ratatui::crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

use crate::theme::{C_ACCENT, C_PANEL_BORDER, C_POPUP_BG, C_PRIMARY, C_SECONDARY};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmEvent {
    Confirmed,
    Declined,
    None,
}

pub struct ConfirmDialog<T> {
    prompt: String,
    subject: T,
    yes_area: Rect,
    no_area: Rect,
}

impl<T> ConfirmDialog<T> {
    pub fn new(prompt: impl Into<String>, subject: T) -> Self {
        Self {
            prompt: prompt.into(),
            subject,
            yes_area: Rect::default(),
            no_area: Rect::default(),
        }
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn into_subject(self) -> T {
        self.subject
    }

    pub fn handle_key(&self, key: KeyEvent) -> ConfirmEvent {
        match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => ConfirmEvent::Confirmed,
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc | KeyCode::Char('q') => {
                ConfirmEvent::Declined
            }
            _ => ConfirmEvent::None,
        }
    }

    pub fn handle_click(&self, col: u16, row: u16) -> ConfirmEvent {
        if super::hit(self.yes_area, col, row) {
            ConfirmEvent::Confirmed
        } else if super::hit(self.no_area, col, row) {
            ConfirmEvent::Declined
        } else {
            ConfirmEvent::None
        }
    }

    pub fn draw(&mut self, frame: &mut Frame, bounds: Rect) {
        let popup = super::centered_rect(40, 5, bounds);
        if popup.width < 16 || popup.height < 4 {
            return;
        }
        const YES: &str = "[y] yes";
        const NO: &str = "[n] no";

        let buttons_y = popup.y + 3;
        let yes_x = popup.x + 2;
        let no_x = yes_x + YES.len() as u16 + 3;
        self.yes_area = Rect::new(yes_x, buttons_y, YES.len() as u16, 1);
        self.no_area = Rect::new(no_x, buttons_y, NO.len() as u16, 1);

        let lines = vec![
            Line::from(Span::styled(
                format!(" {}", self.prompt),
                Style::default().fg(C_PRIMARY).add_modifier(Modifier::BOLD),
            )),
            Line::from(""),
            Line::from(vec![
                Span::raw(" "),
                Span::styled(YES, Style::default().fg(C_ACCENT).add_modifier(Modifier::BOLD)),
                Span::raw("   "),
                Span::styled(NO, Style::default().fg(C_SECONDARY)),
            ]),
        ];

        frame.render_widget(Clear, popup);
        frame.render_widget(
            Paragraph::new(lines).block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(C_PANEL_BORDER))
                    .style(Style::default().bg(C_POPUP_BG)),
            ),
            popup,
        );
    }
}
