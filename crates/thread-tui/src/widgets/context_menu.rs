//! ContextMenu — small anchored popup listing actions.
//!
//! Selecting an entry hands its `Action` back to the caller and the menu is
//! expected to be dropped; any click outside dismisses it.

use ratatui::crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

use crate::action::Action;
use crate::theme::{C_PANEL_BORDER, C_POPUP_BG, C_PRIMARY, C_SECONDARY, C_SELECTION_BG};

#[derive(Debug, Clone, PartialEq)]
pub struct MenuItem {
    pub icon: &'static str,
    pub label: String,
    pub action: Action,
}

impl MenuItem {
    pub fn new(icon: &'static str, label: impl Into<String>, action: Action) -> Self {
        Self {
            icon,
            label: label.into(),
            action,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MenuEvent {
    Selected(Action),
    Dismissed,
    None,
}

pub struct ContextMenu {
    /// Screen cell the menu hangs from (its top-left corner).
    anchor: (u16, u16),
    items: Vec<MenuItem>,
    selected: usize,
    /// Where the menu was last drawn, for click hit-testing.
    last_area: Rect,
}

impl ContextMenu {
    pub fn new(anchor: (u16, u16), items: Vec<MenuItem>) -> Self {
        Self {
            anchor,
            items,
            selected: 0,
            last_area: Rect::default(),
        }
    }

    #[cfg(test)]
    pub fn labels(&self) -> Vec<&str> {
        self.items.iter().map(|i| i.label.as_str()).collect()
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> MenuEvent {
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => {
                self.selected = self.selected.saturating_sub(1);
                MenuEvent::None
            }
            KeyCode::Down | KeyCode::Char('j') => {
                if self.selected + 1 < self.items.len() {
                    self.selected += 1;
                }
                MenuEvent::None
            }
            KeyCode::Enter | KeyCode::Char(' ') => match self.items.get(self.selected) {
                Some(item) => MenuEvent::Selected(item.action.clone()),
                None => MenuEvent::Dismissed,
            },
            KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('m') => MenuEvent::Dismissed,
            _ => MenuEvent::None,
        }
    }

    pub fn handle_click(&mut self, col: u16, row: u16) -> MenuEvent {
        if !super::hit(self.last_area, col, row) {
            return MenuEvent::Dismissed;
        }
        // Rows inside the border map 1:1 to items.
        let idx = row.saturating_sub(self.last_area.y + 1) as usize;
        match self.items.get(idx) {
            Some(item) if row > self.last_area.y => MenuEvent::Selected(item.action.clone()),
            _ => MenuEvent::None,
        }
    }

    /// Where the menu lands inside `bounds`, shifted to stay on screen.
    pub fn placement(&self, bounds: Rect) -> Rect {
        let label_w = self
            .items
            .iter()
            .map(|i| i.label.chars().count() + i.icon.chars().count() + 4)
            .max()
            .unwrap_or(10) as u16;
        let width = (label_w + 2).min(bounds.width);
        let height = (self.items.len() as u16 + 2).min(bounds.height);
        let right = bounds.x + bounds.width;
        let bottom = bounds.y + bounds.height;
        let x = self.anchor.0.max(bounds.x).min(right.saturating_sub(width));
        let y = self.anchor.1.max(bounds.y).min(bottom.saturating_sub(height));
        Rect {
            x,
            y,
            width,
            height,
        }
    }

    pub fn draw(&mut self, frame: &mut Frame, bounds: Rect) {
        let area = self.placement(bounds);
        self.last_area = area;
        if area.width < 4 || area.height < 3 {
            return;
        }

        let lines: Vec<Line> = self
            .items
            .iter()
            .enumerate()
            .map(|(i, item)| {
                let style = if i == self.selected {
                    Style::default()
                        .fg(C_PRIMARY)
                        .bg(C_SELECTION_BG)
                        .add_modifier(Modifier::BOLD)
                } else {
                    Style::default().fg(C_SECONDARY)
                };
                Line::from(vec![
                    Span::styled(format!(" {} ", item.icon), style),
                    Span::styled(format!("{} ", item.label), style),
                ])
            })
            .collect();

        frame.render_widget(Clear, area);
        frame.render_widget(
            Paragraph::new(lines).block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(C_PANEL_BORDER))
                    .style(Style::default().bg(C_POPUP_BG)),
            ),
            area,
        );
    }
}
