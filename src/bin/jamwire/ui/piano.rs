//! Virtual piano: one box per natural key, labelled with its binding

use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::Line,
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use super::focus_style;
use crate::app::{App, Focus};

pub fn render_piano(frame: &mut Frame, area: Rect, app: &App) {
    let block = Block::default()
        .title(" Piano ")
        .borders(Borders::ALL)
        .border_style(focus_style(app.focus == Focus::Piano));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let naturals: Vec<_> = app
        .keyboard
        .notes()
        .iter()
        .filter(|note| !note.is_accidental)
        .collect();
    if naturals.is_empty() {
        return;
    }

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(vec![Constraint::Ratio(1, naturals.len() as u32); naturals.len()])
        .split(inner);

    let lit = app.lit_key();
    for (note, column) in naturals.iter().zip(columns.iter()) {
        let style = if lit == Some(note.midi) {
            Style::default().fg(Color::Black).bg(Color::Yellow)
        } else {
            Style::default().fg(Color::White)
        };
        let key = Paragraph::new(vec![
            Line::from(note.name).style(style.add_modifier(Modifier::BOLD)),
            Line::from(note.key_binding).style(Style::default().fg(Color::DarkGray)),
        ])
        .alignment(Alignment::Center)
        .style(style);
        frame.render_widget(key, *column);
    }
}
