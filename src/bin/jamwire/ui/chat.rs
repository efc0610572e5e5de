//! Chat log and message input

use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

use super::focus_style;
use crate::app::{App, ChatEntry, Focus, INPUT_LIMIT};

pub fn render_chat(frame: &mut Frame, area: Rect, app: &App) {
    let block = Block::default().title(" Chat ").borders(Borders::ALL);

    let lines: Vec<Line> = app.chat.iter().map(entry_line).collect();
    let paragraph = Paragraph::new(lines).wrap(Wrap { trim: false });
    let scroll = scroll_to_newest(&paragraph, area);

    frame.render_widget(paragraph.block(block).scroll((scroll, 0)), area);
}

/// Rows to scroll so the last wrapped row of `paragraph` sits at the bottom
/// of a bordered `area`.
fn scroll_to_newest(paragraph: &Paragraph, area: Rect) -> u16 {
    let visible = area.height.saturating_sub(2) as usize;
    let rows = paragraph.line_count(area.width.saturating_sub(2));
    rows.saturating_sub(visible).min(u16::MAX as usize) as u16
}

fn entry_line(entry: &ChatEntry) -> Line<'_> {
    match entry {
        ChatEntry::Line(line) => {
            let color = if line.from_self { Color::Cyan } else { Color::Green };
            let name = if line.display_name.is_empty() {
                "anonymous"
            } else {
                line.display_name.as_str()
            };
            Line::from(vec![
                Span::styled(
                    format!("{name}: "),
                    Style::default().fg(color).add_modifier(Modifier::BOLD),
                ),
                Span::raw(line.body.as_str()),
            ])
        }
        ChatEntry::System(message) => Line::from(Span::styled(
            format!("-- {message}"),
            Style::default().fg(Color::DarkGray),
        )),
    }
}

pub fn render_input(frame: &mut Frame, area: Rect, app: &App) {
    let focused = app.focus == Focus::Chat;
    let block = Block::default()
        .title(format!(" Message ({}/{INPUT_LIMIT}) ", app.input.chars().count()))
        .borders(Borders::ALL)
        .border_style(focus_style(focused));

    let mut spans = vec![Span::raw(app.input.as_str())];
    if focused {
        spans.push(Span::styled("_", Style::default().add_modifier(Modifier::SLOW_BLINK)));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)).block(block), area);
}
