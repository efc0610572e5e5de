//! Status bar - session, identity, round-trip times and the last error

use ratatui::{
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use jamwire::rtt::RttSnapshot;

use crate::app::App;

/// `cur/max/min/avg` in milliseconds, `--` before the first sample.
pub fn format_rtt(rtt: &RttSnapshot) -> String {
    if rtt.is_empty() {
        return "RTT --".to_string();
    }
    format!(
        "RTT {}/{}/{}/{} ms",
        rtt.latest_ms, rtt.max_ms, rtt.min_ms, rtt.avg_ms
    )
}

pub fn render_status(frame: &mut Frame, area: Rect, app: &App) {
    let block = Block::default().title(" jamwire ").borders(Borders::ALL);

    let (symbol, color) = if app.connected {
        ("●", Color::Green)
    } else {
        ("○", Color::Yellow)
    };

    let mut spans = vec![
        Span::styled(format!(" {symbol} {}  ", app.session_id), Style::default().fg(color)),
        Span::styled(
            format!("{}  ", app.user_name.as_deref().unwrap_or("...")),
            Style::default().fg(Color::Cyan),
        ),
        Span::styled(format!("{}  ", format_rtt(&app.rtt)), Style::default().fg(Color::Magenta)),
        Span::styled(
            format!("pending {}  ", app.rtt.pending),
            Style::default().fg(Color::DarkGray),
        ),
    ];
    if let Some(error) = &app.error {
        spans.push(Span::styled(error.as_str(), Style::default().fg(Color::Red)));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)).block(block), area);
}
