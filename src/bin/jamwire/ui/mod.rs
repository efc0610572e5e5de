//! TUI for jamwire
//!
//! Chat on top, the piano and a level meter of the live mix below.

mod chat;
mod piano;
mod status;
mod meter;

use ratatui::{
    layout::{Constraint, Direction, Layout},
    style::{Color, Style},
    widgets::Paragraph,
    Frame,
};

use crate::app::{App, Focus};

use chat::{render_chat, render_input};
use piano::render_piano;
use status::render_status;
use meter::render_meter;

/// Render the whole client
pub fn render(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Status bar
            Constraint::Min(6),    // Chat
            Constraint::Length(3), // Input
            Constraint::Length(5), // Piano
            Constraint::Length(8), // Level meter
            Constraint::Length(1), // Help bar
        ])
        .split(frame.area());

    render_status(frame, chunks[0], app);
    render_chat(frame, chunks[1], app);
    render_input(frame, chunks[2], app);
    render_piano(frame, chunks[3], app);
    render_meter(frame, chunks[4], &app.audio_buffer);

    let help = match app.focus {
        Focus::Chat => " [Tab] Piano  [Enter] Send  [Esc] Leave",
        Focus::Piano => " [Tab] Chat  [a-;] Play  [Esc] Leave",
    };
    frame.render_widget(
        Paragraph::new(help).style(Style::default().fg(Color::DarkGray)),
        chunks[5],
    );
}

/// Border style of a focusable pane.
fn focus_style(focused: bool) -> Style {
    if focused {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default()
    }
}
