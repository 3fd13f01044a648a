//! TUI layout compositing — assembles all UI panels.

mod feed;
mod palette;
mod status;

use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

use crate::app::App;

/// Render the full TUI layout.
pub fn draw(frame: &mut Frame, app: &mut App) {
    let area = frame.area();

    // ┌──────────────────────────────────┐
    // │ Feed (date separators + lines)   │
    // │                                  │
    // ├──────────────────────────────────┤
    // │ Status bar                       │
    // ├──────────────────────────────────┤
    // │ Key help                         │
    // └──────────────────────────────────┘

    let main_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(5),    // feed
            Constraint::Length(1), // status
            Constraint::Length(1), // help
        ])
        .split(area);

    feed::draw(frame, app, main_layout[0]);
    status::draw(frame, app, main_layout[1]);

    let help = Paragraph::new(" q quit  ↑/↓ PgUp/PgDn scroll  End follow  r reconnect  d disconnect")
        .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(help, main_layout[2]);
}
