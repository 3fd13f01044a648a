//! Status bar — shows link state, message count, server.

use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

use chatframe_core::types::LinkState;

use crate::app::App;

pub fn draw(frame: &mut Frame, app: &App, area: Rect) {
    let state_color = match app.link {
        LinkState::Connected => Color::Green,
        LinkState::Pending => Color::Yellow,
        LinkState::Reconnecting => Color::Magenta,
        LinkState::Idle | LinkState::Closed => Color::DarkGray,
    };

    let mut spans = vec![
        Span::styled(
            format!(" {} ", app.link),
            Style::default().fg(Color::Black).bg(state_color),
        ),
        Span::raw(format!(" messages: {} ", app.log.len())),
        Span::styled(format!(" {} ", app.server_url), Style::default().fg(Color::DarkGray)),
    ];

    if app.scroll_offset > 0 {
        spans.push(Span::styled(
            " [scrolled, End to follow] ",
            Style::default().fg(Color::Yellow),
        ));
    }

    let status = Paragraph::new(Line::from(spans));
    frame.render_widget(status, area);
}
