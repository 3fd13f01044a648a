//! Scrollable message feed with date separators.

use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph};

use chatframe_core::display::{ColorRole, DisplayConfig};
use chatframe_core::grouping::{date_label, group_by_date, time_label, FeedRow};
use chatframe_core::log::BoundedLog;

use super::palette::role_color;
use crate::app::App;

pub fn draw(frame: &mut Frame, app: &mut App, area: Rect) {
    let background = role_color(&app.display, ColorRole::Background);
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .style(Style::default().bg(background));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    if app.log.is_empty() {
        app.set_scroll_limit(0, inner.height as usize);
        let empty = Paragraph::new("Waiting for messages...")
            .style(Style::default().fg(role_color(&app.display, ColorRole::Date)));
        frame.render_widget(empty, inner);
        return;
    }

    let lines = feed_lines(&app.log, &app.display, inner.width);

    // Bottom-anchored window with scroll offset
    let visible_height = inner.height as usize;
    app.set_scroll_limit(lines.len(), visible_height);
    let end = lines.len().saturating_sub(app.scroll_offset).max(visible_height.min(lines.len()));
    let start = end.saturating_sub(visible_height);

    let paragraph = Paragraph::new(lines[start..end].to_vec());
    frame.render_widget(paragraph, inner);
}

/// Every rendered line of the log, separators included, oldest first.
pub fn feed_lines(log: &BoundedLog, display: &DisplayConfig, width: u16) -> Vec<Line<'static>> {
    let date_fg = role_color(display, ColorRole::Date);
    let channel_fg = role_color(display, ColorRole::Channel);
    let user_fg = role_color(display, ColorRole::User);
    let text_fg = role_color(display, ColorRole::Text);
    let separator = Style::default()
        .fg(role_color(display, ColorRole::DateSep))
        .bg(role_color(display, ColorRole::DateSepBack));

    let mut lines = Vec::new();
    for row in group_by_date(log.iter()) {
        match row {
            FeedRow::Separator { date, .. } => {
                let label = date_label(date);
                let pad = (width as usize).saturating_sub(label.chars().count()) / 2;
                let mut text = format!("{}{}", " ".repeat(pad), label);
                let fill = (width as usize).saturating_sub(text.chars().count());
                text.push_str(&" ".repeat(fill));
                lines.push(Line::styled(text, separator));
            }
            FeedRow::Message { index } => {
                let Some(msg) = log.get(index) else {
                    continue;
                };
                let mut text_lines = msg.text.lines();
                let first = text_lines.next().unwrap_or("").to_string();
                lines.push(Line::from(vec![
                    Span::styled(time_label(msg.ts), Style::default().fg(date_fg)),
                    Span::raw("  "),
                    Span::styled(format!("#{}", msg.channel), Style::default().fg(channel_fg)),
                    Span::raw("  "),
                    Span::styled(format!("@{}", msg.user), Style::default().fg(user_fg).bold()),
                    Span::raw("  "),
                    Span::styled(first, Style::default().fg(text_fg)),
                ]));
                for rest in text_lines {
                    lines.push(Line::styled(
                        format!("          {}", rest),
                        Style::default().fg(text_fg),
                    ));
                }
            }
        }
    }
    lines
}
