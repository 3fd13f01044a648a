//! CSS-style colour strings (`#999`, `#608081`, `red`) to terminal colours.

use ratatui::style::Color;

use chatframe_core::display::{ColorRole, DisplayConfig};

/// Unknown or malformed colours fall back to the terminal default.
pub fn parse_color(value: &str) -> Color {
    let value = value.trim().to_ascii_lowercase();
    if let Some(hex) = value.strip_prefix('#') {
        return parse_hex(hex).unwrap_or(Color::Reset);
    }
    match value.as_str() {
        "black" => Color::Black,
        "white" => Color::White,
        "red" => Color::Red,
        "green" => Color::Green,
        "blue" => Color::Blue,
        "yellow" => Color::Yellow,
        "cyan" | "aqua" => Color::Cyan,
        "magenta" | "fuchsia" => Color::Magenta,
        "gray" | "grey" | "silver" => Color::Gray,
        "darkgray" | "darkgrey" => Color::DarkGray,
        _ => Color::Reset,
    }
}

fn parse_hex(hex: &str) -> Option<Color> {
    let channel = |s: &str| u8::from_str_radix(s, 16).ok();
    match hex.len() {
        3 => {
            let mut rgb = [0u8; 3];
            for (i, c) in hex.chars().enumerate() {
                let v = c.to_digit(16)? as u8;
                rgb[i] = v * 17;
            }
            Some(Color::Rgb(rgb[0], rgb[1], rgb[2]))
        }
        6 => Some(Color::Rgb(
            channel(hex.get(0..2)?)?,
            channel(hex.get(2..4)?)?,
            channel(hex.get(4..6)?)?,
        )),
        _ => None,
    }
}

pub fn role_color(display: &DisplayConfig, role: ColorRole) -> Color {
    parse_color(display.get(role))
}
