//! ANSI SGR handling in both directions
//!
//! Rendering goes style -> escape sequence (scrollback rows, job lines);
//! drawing the full-screen frame goes escape sequence -> ratatui spans.

use crate::primitives::display_width::{char_width, str_width};
use ratatui::style::{Color, Modifier, Style};

/// Escape sequence that clears all attributes
pub const RESET: &str = "\x1b[0m";

/// Standard ANSI colors (codes 30-37 for fg, 40-47 for bg)
const STANDARD_COLORS: [Color; 8] = [
    Color::Black,
    Color::Red,
    Color::Green,
    Color::Yellow,
    Color::Blue,
    Color::Magenta,
    Color::Cyan,
    Color::Gray,
];

/// Bright ANSI colors (codes 90-97 for fg, 100-107 for bg)
const BRIGHT_COLORS: [Color; 8] = [
    Color::DarkGray,
    Color::LightRed,
    Color::LightGreen,
    Color::LightYellow,
    Color::LightBlue,
    Color::LightMagenta,
    Color::LightCyan,
    Color::White,
];

const MODIFIER_CODES: [(Modifier, u8); 8] = [
    (Modifier::BOLD, 1),
    (Modifier::DIM, 2),
    (Modifier::ITALIC, 3),
    (Modifier::UNDERLINED, 4),
    (Modifier::SLOW_BLINK, 5),
    (Modifier::REVERSED, 7),
    (Modifier::HIDDEN, 8),
    (Modifier::CROSSED_OUT, 9),
];

/// Map a palette index (0-255) to a ratatui color, using the named colors
/// for the first sixteen entries.
pub fn indexed_color(idx: u8) -> Color {
    match idx {
        0..=7 => STANDARD_COLORS[idx as usize],
        8..=15 => BRIGHT_COLORS[(idx - 8) as usize],
        _ => Color::Indexed(idx),
    }
}

fn color_codes(color: Color, foreground: bool) -> Option<String> {
    let base = if foreground { 30 } else { 40 };
    if let Some(i) = STANDARD_COLORS.iter().position(|c| *c == color) {
        return Some((base + i).to_string());
    }
    if let Some(i) = BRIGHT_COLORS.iter().position(|c| *c == color) {
        return Some((base + 60 + i).to_string());
    }
    let extended = if foreground { 38 } else { 48 };
    match color {
        Color::Indexed(i) => Some(format!("{};5;{}", extended, i)),
        Color::Rgb(r, g, b) => Some(format!("{};2;{};{};{}", extended, r, g, b)),
        _ => None,
    }
}

/// Render the escape sequence that switches the terminal to `style`.
///
/// Every transition starts from a reset so attributes never leak from the
/// previous run of cells.
pub fn sgr(style: Style) -> String {
    let mut codes = vec!["0".to_string()];
    if let Some(fg) = style.fg.and_then(|c| color_codes(c, true)) {
        codes.push(fg);
    }
    if let Some(bg) = style.bg.and_then(|c| color_codes(c, false)) {
        codes.push(bg);
    }
    for (modifier, code) in MODIFIER_CODES {
        if style.add_modifier.contains(modifier) {
            codes.push(code.to_string());
        }
    }
    format!("\x1b[{}m", codes.join(";"))
}

/// Streaming SGR parser: feeds characters, tracks the current style and
/// swallows escape sequences.
#[derive(Debug, Clone, Default)]
pub struct AnsiParser {
    current_style: Style,
    escape_buffer: String,
    in_escape: bool,
}

impl AnsiParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the style for a printable character, or None while inside an
    /// escape sequence.
    pub fn parse_char(&mut self, ch: char) -> Option<Style> {
        if !self.in_escape {
            if ch == '\x1b' {
                self.in_escape = true;
                self.escape_buffer.clear();
                self.escape_buffer.push(ch);
                return None;
            }
            return Some(self.current_style);
        }

        self.escape_buffer.push(ch);
        if self.escape_complete() {
            if self.escape_buffer.starts_with("\x1b[") && self.escape_buffer.ends_with('m') {
                let params = self.escape_buffer[2..self.escape_buffer.len() - 1].to_string();
                self.apply_sgr(&params);
            }
            self.escape_buffer.clear();
            self.in_escape = false;
        }
        None
    }

    fn escape_complete(&self) -> bool {
        let buf = &self.escape_buffer;
        if buf.len() < 2 {
            return false;
        }
        if buf.starts_with("\x1b[") {
            return buf.len() > 2 && buf.chars().last().is_some_and(|c| c.is_ascii_alphabetic());
        }
        if buf.starts_with("\x1b]") {
            return buf.ends_with('\x07') || buf.ends_with("\x1b\\");
        }
        // ESC + single char, or a runaway sequence
        buf.len() == 2 || buf.len() > 32
    }

    fn apply_sgr(&mut self, params: &str) {
        if params.is_empty() {
            self.current_style = Style::default();
            return;
        }

        let params: Vec<u8> = params.split(';').filter_map(|s| s.parse().ok()).collect();
        let mut i = 0;
        while i < params.len() {
            let style = self.current_style;
            let code = params[i];
            self.current_style = match code {
                0 => Style::default(),
                22 => style.remove_modifier(Modifier::BOLD | Modifier::DIM),
                23 => style.remove_modifier(Modifier::ITALIC),
                24 => style.remove_modifier(Modifier::UNDERLINED),
                27 => style.remove_modifier(Modifier::REVERSED),
                30..=37 => style.fg(STANDARD_COLORS[(code - 30) as usize]),
                39 => style.fg(Color::Reset),
                40..=47 => style.bg(STANDARD_COLORS[(code - 40) as usize]),
                49 => style.bg(Color::Reset),
                90..=97 => style.fg(BRIGHT_COLORS[(code - 90) as usize]),
                100..=107 => style.bg(BRIGHT_COLORS[(code - 100) as usize]),
                38 | 48 => {
                    let (color, consumed) = extended_color(&params[i..]);
                    i += consumed;
                    match color {
                        Some(c) if code == 38 => style.fg(c),
                        Some(c) => style.bg(c),
                        None => style,
                    }
                }
                _ => MODIFIER_CODES
                    .iter()
                    .find(|(_, c)| *c == code)
                    .map(|(m, _)| style.add_modifier(*m))
                    .unwrap_or(style),
            };
            i += 1;
        }
    }
}

/// Parse `38;5;n` / `38;2;r;g;b`; returns the color and how many extra
/// parameters were consumed.
fn extended_color(params: &[u8]) -> (Option<Color>, usize) {
    match params.get(1) {
        Some(5) if params.len() >= 3 => (Some(Color::Indexed(params[2])), 2),
        Some(2) if params.len() >= 5 => (Some(Color::Rgb(params[2], params[3], params[4])), 4),
        _ => (None, 0),
    }
}

/// Strip all ANSI escape codes from a string, returning just the text
pub fn strip_ansi_codes(text: &str) -> String {
    if !text.contains('\x1b') {
        return text.to_string();
    }
    let mut parser = AnsiParser::new();
    text.chars()
        .filter(|ch| parser.parse_char(*ch).is_some())
        .collect()
}

/// Terminal columns occupied by the visible part of `text`
pub fn visible_width(text: &str) -> usize {
    if !text.contains('\x1b') {
        return str_width(text);
    }
    let mut parser = AnsiParser::new();
    text.chars()
        .filter(|ch| parser.parse_char(*ch).is_some())
        .map(char_width)
        .sum()
}

/// Split a string with embedded SGR sequences into (text, style) runs
pub fn parse_ansi_string(text: &str) -> Vec<(String, Style)> {
    let mut result = Vec::new();
    let mut parser = AnsiParser::new();
    let mut current_text = String::new();
    let mut current_style = Style::default();

    for ch in text.chars() {
        if let Some(style) = parser.parse_char(ch) {
            if style != current_style && !current_text.is_empty() {
                result.push((std::mem::take(&mut current_text), current_style));
            }
            current_style = style;
            current_text.push(ch);
        }
    }
    if !current_text.is_empty() {
        result.push((current_text, current_style));
    }
    result
}
