//! Terminal buffer backed by `vt100`
//!
//! The scrollback window treats the emulator as a black box: bytes go in,
//! a grid of styled cells comes out. `TerminalBuffer` is that seam;
//! `Vt100Buffer` is the production implementation.
//!
//! Unlike a real screen this buffer never scrolls content away. Height grows
//! with the output (so the whole history stays addressable) and width grows
//! with the longest line until an explicit width is set.

use crate::primitives::ansi::{indexed_color, visible_width};
use ratatui::style::{Color, Modifier, Style};
use std::fmt;
use std::io;

const INITIAL_ROWS: u16 = 1;
const INITIAL_COLS: u16 = 80;
const MAX_AUTO_COLS: u16 = 1024;

/// One grid cell: the grapheme shown there and its style
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerminalCell {
    pub text: String,
    pub style: Style,
}

impl TerminalCell {
    pub fn blank() -> Self {
        Self {
            text: " ".to_string(),
            style: Style::default(),
        }
    }

    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty() && self.style == Style::default()
    }
}

/// Emulated terminal grid
pub trait TerminalBuffer {
    /// Interpret raw output bytes.
    fn write(&mut self, bytes: &[u8]) -> io::Result<usize>;

    /// Resize the grid. Implementations may keep more rows than requested
    /// to avoid discarding written output.
    fn resize(&mut self, rows: u16, cols: u16);

    /// Number of rows holding output, counted from the top.
    fn used_height(&self) -> usize;

    fn height(&self) -> u16;

    fn width(&self) -> u16;

    /// Cells of one row, left to right. Out-of-range rows are empty.
    fn row(&self, index: usize) -> Vec<TerminalCell>;

    /// Whether long lines widen the grid instead of wrapping.
    fn auto_resize_x(&self) -> bool;

    fn set_auto_resize_x(&mut self, enabled: bool);

    /// Whether output grows the grid downwards instead of scrolling.
    fn auto_resize_y(&self) -> bool;

    fn set_auto_resize_y(&mut self, enabled: bool);
}

pub struct Vt100Buffer {
    parser: vt100::Parser,
    auto_resize_x: bool,
    auto_resize_y: bool,
    used: usize,
}

impl fmt::Debug for Vt100Buffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (rows, cols) = self.parser.screen().size();
        f.debug_struct("Vt100Buffer")
            .field("rows", &rows)
            .field("cols", &cols)
            .field("used", &self.used)
            .field("auto_resize_x", &self.auto_resize_x)
            .field("auto_resize_y", &self.auto_resize_y)
            .finish()
    }
}

impl Default for Vt100Buffer {
    fn default() -> Self {
        Self::new()
    }
}

impl Vt100Buffer {
    /// Start with a single row and 80 pre-allocated columns.
    pub fn new() -> Self {
        Self {
            parser: vt100::Parser::new(INITIAL_ROWS, INITIAL_COLS, 0),
            auto_resize_x: true,
            auto_resize_y: true,
            used: 0,
        }
    }

    pub fn with_size(rows: u16, cols: u16) -> Self {
        Self {
            parser: vt100::Parser::new(rows.max(1), cols.max(1), 0),
            auto_resize_x: true,
            auto_resize_y: true,
            used: 0,
        }
    }

    /// Grow the grid so `body` (plus an optional line break) fits without
    /// pushing rows off the top.
    fn reserve_for(&mut self, body: &[u8], ends_line: bool) {
        let screen = self.parser.screen();
        let (rows, cols) = screen.size();
        let (cursor_row, cursor_col) = screen.cursor_position();

        let text_width = visible_width(&String::from_utf8_lossy(body));
        let line_end = cursor_col as usize + text_width;

        let mut new_cols = cols;
        if self.auto_resize_x && line_end > cols as usize {
            new_cols = line_end.min(MAX_AUTO_COLS as usize) as u16;
        }

        let wrapped_rows = line_end / new_cols.max(1) as usize;
        let needed = cursor_row as usize + 1 + wrapped_rows + usize::from(ends_line);
        let new_rows = if self.auto_resize_y {
            needed.min(u16::MAX as usize) as u16
        } else {
            rows
        };

        if new_rows > rows || new_cols != cols {
            self.parser.set_size(new_rows.max(rows), new_cols);
        }
    }

    fn note_cursor(&mut self) {
        let screen = self.parser.screen();
        let (rows, _) = screen.size();
        let (row, col) = screen.cursor_position();
        let touched = row as usize + usize::from(col > 0);
        self.used = self.used.max(touched).min(rows as usize);
    }
}

fn convert_color(color: vt100::Color) -> Option<Color> {
    match color {
        vt100::Color::Default => None,
        vt100::Color::Idx(i) => Some(indexed_color(i)),
        vt100::Color::Rgb(r, g, b) => Some(Color::Rgb(r, g, b)),
    }
}

fn cell_style(cell: &vt100::Cell) -> Style {
    let mut style = Style::default();
    if let Some(fg) = convert_color(cell.fgcolor()) {
        style = style.fg(fg);
    }
    if let Some(bg) = convert_color(cell.bgcolor()) {
        style = style.bg(bg);
    }
    if cell.bold() {
        style = style.add_modifier(Modifier::BOLD);
    }
    if cell.italic() {
        style = style.add_modifier(Modifier::ITALIC);
    }
    if cell.underline() {
        style = style.add_modifier(Modifier::UNDERLINED);
    }
    if cell.inverse() {
        style = style.add_modifier(Modifier::REVERSED);
    }
    style
}

impl TerminalBuffer for Vt100Buffer {
    fn write(&mut self, bytes: &[u8]) -> io::Result<usize> {
        // Feed one line at a time so the grid can grow before the emulator
        // would scroll. Bare LF is treated as CRLF, as raw process logs expect.
        for segment in bytes.split_inclusive(|b| *b == b'\n') {
            let ends_line = segment.last() == Some(&b'\n');
            let body = if ends_line {
                &segment[..segment.len() - 1]
            } else {
                segment
            };
            let body = body.strip_suffix(b"\r").unwrap_or(body);

            self.reserve_for(body, ends_line);
            self.parser.process(body);
            if ends_line {
                self.parser.process(b"\r\n");
            }
            self.note_cursor();
        }
        Ok(bytes.len())
    }

    fn resize(&mut self, rows: u16, cols: u16) {
        let (cursor_row, _) = self.parser.screen().cursor_position();
        let used = self.used.min(u16::MAX as usize) as u16;
        let rows = if self.auto_resize_y {
            rows.max(cursor_row + 1).max(used).max(1)
        } else {
            rows.max(1)
        };
        self.parser.set_size(rows, cols.max(1));
    }

    fn used_height(&self) -> usize {
        self.used
    }

    fn height(&self) -> u16 {
        self.parser.screen().size().0
    }

    fn width(&self) -> u16 {
        self.parser.screen().size().1
    }

    fn row(&self, index: usize) -> Vec<TerminalCell> {
        let screen = self.parser.screen();
        let (rows, cols) = screen.size();
        if index >= rows as usize {
            return Vec::new();
        }

        let row = index as u16;
        let mut cells = Vec::with_capacity(cols as usize);
        for col in 0..cols {
            let Some(cell) = screen.cell(row, col) else {
                continue;
            };
            if cell.is_wide_continuation() {
                continue;
            }
            let contents = cell.contents();
            let text = if contents.is_empty() {
                " ".to_string()
            } else {
                contents.to_string()
            };
            cells.push(TerminalCell {
                text,
                style: cell_style(cell),
            });
        }
        cells
    }

    fn auto_resize_x(&self) -> bool {
        self.auto_resize_x
    }

    fn set_auto_resize_x(&mut self, enabled: bool) {
        self.auto_resize_x = enabled;
    }

    fn auto_resize_y(&self) -> bool {
        self.auto_resize_y
    }

    fn set_auto_resize_y(&mut self, enabled: bool) {
        self.auto_resize_y = enabled;
    }
}
