//! Scrollback window over an emulated terminal
//!
//! A `Vterm` shows `height` rows of a terminal buffer starting at `offset`.
//! New output keeps the window pinned to the bottom unless the user has
//! scrolled away from it; a window with no height yet counts as pinned.

use crate::primitives::ansi::{sgr, strip_ansi_codes, visible_width, RESET};
use crate::services::terminal_buffer::{TerminalBuffer, TerminalCell, Vt100Buffer};
use ratatui::style::Style;
use std::fmt;
use std::io;

pub struct Vterm {
    offset: usize,
    height: usize,
    width: usize,
    prefix: String,
    buffer: Box<dyn TerminalBuffer>,
}

impl fmt::Debug for Vterm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Vterm")
            .field("offset", &self.offset)
            .field("height", &self.height)
            .field("width", &self.width)
            .field("prefix", &self.prefix)
            .field("used_height", &self.buffer.used_height())
            .finish()
    }
}

impl Default for Vterm {
    fn default() -> Self {
        Self::new()
    }
}

impl Vterm {
    /// Window over a fresh `vt100` buffer that grows in both directions
    /// until an explicit width is set.
    pub fn new() -> Self {
        Self::with_buffer(Box::new(Vt100Buffer::new()))
    }

    pub fn with_buffer(buffer: Box<dyn TerminalBuffer>) -> Self {
        Self {
            offset: 0,
            height: 0,
            width: 0,
            prefix: String::new(),
            buffer,
        }
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// Columns left for output once the prefix is drawn
    pub fn columns(&self) -> usize {
        self.buffer.width() as usize
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn used_height(&self) -> usize {
        self.buffer.used_height()
    }

    fn max_offset(&self) -> usize {
        self.used_height().saturating_sub(self.height)
    }

    /// True when the last used row is inside the window.
    pub fn at_bottom(&self) -> bool {
        self.height == 0 || self.offset + self.height >= self.used_height()
    }

    fn pin_to_bottom(&mut self) {
        self.offset = self.max_offset();
    }

    pub fn set_height(&mut self, height: usize) {
        let at_bottom = self.at_bottom();
        self.height = height;
        if at_bottom {
            self.pin_to_bottom();
        } else {
            self.offset = self.offset.min(self.max_offset());
        }
    }

    /// Set the full line width, prefix included. Stops automatic width growth.
    pub fn set_width(&mut self, width: usize) {
        let at_bottom = self.at_bottom();
        self.width = width;
        self.buffer.set_auto_resize_x(false);
        self.resize_buffer_to_width();
        if at_bottom {
            self.pin_to_bottom();
        } else {
            self.offset = self.offset.min(self.max_offset());
        }
    }

    pub fn set_prefix(&mut self, prefix: impl Into<String>) {
        self.prefix = prefix.into();
        if !self.buffer.auto_resize_x() {
            self.resize_buffer_to_width();
        }
    }

    fn resize_buffer_to_width(&mut self) {
        let prefix_width = visible_width(&self.prefix);
        if self.width > prefix_width {
            let cols = (self.width - prefix_width).min(u16::MAX as usize) as u16;
            if cols != self.buffer.width() {
                let rows = self.buffer.height();
                self.buffer.resize(rows, cols);
            }
        }
    }

    /// Scroll by `delta` rows, negative is up.
    pub fn scroll_by(&mut self, delta: isize) {
        let target = if delta < 0 {
            self.offset.saturating_sub(delta.unsigned_abs())
        } else {
            self.offset.saturating_add(delta as usize)
        };
        self.offset = target.min(self.max_offset());
    }

    pub fn page_up(&mut self) {
        self.scroll_by(-(self.height as isize));
    }

    pub fn page_down(&mut self) {
        self.scroll_by(self.height as isize);
    }

    pub fn home(&mut self) {
        self.offset = 0;
    }

    pub fn end(&mut self) {
        self.pin_to_bottom();
    }

    /// Fraction of the output above and inside the window, in `[0, 1]`.
    pub fn scroll_percent(&self) -> f64 {
        let used = self.used_height();
        if used == 0 {
            return 0.0;
        }
        ((self.offset + self.height) as f64 / used as f64).min(1.0)
    }

    /// The rows currently inside the window.
    pub fn render(&self) -> String {
        self.render_region(self.offset, self.height)
    }

    /// Rows `offset..offset + height` (clipped to the used area), each with
    /// the prefix, SGR transitions and a trailing reset, newline-terminated.
    pub fn render_region(&self, offset: usize, height: usize) -> String {
        let used = self.used_height();
        let end = offset.saturating_add(height).min(used);
        let mut out = String::new();
        for row in offset..end {
            out.push_str(&self.prefix);
            render_cells(&self.buffer.row(row), &mut out);
            out.push_str(RESET);
            out.push('\n');
        }
        out
    }

    /// The bottom-most row with visible text, trailing whitespace removed.
    ///
    /// Empty when nothing has been written.
    pub fn last_non_blank_line(&self) -> String {
        for row in (0..self.used_height()).rev() {
            let mut line = String::new();
            render_cells(&self.buffer.row(row), &mut line);
            if strip_ansi_codes(&line).trim().is_empty() {
                continue;
            }
            let mut line = line.trim_end().to_string();
            line.push_str(RESET);
            return line;
        }
        String::new()
    }
}

impl io::Write for Vterm {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let at_bottom = self.at_bottom();
        let n = self.buffer.write(buf)?;
        if at_bottom {
            self.pin_to_bottom();
        }
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Append styled runs for `cells`, dropping trailing unstyled blanks.
fn render_cells(cells: &[TerminalCell], out: &mut String) {
    let end = cells
        .iter()
        .rposition(|c| !c.is_blank())
        .map_or(0, |i| i + 1);

    let mut last = Style::default();
    for cell in &cells[..end] {
        if cell.style != last {
            out.push_str(&sgr(cell.style));
            last = cell.style;
        }
        out.push_str(&cell.text);
    }
}
