//! Scrollable window over the rendered job text
//!
//! Row-based scroll state in the same shape as the scrollback windows: the
//! dashboard re-renders its content on every tick and only follows the
//! bottom if it was already there.

use crate::view::scrollbar::ScrollbarState;

#[derive(Debug, Clone, Default)]
pub struct Viewport {
    lines: Vec<String>,
    /// First visible line
    offset: usize,
    height: usize,
    width: usize,
}

impl Viewport {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            ..Self::default()
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn content_height(&self) -> usize {
        self.lines.len()
    }

    pub fn set_size(&mut self, width: usize, height: usize) {
        self.width = width;
        self.height = height;
        self.clamp_offset();
    }

    /// Replace the content with `text`, one entry per line.
    pub fn set_content(&mut self, text: &str) {
        self.lines = text.lines().map(str::to_string).collect();
        self.clamp_offset();
    }

    pub fn max_offset(&self) -> usize {
        self.lines.len().saturating_sub(self.height)
    }

    fn clamp_offset(&mut self) {
        self.offset = self.offset.min(self.max_offset());
    }

    pub fn at_bottom(&self) -> bool {
        self.offset >= self.max_offset()
    }

    pub fn goto_bottom(&mut self) {
        self.offset = self.max_offset();
    }

    pub fn goto_top(&mut self) {
        self.offset = 0;
    }

    /// Scroll by `delta` lines, negative is up.
    pub fn scroll_by(&mut self, delta: isize) {
        if delta < 0 {
            self.offset = self.offset.saturating_sub(delta.unsigned_abs());
        } else {
            self.offset = self.offset.saturating_add(delta as usize);
        }
        self.clamp_offset();
    }

    pub fn page_up(&mut self) {
        self.scroll_by(-(self.height as isize));
    }

    pub fn page_down(&mut self) {
        self.scroll_by(self.height as isize);
    }

    pub fn visible_lines(&self) -> &[String] {
        let end = (self.offset + self.height).min(self.lines.len());
        &self.lines[self.offset.min(end)..end]
    }

    /// Fraction scrolled, 1.0 when the bottom is visible.
    pub fn scroll_percent(&self) -> f64 {
        let max = self.max_offset();
        if max == 0 {
            return 1.0;
        }
        (self.offset as f64 / max as f64).clamp(0.0, 1.0)
    }

    pub fn needs_scrollbar(&self) -> bool {
        self.lines.len() > self.height
    }

    pub fn to_scrollbar_state(&self) -> ScrollbarState {
        ScrollbarState::new(self.lines.len(), self.height, self.offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbered(n: usize) -> String {
        (0..n).map(|i| format!("line {}\n", i)).collect()
    }

    #[test]
    fn test_set_content_clamps_offset() {
        let mut vp = Viewport::new(80, 5);
        vp.set_content(&numbered(20));
        vp.goto_bottom();
        assert_eq!(vp.offset(), 15);

        vp.set_content(&numbered(8));
        assert_eq!(vp.offset(), 3);
        assert!(vp.at_bottom());
    }

    #[test]
    fn test_visible_lines_window() {
        let mut vp = Viewport::new(80, 3);
        vp.set_content(&numbered(10));
        vp.scroll_by(4);
        assert_eq!(vp.visible_lines(), ["line 4", "line 5", "line 6"]);
    }

    #[test]
    fn test_short_content_is_at_bottom() {
        let mut vp = Viewport::new(80, 10);
        vp.set_content(&numbered(3));
        assert!(vp.at_bottom());
        assert!(!vp.needs_scrollbar());
        assert_eq!(vp.scroll_percent(), 1.0);
        assert_eq!(vp.visible_lines().len(), 3);
    }

    #[test]
    fn test_paging() {
        let mut vp = Viewport::new(80, 4);
        vp.set_content(&numbered(10));
        vp.page_down();
        vp.page_down();
        assert_eq!(vp.offset(), 6);
        vp.page_up();
        assert_eq!(vp.offset(), 2);
        vp.goto_top();
        assert_eq!(vp.scroll_percent(), 0.0);
    }
}
