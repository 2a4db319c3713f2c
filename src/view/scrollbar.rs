//! One-column scrollbar beside the dashboard viewport

use ratatui::layout::Rect;
use ratatui::style::{Color, Style};
use ratatui::Frame;

/// Where the viewport window sits inside the dashboard text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollbarState {
    pub content_lines: usize,
    pub window_lines: usize,
    pub first_line: usize,
}

impl ScrollbarState {
    pub fn new(content_lines: usize, window_lines: usize, first_line: usize) -> Self {
        Self {
            content_lines,
            window_lines,
            first_line,
        }
    }

    /// Rows `start..end` of a `track` rows tall bar covered by the thumb.
    ///
    /// The thumb is at least one row and never the whole track while there
    /// is anything to scroll, so the track stays visible.
    pub fn thumb(&self, track: usize) -> (usize, usize) {
        if track == 0 || self.content_lines == 0 {
            return (0, 0);
        }
        let hidden = self.content_lines.saturating_sub(self.window_lines);
        if hidden == 0 {
            return (0, track);
        }

        let len = (self.window_lines * track)
            .div_ceil(self.content_lines)
            .clamp(1, track.saturating_sub(1).max(1));
        let travel = track - len;
        let start = travel * self.first_line.min(hidden) / hidden;
        (start, start + len)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ScrollbarColors {
    pub track: Color,
    pub thumb: Color,
}

impl Default for ScrollbarColors {
    fn default() -> Self {
        Self {
            track: Color::DarkGray,
            thumb: Color::Gray,
        }
    }
}

/// Paint the bar into the first column of `area`.
pub fn render_scrollbar(
    frame: &mut Frame,
    area: Rect,
    state: &ScrollbarState,
    colors: &ScrollbarColors,
) {
    if area.width == 0 {
        return;
    }
    let (start, end) = state.thumb(area.height as usize);
    let buf = frame.buffer_mut();
    for row in 0..area.height {
        let color = if (start..end).contains(&(row as usize)) {
            colors.thumb
        } else {
            colors.track
        };
        buf[(area.x, area.y + row)]
            .set_symbol(" ")
            .set_style(Style::default().bg(color));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::backend::TestBackend;
    use ratatui::Terminal;

    #[test]
    fn test_thumb_fills_track_when_content_fits() {
        assert_eq!(ScrollbarState::new(10, 20, 0).thumb(10), (0, 10));
        assert_eq!(ScrollbarState::new(0, 20, 0).thumb(10), (0, 0));
    }

    #[test]
    fn test_thumb_follows_first_line() {
        let top = ScrollbarState::new(100, 20, 0);
        assert_eq!(top.thumb(10), (0, 2));

        let middle = ScrollbarState::new(100, 20, 40);
        assert_eq!(middle.thumb(10), (4, 6));

        let bottom = ScrollbarState::new(100, 20, 80);
        assert_eq!(bottom.thumb(10), (8, 10));
    }

    #[test]
    fn test_thumb_leaves_track_visible() {
        let state = ScrollbarState::new(11, 10, 0);
        assert_eq!(state.thumb(10), (0, 9));
    }

    #[test]
    fn test_render_colors_thumb_rows() {
        let mut terminal = Terminal::new(TestBackend::new(1, 4)).unwrap();
        let state = ScrollbarState::new(8, 4, 4);
        terminal
            .draw(|frame| {
                render_scrollbar(frame, frame.area(), &state, &ScrollbarColors::default())
            })
            .unwrap();

        let buffer = terminal.backend().buffer();
        let bg: Vec<Color> = (0..4).map(|y| buffer[(0, y)].bg).collect();
        assert_eq!(
            bg,
            vec![Color::DarkGray, Color::DarkGray, Color::Gray, Color::Gray]
        );
    }
}
