//! Full-screen rendering of the job list
//!
//! `print` produces the dashboard text: one line per job plus, for vertices
//! with captured output, their scrollback window. The text is ANSI-styled
//! and goes either into the viewport (live) or straight to the writer
//! (final flush via `print_full`).

use crate::model::graph::Digest;
use crate::model::projection::{DisplayInfo, Job};
use crate::model::trace::Trace;
use crate::primitives::ansi::{parse_ansi_string, sgr, RESET};
use crate::primitives::units::non_negative;
use crate::services::time_source::SharedTimeSource;
use crate::view::components::Components;
use crate::view::scrollbar::{render_scrollbar, ScrollbarColors};
use crate::view::viewport::Viewport;
use chrono::{DateTime, Utc};
use ratatui::layout::{Constraint, Layout};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use ratatui::Frame;
use std::io::{self, Write};
use std::sync::Arc;

/// How much of each scrollback window to print
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TermView {
    /// Visible region while running, last line once completed
    Windowed { term_height: usize },
    /// Every used row
    Full,
}

#[derive(Debug)]
pub struct Display {
    ui: Arc<Components>,
    time_source: SharedTimeSource,
    focus: Option<Digest>,
}

impl Display {
    pub fn new(ui: Arc<Components>, time_source: SharedTimeSource) -> Self {
        Self {
            ui,
            time_source,
            focus: None,
        }
    }

    pub fn focus(&self) -> Option<&Digest> {
        self.focus.as_ref()
    }

    /// Highlight one vertex whose scrollback receives scroll keys.
    pub fn set_focus(&mut self, focus: Option<Digest>) {
        self.focus = focus;
    }

    /// Header line: elapsed time and completion counts.
    pub fn status(&self, info: &DisplayInfo) -> String {
        let done = info.is_done();
        let template = if done {
            &self.ui.console_done
        } else {
            &self.ui.console_running
        };
        if template.is_empty() {
            return String::new();
        }

        let elapsed = non_negative(self.time_source.now() - info.start_time);
        template.render(&[
            &self.ui.duration(elapsed, done),
            &info.count_completed.to_string(),
            &info.count_total.to_string(),
        ])
    }

    /// Print the dashboard with scrollback windows clipped to `term_height`.
    pub fn print<W: Write>(
        &self,
        w: &mut W,
        info: &DisplayInfo,
        trace: &mut Trace,
        term_height: usize,
        width: usize,
    ) -> io::Result<()> {
        let now = self.time_source.now();
        for job in &info.jobs {
            self.print_job(w, job, trace, TermView::Windowed { term_height }, width, now)?;
        }
        Ok(())
    }

    /// Print the dashboard with every captured output row.
    pub fn print_full<W: Write>(
        &self,
        w: &mut W,
        info: &DisplayInfo,
        trace: &mut Trace,
        width: usize,
    ) -> io::Result<()> {
        let now = self.time_source.now();
        for job in &info.jobs {
            self.print_job(w, job, trace, TermView::Full, width, now)?;
        }
        Ok(())
    }

    fn print_job<W: Write>(
        &self,
        w: &mut W,
        job: &Job,
        trace: &mut Trace,
        view: TermView,
        width: usize,
        now: DateTime<Utc>,
    ) -> io::Result<()> {
        let Some(start) = job.start_time else {
            return Ok(());
        };
        if job.hidden {
            return Ok(());
        }

        let end = job.completed_time.unwrap_or(now);
        let mut line = job.name.clone();
        if !job.status.is_empty() {
            line.push(' ');
            line.push_str(&job.status);
        }
        line.push(' ');
        line.push_str(&self.ui.duration(non_negative(end - start), job.completed_time.is_some()));

        let focused = job.vertex.is_some() && job.vertex.as_ref() == self.focus.as_ref();
        if focused {
            let highlight = sgr(Style::default().add_modifier(Modifier::REVERSED));
            writeln!(w, "{}{}{}", highlight, line, RESET)?;
        } else {
            writeln!(w, "{}", line)?;
        }

        for status in &job.statuses {
            self.print_job(w, status, trace, view, width, now)?;
        }

        let Some(digest) = &job.vertex else {
            return Ok(());
        };
        let Some(state) = trace.vertex_mut(digest) else {
            return Ok(());
        };
        if state.term_bytes() == 0 {
            return Ok(());
        }
        let Some(term) = state.term_mut() else {
            return Ok(());
        };

        match view {
            TermView::Full => {
                term.set_width(width);
                let rows = term.used_height();
                w.write_all(term.render_region(0, rows).as_bytes())?;
            }
            TermView::Windowed { term_height } => {
                term.set_height(term_height);
                term.set_width(width);
                if job.completed_time.is_some() && !focused {
                    let last = term.last_non_blank_line();
                    if !last.is_empty() {
                        writeln!(w, "{}{}", term.prefix(), last)?;
                    }
                } else {
                    w.write_all(term.render().as_bytes())?;
                }
            }
        }
        Ok(())
    }

    /// Paint the header and the viewport, with a scrollbar on overflow.
    pub fn draw(&self, frame: &mut Frame, header: &str, viewport: &Viewport) {
        let [header_area, body] =
            Layout::vertical([Constraint::Length(1), Constraint::Min(0)]).areas(frame.area());

        frame.render_widget(Paragraph::new(ansi_line(header)), header_area);

        let (content_area, scrollbar_area) = if viewport.needs_scrollbar() && body.width > 1 {
            let [content, bar] =
                Layout::horizontal([Constraint::Min(0), Constraint::Length(1)]).areas(body);
            (content, Some(bar))
        } else {
            (body, None)
        };

        let lines: Vec<Line> = viewport
            .visible_lines()
            .iter()
            .map(|l| ansi_line(l))
            .collect();
        frame.render_widget(Paragraph::new(lines), content_area);

        if let Some(bar) = scrollbar_area {
            render_scrollbar(
                frame,
                bar,
                &viewport.to_scrollbar_state(),
                &ScrollbarColors::default(),
            );
        }
    }
}

fn ansi_line(text: &str) -> Line<'static> {
    Line::from(
        parse_ansi_string(text)
            .into_iter()
            .map(|(text, style)| Span::styled(text, style))
            .collect::<Vec<_>>(),
    )
}
