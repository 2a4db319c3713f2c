//! Application layer: message-driven model and the live event loop
//!
//! Every state change goes through `Model::update`, one message at a time.
//! The producer thread, the input thread and the ticker only ever send
//! messages; none of them touch the trace directly.

mod event_loop;

pub use event_loop::display_solve_status;

use crate::config::Config;
use crate::model::graph::{Digest, SolveStatus};
use crate::model::trace::Trace;
use crate::services::time_source::SharedTimeSource;
use crate::view::display::Display;
use crate::view::text_printer::TextPrinter;
use crate::view::viewport::Viewport;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::Frame;
use std::io::{self, Write};
use std::ops::ControlFlow;
use std::sync::Arc;

/// Rows taken by the header line above the viewport
const HEADER_HEIGHT: usize = 1;

/// Everything the consumer loop reacts to
#[derive(Debug)]
pub enum Message {
    /// A batch from the producer
    Status(SolveStatus),
    /// The producer is exhausted
    Eof,
    /// Periodic redraw
    Tick,
    /// Terminal size changed (columns, rows)
    Resize(u16, u16),
    Key(KeyEvent),
}

/// Output mode, fixed for the lifetime of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayMode {
    /// Full-screen dashboard with scrollable windows
    Tui,
    /// Append-only lines suitable for pipes and CI logs
    Plain,
}

/// What a finished run looked like
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
    pub vertex_count: usize,
    pub has_errors: bool,
}

pub type Interrupt = Box<dyn FnMut() + Send>;

pub struct Model {
    config: Config,
    mode: DisplayMode,
    trace: Trace,
    display: Display,
    printer: TextPrinter,
    viewport: Viewport,
    header: String,
    /// Last size reported by the terminal (columns, rows)
    window: Option<(u16, u16)>,
    interrupt: Interrupt,
}

impl std::fmt::Debug for Model {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Model")
            .field("mode", &self.mode)
            .field("trace", &self.trace)
            .field("window", &self.window)
            .field("focus", &self.display.focus())
            .finish()
    }
}

impl Model {
    pub fn new(
        config: Config,
        mode: DisplayMode,
        time_source: SharedTimeSource,
        interrupt: Interrupt,
    ) -> Self {
        let ui = Arc::new(config.ui.clone());
        let tui = mode == DisplayMode::Tui;
        let trace = Trace::new(ui.clone(), tui)
            .with_time_source(time_source.clone())
            .with_log_lines(config.error_log_lines)
            .with_term_pad(config.term_pad);
        let viewport = Viewport::new(
            config.viewport_fallback_width,
            config
                .viewport_fallback_height
                .saturating_sub(HEADER_HEIGHT),
        );

        Self {
            display: Display::new(ui.clone(), time_source),
            printer: TextPrinter::new(ui),
            trace,
            viewport,
            header: String::new(),
            window: None,
            interrupt,
            config,
            mode,
        }
    }

    pub fn mode(&self) -> DisplayMode {
        self.mode
    }

    pub fn trace(&self) -> &Trace {
        &self.trace
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn header(&self) -> &str {
        &self.header
    }

    pub fn focus(&self) -> Option<&Digest> {
        self.display.focus()
    }

    pub fn summary(&self) -> Summary {
        Summary {
            vertex_count: self.trace.len(),
            has_errors: self.trace.has_errors(),
        }
    }

    fn width(&self) -> usize {
        match self.window {
            Some((cols, _)) => cols as usize,
            None => self.config.viewport_fallback_width,
        }
    }

    /// Height of each running vertex's scrollback window
    fn term_height(&self) -> usize {
        self.viewport.height() / 3
    }

    /// Apply one message. `out` receives plain-mode output.
    pub fn update<W: Write>(&mut self, msg: Message, out: &mut W) -> io::Result<ControlFlow<()>> {
        match msg {
            Message::Status(status) => {
                let (height, width) = (self.term_height(), self.width());
                self.trace.update(status, height, width);
            }
            Message::Tick => self.tick(out)?,
            Message::Resize(cols, rows) => self.resize(cols, rows),
            Message::Key(key) => self.handle_key(key),
            Message::Eof => {
                tracing::debug!("end of stream after {} vertices", self.trace.len());
                return Ok(ControlFlow::Break(()));
            }
        }
        Ok(ControlFlow::Continue(()))
    }

    fn tick<W: Write>(&mut self, out: &mut W) -> io::Result<()> {
        match self.mode {
            DisplayMode::Plain => self.printer.print(out, &mut self.trace),
            DisplayMode::Tui => {
                let info = self.trace.display_info();
                self.header = self.display.status(&info);

                let mut text = Vec::new();
                let (height, width) = (self.term_height(), self.viewport.width());
                self.display
                    .print(&mut text, &info, &mut self.trace, height, width)?;

                let follow = self.viewport.at_bottom();
                self.viewport
                    .set_content(&String::from_utf8_lossy(&text));
                if follow {
                    self.viewport.goto_bottom();
                }
                Ok(())
            }
        }
    }

    fn resize(&mut self, cols: u16, rows: u16) {
        tracing::debug!("resize to {}x{}", cols, rows);
        self.window = Some((cols, rows));
        let follow = self.viewport.at_bottom();
        self.viewport
            .set_size(cols as usize, (rows as usize).saturating_sub(HEADER_HEIGHT));
        if follow {
            self.viewport.goto_bottom();
        }
    }

    fn handle_key(&mut self, key: KeyEvent) {
        tracing::trace!("key {:?} {:?}", key.code, key.modifiers);
        match (key.code, key.modifiers) {
            (KeyCode::Char('c'), modifiers) if modifiers.contains(KeyModifiers::CONTROL) => {
                self.request_interrupt()
            }
            (KeyCode::Char('q'), _) | (KeyCode::Esc, _) => self.request_interrupt(),
            (KeyCode::Tab, _) => self.cycle_focus(),
            (KeyCode::BackTab, _) => self.display.set_focus(None),
            (KeyCode::Up, _) => self.scroll(Scroll::By(-1)),
            (KeyCode::Down, _) => self.scroll(Scroll::By(1)),
            (KeyCode::PageUp, _) => self.scroll(Scroll::PageUp),
            (KeyCode::PageDown, _) => self.scroll(Scroll::PageDown),
            (KeyCode::Home, _) => self.scroll(Scroll::Top),
            (KeyCode::End, _) => self.scroll(Scroll::Bottom),
            _ => {}
        }
    }

    /// Cancellation is up to the callback; the loop keeps running until
    /// the stream ends.
    fn request_interrupt(&mut self) {
        tracing::info!("interrupt requested");
        (self.interrupt)();
    }

    /// Move focus to the next vertex that captured output, wrapping to none.
    fn cycle_focus(&mut self) {
        let ui = self.trace.ui();
        let candidates: Vec<&Digest> = self
            .trace
            .chronological()
            .iter()
            .filter(|d| {
                self.trace
                    .vertex(d)
                    .is_some_and(|v| v.term_bytes() > 0 && !ui.is_hidden(&v.vertex().name))
            })
            .collect();

        let next = match self.display.focus() {
            None => candidates.first().copied(),
            Some(current) => candidates
                .iter()
                .position(|d| *d == current)
                .and_then(|i| candidates.get(i + 1).copied()),
        };
        self.display.set_focus(next.cloned());
    }

    fn scroll(&mut self, scroll: Scroll) {
        if let Some(digest) = self.display.focus().cloned() {
            if let Some(term) = self
                .trace
                .vertex_mut(&digest)
                .and_then(|state| state.term_mut())
            {
                match scroll {
                    Scroll::By(delta) => term.scroll_by(delta),
                    Scroll::PageUp => term.page_up(),
                    Scroll::PageDown => term.page_down(),
                    Scroll::Top => term.home(),
                    Scroll::Bottom => term.end(),
                }
                return;
            }
        }

        match scroll {
            Scroll::By(delta) => self.viewport.scroll_by(delta),
            Scroll::PageUp => self.viewport.page_up(),
            Scroll::PageDown => self.viewport.page_down(),
            Scroll::Top => self.viewport.goto_top(),
            Scroll::Bottom => self.viewport.goto_bottom(),
        }
    }

    /// Paint the current frame.
    pub fn view(&self, frame: &mut Frame) {
        self.display.draw(frame, &self.header, &self.viewport);
    }

    /// Final flush once the stream has ended.
    ///
    /// Full-screen mode prints the whole dashboard with every captured
    /// output row; plain mode prints whatever is still pending. Both then
    /// replay the logs of failed vertices.
    pub fn finish<W: Write>(&mut self, w: &mut W) -> io::Result<()> {
        self.trace.flush_partial_logs();
        match self.mode {
            DisplayMode::Tui => {
                let info = self.trace.display_info();
                self.display.set_focus(None);
                let header = self.display.status(&info);
                if !header.is_empty() {
                    writeln!(w, "{}", header)?;
                }
                let width = self.width();
                self.display.print_full(w, &info, &mut self.trace, width)?;
            }
            DisplayMode::Plain => self.printer.print(w, &mut self.trace)?,
        }
        self.trace.print_error_logs(w)?;
        w.flush()
    }
}

#[derive(Debug, Clone, Copy)]
enum Scroll {
    By(isize),
    PageUp,
    PageDown,
    Top,
    Bottom,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::graph::{Vertex, VertexLog};
    use crate::primitives::ansi::strip_ansi_codes;
    use crate::services::time_source::{TestTimeSource, TimeSource};
    use chrono::{DateTime, TimeDelta, Utc};
    use crossterm::event::KeyEventKind;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn model(mode: DisplayMode) -> (Arc<TestTimeSource>, Arc<AtomicUsize>, Model) {
        let clock = TestTimeSource::shared();
        let interrupts = Arc::new(AtomicUsize::new(0));
        let counter = interrupts.clone();
        let model = Model::new(
            Config::default(),
            mode,
            clock.clone(),
            Box::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        );
        (clock, interrupts, model)
    }

    fn vertex(digest: &str, started: DateTime<Utc>, completed: Option<DateTime<Utc>>) -> Message {
        Message::Status(SolveStatus {
            vertexes: vec![Vertex {
                digest: Digest::from(digest),
                name: format!("step {}", digest),
                started: Some(started),
                completed,
                ..Vertex::default()
            }],
            ..SolveStatus::default()
        })
    }

    fn output(digest: &str, at: DateTime<Utc>, data: &str) -> Message {
        Message::Status(SolveStatus {
            logs: vec![VertexLog {
                vertex: Digest::from(digest),
                stream: 1,
                timestamp: at,
                data: data.as_bytes().to_vec(),
            }],
            ..SolveStatus::default()
        })
    }

    fn key(code: KeyCode, modifiers: KeyModifiers) -> Message {
        Message::Key(KeyEvent {
            code,
            modifiers,
            kind: KeyEventKind::Press,
            state: crossterm::event::KeyEventState::NONE,
        })
    }

    fn send(model: &mut Model, msg: Message) -> ControlFlow<()> {
        model.update(msg, &mut io::sink()).unwrap()
    }

    #[test]
    fn test_interrupt_keys_do_not_stop_the_loop() {
        let (_, interrupts, mut model) = model(DisplayMode::Tui);
        for msg in [
            key(KeyCode::Char('c'), KeyModifiers::CONTROL),
            key(KeyCode::Char('q'), KeyModifiers::NONE),
            key(KeyCode::Esc, KeyModifiers::NONE),
        ] {
            assert_eq!(send(&mut model, msg), ControlFlow::Continue(()));
        }
        assert_eq!(interrupts.load(Ordering::SeqCst), 3);

        send(&mut model, key(KeyCode::Char('c'), KeyModifiers::NONE));
        assert_eq!(interrupts.load(Ordering::SeqCst), 3);
        assert_eq!(send(&mut model, Message::Eof), ControlFlow::Break(()));
    }

    #[test]
    fn test_plain_tick_prints_new_lines() {
        let (clock, _, mut model) = model(DisplayMode::Plain);
        let t0 = clock.now();
        send(&mut model, vertex("a", t0, None));
        send(&mut model, output("a", t0, "hello\n"));

        let mut out = Vec::new();
        model.update(Message::Tick, &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "#1 step a\n#1 0.00s hello\n");

        let mut out = Vec::new();
        model.update(Message::Tick, &mut out).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn test_tui_tick_fills_viewport() {
        let (clock, _, mut model) = model(DisplayMode::Tui);
        let t0 = clock.now();
        send(&mut model, Message::Resize(60, 10));
        send(&mut model, vertex("a", t0, None));
        clock.advance(std::time::Duration::from_secs(2));
        send(&mut model, Message::Tick);

        assert_eq!(model.header(), "[+] Building 2.00s (0/1)");
        let lines = model.viewport().visible_lines();
        assert_eq!(strip_ansi_codes(&lines[0]), "=> step a 2.00s");
        assert_eq!(model.viewport().height(), 9);
    }

    #[test]
    fn test_tab_cycles_focus_through_vertices_with_output() {
        let (clock, _, mut model) = model(DisplayMode::Tui);
        let t0 = clock.now();
        send(&mut model, vertex("a", t0, None));
        send(&mut model, vertex("b", t0, None));
        send(&mut model, vertex("c", t0, None));
        send(&mut model, output("a", t0, "x\n"));
        send(&mut model, output("c", t0, "y\n"));

        let tab = || key(KeyCode::Tab, KeyModifiers::NONE);
        send(&mut model, tab());
        assert_eq!(model.focus(), Some(&Digest::from("a")));
        send(&mut model, tab());
        assert_eq!(model.focus(), Some(&Digest::from("c")));
        send(&mut model, tab());
        assert_eq!(model.focus(), None);

        send(&mut model, tab());
        send(&mut model, key(KeyCode::BackTab, KeyModifiers::SHIFT));
        assert_eq!(model.focus(), None);
    }

    #[test]
    fn test_scroll_keys_move_viewport_without_focus() {
        let (clock, _, mut model) = model(DisplayMode::Tui);
        let t0 = clock.now();
        send(&mut model, Message::Resize(40, 4));
        for i in 0..10 {
            send(&mut model, vertex(&i.to_string(), t0, None));
        }
        send(&mut model, Message::Tick);
        assert!(model.viewport().at_bottom());

        send(&mut model, key(KeyCode::Home, KeyModifiers::NONE));
        assert_eq!(model.viewport().offset(), 0);

        send(&mut model, Message::Tick);
        assert_eq!(model.viewport().offset(), 0);

        send(&mut model, key(KeyCode::End, KeyModifiers::NONE));
        assert!(model.viewport().at_bottom());
    }

    #[test]
    fn test_finish_prints_full_dashboard_and_error_replay() {
        let (clock, _, mut model) = model(DisplayMode::Tui);
        let t0 = clock.now();
        send(&mut model, vertex("a", t0, None));
        send(&mut model, output("a", t0, "boom\n"));
        send(
            &mut model,
            Message::Status(SolveStatus {
                vertexes: vec![Vertex {
                    digest: Digest::from("a"),
                    name: "step a".to_string(),
                    started: Some(t0),
                    completed: Some(t0 + TimeDelta::seconds(1)),
                    error: "exit code: 1".to_string(),
                    ..Vertex::default()
                }],
                ..SolveStatus::default()
            }),
        );

        let mut out = Vec::new();
        model.finish(&mut out).unwrap();
        let text = strip_ansi_codes(&String::from_utf8(out).unwrap());
        assert!(text.contains("\u{2718} ERROR step a 1.00s"));
        assert!(text.contains(" > step a:\n#1 0.00s boom\n------\n"));
        assert!(model.summary().has_errors);
    }
}
