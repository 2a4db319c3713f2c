use super::{DisplayMode, Interrupt, Message, Model, Summary};
use crate::config::Config;
use crate::services::status_reader::{spawn_producer, StatusReader};
use crate::services::terminal_modes::TerminalModes;
use crate::services::time_source::RealTimeSource;
use anyhow::{Context, Result as AnyhowResult};
use crossterm::event::{
    poll as event_poll, read as event_read, Event as CrosstermEvent, KeyCode, KeyEvent, KeyEventKind,
    KeyModifiers, MouseEventKind,
};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use std::io::{self, Write};
use std::ops::ControlFlow;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

const INPUT_POLL: Duration = Duration::from_millis(50);

/// Render the status stream from `reader` until it is exhausted.
///
/// Full-screen mode takes over the terminal for the duration of the run and
/// writes the final dashboard to `writer` after restoring it. Plain mode
/// streams lines to `writer` as they arrive. Either way the logs of failed
/// vertices are replayed at the end.
pub fn display_solve_status<W, S>(
    interrupt: Interrupt,
    writer: &mut W,
    reader: S,
    mode: DisplayMode,
    config: Config,
) -> AnyhowResult<Summary>
where
    W: Write,
    S: StatusReader + 'static,
{
    config.validate().context("Invalid configuration")?;
    let tick = Duration::from_millis(config.tick_interval_ms);
    let mut model = Model::new(config, mode, RealTimeSource::shared(), interrupt);

    let (sender, receiver) = mpsc::channel();
    let producer =
        spawn_producer(reader, sender.clone()).context("Failed to start status producer")?;
    tracing::info!("displaying solve status in {:?} mode", mode);

    match mode {
        DisplayMode::Plain => {
            drop(sender);
            run_loop(&mut model, writer, tick, |timeout| receiver.recv_timeout(timeout), |_| Ok(()))?;
        }
        DisplayMode::Tui => {
            let mut modes = TerminalModes::enable().context("Failed to set up terminal")?;
            let stop = Arc::new(AtomicBool::new(false));
            let input = spawn_input(sender, stop.clone()).context("Failed to start input reader")?;

            let result = (|| -> AnyhowResult<()> {
                let mut terminal = Terminal::new(CrosstermBackend::new(io::stdout()))
                    .context("Failed to create terminal")?;
                terminal.clear()?;
                if let Ok((cols, rows)) = crossterm::terminal::size() {
                    model.update(Message::Resize(cols, rows), &mut io::sink())?;
                }
                run_loop(
                    &mut model,
                    &mut io::sink(),
                    tick,
                    |timeout| receiver.recv_timeout(timeout),
                    |model| {
                        terminal.draw(|frame| model.view(frame))?;
                        Ok(())
                    },
                )
            })();

            stop.store(true, Ordering::SeqCst);
            modes.undo();
            if input.join().is_err() {
                tracing::warn!("input thread panicked");
            }
            result?;
        }
    }

    if producer.join().is_err() {
        tracing::warn!("status producer panicked");
    }

    model
        .finish(writer)
        .context("Failed to write final output")?;
    Ok(model.summary())
}

/// Consume messages until end of stream, ticking at `tick` regardless of
/// how fast batches arrive.
fn run_loop<W, R, D>(
    model: &mut Model,
    out: &mut W,
    tick: Duration,
    mut recv: R,
    mut draw: D,
) -> AnyhowResult<()>
where
    W: Write,
    R: FnMut(Duration) -> Result<Message, RecvTimeoutError>,
    D: FnMut(&Model) -> AnyhowResult<()>,
{
    let mut next_tick = Instant::now();
    loop {
        let now = Instant::now();
        let msg = if now >= next_tick {
            next_tick = now + tick;
            Message::Tick
        } else {
            match recv(next_tick - now) {
                Ok(msg) => msg,
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => {
                    tracing::warn!("message queue closed without end of stream");
                    Message::Eof
                }
            }
        };

        let is_tick = matches!(msg, Message::Tick);
        if let ControlFlow::Break(()) = model.update(msg, out)? {
            return Ok(());
        }
        if is_tick {
            draw(model)?;
        }
    }
}

/// Forward terminal events as messages until `stop` is set.
fn spawn_input(sender: Sender<Message>, stop: Arc<AtomicBool>) -> io::Result<JoinHandle<()>> {
    std::thread::Builder::new()
        .name("terminal-input".to_string())
        .spawn(move || {
            while !stop.load(Ordering::SeqCst) {
                let event = match event_poll(INPUT_POLL) {
                    Ok(true) => event_read(),
                    Ok(false) => continue,
                    Err(e) => Err(e),
                };
                let msg = match event {
                    Ok(CrosstermEvent::Key(key)) if key.kind == KeyEventKind::Press => {
                        Message::Key(key)
                    }
                    Ok(CrosstermEvent::Resize(cols, rows)) => Message::Resize(cols, rows),
                    // Wheel scrolls like the arrow keys
                    Ok(CrosstermEvent::Mouse(mouse)) => match mouse.kind {
                        MouseEventKind::ScrollUp => {
                            Message::Key(KeyEvent::new(KeyCode::Up, KeyModifiers::NONE))
                        }
                        MouseEventKind::ScrollDown => {
                            Message::Key(KeyEvent::new(KeyCode::Down, KeyModifiers::NONE))
                        }
                        _ => continue,
                    },
                    Ok(_) => continue,
                    Err(e) => {
                        tracing::error!("failed to read terminal event: {}", e);
                        return;
                    }
                };
                if sender.send(msg).is_err() {
                    return;
                }
            }
        })
}
