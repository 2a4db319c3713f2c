//! Append-only rendering for non-interactive output
//!
//! Each call prints only what is new for the vertices touched since the
//! previous call, so the output can be redirected to a file or a CI log.
//! Printed log lines are drained from the trace; the per-vertex ring keeps
//! the tail for error replay.

use crate::model::graph::Digest;
use crate::model::projection::progress_text;
use crate::model::trace::Trace;
use crate::model::vertex::Lifecycle;
use crate::primitives::units::non_negative;
use crate::view::components::Components;
use std::collections::{HashMap, HashSet};
use std::io::{self, Write};
use std::sync::Arc;

/// What has already been printed for one vertex
#[derive(Debug, Default)]
struct Printed {
    started: bool,
    completed: bool,
    statuses: HashSet<String>,
}

#[derive(Debug)]
pub struct TextPrinter {
    ui: Arc<Components>,
    printed: HashMap<Digest, Printed>,
}

impl TextPrinter {
    pub fn new(ui: Arc<Components>) -> Self {
        Self {
            ui,
            printed: HashMap::new(),
        }
    }

    /// Print everything new since the last call and clear the trace's
    /// update set.
    pub fn print<W: Write>(&mut self, w: &mut W, trace: &mut Trace) -> io::Result<()> {
        let dirty: Vec<Digest> = trace
            .chronological()
            .iter()
            .filter(|d| trace.updates().contains(*d))
            .cloned()
            .collect();

        for digest in dirty {
            let Some(state) = trace.vertex_mut(&digest) else {
                continue;
            };
            let lines = state.drain_logs();
            if self.ui.is_hidden(&state.vertex().name) {
                continue;
            }

            let printed = self.printed.entry(digest).or_default();
            let index = state.index().to_string();

            if !printed.started {
                let name = state.vertex().name.replace('\t', " ");
                writeln!(w, "{}", self.ui.text_vertex_start.render(&[&index, &name]))?;
                printed.started = true;
            }

            for line in lines {
                w.write_all(&line)?;
                writeln!(w)?;
            }

            for status in state.statuses() {
                let Some(completed) = status.completed else {
                    continue;
                };
                if printed.statuses.contains(&status.id) {
                    continue;
                }
                let elapsed = status
                    .started
                    .map(|started| non_negative(completed - started))
                    .unwrap_or_default();
                writeln!(
                    w,
                    "{}",
                    self.ui.text_status_done.render(&[
                        &index,
                        &status.id,
                        &progress_text(status, &self.ui),
                        &self.ui.duration(elapsed, true),
                    ])
                )?;
                printed.statuses.insert(status.id.clone());
            }

            if printed.completed {
                continue;
            }
            let vertex = state.vertex();
            let line = match state.lifecycle() {
                Lifecycle::Pending | Lifecycle::Running => continue,
                Lifecycle::Done => {
                    let elapsed = match (vertex.started, vertex.completed) {
                        (Some(started), Some(completed)) => non_negative(completed - started),
                        _ => Default::default(),
                    };
                    self.ui
                        .text_vertex_done
                        .render(&[&index, &self.ui.duration(elapsed, true)])
                }
                Lifecycle::Cached => self.ui.text_vertex_cached.render(&[&index]),
                Lifecycle::Errored => self.ui.text_vertex_errored.render(&[&index, &vertex.error]),
                Lifecycle::Canceled => self.ui.text_vertex_canceled.render(&[&index]),
            };
            writeln!(w, "{}", line)?;
            printed.completed = true;
        }

        trace.clear_updates();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::graph::{SolveStatus, Vertex, VertexLog, VertexStatus};
    use crate::services::time_source::TestTimeSource;
    use chrono::{DateTime, TimeDelta, Utc};

    fn t(secs: i64) -> DateTime<Utc> {
        DateTime::<Utc>::UNIX_EPOCH + TimeDelta::seconds(1_704_067_200 + secs)
    }

    fn vertex(started: i64, completed: Option<i64>, error: &str) -> SolveStatus {
        SolveStatus {
            vertexes: vec![Vertex {
                digest: Digest::from("d1"),
                name: "RUN make".to_string(),
                started: Some(t(started)),
                completed: completed.map(t),
                error: error.to_string(),
                ..Vertex::default()
            }],
            ..SolveStatus::default()
        }
    }

    fn output(at: i64, data: &str) -> SolveStatus {
        SolveStatus {
            logs: vec![VertexLog {
                vertex: Digest::from("d1"),
                stream: 1,
                timestamp: t(at),
                data: data.as_bytes().to_vec(),
            }],
            ..SolveStatus::default()
        }
    }

    fn setup() -> (Trace, TextPrinter) {
        let ui = Arc::new(Components::default());
        let trace = Trace::new(ui.clone(), false).with_time_source(TestTimeSource::shared());
        (trace, TextPrinter::new(ui))
    }

    fn print(printer: &mut TextPrinter, trace: &mut Trace) -> String {
        let mut out = Vec::new();
        printer.print(&mut out, trace).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_prints_each_line_once() {
        let (mut trace, mut printer) = setup();
        trace.update(vertex(0, None, ""), 0, 80);
        trace.update(output(1, "compiling\n"), 0, 80);
        assert_eq!(print(&mut printer, &mut trace), "#1 RUN make\n#1 1.00s compiling\n");

        assert_eq!(print(&mut printer, &mut trace), "");

        trace.update(output(2, "linking\n"), 0, 80);
        trace.update(vertex(0, Some(3), ""), 0, 80);
        assert_eq!(
            print(&mut printer, &mut trace),
            "#1 2.00s linking\n#1 DONE 3.00s\n"
        );
        assert!(trace.updates().is_empty());
    }

    #[test]
    fn test_partial_line_waits_for_newline() {
        let (mut trace, mut printer) = setup();
        trace.update(vertex(0, None, ""), 0, 80);
        trace.update(output(1, "hello wor"), 0, 80);
        assert_eq!(print(&mut printer, &mut trace), "#1 RUN make\n");

        trace.update(output(2, "ld\n"), 0, 80);
        assert_eq!(print(&mut printer, &mut trace), "#1 1.00s hello world\n");
    }

    #[test]
    fn test_status_completion_printed_once() {
        let (mut trace, mut printer) = setup();
        trace.update(vertex(0, None, ""), 0, 80);
        let status = |completed: Option<i64>| SolveStatus {
            statuses: vec![VertexStatus {
                vertex: Digest::from("d1"),
                id: "transferring".to_string(),
                started: Some(t(0)),
                completed: completed.map(t),
                current: 2048,
                total: 4096,
                ..VertexStatus::default()
            }],
            ..SolveStatus::default()
        };
        trace.update(status(None), 0, 80);
        assert_eq!(print(&mut printer, &mut trace), "#1 RUN make\n");

        trace.update(status(Some(2)), 0, 80);
        assert_eq!(
            print(&mut printer, &mut trace),
            "#1 transferring 2.05kB/4.10kB 2.00s\n"
        );
        trace.update(status(Some(2)), 0, 80);
        assert_eq!(print(&mut printer, &mut trace), "");
    }

    #[test]
    fn test_error_and_cancel_lines() {
        let (mut trace, mut printer) = setup();
        trace.update(vertex(0, Some(1), "exit code: 2"), 0, 80);
        assert_eq!(
            print(&mut printer, &mut trace),
            "#1 RUN make\n#1 ERROR: exit code: 2\n"
        );

        let (mut trace, mut printer) = setup();
        trace.update(vertex(0, Some(1), "context canceled"), 0, 80);
        assert_eq!(print(&mut printer, &mut trace), "#1 RUN make\n#1 CANCELED\n");
    }

    #[test]
    fn test_printed_lines_are_drained() {
        let (mut trace, mut printer) = setup();
        trace.update(vertex(0, None, ""), 0, 80);
        trace.update(output(0, "a\nb\n"), 0, 80);
        print(&mut printer, &mut trace);

        let state = trace.vertex(&Digest::from("d1")).unwrap();
        assert!(state.logs().is_empty());
        assert_eq!(state.log_ring().len(), 2);
    }
}
