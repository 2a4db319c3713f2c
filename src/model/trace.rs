//! Trace engine: folds status batches into vertex state
//!
//! The trace owns every `VertexState`, keeps started vertices in
//! chronological order, remembers which vertices changed since the
//! plain-text printer last ran, and builds the render projection.

use crate::model::graph::{Digest, SolveStatus, Vertex};
use crate::model::projection::{vertex_job, DisplayInfo};
use crate::model::vertex::VertexState;
use crate::primitives::ansi::visible_width;
use crate::services::time_source::{RealTimeSource, SharedTimeSource};
use crate::view::components::Components;
use crate::view::vterm::Vterm;
use chrono::{DateTime, TimeDelta, Utc};
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::io::{self, Write};
use std::sync::Arc;

pub const DEFAULT_LOG_LINES: usize = 10;
pub const DEFAULT_TERM_PAD: usize = 4;

pub struct Trace {
    ui: Arc<Components>,
    time_source: SharedTimeSource,
    tui: bool,
    term_pad: usize,
    log_lines: usize,

    /// Local clock minus producer clock, captured at the first start
    local_time_diff: Option<TimeDelta>,
    by_digest: HashMap<Digest, VertexState>,
    /// Started vertices, completed ones first by completion time
    vertexes: Vec<Digest>,
    next_index: usize,
    updates: HashSet<Digest>,
}

impl std::fmt::Debug for Trace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Trace")
            .field("tui", &self.tui)
            .field("vertexes", &self.by_digest.len())
            .field("started", &self.vertexes.len())
            .field("updates", &self.updates.len())
            .field("local_time_diff", &self.local_time_diff)
            .finish()
    }
}

impl Trace {
    pub fn new(ui: Arc<Components>, tui: bool) -> Self {
        Self {
            ui,
            time_source: RealTimeSource::shared(),
            tui,
            term_pad: DEFAULT_TERM_PAD,
            log_lines: DEFAULT_LOG_LINES,
            local_time_diff: None,
            by_digest: HashMap::new(),
            vertexes: Vec::new(),
            next_index: 0,
            updates: HashSet::new(),
        }
    }

    pub fn with_time_source(mut self, time_source: SharedTimeSource) -> Self {
        self.time_source = time_source;
        self
    }

    /// Capacity of each vertex's error replay ring
    pub fn with_log_lines(mut self, lines: usize) -> Self {
        self.log_lines = lines;
        self
    }

    /// Minimum gutter width in front of captured terminal output
    pub fn with_term_pad(mut self, pad: usize) -> Self {
        self.term_pad = pad;
        self
    }

    pub fn ui(&self) -> &Components {
        &self.ui
    }

    pub fn is_tui(&self) -> bool {
        self.tui
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.time_source.now()
    }

    pub fn local_time_diff(&self) -> Option<TimeDelta> {
        self.local_time_diff
    }

    pub fn vertex(&self, digest: &Digest) -> Option<&VertexState> {
        self.by_digest.get(digest)
    }

    pub fn vertex_mut(&mut self, digest: &Digest) -> Option<&mut VertexState> {
        self.by_digest.get_mut(digest)
    }

    /// Every known vertex, started or not
    pub fn len(&self) -> usize {
        self.by_digest.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_digest.is_empty()
    }

    /// Started vertices in render order
    pub fn chronological(&self) -> &[Digest] {
        &self.vertexes
    }

    /// Vertices touched since the last `clear_updates`
    pub fn updates(&self) -> &HashSet<Digest> {
        &self.updates
    }

    pub fn clear_updates(&mut self) {
        self.updates.clear();
    }

    /// Any vertex failed with a real error (not a cancellation).
    pub fn has_errors(&self) -> bool {
        self.by_digest.values().any(VertexState::is_failed)
    }

    fn log_prefix(&self) -> String {
        let mut prefix = self.ui.log_prefix.render(&[]);
        let width = visible_width(&prefix);
        if width < self.term_pad {
            prefix.push_str(&" ".repeat(self.term_pad - width));
        }
        prefix
    }

    fn new_term(&self, term_height: usize, term_width: usize) -> Vterm {
        let mut term = Vterm::new();
        term.set_prefix(self.log_prefix());
        term.set_height(term_height);
        term.set_width(term_width);
        term
    }

    /// Fold one batch into the trace.
    ///
    /// `term_height` and `term_width` size the scrollback windows of
    /// full-screen mode.
    pub fn update(&mut self, status: SolveStatus, term_height: usize, term_width: usize) {
        let now = self.time_source.now();

        for v in status.vertexes {
            self.update_vertex(v, now, term_height, term_width);
        }

        for s in status.statuses {
            let Some(state) = self.by_digest.get_mut(&s.vertex) else {
                tracing::debug!("dropping status {} for unknown vertex {}", s.id, s.vertex);
                continue;
            };
            let digest = s.vertex.clone();
            state.upsert_status(s, now);
            self.updates.insert(digest);
        }

        for log in status.logs {
            let Some(state) = self.by_digest.get_mut(&log.vertex) else {
                tracing::debug!(
                    "dropping {} log bytes for unknown vertex {}",
                    log.data.len(),
                    log.vertex
                );
                continue;
            };

            if let Some(term) = state.term_mut() {
                if term.width() != term_width {
                    term.set_width(term_width);
                }
                if term.height() != term_height {
                    term.set_height(term_height);
                }
                if let Err(e) = term.write_all(&log.data) {
                    tracing::debug!("terminal buffer rejected output for {}: {}", log.vertex, e);
                }
                state.add_term_bytes(log.data.len());
            }

            state.append_log(log.timestamp, &log.data, &self.ui, now);
            self.updates.insert(log.vertex);
        }

        let by_digest = &self.by_digest;
        let completed = |d: &Digest| by_digest.get(d).and_then(|v| v.vertex().completed);
        self.vertexes
            .sort_by(|a, b| chronological(completed(a), completed(b)));
    }

    fn update_vertex(&mut self, v: Vertex, now: DateTime<Utc>, term_height: usize, term_width: usize) {
        let digest = v.digest.clone();

        if !self.by_digest.contains_key(&digest) {
            self.next_index += 1;
            let mut state = VertexState::new(digest.clone(), self.next_index, self.log_lines);
            if self.tui {
                state.set_term(self.new_term(term_height, term_width));
            }
            tracing::debug!("new vertex #{} {}", self.next_index, digest);
            self.by_digest.insert(digest.clone(), state);
        }
        let Some(state) = self.by_digest.get_mut(&digest) else {
            return;
        };

        let first_start = match (state.vertex().started, v.started) {
            (None, Some(started)) => Some(started),
            _ => None,
        };

        if state.observe(v, now) {
            self.updates.insert(digest.clone());
        }

        if let Some(started) = first_start {
            if self.local_time_diff.is_none() {
                self.local_time_diff = Some(now - started);
            }
            self.vertexes.push(digest);
        }
    }

    /// Build the render snapshot, reusing cached jobs of untouched vertices.
    pub fn display_info(&mut self) -> DisplayInfo {
        let skew = self.local_time_diff.unwrap_or_else(TimeDelta::zero);
        let first_start = self
            .vertexes
            .first()
            .and_then(|d| self.by_digest.get(d))
            .and_then(|v| v.vertex().started);
        let start_time = match (self.local_time_diff, first_start) {
            (Some(diff), Some(started)) => started + diff,
            _ => self.time_source.now(),
        };

        let count_total = self.by_digest.len();
        let count_completed = self
            .by_digest
            .values()
            .filter(|v| v.vertex().completed.is_some())
            .count();

        let mut jobs = Vec::with_capacity(self.vertexes.len());
        for digest in &self.vertexes {
            let Some(state) = self.by_digest.get_mut(digest) else {
                continue;
            };
            let job = match state.cached_job() {
                Some(job) => Arc::clone(job),
                None => {
                    let job = Arc::new(vertex_job(state, &self.ui, skew));
                    state.cache_job(Arc::clone(&job));
                    job
                }
            };
            jobs.push(job);
        }

        DisplayInfo {
            start_time,
            jobs,
            count_total,
            count_completed,
        }
    }

    /// Complete every dangling partial log line. Called once the stream ends.
    pub fn flush_partial_logs(&mut self) {
        for (digest, state) in self.by_digest.iter_mut() {
            if state.has_partial_log() {
                state.flush_partial(&self.ui);
                self.updates.insert(digest.clone());
            }
        }
    }

    /// Replay the logs of every failed vertex.
    ///
    /// Full-screen mode still holds every line; plain mode only has the
    /// ring buffer tail. Canceled vertices are skipped.
    pub fn print_error_logs<W: Write>(&self, w: &mut W) -> io::Result<()> {
        for digest in &self.vertexes {
            let Some(state) = self.by_digest.get(digest) else {
                continue;
            };
            if !state.is_failed() {
                continue;
            }
            let vertex = state.vertex();

            write!(w, "{}", self.ui.error_header.render(&[&vertex.name]))?;
            if self.tui {
                for line in state.logs() {
                    w.write_all(line)?;
                    writeln!(w)?;
                }
            } else {
                for line in state.log_ring().iter() {
                    w.write_all(line)?;
                    writeln!(w)?;
                }
            }
            if !self.ui.error_footer.is_empty() {
                write!(w, "{}", self.ui.error_footer.render(&[&vertex.name]))?;
            }
        }
        Ok(())
    }
}

/// Completed vertices first, earliest completion first; the rest keep
/// their relative order.
fn chronological(a: Option<DateTime<Utc>>, b: Option<DateTime<Utc>>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
