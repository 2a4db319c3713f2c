//! Per-vertex state owned by the trace
//!
//! A `VertexState` merges every observation of one digest: the latest
//! vertex snapshot, its statuses in first-seen order, assembled log lines,
//! and the scrollback window in full-screen mode.

use crate::model::graph::{Digest, Vertex, VertexStatus};
use crate::model::projection::Job;
use crate::primitives::log_ring::LogRing;
use crate::primitives::units::non_negative;
use crate::view::components::Components;
use crate::view::vterm::Vterm;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;

/// Error suffix that marks a vertex as canceled rather than failed
pub const CANCELED_SUFFIX: &str = "context canceled";

/// Where a vertex is in its life
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lifecycle {
    Pending,
    Running,
    Done,
    Cached,
    Errored,
    Canceled,
}

impl Lifecycle {
    pub fn of(vertex: &Vertex) -> Self {
        if vertex.started.is_none() && vertex.completed.is_none() {
            return Lifecycle::Pending;
        }
        if vertex.completed.is_none() {
            return Lifecycle::Running;
        }
        if !vertex.error.is_empty() {
            if vertex.error.ends_with(CANCELED_SUFFIX) {
                Lifecycle::Canceled
            } else {
                Lifecycle::Errored
            }
        } else if vertex.cached {
            Lifecycle::Cached
        } else {
            Lifecycle::Done
        }
    }

    pub fn is_completed(self) -> bool {
        !matches!(self, Lifecycle::Pending | Lifecycle::Running)
    }
}

/// Bytes of a log line that has not seen its newline yet
#[derive(Debug, Clone)]
struct PendingLine {
    timestamp: DateTime<Utc>,
    data: Vec<u8>,
}

#[derive(Debug)]
pub struct VertexState {
    vertex: Vertex,
    /// Last raw observation, for change detection
    prev: Option<Vertex>,
    index: usize,
    indent: String,

    status_order: Vec<String>,
    statuses: HashMap<String, VertexStatus>,

    logs: Vec<Vec<u8>>,
    pending: Option<PendingLine>,
    log_ring: LogRing,

    activity: usize,
    last_block_time: Option<DateTime<Utc>>,

    job: Option<Arc<Job>>,

    term: Option<Vterm>,
    term_bytes: usize,
}

impl VertexState {
    pub fn new(digest: Digest, index: usize, log_lines: usize) -> Self {
        Self {
            vertex: Vertex {
                digest,
                ..Vertex::default()
            },
            prev: None,
            index,
            indent: String::new(),
            status_order: Vec::new(),
            statuses: HashMap::new(),
            logs: Vec::new(),
            pending: None,
            log_ring: LogRing::new(log_lines),
            activity: 0,
            last_block_time: None,
            job: None,
            term: None,
            term_bytes: 0,
        }
    }

    pub fn vertex(&self) -> &Vertex {
        &self.vertex
    }

    pub fn digest(&self) -> &Digest {
        &self.vertex.digest
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn indent(&self) -> &str {
        &self.indent
    }

    #[cfg(test)]
    pub fn set_indent(&mut self, indent: impl Into<String>) {
        self.indent = indent.into();
        self.invalidate();
    }

    pub fn lifecycle(&self) -> Lifecycle {
        Lifecycle::of(&self.vertex)
    }

    /// Carries an error that is not a cancellation, completed or not.
    pub fn is_failed(&self) -> bool {
        !self.vertex.error.is_empty() && !self.vertex.error.ends_with(CANCELED_SUFFIX)
    }

    /// Statuses in the order their ids were first seen
    pub fn statuses(&self) -> impl Iterator<Item = &VertexStatus> {
        self.status_order.iter().filter_map(|id| self.statuses.get(id))
    }

    pub fn status_count(&self) -> usize {
        self.status_order.len()
    }

    /// Completed, formatted log lines not yet drained
    pub fn logs(&self) -> &[Vec<u8>] {
        &self.logs
    }

    /// Remove and return every completed log line.
    pub fn drain_logs(&mut self) -> Vec<Vec<u8>> {
        std::mem::take(&mut self.logs)
    }

    pub fn log_ring(&self) -> &LogRing {
        &self.log_ring
    }

    pub fn has_partial_log(&self) -> bool {
        self.pending.is_some()
    }

    pub fn activity(&self) -> usize {
        self.activity
    }

    pub fn last_block_time(&self) -> Option<DateTime<Utc>> {
        self.last_block_time
    }

    pub fn term(&self) -> Option<&Vterm> {
        self.term.as_ref()
    }

    pub fn term_mut(&mut self) -> Option<&mut Vterm> {
        self.term.as_mut()
    }

    pub fn set_term(&mut self, term: Vterm) {
        self.term = Some(term);
    }

    /// Bytes written into the scrollback window so far
    pub fn term_bytes(&self) -> usize {
        self.term_bytes
    }

    pub fn add_term_bytes(&mut self, n: usize) {
        self.term_bytes += n;
    }

    pub fn cached_job(&self) -> Option<&Arc<Job>> {
        self.job.as_ref()
    }

    pub fn cache_job(&mut self, job: Arc<Job>) {
        self.job = Some(job);
    }

    /// Drop the cached projection; the next build recomputes it.
    pub fn invalidate(&mut self) {
        self.job = None;
    }

    /// Count one mutation; the first one stamps the block time.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        if self.activity == 0 {
            self.last_block_time = Some(now);
        }
        self.activity += 1;
    }

    /// Merge a new observation of this vertex.
    ///
    /// Returns whether any tracked field differs from the previous
    /// observation. Observations with neither a start nor a completion
    /// carry no news and never reset a vertex that has started.
    pub fn observe(&mut self, v: Vertex, now: DateTime<Utc>) -> bool {
        let timed = v.started.is_some() || v.completed.is_some();
        let changed = timed
            && self
                .prev
                .as_ref()
                .map_or(true, |old| differs(old, &v));
        if changed {
            self.touch(now);
        }

        let regresses = self.vertex.started.is_some() && !timed;
        if !regresses {
            let mut merged = Vertex {
                started: v.started.or(self.vertex.started),
                completed: v.completed.or(self.vertex.completed),
                ..v.clone()
            };
            // A stale record from before completion keeps the final outcome
            if v.completed.is_none() && self.vertex.completed.is_some() {
                merged.error = std::mem::take(&mut self.vertex.error);
                merged.cached = self.vertex.cached;
            }
            self.vertex = merged;
        }
        self.prev = Some(v);
        self.invalidate();
        changed
    }

    /// Insert or update a status by id.
    pub fn upsert_status(&mut self, status: VertexStatus, now: DateTime<Utc>) {
        if !self.statuses.contains_key(&status.id) {
            self.status_order.push(status.id.clone());
        }
        self.statuses.insert(status.id.clone(), status);
        self.invalidate();
        self.touch(now);
    }

    /// Append raw log bytes, completing lines at each newline.
    ///
    /// A trailing fragment without newline is held back and prefixed onto
    /// the next call's first line. The line keeps the timestamp of its
    /// first fragment.
    pub fn append_log(
        &mut self,
        timestamp: DateTime<Utc>,
        data: &[u8],
        ui: &Components,
        now: DateTime<Utc>,
    ) {
        for segment in data.split_inclusive(|b| *b == b'\n') {
            let complete = segment.last() == Some(&b'\n');
            let text = if complete {
                &segment[..segment.len() - 1]
            } else {
                segment
            };

            let pending = self.pending.get_or_insert_with(|| PendingLine {
                timestamp,
                data: Vec::new(),
            });
            pending.data.extend_from_slice(text);

            if complete {
                if let Some(line) = self.pending.take() {
                    self.finish_line(line, ui);
                }
            }
        }
        self.invalidate();
        self.touch(now);
    }

    /// Complete a dangling partial line, if any.
    pub fn flush_partial(&mut self, ui: &Components) {
        if let Some(line) = self.pending.take() {
            self.finish_line(line, ui);
            self.invalidate();
        }
    }

    fn finish_line(&mut self, line: PendingLine, ui: &Components) {
        let since_start = self
            .vertex
            .started
            .map(|started| non_negative(line.timestamp - started))
            .unwrap_or_default();
        let duration = ui.duration(since_start, self.vertex.completed.is_some());
        let text = String::from_utf8_lossy(&line.data);
        let formatted = ui
            .text_log_format
            .render(&[&self.index.to_string(), &duration, &text])
            .into_bytes();

        self.log_ring.push(formatted.clone());
        self.logs.push(formatted);
    }
}

fn differs(old: &Vertex, new: &Vertex) -> bool {
    let started_changed = match (old.started, new.started) {
        (None, None) => false,
        (Some(a), Some(b)) => a != b,
        _ => true,
    };
    let completed_changed = new.completed.is_some() && new.completed != old.completed;

    old.digest != new.digest
        || old.name != new.name
        || started_changed
        || completed_changed
        || old.cached != new.cached
        || old.error != new.error
}
