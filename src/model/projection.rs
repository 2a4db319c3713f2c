//! Render projection: display-ready jobs derived from vertex state
//!
//! Jobs are rebuilt only for vertices whose cache was invalidated; the
//! counts and start time are recomputed on every build.

use crate::model::graph::{Digest, VertexStatus};
use crate::model::vertex::{Lifecycle, VertexState};
use crate::primitives::units::format_bytes;
use crate::view::components::Components;
use chrono::{DateTime, TimeDelta, Utc};
use std::sync::Arc;

/// One line of the dashboard: a vertex or one of its statuses
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Job {
    pub start_time: Option<DateTime<Utc>>,
    pub completed_time: Option<DateTime<Utc>>,
    /// Decorated and indented name
    pub name: String,
    /// Progress text, empty when there is nothing to show
    pub status: String,
    pub statuses: Vec<Job>,
    pub has_error: bool,
    pub is_canceled: bool,
    /// Whether the vertex name carries the hide tag
    pub hidden: bool,
    /// Owning vertex, set on vertex jobs only
    pub vertex: Option<Digest>,
}

impl Job {
    /// This job plus its status jobs
    pub fn count(&self) -> usize {
        1 + self.statuses.len()
    }
}

/// A full render snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayInfo {
    pub start_time: DateTime<Utc>,
    pub jobs: Vec<Arc<Job>>,
    pub count_total: usize,
    pub count_completed: usize,
}

impl DisplayInfo {
    pub fn is_done(&self) -> bool {
        self.count_completed > 0 && self.count_completed == self.count_total
    }
}

fn shift(time: Option<DateTime<Utc>>, skew: TimeDelta) -> Option<DateTime<Utc>> {
    time.map(|t| t + skew)
}

/// Build the job subtree for one vertex.
pub fn vertex_job(state: &VertexState, ui: &Components, skew: TimeDelta) -> Job {
    let vertex = state.vertex();
    let name = vertex.name.replace('\t', " ");
    let lifecycle = state.lifecycle();

    let decorated = match lifecycle {
        Lifecycle::Pending | Lifecycle::Running => ui.vertex_running.render(&[&name]),
        Lifecycle::Done => ui.vertex_done.render(&[&name]),
        Lifecycle::Cached => ui.vertex_cached.render(&[&name]),
        Lifecycle::Errored => ui.vertex_errored.render(&[&name]),
        Lifecycle::Canceled => ui.vertex_canceled.render(&[&name]),
    };

    let statuses = state
        .statuses()
        .map(|s| status_job(s, state, ui, skew))
        .collect();

    Job {
        start_time: shift(vertex.started, skew),
        completed_time: shift(vertex.completed, skew),
        name: format!("{}{}", state.indent(), decorated),
        status: String::new(),
        statuses,
        has_error: lifecycle == Lifecycle::Errored,
        is_canceled: lifecycle == Lifecycle::Canceled,
        hidden: ui.is_hidden(&vertex.name),
        vertex: Some(vertex.digest.clone()),
    }
}

/// A status stops its clock when it or its vertex completes.
fn status_job(status: &VertexStatus, state: &VertexState, ui: &Components, skew: TimeDelta) -> Job {
    let completed = status.completed.or(state.vertex().completed);
    Job {
        start_time: shift(status.started, skew),
        completed_time: shift(completed, skew),
        name: format!("{}{}", state.indent(), ui.vertex_status.render(&[&status.id])),
        status: progress_text(status, ui),
        ..Job::default()
    }
}

/// `current/total` when the total is known, `current` when only that is.
pub fn progress_text(status: &VertexStatus, ui: &Components) -> String {
    if status.total != 0 {
        ui.status_progress_bound
            .render(&[&format_bytes(status.current), &format_bytes(status.total)])
    } else if status.current != 0 {
        ui.status_progress_unbound
            .render(&[&format_bytes(status.current)])
    } else {
        String::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::graph::Vertex;

    fn t(secs: i64) -> DateTime<Utc> {
        DateTime::<Utc>::UNIX_EPOCH + TimeDelta::seconds(1_700_000_000 + secs)
    }

    fn state_with(v: Vertex) -> VertexState {
        let mut state = VertexState::new(v.digest.clone(), 1, 10);
        state.observe(v, t(0));
        state
    }

    #[test]
    fn test_progress_text() {
        let ui = Components::default();
        let mut s = VertexStatus {
            current: 50,
            total: 100,
            ..VertexStatus::default()
        };
        assert_eq!(progress_text(&s, &ui), "50B/100B");
        s.total = 0;
        s.current = 2_500;
        assert_eq!(progress_text(&s, &ui), "2.50kB");
        s.current = 0;
        assert_eq!(progress_text(&s, &ui), "");
    }

    #[test]
    fn test_vertex_job_decoration_and_indent() {
        let ui = Components::default();
        let mut state = state_with(Vertex {
            digest: Digest::from("d1"),
            name: "copy\tfiles".to_string(),
            started: Some(t(0)),
            completed: Some(t(2)),
            cached: true,
            ..Vertex::default()
        });
        state.set_indent("  ");

        let job = vertex_job(&state, &ui, TimeDelta::zero());
        assert_eq!(job.name, "  \u{2714} CACHED copy files");
        assert!(!job.has_error);
        assert_eq!(job.vertex, Some(Digest::from("d1")));
    }

    #[test]
    fn test_skew_shifts_times() {
        let ui = Components::default();
        let state = state_with(Vertex {
            digest: Digest::from("d1"),
            name: "x".to_string(),
            started: Some(t(0)),
            ..Vertex::default()
        });

        let job = vertex_job(&state, &ui, TimeDelta::seconds(30));
        assert_eq!(job.start_time, Some(t(30)));
        assert_eq!(job.completed_time, None);
        assert_eq!(job.name, "=> x");
    }

    #[test]
    fn test_error_flags() {
        let ui = Components::default();
        let errored = state_with(Vertex {
            digest: Digest::from("d1"),
            name: "x".to_string(),
            started: Some(t(0)),
            completed: Some(t(1)),
            error: "exit code: 2".to_string(),
            ..Vertex::default()
        });
        let job = vertex_job(&errored, &ui, TimeDelta::zero());
        assert!(job.has_error && !job.is_canceled);
        assert_eq!(job.name, "\u{2718} ERROR x");

        let canceled = state_with(Vertex {
            digest: Digest::from("d2"),
            name: "y".to_string(),
            started: Some(t(0)),
            completed: Some(t(1)),
            error: "context canceled".to_string(),
            ..Vertex::default()
        });
        let job = vertex_job(&canceled, &ui, TimeDelta::zero());
        assert!(job.is_canceled && !job.has_error);
    }
}
