// Test fixtures: solve batches, a pinned-clock trace and temp files

use chrono::{DateTime, TimeDelta, Utc};
use dagview::model::graph::{Digest, SolveStatus, Vertex, VertexLog, VertexStatus};
use dagview::model::trace::Trace;
use dagview::services::time_source::{TestTimeSource, TimeSource};
use dagview::view::components::Components;
use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

/// A trace on a pinned clock, with the components it renders with
pub struct TraceHarness {
    pub clock: Arc<TestTimeSource>,
    pub ui: Arc<Components>,
    pub trace: Trace,
}

impl TraceHarness {
    pub fn new(tui: bool) -> Self {
        let clock = TestTimeSource::shared();
        let ui = Arc::new(Components::default());
        let trace = Trace::new(ui.clone(), tui).with_time_source(clock.clone());
        Self { clock, ui, trace }
    }

    /// Current pinned time
    pub fn t0(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn at(&self, secs: i64) -> DateTime<Utc> {
        self.t0() + TimeDelta::seconds(secs)
    }

    pub fn feed(&mut self, status: SolveStatus) {
        self.trace.update(status, 4, 80);
    }
}

pub fn vertex(
    digest: &str,
    name: &str,
    started: Option<DateTime<Utc>>,
    completed: Option<DateTime<Utc>>,
) -> Vertex {
    Vertex {
        digest: Digest::from(digest),
        name: name.to_string(),
        started,
        completed,
        ..Vertex::default()
    }
}

pub fn vertexes(vs: Vec<Vertex>) -> SolveStatus {
    SolveStatus {
        vertexes: vs,
        ..SolveStatus::default()
    }
}

pub fn progress(
    digest: &str,
    id: &str,
    started: DateTime<Utc>,
    current: u64,
    total: u64,
) -> SolveStatus {
    SolveStatus {
        statuses: vec![VertexStatus {
            vertex: Digest::from(digest),
            id: id.to_string(),
            started: Some(started),
            current,
            total,
            ..VertexStatus::default()
        }],
        ..SolveStatus::default()
    }
}

pub fn log(digest: &str, timestamp: DateTime<Utc>, data: &[u8]) -> SolveStatus {
    SolveStatus {
        logs: vec![VertexLog {
            vertex: Digest::from(digest),
            stream: 1,
            timestamp,
            data: data.to_vec(),
        }],
        ..SolveStatus::default()
    }
}

/// Manages temporary test files
pub struct TestFixture {
    _temp_dir: TempDir,
    pub path: PathBuf,
}

impl TestFixture {
    /// Create a new temporary file with given content
    pub fn new(filename: &str, content: &str) -> anyhow::Result<Self> {
        let temp_dir = tempfile::tempdir()?;
        let path = temp_dir.path().join(filename);

        let mut file = fs::File::create(&path)?;
        file.write_all(content.as_bytes())?;
        file.flush()?;

        Ok(TestFixture {
            _temp_dir: temp_dir,
            path,
        })
    }
}
