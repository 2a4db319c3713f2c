//! Format templates for every piece of rendered text
//!
//! Templates use positional placeholders (`{0}`, `{1}`, ...) so a config
//! file can reorder or drop values. Defaults mimic the classic build log
//! look and are all overridable.

use crate::primitives::units::format_seconds;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// A format string with positional `{n}` placeholders
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Template(String);

impl Template {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Substitute `{n}` with `args[n]`.
    ///
    /// Placeholders that are malformed or out of range are kept verbatim.
    pub fn render(&self, args: &[&str]) -> String {
        let src = self.0.as_str();
        let mut out = String::with_capacity(src.len() + args.iter().map(|a| a.len()).sum::<usize>());
        let mut rest = src;

        while let Some(open) = rest.find('{') {
            out.push_str(&rest[..open]);
            let after = &rest[open + 1..];
            let substituted = after.find('}').and_then(|close| {
                let index: usize = after[..close].parse().ok()?;
                let arg = args.get(index)?;
                Some((arg, close))
            });
            match substituted {
                Some((arg, close)) => {
                    out.push_str(arg);
                    rest = &after[close + 1..];
                }
                None => {
                    out.push('{');
                    rest = after;
                }
            }
        }
        out.push_str(rest);
        out
    }
}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Template {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Every template used by the dashboard and the plain-text log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Components {
    /// Header while work remains: duration, completed, total
    pub console_running: Template,
    /// Header once every vertex completed: duration, completed, total
    pub console_done: Template,

    pub vertex_running: Template,
    pub vertex_done: Template,
    pub vertex_cached: Template,
    pub vertex_errored: Template,
    pub vertex_canceled: Template,
    /// Status sub-task name: status id
    pub vertex_status: Template,
    /// current, total
    pub status_progress_bound: Template,
    /// current
    pub status_progress_unbound: Template,

    /// Gutter drawn before every line of captured terminal output
    pub log_prefix: Template,
    /// One completed log line: index, duration, text
    pub text_log_format: Template,

    pub running_duration: Template,
    pub done_duration: Template,

    /// Printed before an errored vertex's logs: name
    pub error_header: Template,
    /// Printed after them, skipped when empty: name
    pub error_footer: Template,

    /// index, name
    pub text_vertex_start: Template,
    /// index, duration
    pub text_vertex_done: Template,
    /// index
    pub text_vertex_cached: Template,
    /// index, error
    pub text_vertex_errored: Template,
    /// index
    pub text_vertex_canceled: Template,
    /// index, status id, progress, duration
    pub text_status_done: Template,

    /// Vertices whose name contains this marker are never drawn
    pub hide_tag: String,
}

impl Default for Components {
    fn default() -> Self {
        Self {
            console_running: "[+] Building {0} ({1}/{2})".into(),
            console_done: "[+] Building {0} ({1}/{2}) FINISHED".into(),
            vertex_running: "=> {0}".into(),
            vertex_done: "\u{2714} {0}".into(),
            vertex_cached: "\u{2714} CACHED {0}".into(),
            vertex_errored: "\u{2718} ERROR {0}".into(),
            vertex_canceled: "\u{2718} CANCELED {0}".into(),
            vertex_status: "-> {0}".into(),
            status_progress_bound: "{0}/{1}".into(),
            status_progress_unbound: "{0}".into(),
            log_prefix: "  \u{2502} ".into(),
            text_log_format: "#{0} {1} {2}".into(),
            running_duration: "{0}s".into(),
            done_duration: "{0}s".into(),
            error_header: "------\n > {0}:\n".into(),
            error_footer: "------\n".into(),
            text_vertex_start: "#{0} {1}".into(),
            text_vertex_done: "#{0} DONE {1}".into(),
            text_vertex_cached: "#{0} CACHED".into(),
            text_vertex_errored: "#{0} ERROR: {1}".into(),
            text_vertex_canceled: "#{0} CANCELED".into(),
            text_status_done: "#{0} {1} {2} {3}".into(),
            hide_tag: "[hide]".to_string(),
        }
    }
}

impl Components {
    /// Format an elapsed time with the running or done template.
    pub fn duration(&self, dt: Duration, completed: bool) -> String {
        let template = if completed {
            &self.done_duration
        } else {
            &self.running_duration
        };
        template.render(&[&format_seconds(dt)])
    }

    /// Whether a vertex with this raw name must stay off screen.
    pub fn is_hidden(&self, name: &str) -> bool {
        !self.hide_tag.is_empty() && name.contains(&self.hide_tag)
    }
}
