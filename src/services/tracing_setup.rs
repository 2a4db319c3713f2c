//! Tracing subscriber setup
//!
//! The renderer owns the terminal, so diagnostics never go to stdout or
//! stderr. They are written to a log file instead, filtered by `RUST_LOG`.

use std::fs::File;
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

/// Install the global subscriber writing to `log_file_path`.
///
/// Fails if the file cannot be created. A second call in the same process
/// keeps the first subscriber.
pub fn init_global(log_file_path: &Path) -> std::io::Result<()> {
    let log_file = File::create(log_file_path)?;
    if build_subscriber(log_file).try_init().is_err() {
        tracing::debug!("global tracing subscriber already installed");
    }
    Ok(())
}

/// Build a file-backed subscriber with `RUST_LOG` filtering and a DEBUG default.
///
/// Shared between the binary and tests.
pub fn build_subscriber(log_file: File) -> impl tracing::Subscriber + Send + Sync {
    let env_filter = EnvFilter::builder()
        .with_default_directive(tracing::Level::DEBUG.into())
        .from_env_lossy();

    let fmt_layer = fmt::layer()
        .with_ansi(false)
        .with_writer(Arc::new(log_file));

    tracing_subscriber::registry().with(fmt_layer).with(env_filter)
}
