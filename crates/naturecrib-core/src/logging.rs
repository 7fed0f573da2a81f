//! Diagnostic logging.
//!
//! Transport and persistence causes are logged here and never shown to the
//! user; the status reporter carries the fixed user-facing messages.

use std::fs;

use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use crate::config::paths;

/// Initializes the global subscriber writing to a daily-rolling file under
/// `${NATURECRIB_HOME}/logs`. The filter is taken from `NATURECRIB_LOG`
/// (default `info`).
///
/// Returns a guard that must be held for the process lifetime so buffered
/// log lines are flushed on exit.
pub fn init() -> Result<WorkerGuard> {
    let logs_dir = paths::logs_dir();
    fs::create_dir_all(&logs_dir)
        .with_context(|| format!("Failed to create log directory {}", logs_dir.display()))?;

    let file = tracing_appender::rolling::daily(logs_dir, "naturecrib.log");
    let (writer, guard) = tracing_appender::non_blocking(file);

    let filter = EnvFilter::try_from_env("NATURECRIB_LOG").unwrap_or_else(|_| EnvFilter::new("info"));

    // Ignore a second init (tests, embedding apps).
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .try_init();

    Ok(guard)
}
