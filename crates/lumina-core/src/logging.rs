//! File logging.
//!
//! Stdout belongs to the chat renderer, so logs go to a daily-rotated file
//! under `$LUMINA_HOME/logs`.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Env var holding a `tracing` filter directive; wins over config.
pub const LOG_ENV: &str = "LUMINA_LOG";

const LOG_FILE_PREFIX: &str = "lumina.log";

/// Keeps the background log writer alive; flushes on drop.
#[must_use = "dropping the guard stops file logging"]
pub struct LogGuard {
    _guard: WorkerGuard,
}

/// Builds the filter from `LUMINA_LOG`, falling back to `default_level`, then
/// to `info` when the configured level does not parse.
pub fn build_filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Installs the global subscriber writing to `dir/lumina.log.<date>`.
///
/// # Errors
/// Returns an error if the directory cannot be created or a global
/// subscriber is already set.
pub fn init(dir: &Path, default_level: &str) -> Result<LogGuard> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create log directory {}", dir.display()))?;

    let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
    let (non_blocking, guard) = tracing_appender::non_blocking(appender);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(true);

    tracing_subscriber::registry()
        .with(build_filter(default_level))
        .with(file_layer)
        .try_init()
        .context("Failed to install log subscriber")?;

    Ok(LogGuard { _guard: guard })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bad_level_falls_back() {
        // Must not panic on garbage directives.
        let filter = build_filter("=[not a filter");
        assert!(!filter.to_string().is_empty());
    }
}
