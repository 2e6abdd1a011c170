//! Logging bootstrap.
//!
//! Installs a global `tracing` subscriber with:
//! - a non-blocking file writer under the configured log directory
//! - optional console output for interactive CLI use
//! - level filtering from `RUST_LOG`, falling back to a default directive

use std::fs;
use std::io;
use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Default filter directive when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "info";

/// Guard that must be kept alive for the duration of logging.
///
/// Dropping this guard flushes and closes the log file writer.
pub struct LoggingGuard {
    _file_guard: WorkerGuard,
}

/// Output options for [`init_logging`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogOutput {
    /// Mirror log lines to stdout.
    pub console: bool,
    /// Truncate the log file instead of appending to it.
    pub truncate: bool,
}

impl Default for LogOutput {
    fn default() -> Self {
        Self {
            console: true,
            truncate: false,
        }
    }
}

/// Initialize the global subscriber.
///
/// Creates the log directory if needed. Fails if the directory or file
/// cannot be prepared; a subscriber that is already installed (e.g. by a
/// test harness) is left in place.
pub fn init_logging(log_dir: &Path, log_file: &str, output: LogOutput) -> Result<LoggingGuard, io::Error> {
    prepare_log_file(log_dir, log_file, output.truncate)?;

    let file_appender = tracing_appender::rolling::never(log_dir, log_file);
    let (non_blocking_file, file_guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking_file)
        .with_ansi(false)
        .with_thread_names(true)
        .with_target(true);

    let stdout_layer = output.console.then(|| {
        tracing_subscriber::fmt::layer()
            .with_writer(io::stdout)
            .with_ansi(true)
            .compact()
    });

    // Ignore the error if a global subscriber is already set.
    let _ = tracing_subscriber::registry()
        .with(build_filter(None))
        .with(file_layer)
        .with(stdout_layer)
        .try_init();

    Ok(LoggingGuard {
        _file_guard: file_guard,
    })
}

/// Filter from `RUST_LOG`, else from `fallback`, else [`DEFAULT_FILTER`].
pub fn build_filter(fallback: Option<&str>) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(fallback.unwrap_or(DEFAULT_FILTER)))
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

fn prepare_log_file(log_dir: &Path, log_file: &str, truncate: bool) -> Result<(), io::Error> {
    fs::create_dir_all(log_dir)?;
    let path = log_dir.join(log_file);
    if truncate {
        fs::write(&path, "")?;
    } else {
        fs::OpenOptions::new().create(true).append(true).open(&path)?;
    }
    Ok(())
}

/// Default log file name.
pub fn default_log_file() -> &'static str {
    "sensorcache.log"
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_prepare_creates_nested_directory() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("deep").join("logs");

        prepare_log_file(&dir, "cache.log", false).unwrap();
        assert!(dir.join("cache.log").exists());
    }

    #[test]
    fn test_prepare_appends_by_default() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("cache.log");
        fs::write(&path, "previous run\n").unwrap();

        prepare_log_file(temp.path(), "cache.log", false).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "previous run\n");

        prepare_log_file(temp.path(), "cache.log", true).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "");
    }

    #[test]
    fn test_prepare_fails_when_directory_is_a_file() {
        let temp = TempDir::new().unwrap();
        let blocker = temp.path().join("blocker");
        fs::write(&blocker, "").unwrap();

        assert!(prepare_log_file(&blocker.join("logs"), "cache.log", false).is_err());
    }

    #[test]
    fn test_build_filter_accepts_fallback() {
        let filter = build_filter(Some("sensorcache=debug"));
        assert!(!filter.to_string().is_empty());
    }

    #[test]
    fn test_default_log_file() {
        assert_eq!(default_log_file(), "sensorcache.log");
    }
}
