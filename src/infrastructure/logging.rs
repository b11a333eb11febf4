//! Log file setup
//!
//! The terminal belongs to the interactive session, so logs only go to a
//! daily-rotated file.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use super::config::APP_DIR;

/// Prefix of the rotated log files
pub const LOG_FILE_PREFIX: &str = "audio-studio.log";

/// Default location: `<data_dir>/audio-studio/logs`
pub fn default_logs_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
        .join("logs")
}

/// Filter for the crate at `level`, quieter for dependencies.
/// `RUST_LOG` wins when set.
pub fn env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("audio_studio={},warn", level)))
}

/// Initialize file logging.
///
/// Returns a guard that must be kept alive for the duration of the
/// application; dropping it flushes pending lines.
pub fn init_logging(logs_dir: &Path, level: &str) -> io::Result<WorkerGuard> {
    fs::create_dir_all(logs_dir)?;

    let file_appender = RollingFileAppender::new(Rotation::DAILY, logs_dir, LOG_FILE_PREFIX);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(true)
        .with_thread_names(true)
        .with_filter(env_filter(level));

    // try_init: a second call keeps the first subscriber
    if tracing_subscriber::registry()
        .with(file_layer)
        .try_init()
        .is_ok()
    {
        tracing::info!(logs_dir = ?logs_dir, level = level, "Logging initialized");
    }

    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_dir_ends_with_logs() {
        let dir = default_logs_dir();
        assert!(dir.ends_with("audio-studio/logs"));
    }

    #[test]
    fn creates_logs_dir() {
        let temp = tempfile::tempdir().unwrap();
        let logs = temp.path().join("nested").join("logs");
        let guard = init_logging(&logs, "debug").unwrap();
        assert!(logs.is_dir());
        drop(guard);
    }
}
