//! Logging setup
//!
//! Console output always goes to stderr. Debug mode additionally writes a
//! daily-rolling log file under the log directory.

use std::fs;
use std::path::PathBuf;
use std::time::{Duration, SystemTime};

use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

const LOG_FILE_PREFIX: &str = "deckhand.log";

/// Logging configuration builder
#[derive(Debug, Clone)]
pub struct LogConfig {
    debug_mode: bool,
    log_dir: Option<PathBuf>,
    level: String,
    json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl LogConfig {
    pub fn new() -> Self {
        Self {
            debug_mode: false,
            log_dir: None,
            level: "info".to_string(),
            json: false,
        }
    }

    pub fn with_debug_mode(mut self, debug: bool) -> Self {
        self.debug_mode = debug;
        self
    }

    pub fn with_log_dir(mut self, dir: PathBuf) -> Self {
        self.log_dir = Some(dir);
        self
    }

    pub fn with_level(mut self, level: &str) -> Self {
        self.level = level.to_string();
        self
    }

    /// Emit JSON lines to the log file instead of plain text
    pub fn with_json(mut self, json: bool) -> Self {
        self.json = json;
        self
    }

    /// Directory that receives log files in debug mode
    pub fn log_dir(&self) -> PathBuf {
        self.log_dir.clone().unwrap_or_else(default_log_dir)
    }

    fn filter(&self) -> EnvFilter {
        let level = if self.debug_mode { "debug" } else { self.level.as_str() };
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(format!("deckhand={level},warn")))
    }
}

fn default_log_dir() -> PathBuf {
    crate::config::deckhand_home().join("logs")
}

/// Initialize the global subscriber.
///
/// Returns the file writer guard in debug mode; dropping it flushes and closes
/// the log file, so callers keep it alive for the whole process.
pub fn init_logging(config: LogConfig) -> Result<Option<WorkerGuard>> {
    let console = fmt::layer().with_writer(std::io::stderr).with_target(false);

    if !config.debug_mode {
        tracing_subscriber::registry()
            .with(config.filter())
            .with(console)
            .try_init()
            .context("Failed to install tracing subscriber")?;
        return Ok(None);
    }

    let dir = config.log_dir();
    fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create log directory: {:?}", dir))?;

    let appender = tracing_appender::rolling::daily(&dir, LOG_FILE_PREFIX);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let registry = tracing_subscriber::registry()
        .with(config.filter())
        .with(console);

    if config.json {
        registry
            .with(fmt::layer().json().with_writer(writer).with_ansi(false))
            .try_init()
            .context("Failed to install tracing subscriber")?;
    } else {
        registry
            .with(
                fmt::layer()
                    .with_writer(writer)
                    .with_ansi(false)
                    .with_file(true)
                    .with_line_number(true),
            )
            .try_init()
            .context("Failed to install tracing subscriber")?;
    }

    tracing::debug!("Debug logging to {}", dir.display());
    Ok(Some(guard))
}

/// Remove rolled log files older than `days` from the default log directory
pub fn cleanup_old_logs(days: u64) -> Result<usize> {
    cleanup_logs_in(&default_log_dir(), days)
}

/// Remove rolled log files older than `days` from `dir`
pub fn cleanup_logs_in(dir: &std::path::Path, days: u64) -> Result<usize> {
    if !dir.exists() {
        return Ok(0);
    }

    let max_age = Duration::from_secs(days * 24 * 60 * 60);
    let now = SystemTime::now();
    let mut removed = 0;

    for entry in fs::read_dir(dir).with_context(|| format!("Failed to read {:?}", dir))? {
        let entry = entry?;
        let name = entry.file_name();
        if !name.to_string_lossy().starts_with(LOG_FILE_PREFIX) {
            continue;
        }

        let modified = entry.metadata().and_then(|m| m.modified())?;
        let age = now.duration_since(modified).unwrap_or_default();
        if age > max_age {
            fs::remove_file(entry.path())?;
            removed += 1;
        }
    }

    Ok(removed)
}
