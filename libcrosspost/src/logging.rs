//! Logging setup for the crosspost binary
//!
//! Every event goes to an append-only log file, one line per event with a
//! timestamp, level and message. Two line formats are supported:
//! - Text (human-readable, no colors)
//! - JSON (one JSON object per line)
//!
//! # Examples
//!
//! ```no_run
//! use libcrosspost::logging::{LoggingConfig, LogFormat};
//!
//! let config = LoggingConfig::new(
//!     LogFormat::Text,
//!     "info".to_string(),
//!     false,
//!     "/var/log/crosspost/log.txt",
//! );
//! config.init().expect("failed to initialize logging");
//! ```

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use thiserror::Error;
use tracing_subscriber::EnvFilter;

/// File name of the log inside the log directory
pub const LOG_FILE_NAME: &str = "log.txt";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable text output
    Text,
    /// Machine-parseable JSON (one JSON object per line)
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            _ => Err(format!(
                "Invalid log format: '{}'. Valid options: text, json",
                s
            )),
        }
    }
}

impl std::fmt::Display for LogFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogFormat::Text => write!(f, "text"),
            LogFormat::Json => write!(f, "json"),
        }
    }
}

#[derive(Error, Debug)]
pub enum LoggingError {
    #[error("Failed to open log file {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to install log subscriber: {0}")]
    Install(String),
}

/// Configuration for logging initialization
pub struct LoggingConfig {
    pub format: LogFormat,
    pub level: String,
    pub verbose: bool,
    /// Append-only log file
    pub file: PathBuf,
}

impl LoggingConfig {
    /// Create a new logging configuration
    ///
    /// # Arguments
    ///
    /// * `format` - Log line format (text or json)
    /// * `level` - Minimum log level (error, warn, info, debug, trace)
    /// * `verbose` - If true, defaults to debug level
    /// * `file` - Log file, created when missing
    pub fn new(format: LogFormat, level: String, verbose: bool, file: impl Into<PathBuf>) -> Self {
        Self {
            format,
            level,
            verbose,
            file: file.into(),
        }
    }

    fn filter(&self) -> EnvFilter {
        let default_level = if self.verbose { "debug" } else { self.level.as_str() };
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
    }

    /// Install the global subscriber
    ///
    /// This should be called once at the start of the program. The log file
    /// and its parent directory are created if missing; existing content is
    /// kept.
    pub fn init(&self) -> Result<(), LoggingError> {
        let filter = self.filter();

        let writer = Arc::new(open_append(&self.file)?);

        let installed = match self.format {
            LogFormat::Json => tracing_subscriber::fmt()
                .json()
                .with_env_filter(filter)
                .with_writer(writer)
                .with_ansi(false)
                .flatten_event(true)
                .with_target(true)
                .try_init(),
            LogFormat::Text => tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(writer)
                .with_ansi(false)
                .with_target(false)
                .with_level(true)
                .try_init(),
        };
        installed.map_err(|e| LoggingError::Install(e.to_string()))
    }
}

/// Open `path` for appending, creating it and its directory when missing
pub fn open_append(path: &Path) -> Result<std::fs::File, LoggingError> {
    let open_error = |source| LoggingError::Open {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(open_error)?;
    }

    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(open_error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_log_format_from_str() {
        assert_eq!("text".parse::<LogFormat>().unwrap(), LogFormat::Text);
        assert_eq!("json".parse::<LogFormat>().unwrap(), LogFormat::Json);

        // Case insensitive
        assert_eq!("TEXT".parse::<LogFormat>().unwrap(), LogFormat::Text);
        assert_eq!("Json".parse::<LogFormat>().unwrap(), LogFormat::Json);
    }

    #[test]
    fn test_log_format_from_str_invalid() {
        let result = "pretty".parse::<LogFormat>();
        assert!(result.is_err());
        assert!(result.unwrap_err().contains("Invalid log format: 'pretty'"));
    }

    #[test]
    fn test_log_format_display() {
        assert_eq!(LogFormat::Text.to_string(), "text");
        assert_eq!(LogFormat::Json.to_string(), "json");
    }

    #[test]
    fn test_logging_config_new() {
        let config = LoggingConfig::new(
            LogFormat::Json,
            "debug".to_string(),
            true,
            "/tmp/crosspost/log.txt",
        );
        assert_eq!(config.format, LogFormat::Json);
        assert_eq!(config.level, "debug");
        assert!(config.verbose);
        assert_eq!(config.file, PathBuf::from("/tmp/crosspost/log.txt"));
    }

    #[test]
    fn test_open_append_keeps_existing_lines() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("logs").join(LOG_FILE_NAME);

        {
            let mut file = open_append(&path).unwrap();
            writeln!(file, "first run").unwrap();
        }
        {
            let mut file = open_append(&path).unwrap();
            writeln!(file, "second run").unwrap();
        }

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "first run\nsecond run\n");
    }

    #[test]
    fn test_open_append_reports_path() {
        let temp_dir = TempDir::new().unwrap();
        let blocker = temp_dir.path().join("not-a-dir");
        std::fs::write(&blocker, "file").unwrap();

        let result = open_append(&blocker.join(LOG_FILE_NAME));

        match result {
            Err(e @ LoggingError::Open { .. }) => assert!(e.to_string().contains("not-a-dir")),
            other => panic!("Expected Open error, got {:?}", other),
        }
    }
}
