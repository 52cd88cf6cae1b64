//! Outcome reporting for dispatch runs
//!
//! The dispatcher reports each platform outcome through a [`Reporter`]
//! handed to it, rather than through a global logger.
//! [`TracingReporter`] forwards to `tracing` (and so to the log file);
//! [`MemoryReporter`] keeps the lines in memory for assertions.

use std::sync::{Arc, Mutex};

use tracing::{error, info};

pub trait Reporter: Send + Sync {
    fn info(&self, message: &str);
    fn error(&self, message: &str);
}

/// Reporter backed by the installed `tracing` subscriber
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn info(&self, message: &str) {
        info!("{}", message);
    }

    fn error(&self, message: &str) {
        error!("{}", message);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportLevel {
    Info,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportEntry {
    pub level: ReportLevel,
    pub message: String,
}

/// Reporter that records entries; clones share the same record
#[derive(Debug, Clone, Default)]
pub struct MemoryReporter {
    entries: Arc<Mutex<Vec<ReportEntry>>>,
}

impl MemoryReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<ReportEntry> {
        self.entries
            .lock()
            .map(|entries| entries.clone())
            .unwrap_or_default()
    }

    pub fn infos(&self) -> Vec<String> {
        self.messages(ReportLevel::Info)
    }

    pub fn errors(&self) -> Vec<String> {
        self.messages(ReportLevel::Error)
    }

    fn messages(&self, level: ReportLevel) -> Vec<String> {
        self.entries()
            .into_iter()
            .filter(|entry| entry.level == level)
            .map(|entry| entry.message)
            .collect()
    }

    fn push(&self, level: ReportLevel, message: &str) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.push(ReportEntry {
                level,
                message: message.to_string(),
            });
        }
    }
}

impl Reporter for MemoryReporter {
    fn info(&self, message: &str) {
        self.push(ReportLevel::Info, message);
    }

    fn error(&self, message: &str) {
        self.push(ReportLevel::Error, message);
    }
}
