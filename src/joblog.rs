//! Job log sink.
//!
//! Per-device tasks share one `JobLogger`. Each entry is appended under a
//! lock, attributed to its device and mirrored to `tracing`. The collected
//! entries are attached to the job result when the run ends.

use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::models::{Device, LogEntry, LogLevel};

/// Concurrency-safe, append-only job log.
#[derive(Debug, Clone)]
pub struct JobLogger {
    job_id: Uuid,
    level: LogLevel,
    entries: Arc<Mutex<Vec<LogEntry>>>,
}

impl JobLogger {
    /// Creates a logger for a job.
    ///
    /// Entries below `level` are dropped, except that outcome records
    /// (success and above) are always kept.
    #[must_use]
    pub fn new(job_id: Uuid, level: LogLevel) -> Self {
        Self {
            job_id,
            level,
            entries: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Returns the job id.
    #[must_use]
    pub const fn job_id(&self) -> Uuid {
        self.job_id
    }

    /// Returns true if entries at this level are kept.
    #[must_use]
    pub fn enabled(&self, level: LogLevel) -> bool {
        level >= self.level.min(LogLevel::Success)
    }

    /// Records an entry.
    pub fn log(&self, level: LogLevel, subject: Option<&Device>, message: &str) {
        if !self.enabled(level) {
            return;
        }

        let device = subject.map_or("", |d| d.name.as_str());
        match level {
            LogLevel::Debug => debug!(job = %self.job_id, device, "{message}"),
            LogLevel::Info | LogLevel::Success => info!(job = %self.job_id, device, level = %level, "{message}"),
            LogLevel::Warning => warn!(job = %self.job_id, device, "{message}"),
            LogLevel::Failure | LogLevel::Error => error!(job = %self.job_id, device, level = %level, "{message}"),
        }

        let entry = LogEntry::new(level, subject.map(|d| d.name.as_str()), message);
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(entry);
    }

    /// Records a debug entry.
    pub fn debug(&self, subject: Option<&Device>, message: &str) {
        self.log(LogLevel::Debug, subject, message);
    }

    /// Records an info entry.
    pub fn info(&self, subject: Option<&Device>, message: &str) {
        self.log(LogLevel::Info, subject, message);
    }

    /// Records a success entry.
    pub fn success(&self, subject: Option<&Device>, message: &str) {
        self.log(LogLevel::Success, subject, message);
    }

    /// Records a warning entry.
    pub fn warning(&self, subject: Option<&Device>, message: &str) {
        self.log(LogLevel::Warning, subject, message);
    }

    /// Records a failure entry.
    pub fn failure(&self, subject: Option<&Device>, message: &str) {
        self.log(LogLevel::Failure, subject, message);
    }

    /// Records an error entry.
    pub fn error(&self, subject: Option<&Device>, message: &str) {
        self.log(LogLevel::Error, subject, message);
    }

    /// Returns a copy of the recorded entries.
    #[must_use]
    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Removes and returns the recorded entries.
    #[must_use]
    pub fn take(&self) -> Vec<LogEntry> {
        std::mem::take(&mut *self.entries.lock().unwrap_or_else(PoisonError::into_inner))
    }
}
