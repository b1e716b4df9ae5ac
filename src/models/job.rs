//! Job results and their structured log.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Severity of a job log entry.
///
/// Variants are ordered from least to most severe.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Diagnostic detail.
    Debug,
    /// Informational message.
    #[default]
    Info,
    /// Successful outcome for a subject.
    Success,
    /// Unexpected but non-fatal condition.
    Warning,
    /// Failed outcome for a subject.
    Failure,
    /// Run-level error.
    Error,
}

/// A single structured job log entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LogEntry {
    /// When the entry was recorded.
    pub timestamp: DateTime<Utc>,
    /// Severity.
    pub level: LogLevel,
    /// Name of the device the entry is about, if any.
    #[serde(default)]
    pub subject: Option<String>,
    /// Message text.
    pub message: String,
}

/// Lifecycle status of a job result.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// Created but not started.
    #[default]
    Pending,
    /// Running.
    Running,
    /// Finished and every device succeeded.
    Completed,
    /// Finished with at least one failure, or rejected up front.
    Failed,
    /// Aborted by an infrastructure error.
    Errored,
}

/// Record of one deployment run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct JobResult {
    /// Unique identifier.
    pub id: Uuid,
    /// Job name.
    pub name: String,
    /// Current status.
    pub status: JobStatus,
    /// When the job was created.
    pub created: DateTime<Utc>,
    /// When the job finished.
    #[serde(default)]
    pub completed: Option<DateTime<Utc>>,
    /// Append-only structured log.
    #[serde(default)]
    pub log: Vec<LogEntry>,
}

impl LogLevel {
    /// Returns the lowercase name of the level.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Success => "success",
            Self::Warning => "warning",
            Self::Failure => "failure",
            Self::Error => "error",
        }
    }
}

impl LogEntry {
    /// Creates an entry stamped with the current time.
    #[must_use]
    pub fn new(level: LogLevel, subject: Option<&str>, message: &str) -> Self {
        Self {
            timestamp: Utc::now(),
            level,
            subject: subject.map(ToString::to_string),
            message: message.to_string(),
        }
    }
}

impl JobResult {
    /// Creates a pending job result.
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            status: JobStatus::Pending,
            created: Utc::now(),
            completed: None,
            log: Vec::new(),
        }
    }

    /// Marks the job as running.
    pub const fn start(&mut self) {
        self.status = JobStatus::Running;
    }

    /// Marks the job as finished with the given status.
    pub fn finish(&mut self, status: JobStatus) {
        self.status = status;
        self.completed = Some(Utc::now());
    }

    /// Appends log entries.
    pub fn append_log(&mut self, entries: impl IntoIterator<Item = LogEntry>) {
        self.log.extend(entries);
    }

    /// Returns the entries recorded about one device.
    pub fn entries_for<'a>(&'a self, subject: &'a str) -> impl Iterator<Item = &'a LogEntry> + 'a {
        self.log
            .iter()
            .filter(move |e| e.subject.as_deref() == Some(subject))
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "success" => Ok(Self::Success),
            "warn" | "warning" => Ok(Self::Warning),
            "failure" => Ok(Self::Failure),
            "error" => Ok(Self::Error),
            _ => Err(format!("Invalid log level: {s}")),
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Errored => "errored",
        };
        write!(f, "{s}")
    }
}
