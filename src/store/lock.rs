//! Run lock for the plan store.
//!
//! A deployment run holds the lock for its whole duration so two runs
//! never mutate the same plans concurrently. The holder refreshes it while
//! the run is in flight; an unrefreshed lock expires after its ttl.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

/// Default lock lifetime.
pub const LOCK_EXPIRY: Duration = Duration::from_secs(300);

fn default_ttl_ms() -> i64 {
    i64::try_from(LOCK_EXPIRY.as_millis()).unwrap_or(i64::MAX)
}

/// Information about a run lock.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LockInfo {
    /// Unique lock identifier.
    pub lock_id: String,
    /// Who holds the lock.
    pub holder: String,
    /// When the lock was acquired.
    pub acquired_at: DateTime<Utc>,
    /// When the lock expires.
    pub expires_at: DateTime<Utc>,
    /// Lifetime granted by each acquire or refresh, in milliseconds.
    #[serde(default = "default_ttl_ms")]
    pub ttl_ms: i64,
}

impl LockInfo {
    /// Creates a new lock info with the default lifetime.
    #[must_use]
    pub fn new(holder: &str) -> Self {
        Self::with_ttl(holder, LOCK_EXPIRY)
    }

    /// Creates a new lock info that expires after `ttl`.
    #[must_use]
    pub fn with_ttl(holder: &str, ttl: Duration) -> Self {
        let now = Utc::now();
        let ttl_ms = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
        Self {
            lock_id: Uuid::new_v4().to_string(),
            holder: holder.to_string(),
            acquired_at: now,
            expires_at: now + chrono::Duration::milliseconds(ttl_ms),
            ttl_ms,
        }
    }

    /// Pushes the expiry one ttl past now.
    pub fn refresh(&mut self) {
        self.expires_at = Utc::now() + chrono::Duration::milliseconds(self.ttl_ms);
    }

    /// Returns the lock lifetime.
    #[must_use]
    pub fn ttl(&self) -> Duration {
        Duration::from_millis(u64::try_from(self.ttl_ms).unwrap_or(0))
    }

    /// Checks if the lock has expired.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        Utc::now() > self.expires_at
    }

    /// Returns the remaining time until expiry in seconds.
    #[must_use]
    pub fn remaining_secs(&self) -> i64 {
        let remaining = self.expires_at - Utc::now();
        remaining.num_seconds().max(0)
    }
}

/// Generates a unique holder identifier for the current process.
#[must_use]
pub fn generate_holder_id() -> String {
    let hostname = hostname::get().map_or_else(|_| String::from("unknown"), |h| h.to_string_lossy().to_string());

    let pid = std::process::id();
    let uuid = &Uuid::new_v4().to_string()[..8];

    format!("{hostname}-{pid}-{uuid}")
}

/// Resolves the holder name, generating one when none is given.
pub(crate) fn holder_or_generated(holder: &str) -> String {
    if holder.is_empty() {
        generate_holder_id()
    } else {
        holder.to_string()
    }
}
