//! Push driver capability.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::DispatchError;
use crate::inventory::Host;

/// Outcome reported by a driver after a push.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushResult {
    /// Whether the device configuration changed.
    pub changed: bool,
    /// Whether the push failed. Combined with `changed`, the device
    /// reverted after a partial failure.
    pub failed: bool,
    /// Free-form driver output.
    #[serde(default)]
    pub result: Option<String>,
}

impl PushResult {
    /// Creates a result without driver output.
    #[must_use]
    pub const fn new(changed: bool, failed: bool) -> Self {
        Self {
            changed,
            failed,
            result: None,
        }
    }
}

/// A vendor-specific way of pushing configuration to a device.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ConfigDriver: Send + Sync {
    /// Pushes merged configuration to the host.
    async fn push(&self, host: &Host, config: &str) -> Result<PushResult, DispatchError>;

    /// Checks that the host is reachable.
    async fn check_connectivity(&self, host: &Host) -> Result<(), DispatchError>;
}
