//! Per-device outcomes and the deployment summary.

use serde::Serialize;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::models::JobStatus;

/// What happened on one device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceOutcome {
    /// The push changed the device.
    Deployed,
    /// The device already had the configuration.
    NothingToDeploy,
    /// The device reverted after a partial failure.
    Reverted,
    /// The driver reported a failure without a change.
    Unexpected,
    /// The driver could not reach or talk to the device.
    TransportFailed,
    /// Commit mode was off.
    NotCommitted,
    /// A plan update failed.
    Error,
}

impl DeviceOutcome {
    /// Interprets a driver's (changed, failed) report.
    #[must_use]
    pub const fn from_push(changed: bool, failed: bool) -> Self {
        match (changed, failed) {
            (true, true) => Self::Reverted,
            (false, false) => Self::NothingToDeploy,
            (true, false) => Self::Deployed,
            (false, true) => Self::Unexpected,
        }
    }

    /// Returns true for outcomes that count as success.
    #[must_use]
    pub const fn is_success(self) -> bool {
        matches!(self, Self::Deployed | Self::NothingToDeploy | Self::NotCommitted)
    }

    /// Returns the snake case name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Deployed => "deployed",
            Self::NothingToDeploy => "nothing_to_deploy",
            Self::Reverted => "reverted",
            Self::Unexpected => "unexpected",
            Self::TransportFailed => "transport_failed",
            Self::NotCommitted => "not_committed",
            Self::Error => "error",
        }
    }
}

impl std::fmt::Display for DeviceOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of the per-device task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceReport {
    /// Device name.
    pub device: String,
    /// Device id.
    pub device_id: Uuid,
    /// Number of plans deployed together.
    pub plans: usize,
    /// Outcome.
    pub outcome: DeviceOutcome,
    /// SHA-256 of the consolidated payload, hex encoded.
    pub payload_digest: String,
    /// Driver output, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    /// Error detail for failed devices.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Computes the payload digest.
#[must_use]
pub fn payload_digest(payload: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(payload.as_bytes());
    hex::encode(hasher.finalize())
}

/// Aggregate result of a deployment run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeploymentSummary {
    /// Job result id.
    pub job_id: Uuid,
    /// Whether configuration was pushed.
    pub commit: bool,
    /// One report per device, in inventory order.
    pub devices: Vec<DeviceReport>,
}

impl DeploymentSummary {
    /// Number of devices in the run.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.devices.len()
    }

    /// Number of successful devices.
    #[must_use]
    pub fn succeeded(&self) -> usize {
        self.devices.iter().filter(|d| d.outcome.is_success()).count()
    }

    /// Number of failed devices.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.total() - self.succeeded()
    }

    /// Returns true if every device succeeded.
    #[must_use]
    pub fn all_successful(&self) -> bool {
        self.devices.iter().all(|d| d.outcome.is_success())
    }

    /// Number of devices with a given outcome.
    #[must_use]
    pub fn count(&self, outcome: DeviceOutcome) -> usize {
        self.devices.iter().filter(|d| d.outcome == outcome).count()
    }

    /// Job status implied by the device outcomes.
    #[must_use]
    pub fn job_status(&self) -> JobStatus {
        if self.all_successful() {
            JobStatus::Completed
        } else {
            JobStatus::Failed
        }
    }

    /// Report for a device, by name.
    #[must_use]
    pub fn device(&self, name: &str) -> Option<&DeviceReport> {
        self.devices.iter().find(|d| d.device == name)
    }
}

impl std::fmt::Display for DeploymentSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} device(s): {} succeeded, {} failed",
            self.total(),
            self.succeeded(),
            self.failed()
        )?;
        if !self.commit {
            write!(f, " (commit disabled)")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(name: &str, outcome: DeviceOutcome) -> DeviceReport {
        DeviceReport {
            device: name.to_string(),
            device_id: Uuid::new_v4(),
            plans: 1,
            outcome,
            payload_digest: payload_digest("x"),
            result: None,
            error: None,
        }
    }

    #[test]
    fn test_from_push_table() {
        assert_eq!(DeviceOutcome::from_push(true, true), DeviceOutcome::Reverted);
        assert_eq!(DeviceOutcome::from_push(false, false), DeviceOutcome::NothingToDeploy);
        assert_eq!(DeviceOutcome::from_push(true, false), DeviceOutcome::Deployed);
        assert_eq!(DeviceOutcome::from_push(false, true), DeviceOutcome::Unexpected);
    }

    #[test]
    fn test_payload_digest() {
        assert_eq!(
            payload_digest(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_ne!(payload_digest("line1\nline2"), payload_digest("line2\nline1"));
    }

    #[test]
    fn test_summary_counts() {
        let summary = DeploymentSummary {
            job_id: Uuid::new_v4(),
            commit: true,
            devices: vec![
                report("r1", DeviceOutcome::Deployed),
                report("r2", DeviceOutcome::TransportFailed),
                report("r3", DeviceOutcome::NothingToDeploy),
            ],
        };
        assert_eq!(summary.succeeded(), 2);
        assert_eq!(summary.failed(), 1);
        assert_eq!(summary.count(DeviceOutcome::TransportFailed), 1);
        assert_eq!(summary.job_status(), JobStatus::Failed);
        assert_eq!(summary.to_string(), "3 device(s): 2 succeeded, 1 failed");
        assert!(summary.device("r2").is_some());
    }
}
