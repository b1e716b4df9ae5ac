//! Error types for the golden config deployment system.
//!
//! This module provides the error hierarchy for every stage of a deployment
//! run: settings, the plan store, driver dispatch, secrets, inventory
//! construction and the orchestration itself.

use std::path::PathBuf;
use thiserror::Error;

/// Diagnostic code prefixed to every orchestration-level failure.
pub const ORCHESTRATION_ERROR_CODE: &str = "E3011";

/// Message logged and raised when a plan set contains unapproved plans.
pub const NOT_APPROVED_MESSAGE: &str =
    "Cannot deploy configuration(s). One or more config plans are not approved.";

/// Message logged and raised when a plan set contains completed plans.
pub const ALREADY_COMPLETED_MESSAGE: &str =
    "Cannot deploy configuration(s). One or more config plans are already completed.";

/// The main error type for the golden config deployment system.
#[derive(Debug, Error)]
pub enum GoldenConfigError {
    /// Settings-related errors.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Plan store errors.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Driver dispatch errors.
    #[error("Dispatch error: {0}")]
    Dispatch(#[from] DispatchError),

    /// Secret resolution errors.
    #[error("Secret error: {0}")]
    Secret(#[from] SecretError),

    /// Inventory construction errors.
    #[error("Inventory error: {0}")]
    Inventory(#[from] InventoryError),

    /// Deployment errors.
    #[error("Deployment error: {0}")]
    Deploy(#[from] DeployError),

    /// IO errors.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Settings-related errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The settings file was not found.
    #[error("Configuration file not found: {path}")]
    FileNotFound {
        /// Path to the missing file.
        path: PathBuf,
    },

    /// The settings file could not be parsed.
    #[error("Failed to parse configuration: {message}")]
    ParseError {
        /// Description of the parse error.
        message: String,
        /// Optional source location.
        location: Option<String>,
    },

    /// Validation failed.
    #[error("Configuration validation failed: {message}")]
    ValidationError {
        /// Description of the validation error.
        message: String,
        /// Field that failed validation.
        field: Option<String>,
    },

    /// Environment variable is missing.
    #[error("Missing environment variable: {name}")]
    MissingEnvVar {
        /// Name of the missing variable.
        name: String,
    },
}

/// Plan store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Data file is corrupted.
    #[error("Store data is corrupted: {message}")]
    Corrupted {
        /// Description of the corruption.
        message: String,
    },

    /// Reading or writing the data file failed.
    #[error("Store IO failure: {message}")]
    Io {
        /// Description of the failure.
        message: String,
    },

    /// Run lock acquisition failed.
    #[error("Failed to acquire run lock: {message}")]
    LockFailed {
        /// Description of the lock failure.
        message: String,
    },

    /// Run lock is held by another process.
    #[error("Store is locked by another run (lock holder: {holder}, since: {since})")]
    LockedByOther {
        /// Identifier of the lock holder.
        holder: String,
        /// When the lock was acquired.
        since: String,
    },

    /// Serialization error.
    #[error("Store serialization error: {message}")]
    SerializationError {
        /// Description of the serialization error.
        message: String,
    },

    /// A status name is missing from the registry.
    #[error("Status not found: {name}")]
    StatusNotFound {
        /// Name that was looked up.
        name: String,
    },

    /// A device reference could not be resolved.
    #[error("Device not found: {reference}")]
    DeviceNotFound {
        /// Device name or id.
        reference: String,
    },

    /// A config plan id could not be resolved.
    #[error("Config plan not found: {id}")]
    PlanNotFound {
        /// Plan id.
        id: String,
    },
}

/// Driver dispatch errors.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// No driver is registered under this identifier.
    #[error("Unknown driver '{driver}'")]
    UnknownDriver {
        /// The requested driver identifier.
        driver: String,
    },

    /// Transport-level failure talking to the device.
    #[error("Transport failure on {device}: {message}")]
    Transport {
        /// Device name.
        device: String,
        /// Description of the failure.
        message: String,
    },

    /// The device management API rejected the request.
    #[error("Driver request failed on {device}: {status} - {message}")]
    Driver {
        /// Device name.
        device: String,
        /// HTTP status code.
        status: u16,
        /// Error body returned by the device.
        message: String,
    },

    /// The device answered with something that is not a push result.
    #[error("Invalid response from {device}: {message}")]
    InvalidResponse {
        /// Device name.
        device: String,
        /// Description of the response issue.
        message: String,
    },

    /// The connectivity test failed before the push.
    #[error("Connectivity check failed for {device}: {message}")]
    ConnectivityFailed {
        /// Device name.
        device: String,
        /// Description of the failure.
        message: String,
    },

    /// The push did not complete in time.
    #[error("Timed out after {secs}s pushing configuration to {device}")]
    Timeout {
        /// Device name.
        device: String,
        /// Configured timeout in seconds.
        secs: u64,
    },
}

/// Secret resolution errors.
#[derive(Debug, Error)]
pub enum SecretError {
    /// The secrets group has no association for this access/secret type.
    #[error("Secrets group '{group}' has no {access_type}/{secret_type} association")]
    AssociationNotFound {
        /// Secrets group name.
        group: String,
        /// Requested access type.
        access_type: String,
        /// Requested secret type.
        secret_type: String,
    },

    /// The secrets group is not defined.
    #[error("Secrets group not found: {group}")]
    GroupNotFound {
        /// Secrets group name.
        group: String,
    },

    /// The association exists but its value cannot be read.
    #[error("Secret value unavailable in group '{group}': {message}")]
    ValueUnavailable {
        /// Secrets group name.
        group: String,
        /// Description of the failure.
        message: String,
    },
}

/// Inventory construction errors.
#[derive(Debug, Error)]
pub enum InventoryError {
    /// The device has no platform assigned.
    #[error("Device {device} has no platform assigned")]
    MissingPlatform {
        /// Device name.
        device: String,
    },

    /// The device platform maps to a driver that is not registered.
    #[error("Device {device} uses unregistered driver '{driver}'")]
    UnresolvedDriver {
        /// Device name.
        device: String,
        /// Driver identifier derived from the platform.
        driver: String,
    },

    /// Credentials could not be assembled for the device.
    #[error("Missing {field} credential for device {device}")]
    MissingCredentials {
        /// Device name.
        device: String,
        /// Credential field (username, password).
        field: String,
    },
}

/// Deployment errors.
#[derive(Debug, Error)]
pub enum DeployError {
    /// At least one selected plan still has the default, unapproved status.
    #[error("{}", NOT_APPROVED_MESSAGE)]
    PlansNotApproved,

    /// At least one selected plan is already completed.
    #[error("{}", ALREADY_COMPLETED_MESSAGE)]
    PlansAlreadyCompleted,

    /// A per-device task terminated abnormally.
    #[error("Deployment task for {device} aborted: {message}")]
    TaskAborted {
        /// Device name.
        device: String,
        /// Panic or cancellation message.
        message: String,
    },

    /// Infrastructure failure wrapped at the orchestrator boundary.
    #[error("{code}: {message}", code = ORCHESTRATION_ERROR_CODE)]
    Orchestration {
        /// Message of the underlying failure.
        message: String,
    },
}

/// Result type alias for golden config operations.
pub type Result<T> = std::result::Result<T, GoldenConfigError>;

impl GoldenConfigError {
    /// Creates a new internal error with the given message.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Returns true if this error is a precondition violation on the plan set.
    #[must_use]
    pub const fn is_precondition_violation(&self) -> bool {
        matches!(
            self,
            Self::Deploy(DeployError::PlansNotApproved | DeployError::PlansAlreadyCompleted)
        )
    }
}

impl ConfigError {
    /// Creates a validation error for a specific field.
    #[must_use]
    pub fn validation(message: impl Into<String>, field: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Creates a validation error without a specific field.
    #[must_use]
    pub fn validation_general(message: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
            field: None,
        }
    }
}

impl StoreError {
    /// Creates an IO error with the given message.
    #[must_use]
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
        }
    }

    /// Creates a serialization error with the given message.
    #[must_use]
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::SerializationError {
            message: message.into(),
        }
    }
}

impl DispatchError {
    /// Creates a transport error.
    #[must_use]
    pub fn transport(device: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Transport {
            device: device.into(),
            message: message.into(),
        }
    }
}

impl DeployError {
    /// Wraps an infrastructure failure with the orchestration error code.
    #[must_use]
    pub fn orchestration(message: impl Into<String>) -> Self {
        Self::Orchestration {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_orchestration_error_carries_code() {
        let err = DeployError::orchestration("inventory exploded");
        assert_eq!(err.to_string(), "E3011: inventory exploded");
    }

    #[test]
    fn test_precondition_messages_are_distinct() {
        let not_approved = DeployError::PlansNotApproved.to_string();
        let completed = DeployError::PlansAlreadyCompleted.to_string();
        assert_ne!(not_approved, completed);
        assert!(not_approved.contains("not approved"));
        assert!(completed.contains("already completed"));
    }

    #[test]
    fn test_precondition_classification() {
        let violation: GoldenConfigError = DeployError::PlansNotApproved.into();
        assert!(violation.is_precondition_violation());

        let completed: GoldenConfigError = DeployError::PlansAlreadyCompleted.into();
        assert!(completed.is_precondition_violation());

        let transport: GoldenConfigError = DispatchError::transport("r1", "reset").into();
        assert!(!transport.is_precondition_violation());
    }
}
