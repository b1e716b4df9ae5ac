//! Settings types for the deployment system.
//!
//! This module defines the structs that map to the `golden-config.yaml`
//! file. The settings are loaded once at process start, validated, and then
//! passed by reference to the components that need them.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use validator::Validate;

use crate::models::{AccessType, GitRepository, SecretType, NOT_APPROVED};

/// The root settings structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq, Validate)]
pub struct Settings {
    /// Deployment behaviour.
    #[serde(default)]
    #[validate(nested)]
    pub deploy: DeploySettings,
    /// Execution backend.
    #[serde(default)]
    #[validate(nested)]
    pub runner: RunnerSettings,
    /// Inventory construction.
    #[serde(default)]
    #[validate(nested)]
    pub inventory: InventorySettings,
    /// Maps platform network drivers to dispatch driver identifiers.
    #[serde(default)]
    pub platform_network_driver_map: HashMap<String, String>,
    /// Registered push drivers, keyed by driver identifier.
    #[serde(default)]
    pub drivers: BTreeMap<String, DriverConfig>,
    /// Secrets groups, keyed by group name.
    #[serde(default)]
    pub secrets_groups: BTreeMap<String, Vec<SecretAssociation>>,
    /// Configuration repositories.
    #[serde(default)]
    pub repositories: Vec<GitRepository>,
    /// Plan store location.
    #[serde(default)]
    pub store: StoreSettings,
}

/// Deployment behaviour.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Validate)]
pub struct DeploySettings {
    /// Whether runs push configuration to devices.
    #[serde(default = "default_commit")]
    pub commit: bool,
    /// Name of the default, unapproved plan status.
    #[serde(default = "default_not_approved_status")]
    #[validate(length(min = 1, message = "status name cannot be empty"))]
    pub not_approved_status: String,
    /// Upper bound on a single device push, in seconds.
    #[serde(default)]
    #[validate(range(min = 1, message = "push timeout must be at least one second"))]
    pub push_timeout_secs: Option<u64>,
}

/// Execution backend settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Validate)]
pub struct RunnerSettings {
    /// Scheduling strategy.
    #[serde(default)]
    pub strategy: RunnerStrategy,
    /// Maximum number of devices deployed concurrently.
    #[serde(default = "default_num_workers")]
    #[validate(range(min = 1, max = 1000, message = "num_workers must be between 1 and 1000"))]
    pub num_workers: usize,
}

/// Scheduling strategies.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum RunnerStrategy {
    /// One device at a time, in inventory order.
    Serial,
    /// Bounded parallelism across devices.
    #[default]
    Threaded,
}

/// Inventory construction settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Validate)]
pub struct InventorySettings {
    /// Where device credentials come from.
    #[serde(default)]
    pub credentials: CredentialsSource,
    /// Whether to test connectivity before pushing.
    #[serde(default)]
    pub connectivity_test: bool,
    /// Environment variable holding the device username.
    #[serde(default = "default_username_env")]
    #[validate(length(min = 1))]
    pub username_env: String,
    /// Environment variable holding the device password.
    #[serde(default = "default_password_env")]
    #[validate(length(min = 1))]
    pub password_env: String,
    /// Environment variable holding the privileged-mode secret.
    #[serde(default = "default_secret_env")]
    pub secret_env: String,
}

/// Credential sources.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum CredentialsSource {
    /// Environment variables named in [`InventorySettings`].
    #[default]
    Settings,
    /// The device's secrets group.
    SecretsGroup,
}

/// HTTP push driver parameters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DriverConfig {
    /// URL scheme (http or https).
    #[serde(default = "default_scheme")]
    pub scheme: String,
    /// Management API port; defaults to the scheme's port.
    #[serde(default)]
    pub port: Option<u16>,
    /// Configuration endpoint path.
    #[serde(default = "default_path")]
    pub path: String,
    /// Whether to verify TLS certificates.
    #[serde(default = "default_verify_tls")]
    pub verify_tls: bool,
    /// Request timeout in seconds.
    #[serde(default = "default_driver_timeout")]
    pub timeout_secs: u64,
}

/// One secret held by a secrets group.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SecretAssociation {
    /// Access type the secret applies to.
    pub access_type: AccessType,
    /// Kind of secret.
    pub secret_type: SecretType,
    /// Environment variable holding the value.
    pub env: String,
}

/// Plan store settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoreSettings {
    /// Path of the JSON data file.
    #[serde(default)]
    pub path: Option<String>,
}

impl Settings {
    /// Returns the effective number of workers for the runner.
    #[must_use]
    pub const fn effective_workers(&self) -> usize {
        match self.runner.strategy {
            RunnerStrategy::Serial => 1,
            RunnerStrategy::Threaded => self.runner.num_workers,
        }
    }
}

impl DriverConfig {
    /// Returns the configured port, or the scheme default.
    #[must_use]
    pub fn effective_port(&self) -> u16 {
        self.port
            .unwrap_or(if self.scheme == "http" { 80 } else { 443 })
    }
}

impl Default for DeploySettings {
    fn default() -> Self {
        Self {
            commit: default_commit(),
            not_approved_status: default_not_approved_status(),
            push_timeout_secs: None,
        }
    }
}

impl Default for RunnerSettings {
    fn default() -> Self {
        Self {
            strategy: RunnerStrategy::default(),
            num_workers: default_num_workers(),
        }
    }
}

impl Default for InventorySettings {
    fn default() -> Self {
        Self {
            credentials: CredentialsSource::default(),
            connectivity_test: false,
            username_env: default_username_env(),
            password_env: default_password_env(),
            secret_env: default_secret_env(),
        }
    }
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            scheme: default_scheme(),
            port: None,
            path: default_path(),
            verify_tls: default_verify_tls(),
            timeout_secs: default_driver_timeout(),
        }
    }
}

// Default value functions

const fn default_commit() -> bool {
    true
}

fn default_not_approved_status() -> String {
    NOT_APPROVED.to_string()
}

const fn default_num_workers() -> usize {
    20
}

fn default_username_env() -> String {
    String::from("DEVICE_USERNAME")
}

fn default_password_env() -> String {
    String::from("DEVICE_PASSWORD")
}

fn default_secret_env() -> String {
    String::from("DEVICE_SECRET")
}

fn default_scheme() -> String {
    String::from("https")
}

fn default_path() -> String {
    String::from("/api/config")
}

const fn default_verify_tls() -> bool {
    true
}

const fn default_driver_timeout() -> u64 {
    60
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serial_forces_single_worker() {
        let mut settings = Settings::default();
        settings.runner.num_workers = 8;
        assert_eq!(settings.effective_workers(), 8);

        settings.runner.strategy = RunnerStrategy::Serial;
        assert_eq!(settings.effective_workers(), 1);
    }

    #[test]
    fn test_driver_port_defaults_follow_scheme() {
        let mut driver = DriverConfig::default();
        assert_eq!(driver.effective_port(), 443);
        driver.scheme = String::from("http");
        assert_eq!(driver.effective_port(), 80);
        driver.port = Some(8443);
        assert_eq!(driver.effective_port(), 8443);
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert!(settings.deploy.commit);
        assert_eq!(settings.deploy.not_approved_status, "Not Approved");
        assert_eq!(settings.runner.num_workers, 20);
    }
}
