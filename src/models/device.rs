//! Devices and platforms.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A device platform as recorded in the source of truth.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Platform {
    /// Platform name (e.g. "Cisco IOS").
    pub name: String,
    /// Network driver identifier (e.g. "cisco_ios").
    pub network_driver: String,
}

/// A network device.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Device {
    /// Unique identifier.
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    /// Device name.
    pub name: String,
    /// Assigned platform.
    #[serde(default)]
    pub platform: Option<Platform>,
    /// Primary management address, optionally with a prefix length.
    #[serde(default)]
    pub primary_ip: Option<String>,
    /// Device role.
    #[serde(default)]
    pub role: Option<String>,
    /// Location name.
    #[serde(default)]
    pub location: Option<String>,
    /// Tenant name.
    #[serde(default)]
    pub tenant: Option<String>,
    /// Secrets group holding the device credentials.
    #[serde(default)]
    pub secrets_group: Option<String>,
}

impl Device {
    /// Creates a device with only a name.
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            platform: None,
            primary_ip: None,
            role: None,
            location: None,
            tenant: None,
            secrets_group: None,
        }
    }

    /// Sets the platform.
    #[must_use]
    pub fn with_platform(mut self, name: &str, network_driver: &str) -> Self {
        self.platform = Some(Platform {
            name: name.to_string(),
            network_driver: network_driver.to_string(),
        });
        self
    }

    /// Sets the primary management address.
    #[must_use]
    pub fn with_primary_ip(mut self, address: &str) -> Self {
        self.primary_ip = Some(address.to_string());
        self
    }

    /// Sets the secrets group.
    #[must_use]
    pub fn with_secrets_group(mut self, group: &str) -> Self {
        self.secrets_group = Some(group.to_string());
        self
    }

    /// Returns the platform network driver, if a platform is assigned.
    #[must_use]
    pub fn network_driver(&self) -> Option<&str> {
        self.platform.as_ref().map(|p| p.network_driver.as_str())
    }

    /// Returns the address used to reach the device.
    ///
    /// The prefix length of the primary address is dropped; devices without
    /// a primary address are reached by name.
    #[must_use]
    pub fn management_host(&self) -> &str {
        self.primary_ip
            .as_deref()
            .and_then(|ip| ip.split('/').next())
            .filter(|ip| !ip.is_empty())
            .unwrap_or(self.name.as_str())
    }
}

impl std::fmt::Display for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}
