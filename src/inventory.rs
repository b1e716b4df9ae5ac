//! Device-scoped inventory.
//!
//! An inventory holds one host per device implicated in a run. Each host
//! carries its device record, resolved dispatch driver, credentials and
//! the defaults shared by the whole inventory.

use chrono::{DateTime, FixedOffset, Local};
use std::sync::Arc;
use tracing::{debug, info};

use crate::credentials::{Credentials, CredentialsProvider};
use crate::dispatch::DriverRegistry;
use crate::error::{InventoryError, Result};
use crate::models::Device;

/// Values shared by every host in an inventory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InventoryDefaults {
    /// Wall-clock time, with its UTC offset, when the inventory was built.
    pub now: DateTime<FixedOffset>,
}

impl InventoryDefaults {
    /// Captures the current local time.
    #[must_use]
    pub fn now() -> Self {
        Self {
            now: Local::now().fixed_offset(),
        }
    }
}

impl Default for InventoryDefaults {
    fn default() -> Self {
        Self::now()
    }
}

/// One device in an inventory.
#[derive(Debug)]
pub struct Host {
    device: Device,
    hostname: String,
    driver: String,
    credentials: Credentials,
    defaults: Arc<InventoryDefaults>,
}

impl Host {
    /// Creates a host for a device and its dispatch driver.
    #[must_use]
    pub fn new(device: Device, driver: &str, credentials: Credentials, defaults: Arc<InventoryDefaults>) -> Self {
        let hostname = device.management_host().to_string();
        Self {
            device,
            hostname,
            driver: driver.to_string(),
            credentials,
            defaults,
        }
    }

    /// Device name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.device.name
    }

    /// Device record.
    #[must_use]
    pub const fn device(&self) -> &Device {
        &self.device
    }

    /// Address used to reach the device.
    #[must_use]
    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    /// Platform network driver, empty when the device has no platform.
    #[must_use]
    pub fn network_driver(&self) -> &str {
        self.device.network_driver().unwrap_or_default()
    }

    /// Dispatch driver identifier.
    #[must_use]
    pub fn driver(&self) -> &str {
        &self.driver
    }

    /// Login material.
    #[must_use]
    pub const fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Inventory-wide defaults.
    #[must_use]
    pub fn defaults(&self) -> &InventoryDefaults {
        &self.defaults
    }
}

/// Hosts for one deployment run.
#[derive(Debug)]
pub struct Inventory {
    hosts: Vec<Host>,
    defaults: Arc<InventoryDefaults>,
}

impl Inventory {
    /// Builds an inventory from devices.
    ///
    /// # Errors
    ///
    /// Fails if a device has no platform, if its platform does not resolve
    /// to a registered driver, or if its credentials cannot be found.
    pub fn build(
        devices: Vec<Device>,
        credentials: &dyn CredentialsProvider,
        registry: &DriverRegistry,
        defaults: InventoryDefaults,
    ) -> Result<Self> {
        let defaults = Arc::new(defaults);
        let mut hosts = Vec::with_capacity(devices.len());

        for device in devices {
            let network_driver = device
                .network_driver()
                .ok_or_else(|| InventoryError::MissingPlatform {
                    device: device.name.clone(),
                })?;

            let driver = registry.get_platform(network_driver).to_string();
            if !registry.contains(&driver) {
                return Err(InventoryError::UnresolvedDriver {
                    device: device.name.clone(),
                    driver,
                }
                .into());
            }

            let login = credentials.credentials_for(&device)?;
            debug!("Adding {} to inventory with driver {driver}", device.name);
            hosts.push(Host::new(device, &driver, login, Arc::clone(&defaults)));
        }

        info!("Built inventory with {} host(s)", hosts.len());
        Ok(Self { hosts, defaults })
    }

    /// Returns the hosts.
    #[must_use]
    pub fn hosts(&self) -> &[Host] {
        &self.hosts
    }

    /// Returns the number of hosts.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.hosts.len()
    }

    /// Returns true if the inventory has no hosts.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }

    /// Returns the inventory-wide defaults.
    #[must_use]
    pub fn defaults(&self) -> &InventoryDefaults {
        &self.defaults
    }

    /// Consumes the inventory and returns its hosts.
    #[must_use]
    pub fn into_hosts(self) -> Vec<Host> {
        self.hosts
    }
}
