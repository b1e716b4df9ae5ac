//! Driver registry.
//!
//! Maps a device's platform network driver to a registered push driver.
//! Lookups of unknown identifiers fail at resolution time.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::debug;

use crate::config::Settings;
use crate::error::{DispatchError, Result};

use super::driver::ConfigDriver;
use super::http::HttpPushDriver;

/// Registry from driver identifier to driver.
#[derive(Clone, Default)]
pub struct DriverRegistry {
    drivers: BTreeMap<String, Arc<dyn ConfigDriver>>,
    platform_map: HashMap<String, String>,
}

impl DriverRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the platform network driver map.
    #[must_use]
    pub fn with_platform_map(mut self, platform_map: HashMap<String, String>) -> Self {
        self.platform_map = platform_map;
        self
    }

    /// Registers a driver under an identifier, replacing any previous one.
    pub fn register(&mut self, driver_id: impl Into<String>, driver: Arc<dyn ConfigDriver>) {
        let driver_id = driver_id.into();
        debug!("Registering driver: {driver_id}");
        self.drivers.insert(driver_id, driver);
    }

    /// Builds the registry described by the settings, with one HTTP push
    /// driver per configured entry.
    ///
    /// # Errors
    ///
    /// Returns an error if an HTTP client cannot be created.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let mut registry = Self::new().with_platform_map(settings.platform_network_driver_map.clone());
        for (driver_id, config) in &settings.drivers {
            registry.register(driver_id.clone(), Arc::new(HttpPushDriver::new(config)?));
        }
        Ok(registry)
    }

    /// Maps a platform network driver to its dispatch driver identifier.
    ///
    /// Unmapped values are returned unchanged.
    #[must_use]
    pub fn get_platform<'a>(&'a self, network_driver: &'a str) -> &'a str {
        self.platform_map
            .get(network_driver)
            .map_or(network_driver, String::as_str)
    }

    /// Returns the driver registered under an identifier.
    ///
    /// # Errors
    ///
    /// Returns `DispatchError::UnknownDriver` if nothing is registered.
    pub fn resolve(&self, driver_id: &str) -> std::result::Result<Arc<dyn ConfigDriver>, DispatchError> {
        self.drivers
            .get(driver_id)
            .cloned()
            .ok_or_else(|| DispatchError::UnknownDriver {
                driver: driver_id.to_string(),
            })
    }

    /// Returns the registered identifiers.
    pub fn driver_ids(&self) -> impl Iterator<Item = &str> {
        self.drivers.keys().map(String::as_str)
    }

    /// Returns true if an identifier is registered.
    #[must_use]
    pub fn contains(&self, driver_id: &str) -> bool {
        self.drivers.contains_key(driver_id)
    }
}

impl std::fmt::Debug for DriverRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DriverRegistry")
            .field("drivers", &self.drivers.keys().collect::<Vec<_>>())
            .field("platform_map", &self.platform_map)
            .finish()
    }
}
