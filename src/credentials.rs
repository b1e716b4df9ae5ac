//! Device credentials providers.
//!
//! The inventory asks a provider for the login of every device it
//! contains. Two providers exist: one reading fixed environment variables
//! and one resolving the device's secrets group.

use secrecy::{ExposeSecret, SecretString};
use std::sync::Arc;
use tracing::debug;

use crate::config::{CredentialsSource, InventorySettings, Settings};
use crate::error::{InventoryError, Result};
use crate::models::{Device, SecretType};
use crate::secrets::SecretResolver;

/// Login material for one device.
#[derive(Debug)]
pub struct Credentials {
    /// Login name.
    pub username: String,
    /// Login password.
    pub password: SecretString,
    /// Privileged-mode secret, if any.
    pub secret: Option<SecretString>,
}

/// Supplies credentials for devices.
pub trait CredentialsProvider: Send + Sync {
    /// Returns the credentials for a device.
    ///
    /// # Errors
    ///
    /// Returns `InventoryError::MissingCredentials` when the username or
    /// password cannot be found.
    fn credentials_for(&self, device: &Device) -> Result<Credentials>;
}

/// Credentials shared by every device, read from environment variables.
#[derive(Debug, Clone)]
pub struct SettingsCredentials {
    username_env: String,
    password_env: String,
    secret_env: String,
}

impl SettingsCredentials {
    /// Creates a provider reading the variables named in the settings.
    #[must_use]
    pub fn new(settings: &InventorySettings) -> Self {
        Self {
            username_env: settings.username_env.clone(),
            password_env: settings.password_env.clone(),
            secret_env: settings.secret_env.clone(),
        }
    }

    fn read(name: &str) -> Option<String> {
        std::env::var(name).ok().filter(|v| !v.is_empty())
    }
}

impl CredentialsProvider for SettingsCredentials {
    fn credentials_for(&self, device: &Device) -> Result<Credentials> {
        let missing = |field: &str| InventoryError::MissingCredentials {
            device: device.name.clone(),
            field: field.to_string(),
        };

        let username = Self::read(&self.username_env).ok_or_else(|| missing("username"))?;
        let password = Self::read(&self.password_env).ok_or_else(|| missing("password"))?;
        let secret = Self::read(&self.secret_env).map(SecretString::from);

        Ok(Credentials {
            username,
            password: SecretString::from(password),
            secret,
        })
    }
}

/// Credentials resolved from each device's secrets group.
#[derive(Debug, Clone)]
pub struct SecretsGroupCredentials {
    resolver: SecretResolver,
}

impl SecretsGroupCredentials {
    /// Creates a provider over a secret resolver.
    #[must_use]
    pub const fn new(resolver: SecretResolver) -> Self {
        Self { resolver }
    }
}

impl CredentialsProvider for SecretsGroupCredentials {
    fn credentials_for(&self, device: &Device) -> Result<Credentials> {
        let missing = |field: &str| InventoryError::MissingCredentials {
            device: device.name.clone(),
            field: field.to_string(),
        };

        let username = self
            .resolver
            .resolve(SecretType::Username, device)?
            .ok_or_else(|| missing("username"))?;
        let password = self
            .resolver
            .resolve(SecretType::Password, device)?
            .ok_or_else(|| missing("password"))?;
        let secret = self.resolver.resolve(SecretType::Secret, device)?;

        debug!("Resolved credentials for {} from its secrets group", device.name);
        Ok(Credentials {
            username: username.expose_secret().to_string(),
            password,
            secret,
        })
    }
}

/// Builds the provider selected in the settings.
#[must_use]
pub fn provider_from_settings(settings: &Settings, resolver: &SecretResolver) -> Arc<dyn CredentialsProvider> {
    match settings.inventory.credentials {
        CredentialsSource::Settings => Arc::new(SettingsCredentials::new(&settings.inventory)),
        CredentialsSource::SecretsGroup => Arc::new(SecretsGroupCredentials::new(resolver.clone())),
    }
}
