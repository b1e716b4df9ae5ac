//! Secret resolution.
//!
//! Secrets groups associate (access type, secret type) pairs with stored
//! values. Repositories and devices name a secrets group; the resolver
//! looks a value up for them and reports a missing association as absence.

use secrecy::SecretString;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

use crate::config::{SecretAssociation, Settings};
use crate::error::{Result, SecretError};
use crate::models::{AccessType, Device, GitRepository, SecretType};

/// Source of secret values.
#[cfg_attr(test, mockall::automock)]
pub trait SecretsBackend: Send + Sync {
    /// Returns the value held by `group` for the access/secret type pair.
    ///
    /// # Errors
    ///
    /// Returns `SecretError::AssociationNotFound` when the group has no
    /// such association and other variants when the value cannot be read.
    fn get_secret_value(
        &self,
        group: &str,
        access_type: AccessType,
        secret_type: SecretType,
    ) -> std::result::Result<SecretString, SecretError>;
}

/// Anything that names a secrets group.
pub trait SecretsOwner {
    /// Secrets group name, if one is assigned.
    fn secrets_group(&self) -> Option<&str>;

    /// Access type used when resolving secrets for this owner.
    fn access_type(&self) -> AccessType;
}

impl SecretsOwner for GitRepository {
    fn secrets_group(&self) -> Option<&str> {
        self.secrets_group.as_deref()
    }

    fn access_type(&self) -> AccessType {
        AccessType::Http
    }
}

impl SecretsOwner for Device {
    fn secrets_group(&self) -> Option<&str> {
        self.secrets_group.as_deref()
    }

    fn access_type(&self) -> AccessType {
        AccessType::Generic
    }
}

/// Secrets backend reading values from environment variables.
#[derive(Debug, Clone, Default)]
pub struct EnvSecretsBackend {
    groups: BTreeMap<String, Vec<SecretAssociation>>,
}

impl EnvSecretsBackend {
    /// Creates a backend from the configured secrets groups.
    #[must_use]
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            groups: settings.secrets_groups.clone(),
        }
    }
}

impl SecretsBackend for EnvSecretsBackend {
    fn get_secret_value(
        &self,
        group: &str,
        access_type: AccessType,
        secret_type: SecretType,
    ) -> std::result::Result<SecretString, SecretError> {
        let associations = self.groups.get(group).ok_or_else(|| SecretError::GroupNotFound {
            group: group.to_string(),
        })?;

        let association = associations
            .iter()
            .find(|a| a.access_type == access_type && a.secret_type == secret_type)
            .ok_or_else(|| SecretError::AssociationNotFound {
                group: group.to_string(),
                access_type: access_type.to_string(),
                secret_type: secret_type.to_string(),
            })?;

        std::env::var(&association.env)
            .map(SecretString::from)
            .map_err(|e| SecretError::ValueUnavailable {
                group: group.to_string(),
                message: format!("{}: {e}", association.env),
            })
    }
}

/// Resolves secrets for repositories and devices.
#[derive(Clone)]
pub struct SecretResolver {
    backend: Arc<dyn SecretsBackend>,
}

impl SecretResolver {
    /// Creates a resolver over a backend.
    #[must_use]
    pub fn new(backend: Arc<dyn SecretsBackend>) -> Self {
        Self { backend }
    }

    /// Creates a resolver over the environment backend.
    #[must_use]
    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(Arc::new(EnvSecretsBackend::from_settings(settings)))
    }

    /// Resolves one secret for an owner.
    ///
    /// Returns `Ok(None)` when the owner has no secrets group or the group
    /// has no matching association.
    ///
    /// # Errors
    ///
    /// Returns an error if the group does not exist or the value cannot
    /// be read.
    pub fn resolve(&self, secret_type: SecretType, owner: &dyn SecretsOwner) -> Result<Option<SecretString>> {
        let Some(group) = owner.secrets_group() else {
            return Ok(None);
        };

        match self
            .backend
            .get_secret_value(group, owner.access_type(), secret_type)
        {
            Ok(value) => Ok(Some(value)),
            Err(SecretError::AssociationNotFound { .. }) => {
                debug!("No {secret_type} association in secrets group {group}");
                Ok(None)
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Resolves the HTTP token of a repository.
    ///
    /// # Errors
    ///
    /// See [`SecretResolver::resolve`].
    pub fn repository_token(&self, repository: &GitRepository) -> Result<Option<SecretString>> {
        self.resolve(SecretType::Token, repository)
    }
}

impl std::fmt::Debug for SecretResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretResolver").finish_non_exhaustive()
    }
}
