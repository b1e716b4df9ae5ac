//! Git-backed configuration repositories.

use serde::{Deserialize, Serialize};

/// A git repository holding backup, intended or template configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GitRepository {
    /// Repository name.
    pub name: String,
    /// Remote URL.
    pub remote_url: String,
    /// Secrets group holding the HTTP token.
    #[serde(default)]
    pub secrets_group: Option<String>,
}

impl GitRepository {
    /// Creates a repository without a secrets group.
    #[must_use]
    pub fn new(name: &str, remote_url: &str) -> Self {
        Self {
            name: name.to_string(),
            remote_url: remote_url.to_string(),
            secrets_group: None,
        }
    }

    /// Sets the secrets group.
    #[must_use]
    pub fn with_secrets_group(mut self, group: &str) -> Self {
        self.secrets_group = Some(group.to_string());
        self
    }
}
