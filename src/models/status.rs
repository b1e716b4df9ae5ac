//! Shared status registry.
//!
//! Statuses are records shared by reference: plans hold a status id and
//! the registry resolves names to records.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Default status of a freshly generated plan.
pub const NOT_APPROVED: &str = "Not Approved";

/// Status of a plan cleared for deployment.
pub const APPROVED: &str = "Approved";

/// Status of a plan whose deployment has started.
pub const IN_PROGRESS: &str = "In Progress";

/// Status of a plan that was deployed.
pub const COMPLETED: &str = "Completed";

/// Status of a plan whose deployment failed.
pub const FAILED: &str = "Failed";

/// Statuses seeded into every new registry.
const DEFAULT_STATUSES: &[&str] = &[NOT_APPROVED, APPROVED, IN_PROGRESS, COMPLETED, FAILED];

/// A status record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Status {
    /// Unique identifier.
    pub id: Uuid,
    /// Display name, unique within the registry.
    pub name: String,
}

/// Registry of known statuses.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct StatusRegistry {
    statuses: Vec<Status>,
}

impl Status {
    /// Creates a status with a fresh id.
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
        }
    }
}

impl StatusRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            statuses: Vec::new(),
        }
    }

    /// Creates a registry seeded with the deployment statuses.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self {
            statuses: DEFAULT_STATUSES.iter().map(|name| Status::new(name)).collect(),
        }
    }

    /// Looks a status up by name.
    #[must_use]
    pub fn get_by_name(&self, name: &str) -> Option<&Status> {
        self.statuses.iter().find(|s| s.name == name)
    }

    /// Looks a status up by id.
    #[must_use]
    pub fn get(&self, id: Uuid) -> Option<&Status> {
        self.statuses.iter().find(|s| s.id == id)
    }

    /// Returns the name of the status with this id.
    #[must_use]
    pub fn name_of(&self, id: Uuid) -> Option<&str> {
        self.get(id).map(|s| s.name.as_str())
    }

    /// Returns the status with this name, registering it first if needed.
    pub fn ensure(&mut self, name: &str) -> Status {
        if let Some(existing) = self.get_by_name(name) {
            return existing.clone();
        }
        let status = Status::new(name);
        self.statuses.push(status.clone());
        status
    }

    /// Iterates over all statuses.
    pub fn iter(&self) -> impl Iterator<Item = &Status> {
        self.statuses.iter()
    }

    /// Returns the number of registered statuses.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.statuses.len()
    }

    /// Returns true if no status is registered.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.statuses.is_empty()
    }
}

impl Default for StatusRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}
