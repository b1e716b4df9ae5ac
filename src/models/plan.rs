//! Config plans and plan sets.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

use super::status::Status;

/// Kind of a config plan.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum PlanType {
    /// Full intended configuration.
    Intended,
    /// Configuration missing from the device.
    Missing,
    /// Remediation generated from compliance results.
    #[default]
    Remediation,
    /// Hand-written configuration.
    Manual,
}

/// One unit of proposed configuration change for exactly one device.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConfigPlan {
    /// Unique identifier.
    pub id: Uuid,
    /// Owning device id.
    pub device: Uuid,
    /// Plan kind.
    #[serde(default)]
    pub plan_type: PlanType,
    /// Rendered configuration fragment.
    pub config_set: String,
    /// Status record id.
    pub status: Uuid,
    /// Job result that performed or attempted the deployment.
    #[serde(default)]
    pub deploy_result: Option<Uuid>,
    /// Change control ticket identifier.
    #[serde(default)]
    pub change_control_id: Option<String>,
    /// Change control ticket URL.
    #[serde(default)]
    pub change_control_url: Option<String>,
    /// Compliance features the plan remediates.
    #[serde(default)]
    pub features: Vec<String>,
    /// When the plan was generated.
    pub created: DateTime<Utc>,
}

/// An ordered snapshot of selected config plans.
///
/// Plans keep their retrieval order; per-device views preserve it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct PlanSet {
    plans: Vec<ConfigPlan>,
}

impl ConfigPlan {
    /// Creates a plan for a device with the given status.
    #[must_use]
    pub fn new(device: Uuid, plan_type: PlanType, config_set: &str, status: &Status) -> Self {
        Self {
            id: Uuid::new_v4(),
            device,
            plan_type,
            config_set: config_set.to_string(),
            status: status.id,
            deploy_result: None,
            change_control_id: None,
            change_control_url: None,
            features: Vec::new(),
            created: Utc::now(),
        }
    }

    /// Sets the change control identifier.
    #[must_use]
    pub fn with_change_control(mut self, id: &str) -> Self {
        self.change_control_id = Some(id.to_string());
        self
    }
}

impl PlanSet {
    /// Creates a plan set from plans in retrieval order.
    #[must_use]
    pub const fn new(plans: Vec<ConfigPlan>) -> Self {
        Self { plans }
    }

    /// Returns true if the set is empty.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.plans.is_empty()
    }

    /// Returns the number of plans.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.plans.len()
    }

    /// Iterates over the plans.
    pub fn iter(&self) -> impl Iterator<Item = &ConfigPlan> {
        self.plans.iter()
    }

    /// Returns the plan ids.
    #[must_use]
    pub fn ids(&self) -> Vec<Uuid> {
        self.plans.iter().map(|p| p.id).collect()
    }

    /// Returns the plans owned by one device.
    pub fn for_device(&self, device: Uuid) -> impl Iterator<Item = &ConfigPlan> {
        self.plans.iter().filter(move |p| p.device == device)
    }

    /// Returns the distinct device ids, in order of first appearance.
    #[must_use]
    pub fn device_ids(&self) -> Vec<Uuid> {
        let mut seen = HashSet::new();
        self.plans
            .iter()
            .filter(|p| seen.insert(p.device))
            .map(|p| p.device)
            .collect()
    }

    /// Returns true if any plan has the given status.
    #[must_use]
    pub fn any_with_status(&self, status: &Status) -> bool {
        self.plans.iter().any(|p| p.status == status.id)
    }
}

impl From<Vec<ConfigPlan>> for PlanSet {
    fn from(plans: Vec<ConfigPlan>) -> Self {
        Self::new(plans)
    }
}

impl std::fmt::Display for PlanType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Intended => "intended",
            Self::Missing => "missing",
            Self::Remediation => "remediation",
            Self::Manual => "manual",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for PlanType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "intended" => Ok(Self::Intended),
            "missing" => Ok(Self::Missing),
            "remediation" => Ok(Self::Remediation),
            "manual" => Ok(Self::Manual),
            _ => Err(format!("Invalid plan type: {s}")),
        }
    }
}
