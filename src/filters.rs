//! Config plan filter set.
//!
//! Values inside one field are alternatives; populated fields must all
//! match. Empty fields and a blank search string are ignored.

use serde::{Deserialize, Serialize};

use crate::models::{ConfigPlan, Device, PlanType};

/// Selection criteria for config plans.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigPlanFilter {
    /// Case-insensitive substring search on the device name.
    pub q: Option<String>,
    /// Device names or ids.
    pub device: Vec<String>,
    /// Platform names or network drivers.
    pub platform: Vec<String>,
    /// Status names.
    pub status: Vec<String>,
    /// Device roles.
    pub role: Vec<String>,
    /// Device locations.
    pub location: Vec<String>,
    /// Device tenants.
    pub tenant: Vec<String>,
    /// Plan types.
    pub plan_type: Vec<PlanType>,
    /// Change control identifiers.
    pub change_control_id: Vec<String>,
    /// Plan ids.
    pub id: Vec<String>,
}

impl ConfigPlanFilter {
    /// Creates a filter that matches every plan.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the search string.
    #[must_use]
    pub fn with_search(mut self, q: &str) -> Self {
        self.q = Some(q.to_string());
        self
    }

    /// Adds a device name or id.
    #[must_use]
    pub fn with_device(mut self, device: &str) -> Self {
        self.device.push(device.to_string());
        self
    }

    /// Adds a status name.
    #[must_use]
    pub fn with_status(mut self, status: &str) -> Self {
        self.status.push(status.to_string());
        self
    }

    /// Adds a plan type.
    #[must_use]
    pub fn with_plan_type(mut self, plan_type: PlanType) -> Self {
        self.plan_type.push(plan_type);
        self
    }

    /// Returns true if no criterion is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.search().is_none()
            && self.device.is_empty()
            && self.platform.is_empty()
            && self.status.is_empty()
            && self.role.is_empty()
            && self.location.is_empty()
            && self.tenant.is_empty()
            && self.plan_type.is_empty()
            && self.change_control_id.is_empty()
            && self.id.is_empty()
    }

    /// Returns the trimmed search string, if it is not blank.
    fn search(&self) -> Option<&str> {
        self.q.as_deref().map(str::trim).filter(|q| !q.is_empty())
    }

    /// Checks a plan against every populated criterion.
    ///
    /// `device` is the plan's device and `status_name` the name of its
    /// status; a criterion that needs a missing value does not match.
    #[must_use]
    pub fn matches(&self, plan: &ConfigPlan, device: Option<&Device>, status_name: Option<&str>) -> bool {
        if let Some(q) = self.search() {
            let needle = q.to_lowercase();
            if !device.is_some_and(|d| d.name.to_lowercase().contains(&needle)) {
                return false;
            }
        }

        if !self.device.is_empty()
            && !device.is_some_and(|d| {
                let id = d.id.to_string();
                self.device.iter().any(|v| *v == d.name || *v == id)
            })
        {
            return false;
        }

        if !self.platform.is_empty()
            && !device.and_then(|d| d.platform.as_ref()).is_some_and(|p| {
                self.platform
                    .iter()
                    .any(|v| *v == p.name || *v == p.network_driver)
            })
        {
            return false;
        }

        if !self.status.is_empty()
            && !status_name.is_some_and(|name| self.status.iter().any(|v| v == name))
        {
            return false;
        }

        if !any_of(&self.role, device.and_then(|d| d.role.as_deref()))
            || !any_of(&self.location, device.and_then(|d| d.location.as_deref()))
            || !any_of(&self.tenant, device.and_then(|d| d.tenant.as_deref()))
            || !any_of(&self.change_control_id, plan.change_control_id.as_deref())
        {
            return false;
        }

        if !self.plan_type.is_empty() && !self.plan_type.contains(&plan.plan_type) {
            return false;
        }

        if !self.id.is_empty() {
            let id = plan.id.to_string();
            if !self.id.iter().any(|v| *v == id) {
                return false;
            }
        }

        true
    }
}

/// An empty criterion matches anything; otherwise the value must be listed.
fn any_of(criterion: &[String], value: Option<&str>) -> bool {
    criterion.is_empty() || value.is_some_and(|value| criterion.iter().any(|v| v == value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Status;

    fn fixture() -> (ConfigPlan, Device) {
        let mut device = Device::new("Edge-Router-01").with_platform("Cisco IOS", "cisco_ios");
        device.role = Some(String::from("edge"));
        device.location = Some(String::from("nyc"));
        let plan = ConfigPlan::new(device.id, PlanType::Remediation, "ntp server 1.1.1.1", &Status::new("Approved"))
            .with_change_control("CHG-42");
        (plan, device)
    }

    #[test]
    fn test_empty_filter_matches_everything() {
        let (plan, device) = fixture();
        let filter = ConfigPlanFilter::new();
        assert!(filter.is_empty());
        assert!(filter.matches(&plan, Some(&device), Some("Approved")));
        assert!(filter.matches(&plan, None, None));
    }

    #[test]
    fn test_blank_search_is_ignored() {
        let (plan, device) = fixture();
        let filter = ConfigPlanFilter::new().with_search("   ");
        assert!(filter.is_empty());
        assert!(filter.matches(&plan, Some(&device), None));
    }

    #[test]
    fn test_search_is_case_insensitive() {
        let (plan, device) = fixture();
        assert!(ConfigPlanFilter::new().with_search("router").matches(&plan, Some(&device), None));
        assert!(!ConfigPlanFilter::new().with_search("switch").matches(&plan, Some(&device), None));
    }

    #[test]
    fn test_device_by_name_or_id() {
        let (plan, device) = fixture();
        let by_name = ConfigPlanFilter::new().with_device("Edge-Router-01");
        let by_id = ConfigPlanFilter::new().with_device(&device.id.to_string());
        assert!(by_name.matches(&plan, Some(&device), None));
        assert!(by_id.matches(&plan, Some(&device), None));
        assert!(!by_name.matches(&plan, None, None));
    }

    #[test]
    fn test_values_within_field_are_alternatives() {
        let (plan, device) = fixture();
        let filter = ConfigPlanFilter::new()
            .with_status("Not Approved")
            .with_status("Approved");
        assert!(filter.matches(&plan, Some(&device), Some("Approved")));
        assert!(!filter.matches(&plan, Some(&device), Some("Completed")));
    }

    #[test]
    fn test_fields_are_combined() {
        let (plan, device) = fixture();
        let mut filter = ConfigPlanFilter::new().with_plan_type(PlanType::Remediation);
        filter.platform.push(String::from("cisco_ios"));
        filter.role.push(String::from("edge"));
        filter.change_control_id.push(String::from("CHG-42"));
        assert!(filter.matches(&plan, Some(&device), None));

        filter.location.push(String::from("lon"));
        assert!(!filter.matches(&plan, Some(&device), None));
    }

    #[test]
    fn test_plan_id() {
        let (plan, device) = fixture();
        let mut filter = ConfigPlanFilter::new();
        filter.id.push(plan.id.to_string());
        assert!(filter.matches(&plan, Some(&device), None));
        filter.id = vec![String::from("nope")];
        assert!(!filter.matches(&plan, Some(&device), None));
    }
}
