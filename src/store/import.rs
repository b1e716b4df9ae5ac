//! Bulk import of devices and config plans.
//!
//! Plans produced by compliance runs are exchanged as YAML documents that
//! name their device instead of carrying device ids.

use serde::Deserialize;
use tracing::info;

use crate::error::{ConfigError, GoldenConfigError, Result};
use crate::models::{ConfigPlan, Device, PlanType};

use super::backend::PlanStore;

/// A plan import document.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlanImport {
    /// Devices to create or update.
    #[serde(default)]
    pub devices: Vec<Device>,
    /// Plans to create.
    #[serde(default)]
    pub plans: Vec<PlanRecord>,
}

/// One plan in an import document.
#[derive(Debug, Clone, Deserialize)]
pub struct PlanRecord {
    /// Device name or id.
    pub device: String,
    /// Plan kind.
    #[serde(default)]
    pub plan_type: PlanType,
    /// Configuration fragment.
    pub config_set: String,
    /// Status name; the unapproved default when absent.
    #[serde(default)]
    pub status: Option<String>,
    /// Change control ticket identifier.
    #[serde(default)]
    pub change_control_id: Option<String>,
    /// Change control ticket URL.
    #[serde(default)]
    pub change_control_url: Option<String>,
    /// Compliance features the plan remediates.
    #[serde(default)]
    pub features: Vec<String>,
}

/// Counts of imported records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportReport {
    /// Devices created or updated.
    pub devices: usize,
    /// Plans created.
    pub plans: usize,
}

impl PlanImport {
    /// Parses an import document from YAML.
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML is invalid.
    pub fn from_yaml(content: &str) -> Result<Self> {
        serde_yaml::from_str(content).map_err(|e| {
            GoldenConfigError::Config(ConfigError::ParseError {
                message: format!("Invalid plan import document: {e}"),
                location: None,
            })
        })
    }

    /// Writes the devices and plans into the store.
    ///
    /// Plans without a status get `default_status`, which is registered
    /// if the store does not know it yet.
    ///
    /// # Errors
    ///
    /// Returns an error if a plan references an unknown device or status.
    pub async fn apply(self, store: &dyn PlanStore, default_status: &str) -> Result<ImportReport> {
        let mut report = ImportReport::default();
        let default_status = store.ensure_status(default_status).await?;

        for device in self.devices {
            store.upsert_device(device).await?;
            report.devices += 1;
        }

        for record in self.plans {
            let device = store.get_device(&record.device).await?;
            let status = match &record.status {
                Some(name) => store.status_by_name(name).await?,
                None => default_status.clone(),
            };

            let mut plan = ConfigPlan::new(device.id, record.plan_type, &record.config_set, &status);
            plan.change_control_id = record.change_control_id;
            plan.change_control_url = record.change_control_url;
            plan.features = record.features;
            store.insert_plan(plan).await?;
            report.plans += 1;
        }

        info!(
            "Imported {} device(s) and {} plan(s)",
            report.devices, report.plans
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::ConfigPlanFilter;
    use crate::models::{APPROVED, NOT_APPROVED};
    use crate::store::MemoryPlanStore;

    const DOCUMENT: &str = r"
devices:
  - name: edge-1
    platform:
      name: Cisco IOS
      network_driver: cisco_ios
    primary_ip: 10.0.0.1/24
plans:
  - device: edge-1
    plan_type: intended
    config_set: ntp server 1.1.1.1
    status: Approved
  - device: edge-1
    config_set: logging host 10.0.0.5
    change_control_id: CHG-7
";

    #[tokio::test]
    async fn test_import_resolves_devices_and_statuses() {
        let store = MemoryPlanStore::new();
        let report = PlanImport::from_yaml(DOCUMENT)
            .expect("parse")
            .apply(&store, NOT_APPROVED)
            .await
            .expect("apply");
        assert_eq!(report, ImportReport { devices: 1, plans: 2 });

        let plans = store.list_plans(&ConfigPlanFilter::new()).await.expect("list");
        let approved = store.status_by_name(APPROVED).await.expect("status");
        let pending = store.status_by_name(NOT_APPROVED).await.expect("status");
        let statuses: Vec<_> = plans.iter().map(|p| p.status).collect();
        assert_eq!(statuses, vec![approved.id, pending.id]);

        let second = plans.iter().nth(1).expect("second plan");
        assert_eq!(second.plan_type, PlanType::Remediation);
        assert_eq!(second.change_control_id.as_deref(), Some("CHG-7"));
    }

    #[tokio::test]
    async fn test_import_unknown_device_fails() {
        let store = MemoryPlanStore::new();
        let doc = PlanImport::from_yaml("plans:\n  - device: ghost\n    config_set: x\n").expect("parse");
        assert!(doc.apply(&store, NOT_APPROVED).await.is_err());
    }
}
