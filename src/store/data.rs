//! Store contents shared by every backend.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Result, StoreError};
use crate::filters::ConfigPlanFilter;
use crate::models::{ConfigPlan, Device, JobResult, PlanSet, Status, StatusRegistry};

use super::backend::PlanUpdate;

/// Current data format version.
pub const DATA_VERSION: u32 = 1;

/// Everything a plan store holds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanData {
    /// Data format version.
    pub version: u32,
    /// Status registry.
    #[serde(default)]
    pub statuses: StatusRegistry,
    /// Devices.
    #[serde(default)]
    pub devices: Vec<Device>,
    /// Config plans, in creation order.
    #[serde(default)]
    pub plans: Vec<ConfigPlan>,
    /// Job results, in creation order.
    #[serde(default)]
    pub jobs: Vec<JobResult>,
}

impl Default for PlanData {
    fn default() -> Self {
        Self {
            version: DATA_VERSION,
            statuses: StatusRegistry::with_defaults(),
            devices: Vec::new(),
            plans: Vec::new(),
            jobs: Vec::new(),
        }
    }
}

impl PlanData {
    pub(crate) fn status_by_name(&self, name: &str) -> Result<Status> {
        self.statuses.get_by_name(name).cloned().ok_or_else(|| {
            StoreError::StatusNotFound {
                name: name.to_string(),
            }
            .into()
        })
    }

    pub(crate) fn device_by_id(&self, id: Uuid) -> Option<&Device> {
        self.devices.iter().find(|d| d.id == id)
    }

    pub(crate) fn get_device(&self, reference: &str) -> Result<Device> {
        let by_id = Uuid::parse_str(reference).ok();
        self.devices
            .iter()
            .find(|d| d.name == reference || Some(d.id) == by_id)
            .cloned()
            .ok_or_else(|| {
                StoreError::DeviceNotFound {
                    reference: reference.to_string(),
                }
                .into()
            })
    }

    pub(crate) fn devices(&self, ids: &[Uuid]) -> Result<Vec<Device>> {
        ids.iter()
            .map(|id| -> Result<Device> {
                self.device_by_id(*id).cloned().ok_or_else(|| {
                    StoreError::DeviceNotFound {
                        reference: id.to_string(),
                    }
                    .into()
                })
            })
            .collect()
    }

    pub(crate) fn upsert_device(&mut self, mut device: Device) -> Uuid {
        if let Some(existing) = self.devices.iter_mut().find(|d| d.name == device.name) {
            device.id = existing.id;
            *existing = device;
            existing.id
        } else {
            let id = device.id;
            self.devices.push(device);
            id
        }
    }

    pub(crate) fn insert_plan(&mut self, plan: ConfigPlan) -> Result<()> {
        if self.device_by_id(plan.device).is_none() {
            return Err(StoreError::DeviceNotFound {
                reference: plan.device.to_string(),
            }
            .into());
        }
        if self.statuses.get(plan.status).is_none() {
            return Err(StoreError::StatusNotFound {
                name: plan.status.to_string(),
            }
            .into());
        }
        self.plans.push(plan);
        Ok(())
    }

    pub(crate) fn list_plans(&self, filter: &ConfigPlanFilter) -> PlanSet {
        self.plans
            .iter()
            .filter(|plan| {
                filter.matches(
                    plan,
                    self.device_by_id(plan.device),
                    self.statuses.name_of(plan.status),
                )
            })
            .cloned()
            .collect::<Vec<_>>()
            .into()
    }

    pub(crate) fn get_plan(&self, id: Uuid) -> Result<ConfigPlan> {
        self.plans.iter().find(|p| p.id == id).cloned().ok_or_else(|| {
            StoreError::PlanNotFound { id: id.to_string() }.into()
        })
    }

    pub(crate) fn plans(&self, ids: &[Uuid]) -> Result<PlanSet> {
        if let Some(missing) = ids.iter().find(|id| !self.plans.iter().any(|p| p.id == **id)) {
            return Err(StoreError::PlanNotFound {
                id: missing.to_string(),
            }
            .into());
        }
        Ok(self
            .plans
            .iter()
            .filter(|p| ids.contains(&p.id))
            .cloned()
            .collect::<Vec<_>>()
            .into())
    }

    pub(crate) fn update_plans(&mut self, ids: &[Uuid], update: &PlanUpdate) -> Result<usize> {
        if let Some(status) = update.status
            && self.statuses.get(status).is_none()
        {
            return Err(StoreError::StatusNotFound {
                name: status.to_string(),
            }
            .into());
        }

        let mut changed = 0;
        for plan in self.plans.iter_mut().filter(|p| ids.contains(&p.id)) {
            if let Some(status) = update.status {
                plan.status = status;
            }
            if let Some(job) = update.deploy_result {
                plan.deploy_result = Some(job);
            }
            changed += 1;
        }
        Ok(changed)
    }

    pub(crate) fn save_job_result(&mut self, job: &JobResult) {
        if let Some(existing) = self.jobs.iter_mut().find(|j| j.id == job.id) {
            *existing = job.clone();
        } else {
            self.jobs.push(job.clone());
        }
    }

    pub(crate) fn get_job_result(&self, id: Uuid) -> Option<JobResult> {
        self.jobs.iter().find(|j| j.id == id).cloned()
    }

    pub(crate) fn list_job_results(&self) -> Vec<JobResult> {
        let mut jobs = self.jobs.clone();
        jobs.sort_by(|a, b| b.created.cmp(&a.created));
        jobs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PlanType, APPROVED, COMPLETED};

    fn seeded() -> (PlanData, Device) {
        let mut data = PlanData::default();
        let device = Device::new("edge-1");
        data.upsert_device(device.clone());
        (data, device)
    }

    #[test]
    fn test_upsert_device_keeps_id() {
        let (mut data, device) = seeded();
        let replacement = Device::new("edge-1").with_primary_ip("10.0.0.1/24");
        let id = data.upsert_device(replacement);
        assert_eq!(id, device.id);
        assert_eq!(data.devices.len(), 1);
        assert_eq!(data.devices[0].primary_ip.as_deref(), Some("10.0.0.1/24"));
    }

    #[test]
    fn test_insert_plan_requires_device() {
        let (mut data, _) = seeded();
        let approved = data.status_by_name(APPROVED).unwrap();
        let orphan = ConfigPlan::new(Uuid::new_v4(), PlanType::Manual, "x", &approved);
        assert!(data.insert_plan(orphan).is_err());
    }

    #[test]
    fn test_update_plans_scoped_to_ids() {
        let (mut data, device) = seeded();
        let approved = data.status_by_name(APPROVED).unwrap();
        let completed = data.status_by_name(COMPLETED).unwrap();
        let first = ConfigPlan::new(device.id, PlanType::Manual, "a", &approved);
        let second = ConfigPlan::new(device.id, PlanType::Manual, "b", &approved);
        let first_id = first.id;
        data.insert_plan(first).unwrap();
        data.insert_plan(second).unwrap();

        let changed = data
            .update_plans(&[first_id], &PlanUpdate::status(&completed))
            .unwrap();
        assert_eq!(changed, 1);
        assert_eq!(data.plans[0].status, completed.id);
        assert_eq!(data.plans[1].status, approved.id);
    }

    #[test]
    fn test_plans_by_id_keep_creation_order() {
        let (mut data, device) = seeded();
        let approved = data.status_by_name(APPROVED).unwrap();
        let first = ConfigPlan::new(device.id, PlanType::Manual, "a", &approved);
        let second = ConfigPlan::new(device.id, PlanType::Manual, "b", &approved);
        let (first_id, second_id) = (first.id, second.id);
        data.insert_plan(first).unwrap();
        data.insert_plan(second).unwrap();

        let plans = data.plans(&[second_id, first_id]).unwrap();
        assert_eq!(plans.ids(), vec![first_id, second_id]);
        assert!(data.plans(&[Uuid::new_v4()]).is_err());
    }

    #[test]
    fn test_update_plans_rejects_unknown_status() {
        let (mut data, _) = seeded();
        let update = PlanUpdate::status(&Status::new("Ghost"));
        assert!(data.update_plans(&[], &update).is_err());
    }

    #[test]
    fn test_get_device_by_name_or_id() {
        let (data, device) = seeded();
        assert_eq!(data.get_device("edge-1").unwrap().id, device.id);
        assert_eq!(data.get_device(&device.id.to_string()).unwrap().name, "edge-1");
        assert!(data.get_device("edge-2").is_err());
    }
}
