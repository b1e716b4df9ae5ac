//! In-memory plan store.
//!
//! Used by tests and by callers that hold plans outside of the JSON
//! data file.

use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{Result, StoreError};
use crate::filters::ConfigPlanFilter;
use crate::models::{ConfigPlan, Device, JobResult, PlanSet, Status, StatusRegistry};

use super::backend::{PlanStore, PlanUpdate};
use super::data::PlanData;
use super::lock::{holder_or_generated, LockInfo, LOCK_EXPIRY};

/// In-memory plan store.
#[derive(Debug)]
pub struct MemoryPlanStore {
    data: RwLock<PlanData>,
    lock: Mutex<Option<LockInfo>>,
    lock_ttl: Duration,
}

impl Default for MemoryPlanStore {
    fn default() -> Self {
        Self::with_data(PlanData::default())
    }
}

impl MemoryPlanStore {
    /// Creates an empty store seeded with the default statuses.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store from existing data.
    #[must_use]
    pub fn with_data(data: PlanData) -> Self {
        Self {
            data: RwLock::new(data),
            lock: Mutex::new(None),
            lock_ttl: LOCK_EXPIRY,
        }
    }

    /// Sets the lifetime of run locks taken on this store.
    #[must_use]
    pub const fn with_lock_ttl(mut self, ttl: Duration) -> Self {
        self.lock_ttl = ttl;
        self
    }

    /// Returns a copy of the current contents.
    pub async fn snapshot(&self) -> PlanData {
        self.data.read().await.clone()
    }
}

#[async_trait]
impl PlanStore for MemoryPlanStore {
    async fn statuses(&self) -> Result<StatusRegistry> {
        Ok(self.data.read().await.statuses.clone())
    }

    async fn status_by_name(&self, name: &str) -> Result<Status> {
        self.data.read().await.status_by_name(name)
    }

    async fn ensure_status(&self, name: &str) -> Result<Status> {
        Ok(self.data.write().await.statuses.ensure(name))
    }

    async fn list_devices(&self) -> Result<Vec<Device>> {
        Ok(self.data.read().await.devices.clone())
    }

    async fn get_device(&self, reference: &str) -> Result<Device> {
        self.data.read().await.get_device(reference)
    }

    async fn devices(&self, ids: &[Uuid]) -> Result<Vec<Device>> {
        self.data.read().await.devices(ids)
    }

    async fn upsert_device(&self, device: Device) -> Result<Uuid> {
        Ok(self.data.write().await.upsert_device(device))
    }

    async fn insert_plan(&self, plan: ConfigPlan) -> Result<()> {
        self.data.write().await.insert_plan(plan)
    }

    async fn list_plans(&self, filter: &ConfigPlanFilter) -> Result<PlanSet> {
        Ok(self.data.read().await.list_plans(filter))
    }

    async fn get_plan(&self, id: Uuid) -> Result<ConfigPlan> {
        self.data.read().await.get_plan(id)
    }

    async fn plans(&self, ids: &[Uuid]) -> Result<PlanSet> {
        self.data.read().await.plans(ids)
    }

    async fn update_plans(&self, ids: &[Uuid], update: &PlanUpdate) -> Result<usize> {
        let changed = self.data.write().await.update_plans(ids, update)?;
        debug!("Updated {changed} plan(s)");
        Ok(changed)
    }

    async fn save_job_result(&self, job: &JobResult) -> Result<()> {
        self.data.write().await.save_job_result(job);
        Ok(())
    }

    async fn get_job_result(&self, id: Uuid) -> Result<Option<JobResult>> {
        Ok(self.data.read().await.get_job_result(id))
    }

    async fn list_job_results(&self) -> Result<Vec<JobResult>> {
        Ok(self.data.read().await.list_job_results())
    }

    async fn acquire_lock(&self, holder: &str) -> Result<LockInfo> {
        let mut slot = self.lock.lock().await;
        if let Some(existing) = slot.as_ref()
            && !existing.is_expired()
        {
            return Err(StoreError::LockedByOther {
                holder: existing.holder.clone(),
                since: existing.acquired_at.to_rfc3339(),
            }
            .into());
        }

        let lock_info = LockInfo::with_ttl(&holder_or_generated(holder), self.lock_ttl);
        info!("Acquired run lock: {}", lock_info.lock_id);
        *slot = Some(lock_info.clone());
        Ok(lock_info)
    }

    async fn refresh_lock(&self, lock_id: &str) -> Result<LockInfo> {
        let mut slot = self.lock.lock().await;
        match slot.as_mut() {
            Some(held) if held.lock_id == lock_id => {
                held.refresh();
                debug!("Refreshed run lock: {lock_id}");
                Ok(held.clone())
            }
            _ => Err(StoreError::LockFailed {
                message: format!("run lock {lock_id} is no longer held"),
            }
            .into()),
        }
    }

    async fn release_lock(&self, lock_id: &str) -> Result<()> {
        let mut slot = self.lock.lock().await;
        if slot.as_ref().is_some_and(|l| l.lock_id == lock_id) {
            *slot = None;
            info!("Released run lock: {lock_id}");
        }
        Ok(())
    }

    fn backend_type(&self) -> &'static str {
        "memory"
    }
}
