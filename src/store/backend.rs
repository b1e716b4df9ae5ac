//! Plan store trait definition.
//!
//! This module defines the common interface for plan storage backends.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Result;
use crate::filters::ConfigPlanFilter;
use crate::models::{ConfigPlan, Device, JobResult, PlanSet, Status, StatusRegistry};

use super::lock::LockInfo;

/// Partial update applied to a set of plans.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlanUpdate {
    /// New status id.
    pub status: Option<Uuid>,
    /// New deploy result reference.
    pub deploy_result: Option<Uuid>,
}

impl PlanUpdate {
    /// Update that only changes the status.
    #[must_use]
    pub const fn status(status: &Status) -> Self {
        Self {
            status: Some(status.id),
            deploy_result: None,
        }
    }

    /// Update that only stamps the deploy result.
    #[must_use]
    pub const fn deploy_result(job_id: Uuid) -> Self {
        Self {
            status: None,
            deploy_result: Some(job_id),
        }
    }
}

/// Trait for plan storage backends.
#[async_trait]
pub trait PlanStore: Send + Sync {
    /// Returns the status registry.
    async fn statuses(&self) -> Result<StatusRegistry>;

    /// Looks up a status by name.
    ///
    /// Fails with `StoreError::StatusNotFound` for unknown names.
    async fn status_by_name(&self, name: &str) -> Result<Status>;

    /// Returns the status with this name, registering it if needed.
    async fn ensure_status(&self, name: &str) -> Result<Status>;

    /// Lists every device.
    async fn list_devices(&self) -> Result<Vec<Device>>;

    /// Looks up a device by name or id.
    async fn get_device(&self, reference: &str) -> Result<Device>;

    /// Returns the devices with the given ids, in the given order.
    async fn devices(&self, ids: &[Uuid]) -> Result<Vec<Device>>;

    /// Inserts a device, or updates the device with the same name.
    ///
    /// Returns the stored device id.
    async fn upsert_device(&self, device: Device) -> Result<Uuid>;

    /// Inserts a config plan.
    async fn insert_plan(&self, plan: ConfigPlan) -> Result<()>;

    /// Returns the plans matching the filter, in creation order.
    async fn list_plans(&self, filter: &ConfigPlanFilter) -> Result<PlanSet>;

    /// Looks up a plan by id.
    async fn get_plan(&self, id: Uuid) -> Result<ConfigPlan>;

    /// Returns the current rows of the given plans, in creation order.
    ///
    /// Fails with `StoreError::PlanNotFound` if any id is unknown.
    async fn plans(&self, ids: &[Uuid]) -> Result<PlanSet>;

    /// Applies an update to the given plans.
    ///
    /// Returns the number of plans changed.
    async fn update_plans(&self, ids: &[Uuid], update: &PlanUpdate) -> Result<usize>;

    /// Saves a job result, replacing any previous version.
    async fn save_job_result(&self, job: &JobResult) -> Result<()>;

    /// Looks up a job result by id.
    async fn get_job_result(&self, id: Uuid) -> Result<Option<JobResult>>;

    /// Lists job results, newest first.
    async fn list_job_results(&self) -> Result<Vec<JobResult>>;

    /// Acquires the run lock.
    ///
    /// Returns lock information if successful.
    async fn acquire_lock(&self, holder: &str) -> Result<LockInfo>;

    /// Extends the run lock held under `lock_id` by its ttl.
    ///
    /// Fails with `StoreError::LockFailed` if the lock is no longer held
    /// under that id.
    async fn refresh_lock(&self, lock_id: &str) -> Result<LockInfo>;

    /// Releases the run lock.
    async fn release_lock(&self, lock_id: &str) -> Result<()>;

    /// Gets the backend type name.
    fn backend_type(&self) -> &'static str;
}
