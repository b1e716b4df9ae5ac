//! Local file-based plan store.
//!
//! The whole store is one JSON document. Every operation reads it from
//! disk, so separate processes sharing the file see each other's writes.
//! Mutations are read-modify-write cycles, serialized within the process
//! and written back through a temporary file and an atomic rename.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{Result, StoreError};
use crate::filters::ConfigPlanFilter;
use crate::models::{ConfigPlan, Device, JobResult, PlanSet, Status, StatusRegistry};

use super::backend::{PlanStore, PlanUpdate};
use super::data::{PlanData, DATA_VERSION};
use super::lock::{holder_or_generated, LockInfo, LOCK_EXPIRY};

/// Lock file name.
const LOCK_FILE: &str = "run.lock";

/// Local file-based plan store.
#[derive(Debug)]
pub struct LocalPlanStore {
    /// Directory holding the data and lock files.
    base_dir: PathBuf,
    /// Path to the data file.
    data_path: PathBuf,
    /// Path to the lock file.
    lock_path: PathBuf,
    /// Serializes read-modify-write cycles.
    write_guard: Mutex<()>,
    /// Lifetime of run locks taken on this store.
    lock_ttl: Duration,
}

impl LocalPlanStore {
    /// Creates a store backed by the given data file.
    #[must_use]
    pub fn with_data_path(data_path: impl Into<PathBuf>) -> Self {
        let data_path = data_path.into();
        let base_dir = data_path
            .parent()
            .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
        let lock_path = base_dir.join(LOCK_FILE);

        Self {
            base_dir,
            data_path,
            lock_path,
            write_guard: Mutex::new(()),
            lock_ttl: LOCK_EXPIRY,
        }
    }

    /// Sets the lifetime of run locks taken on this store.
    #[must_use]
    pub const fn with_lock_ttl(mut self, ttl: Duration) -> Self {
        self.lock_ttl = ttl;
        self
    }

    /// Returns the data file path.
    #[must_use]
    pub fn data_path(&self) -> &Path {
        &self.data_path
    }

    /// Ensures the store directory exists.
    async fn ensure_dir(&self) -> Result<()> {
        if !self.base_dir.exists() {
            debug!("Creating store directory: {}", self.base_dir.display());
            fs::create_dir_all(&self.base_dir)
                .await
                .map_err(|e| StoreError::io(format!("Failed to create store directory: {e}")))?;
        }
        Ok(())
    }

    /// Reads the data file, or returns fresh data if it does not exist.
    async fn load(&self) -> Result<PlanData> {
        if !self.data_path.exists() {
            debug!("Data file does not exist: {}", self.data_path.display());
            return Ok(PlanData::default());
        }

        debug!("Loading plan data from: {}", self.data_path.display());

        let content = fs::read_to_string(&self.data_path).await.map_err(|e| StoreError::Corrupted {
            message: format!("Failed to read data file: {e}"),
        })?;

        let data: PlanData = serde_json::from_str(&content).map_err(|e| StoreError::Corrupted {
            message: format!("Failed to parse data file: {e}"),
        })?;

        if data.version > DATA_VERSION {
            return Err(StoreError::Corrupted {
                message: format!(
                    "Data file version {} is newer than supported version {DATA_VERSION}",
                    data.version
                ),
            }
            .into());
        }

        Ok(data)
    }

    /// Writes `content` to `path` through a temporary file and a rename.
    async fn write_atomic(&self, path: &Path, content: &str) -> Result<()> {
        self.ensure_dir().await?;

        let temp_path = path.with_extension("tmp");

        let mut file = fs::File::create(&temp_path)
            .await
            .map_err(|e| StoreError::io(format!("Failed to create temp file: {e}")))?;

        file.write_all(content.as_bytes())
            .await
            .map_err(|e| StoreError::io(format!("Failed to write {}: {e}", temp_path.display())))?;

        file.sync_all()
            .await
            .map_err(|e| StoreError::io(format!("Failed to sync {}: {e}", temp_path.display())))?;

        fs::rename(&temp_path, path)
            .await
            .map_err(|e| StoreError::io(format!("Failed to rename {}: {e}", temp_path.display())))?;

        Ok(())
    }

    /// Writes the data file atomically.
    async fn persist(&self, data: &PlanData) -> Result<()> {
        let content = serde_json::to_string_pretty(data)
            .map_err(|e| StoreError::serialization(format!("Failed to serialize plan data: {e}")))?;

        self.write_atomic(&self.data_path, &content).await?;

        debug!("Plan data saved to: {}", self.data_path.display());
        Ok(())
    }

    /// Runs a read-only closure against the data on disk.
    async fn read<T>(&self, f: impl FnOnce(&PlanData) -> T) -> Result<T> {
        let data = self.load().await?;
        Ok(f(&data))
    }

    /// Runs a mutating closure against the data on disk and persists the
    /// result. Nothing is written if the closure fails.
    async fn write<T>(&self, f: impl FnOnce(&mut PlanData) -> Result<T>) -> Result<T> {
        let _guard = self.write_guard.lock().await;
        let mut data = self.load().await?;
        let value = f(&mut data)?;
        self.persist(&data).await?;
        Ok(value)
    }

    /// Reads the lock file if it exists.
    async fn read_lock_file(&self) -> Result<Option<LockInfo>> {
        if !self.lock_path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&self.lock_path).await.map_err(|e| StoreError::Corrupted {
            message: format!("Failed to read lock file: {e}"),
        })?;

        let lock_info: LockInfo = serde_json::from_str(&content).map_err(|e| StoreError::Corrupted {
            message: format!("Failed to parse lock file: {e}"),
        })?;

        Ok(Some(lock_info))
    }

    /// Writes the lock file.
    async fn write_lock_file(&self, lock_info: &LockInfo) -> Result<()> {
        let content = serde_json::to_string_pretty(lock_info)
            .map_err(|e| StoreError::serialization(format!("Failed to serialize lock: {e}")))?;

        self.write_atomic(&self.lock_path, &content)
            .await
            .map_err(|e| {
                StoreError::LockFailed {
                    message: e.to_string(),
                }
                .into()
            })
    }
}

#[async_trait]
impl PlanStore for LocalPlanStore {
    async fn statuses(&self) -> Result<StatusRegistry> {
        self.read(|data| data.statuses.clone()).await
    }

    async fn status_by_name(&self, name: &str) -> Result<Status> {
        self.read(|data| data.status_by_name(name)).await?
    }

    async fn ensure_status(&self, name: &str) -> Result<Status> {
        if let Ok(existing) = self.status_by_name(name).await {
            return Ok(existing);
        }
        self.write(|data| Ok(data.statuses.ensure(name))).await
    }

    async fn list_devices(&self) -> Result<Vec<Device>> {
        self.read(|data| data.devices.clone()).await
    }

    async fn get_device(&self, reference: &str) -> Result<Device> {
        self.read(|data| data.get_device(reference)).await?
    }

    async fn devices(&self, ids: &[Uuid]) -> Result<Vec<Device>> {
        self.read(|data| data.devices(ids)).await?
    }

    async fn upsert_device(&self, device: Device) -> Result<Uuid> {
        self.write(|data| Ok(data.upsert_device(device))).await
    }

    async fn insert_plan(&self, plan: ConfigPlan) -> Result<()> {
        self.write(|data| data.insert_plan(plan)).await
    }

    async fn list_plans(&self, filter: &ConfigPlanFilter) -> Result<PlanSet> {
        self.read(|data| data.list_plans(filter)).await
    }

    async fn get_plan(&self, id: Uuid) -> Result<ConfigPlan> {
        self.read(|data| data.get_plan(id)).await?
    }

    async fn plans(&self, ids: &[Uuid]) -> Result<PlanSet> {
        self.read(|data| data.plans(ids)).await?
    }

    async fn update_plans(&self, ids: &[Uuid], update: &PlanUpdate) -> Result<usize> {
        let changed = self.write(|data| data.update_plans(ids, update)).await?;
        debug!("Updated {changed} plan(s)");
        Ok(changed)
    }

    async fn save_job_result(&self, job: &JobResult) -> Result<()> {
        self.write(|data| {
            data.save_job_result(job);
            Ok(())
        })
        .await
    }

    async fn get_job_result(&self, id: Uuid) -> Result<Option<JobResult>> {
        self.read(|data| data.get_job_result(id)).await
    }

    async fn list_job_results(&self) -> Result<Vec<JobResult>> {
        self.read(PlanData::list_job_results).await
    }

    async fn acquire_lock(&self, holder: &str) -> Result<LockInfo> {
        if let Some(existing) = self.read_lock_file().await? {
            if !existing.is_expired() {
                return Err(StoreError::LockedByOther {
                    holder: existing.holder.clone(),
                    since: existing.acquired_at.to_rfc3339(),
                }
                .into());
            }
            debug!("Expired lock found, taking over");
        }

        let lock_info = LockInfo::with_ttl(&holder_or_generated(holder), self.lock_ttl);
        self.write_lock_file(&lock_info).await?;

        info!(
            "Acquired run lock: {} (expires in {}s)",
            lock_info.lock_id,
            lock_info.remaining_secs()
        );

        Ok(lock_info)
    }

    async fn refresh_lock(&self, lock_id: &str) -> Result<LockInfo> {
        match self.read_lock_file().await? {
            Some(mut held) if held.lock_id == lock_id => {
                held.refresh();
                self.write_lock_file(&held).await?;
                debug!("Refreshed run lock: {lock_id}");
                Ok(held)
            }
            _ => Err(StoreError::LockFailed {
                message: format!("run lock {lock_id} is no longer held"),
            }
            .into()),
        }
    }

    async fn release_lock(&self, lock_id: &str) -> Result<()> {
        if let Some(existing) = self.read_lock_file().await? {
            if existing.lock_id == lock_id {
                fs::remove_file(&self.lock_path).await.map_err(|e| StoreError::LockFailed {
                    message: format!("Failed to delete lock file: {e}"),
                })?;
                info!("Released run lock: {lock_id}");
            } else {
                debug!(
                    "Lock ID mismatch: expected {lock_id}, found {}",
                    existing.lock_id
                );
            }
        }
        Ok(())
    }

    fn backend_type(&self) -> &'static str {
        "local"
    }
}
