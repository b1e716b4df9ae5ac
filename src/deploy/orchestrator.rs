//! Deployment orchestrator.
//!
//! Checks the plan set, builds the device-scoped inventory and fans the
//! per-device task out through the runner. Per-device failures end up in
//! the summary and the job log; only precondition violations and
//! infrastructure failures are returned as errors.
//!
//! The run lock is held from the moment the plans are re-read until the
//! last device finishes, and is refreshed in the background meanwhile.

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::Settings;
use crate::credentials::{provider_from_settings, CredentialsProvider};
use crate::dispatch::{Dispatcher, DriverRegistry};
use crate::error::{DeployError, GoldenConfigError, Result, ALREADY_COMPLETED_MESSAGE, NOT_APPROVED_MESSAGE};
use crate::inventory::{Inventory, InventoryDefaults};
use crate::joblog::JobLogger;
use crate::models::{JobResult, JobStatus, LogLevel, PlanSet, COMPLETED, FAILED, IN_PROGRESS, NOT_APPROVED};
use crate::runner::Runner;
use crate::secrets::SecretResolver;
use crate::store::{generate_holder_id, LockInfo, PlanStore};

use super::outcome::DeploymentSummary;
use super::task::{run_deployment, DeploymentContext, TaskStatuses};

/// Deploys approved config plans to their devices.
pub struct ConfigDeployment {
    store: Arc<dyn PlanStore>,
    dispatcher: Dispatcher,
    credentials: Arc<dyn CredentialsProvider>,
    runner: Runner,
    commit: bool,
    not_approved_status: String,
}

impl ConfigDeployment {
    /// Creates an orchestrator in commit mode with the default runner.
    #[must_use]
    pub fn new(store: Arc<dyn PlanStore>, dispatcher: Dispatcher, credentials: Arc<dyn CredentialsProvider>) -> Self {
        Self {
            store,
            dispatcher,
            credentials,
            runner: Runner::default(),
            commit: true,
            not_approved_status: NOT_APPROVED.to_string(),
        }
    }

    /// Creates an orchestrator from validated settings.
    ///
    /// # Errors
    ///
    /// Returns an error if a configured driver cannot be built.
    pub fn from_settings(settings: &Settings, store: Arc<dyn PlanStore>) -> Result<Self> {
        let registry = DriverRegistry::from_settings(settings)?;
        let resolver = SecretResolver::from_settings(settings);

        Ok(Self {
            store,
            dispatcher: Dispatcher::from_settings(registry, settings),
            credentials: provider_from_settings(settings, &resolver),
            runner: Runner::from_settings(settings),
            commit: settings.deploy.commit,
            not_approved_status: settings.deploy.not_approved_status.clone(),
        })
    }

    /// Enables or disables pushing to devices.
    #[must_use]
    pub const fn with_commit(mut self, commit: bool) -> Self {
        self.commit = commit;
        self
    }

    /// Sets the runner.
    #[must_use]
    pub const fn with_runner(mut self, runner: Runner) -> Self {
        self.runner = runner;
        self
    }

    /// Sets the name of the unapproved status.
    #[must_use]
    pub fn with_not_approved_status(mut self, name: impl Into<String>) -> Self {
        self.not_approved_status = name.into();
        self
    }

    /// Returns whether pushes are committed.
    #[must_use]
    pub const fn commit(&self) -> bool {
        self.commit
    }

    /// Deploys a plan set, recording progress on `job`.
    ///
    /// The job result is saved with its log whatever the outcome.
    ///
    /// # Errors
    ///
    /// Returns `DeployError::PlansNotApproved` or
    /// `DeployError::PlansAlreadyCompleted` before any plan is touched, and
    /// `DeployError::Orchestration` for any infrastructure failure.
    pub async fn deploy(&self, plans: PlanSet, log_level: LogLevel, job: &mut JobResult) -> Result<DeploymentSummary> {
        job.start();
        let logger = JobLogger::new(job.id, log_level);
        logger.debug(None, "Starting config deployment");

        let outcome = match self.check_preconditions(&plans, &logger).await {
            Ok(()) => self.run(plans, job, &logger).await,
            Err(err) => Err(err),
        }
        .map_err(|err| {
            if err.is_precondition_violation() {
                return err;
            }
            let wrapped = DeployError::orchestration(err.to_string());
            logger.error(None, &wrapped.to_string());
            GoldenConfigError::from(wrapped)
        });

        let status = match &outcome {
            Ok(summary) => summary.job_status(),
            Err(err) if err.is_precondition_violation() => JobStatus::Failed,
            Err(_) => JobStatus::Errored,
        };
        job.append_log(logger.take());
        job.finish(status);
        if let Err(err) = self.store.save_job_result(job).await {
            error!("Could not save job result {}: {err}", job.id);
        }

        outcome
    }

    /// Rejects plan sets containing unapproved or completed plans.
    async fn check_preconditions(&self, plans: &PlanSet, logger: &JobLogger) -> Result<()> {
        let statuses = self.store.statuses().await?;

        if let Some(status) = statuses.get_by_name(&self.not_approved_status) {
            if plans.any_with_status(status) {
                logger.failure(None, NOT_APPROVED_MESSAGE);
                return Err(DeployError::PlansNotApproved.into());
            }
        }
        if let Some(status) = statuses.get_by_name(COMPLETED) {
            if plans.any_with_status(status) {
                logger.failure(None, ALREADY_COMPLETED_MESSAGE);
                return Err(DeployError::PlansAlreadyCompleted.into());
            }
        }
        Ok(())
    }

    async fn run(&self, plans: PlanSet, job: &JobResult, logger: &JobLogger) -> Result<DeploymentSummary> {
        let lock = self.store.acquire_lock(&generate_holder_id()).await?;
        let heartbeat = spawn_lock_heartbeat(Arc::clone(&self.store), lock.clone());

        let result = self.run_locked(&plans, job, logger).await;

        heartbeat.abort();
        heartbeat.await.ok();
        if let Err(err) = self.store.release_lock(&lock.lock_id).await {
            error!("Could not release run lock {}: {err}", lock.lock_id);
        }
        result
    }

    async fn run_locked(&self, selected: &PlanSet, job: &JobResult, logger: &JobLogger) -> Result<DeploymentSummary> {
        // The caller's rows may predate another run that finished since.
        let plans = self.store.plans(&selected.ids()).await?;
        self.check_preconditions(&plans, logger).await?;
        self.store.save_job_result(job).await?;

        let statuses = TaskStatuses {
            in_progress: self.store.status_by_name(IN_PROGRESS).await?,
            completed: self.store.status_by_name(COMPLETED).await?,
            failed: self.store.status_by_name(FAILED).await?,
        };

        let devices = self.store.devices(&plans.device_ids()).await?;
        let inventory = Inventory::build(
            devices,
            self.credentials.as_ref(),
            self.dispatcher.registry(),
            InventoryDefaults::now(),
        )?;
        info!(
            "Deploying {} plan(s) to {} device(s), commit {}",
            plans.len(),
            inventory.len(),
            self.commit
        );

        let ctx = Arc::new(DeploymentContext {
            store: Arc::clone(&self.store),
            dispatcher: self.dispatcher.clone(),
            plans,
            job_id: job.id,
            commit: self.commit,
            logger: logger.clone(),
            statuses,
        });

        let devices = self
            .runner
            .run(inventory.into_hosts(), |host| run_deployment(host, Arc::clone(&ctx)))
            .await?;

        let summary = DeploymentSummary {
            job_id: job.id,
            commit: self.commit,
            devices,
        };
        debug!("{summary}");
        logger.debug(None, "Completed configuration deployment.");
        Ok(summary)
    }
}

/// Refreshes the run lock every third of its ttl until aborted.
fn spawn_lock_heartbeat(store: Arc<dyn PlanStore>, lock: LockInfo) -> JoinHandle<()> {
    let period = (lock.ttl() / 3).max(Duration::from_millis(10));
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(period).await;
            match store.refresh_lock(&lock.lock_id).await {
                Ok(refreshed) => debug!("Run lock {} held until {}", refreshed.lock_id, refreshed.expires_at),
                Err(err) => warn!("Could not refresh run lock {}: {err}", lock.lock_id),
            }
        }
    })
}

impl std::fmt::Debug for ConfigDeployment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigDeployment")
            .field("store", &self.store.backend_type())
            .field("dispatcher", &self.dispatcher)
            .field("runner", &self.runner)
            .field("commit", &self.commit)
            .field("not_approved_status", &self.not_approved_status)
            .finish_non_exhaustive()
    }
}
