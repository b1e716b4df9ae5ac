//! End-to-end deployment runs against the in-memory and JSON file stores.

use async_trait::async_trait;
use secrecy::SecretString;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use uuid::Uuid;

use golden_config_deploy::credentials::{Credentials, CredentialsProvider};
use golden_config_deploy::error::{
    DeployError, DispatchError, GoldenConfigError, StoreError, NOT_APPROVED_MESSAGE,
};
use golden_config_deploy::filters::ConfigPlanFilter;
use golden_config_deploy::models::{
    ConfigPlan, Device, JobResult, JobStatus, LogLevel, PlanSet, PlanType, Status, StatusRegistry, APPROVED,
    COMPLETED, FAILED, NOT_APPROVED,
};
use golden_config_deploy::store::{LockInfo, PlanUpdate};
use golden_config_deploy::{
    ConfigDeployment, ConfigDriver, DeviceOutcome, Dispatcher, DriverRegistry, Host, LocalPlanStore,
    MemoryPlanStore, PlanStore, PushResult, Runner,
};

/// Driver answering from a per-device script and recording every push.
#[derive(Default)]
struct ScriptedDriver {
    replies: HashMap<String, Reply>,
    pushes: Mutex<Vec<(String, String)>>,
}

#[derive(Clone, Copy)]
enum Reply {
    Push(bool, bool),
    Refused,
    Slow(Duration),
}

impl ScriptedDriver {
    fn reply(mut self, device: &str, reply: Reply) -> Self {
        self.replies.insert(device.to_string(), reply);
        self
    }

    fn pushes(&self) -> Vec<(String, String)> {
        self.pushes.lock().expect("lock").clone()
    }
}

#[async_trait]
impl ConfigDriver for ScriptedDriver {
    async fn push(&self, host: &Host, config: &str) -> Result<PushResult, DispatchError> {
        self.pushes
            .lock()
            .expect("lock")
            .push((host.name().to_string(), config.to_string()));
        match self.replies.get(host.name()).copied().unwrap_or(Reply::Push(true, false)) {
            Reply::Push(changed, failed) => Ok(PushResult::new(changed, failed)),
            Reply::Refused => Err(DispatchError::transport(host.name(), "connection refused")),
            Reply::Slow(delay) => {
                tokio::time::sleep(delay).await;
                Ok(PushResult::new(true, false))
            }
        }
    }

    async fn check_connectivity(&self, _host: &Host) -> Result<(), DispatchError> {
        Ok(())
    }
}

struct StaticCredentials;

impl CredentialsProvider for StaticCredentials {
    fn credentials_for(&self, _device: &Device) -> golden_config_deploy::Result<Credentials> {
        Ok(Credentials {
            username: String::from("netops"),
            password: SecretString::from(String::from("netops")),
            secret: None,
        })
    }
}

/// Builds a deployment over any store, with `ios` devices routed to `driver`.
fn deployment_on(store: Arc<dyn PlanStore>, driver: &Arc<ScriptedDriver>) -> ConfigDeployment {
    let mut registry = DriverRegistry::new().with_platform_map(HashMap::from([(
        String::from("ios"),
        String::from("cisco_ios"),
    )]));
    let driver: Arc<dyn ConfigDriver> = Arc::clone(driver) as Arc<dyn ConfigDriver>;
    registry.register("cisco_ios", driver);
    ConfigDeployment::new(store, Dispatcher::new(registry), Arc::new(StaticCredentials))
        .with_runner(Runner::threaded(4))
}

async fn add_plans_to(store: &dyn PlanStore, device: &str, status: &str, configs: &[&str]) -> Device {
    let device = Device::new(device).with_platform("Cisco IOS", "ios");
    store.upsert_device(device.clone()).await.expect("device");
    let status = store.status_by_name(status).await.expect("status");
    for config in configs {
        let plan = ConfigPlan::new(device.id, PlanType::Remediation, config, &status);
        store.insert_plan(plan).await.expect("plan");
    }
    device
}

struct Fixture {
    store: Arc<MemoryPlanStore>,
    driver: Arc<ScriptedDriver>,
}

impl Fixture {
    fn new(driver: ScriptedDriver) -> Self {
        Self::with_store(MemoryPlanStore::new(), driver)
    }

    fn with_store(store: MemoryPlanStore, driver: ScriptedDriver) -> Self {
        Self {
            store: Arc::new(store),
            driver: Arc::new(driver),
        }
    }

    async fn add_plans(&self, device: &str, status: &str, configs: &[&str]) -> Device {
        add_plans_to(self.store.as_ref(), device, status, configs).await
    }

    fn deployment(&self) -> ConfigDeployment {
        let store: Arc<dyn PlanStore> = Arc::clone(&self.store) as Arc<dyn PlanStore>;
        deployment_on(store, &self.driver)
    }

    async fn plans(&self) -> golden_config_deploy::models::PlanSet {
        self.store.list_plans(&ConfigPlanFilter::new()).await.expect("plans")
    }

    async fn plans_of(&self, device: &Device) -> Vec<ConfigPlan> {
        self.plans().await.for_device(device.id).cloned().collect()
    }

    async fn status_id(&self, name: &str) -> uuid::Uuid {
        self.store.status_by_name(name).await.expect("status").id
    }
}

#[tokio::test]
async fn test_two_plans_are_pushed_as_one_payload() {
    let fixture = Fixture::new(ScriptedDriver::default());
    let device = fixture.add_plans("edge-a", APPROVED, &["line1", "line2"]).await;

    let mut job = JobResult::new("deploy");
    let summary = fixture
        .deployment()
        .deploy(fixture.plans().await, LogLevel::Debug, &mut job)
        .await
        .expect("deploy");

    assert_eq!(
        fixture.driver.pushes(),
        vec![(String::from("edge-a"), String::from("line1\nline2"))]
    );
    assert_eq!(summary.device("edge-a").map(|d| d.outcome), Some(DeviceOutcome::Deployed));

    let completed = fixture.status_id(COMPLETED).await;
    for plan in fixture.plans_of(&device).await {
        assert_eq!(plan.status, completed);
        assert_eq!(plan.deploy_result, Some(job.id));
    }

    assert!(job
        .entries_for("edge-a")
        .any(|e| e.level == LogLevel::Debug && e.message == "Consolidated config set: line1\nline2"));
    assert!(job
        .entries_for("edge-a")
        .any(|e| e.level == LogLevel::Success && e.message == "Successfully deployed configuration to device."));
}

#[tokio::test]
async fn test_unapproved_plan_aborts_the_whole_run() {
    let fixture = Fixture::new(ScriptedDriver::default());
    fixture.add_plans("edge-a", APPROVED, &["ntp server 10.0.0.1"]).await;
    fixture.add_plans("edge-b", NOT_APPROVED, &["ntp server 10.0.0.2"]).await;
    let before = fixture.plans().await;

    let mut job = JobResult::new("deploy");
    let err = fixture
        .deployment()
        .deploy(before.clone(), LogLevel::Info, &mut job)
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), format!("Deployment error: {NOT_APPROVED_MESSAGE}"));
    assert!(fixture.driver.pushes().is_empty());
    assert_eq!(fixture.plans().await, before);
    assert!(job.log.iter().any(|e| e.level == LogLevel::Failure && e.message == NOT_APPROVED_MESSAGE));
}

#[tokio::test]
async fn test_completed_plan_aborts_with_its_own_message() {
    let fixture = Fixture::new(ScriptedDriver::default());
    fixture.add_plans("edge-a", APPROVED, &["a"]).await;
    fixture.add_plans("edge-b", COMPLETED, &["b"]).await;
    let before = fixture.plans().await;

    let mut job = JobResult::new("deploy");
    let err = fixture
        .deployment()
        .deploy(before.clone(), LogLevel::Info, &mut job)
        .await
        .unwrap_err();

    assert!(matches!(err, GoldenConfigError::Deploy(DeployError::PlansAlreadyCompleted)));
    assert_ne!(err.to_string(), format!("Deployment error: {NOT_APPROVED_MESSAGE}"));
    assert!(fixture.driver.pushes().is_empty());
    assert_eq!(fixture.plans().await, before);
}

#[tokio::test]
async fn test_transport_error_fails_only_that_device() {
    let fixture = Fixture::new(ScriptedDriver::default().reply("edge-b", Reply::Refused));
    let ok = fixture.add_plans("edge-a", APPROVED, &["a"]).await;
    let refused = fixture.add_plans("edge-b", APPROVED, &["b1", "b2"]).await;

    let mut job = JobResult::new("deploy");
    let summary = fixture
        .deployment()
        .deploy(fixture.plans().await, LogLevel::Info, &mut job)
        .await
        .expect("per-device failures are not raised");

    assert_eq!(summary.succeeded(), 1);
    assert_eq!(summary.count(DeviceOutcome::TransportFailed), 1);
    assert_eq!(job.status, JobStatus::Failed);

    let completed = fixture.status_id(COMPLETED).await;
    let failed = fixture.status_id(FAILED).await;
    assert!(fixture.plans_of(&ok).await.iter().all(|p| p.status == completed));
    assert!(fixture.plans_of(&refused).await.iter().all(|p| p.status == failed));
    assert!(fixture
        .plans_of(&refused)
        .await
        .iter()
        .all(|p| p.deploy_result == Some(job.id)));
    assert!(job
        .entries_for("edge-b")
        .any(|e| e.level == LogLevel::Failure && e.message == "Failed deployment to the device."));
}

#[tokio::test]
async fn test_nothing_to_deploy_is_distinguishable() {
    let fixture = Fixture::new(ScriptedDriver::default().reply("edge-a", Reply::Push(false, false)));
    let device = fixture.add_plans("edge-a", APPROVED, &["a"]).await;

    let mut job = JobResult::new("deploy");
    fixture
        .deployment()
        .deploy(fixture.plans().await, LogLevel::Info, &mut job)
        .await
        .expect("deploy");

    let completed = fixture.status_id(COMPLETED).await;
    assert!(fixture.plans_of(&device).await.iter().all(|p| p.status == completed));
    let messages: Vec<&str> = job.entries_for("edge-a").map(|e| e.message.as_str()).collect();
    assert!(messages.contains(&"Nothing was deployed to the device."));
    assert!(!messages.contains(&"Successfully deployed configuration to device."));
}

#[tokio::test]
async fn test_reverted_and_unexpected_results_fail() {
    let fixture = Fixture::new(
        ScriptedDriver::default()
            .reply("edge-a", Reply::Push(true, true))
            .reply("edge-b", Reply::Push(false, true)),
    );
    fixture.add_plans("edge-a", APPROVED, &["a"]).await;
    fixture.add_plans("edge-b", APPROVED, &["b"]).await;

    let mut job = JobResult::new("deploy");
    let summary = fixture
        .deployment()
        .deploy(fixture.plans().await, LogLevel::Info, &mut job)
        .await
        .expect("deploy");

    assert_eq!(summary.device("edge-a").map(|d| d.outcome), Some(DeviceOutcome::Reverted));
    assert_eq!(summary.device("edge-b").map(|d| d.outcome), Some(DeviceOutcome::Unexpected));
    let failed = fixture.status_id(FAILED).await;
    assert!(fixture.plans().await.iter().all(|p| p.status == failed));
    assert!(job.entries_for("edge-b").any(|e| e.level == LogLevel::Warning));
}

#[tokio::test]
async fn test_non_commit_mode_leaves_statuses_alone() {
    let fixture = Fixture::new(ScriptedDriver::default());
    let device = fixture.add_plans("edge-a", APPROVED, &["a"]).await;

    let mut job = JobResult::new("deploy");
    let summary = fixture
        .deployment()
        .with_commit(false)
        .deploy(fixture.plans().await, LogLevel::Info, &mut job)
        .await
        .expect("deploy");

    assert!(fixture.driver.pushes().is_empty());
    assert_eq!(summary.count(DeviceOutcome::NotCommitted), 1);

    let approved = fixture.status_id(APPROVED).await;
    for plan in fixture.plans_of(&device).await {
        assert_eq!(plan.status, approved);
        assert_eq!(plan.deploy_result, Some(job.id));
    }
    assert!(job.entries_for("edge-a").any(|e| e.level == LogLevel::Info
        && e.message == "Commit not enabled. Configuration not deployed to device."));
}

#[tokio::test]
async fn test_serial_runner_deploys_every_device() {
    let fixture = Fixture::new(ScriptedDriver::default());
    for name in ["r1", "r2", "r3"] {
        fixture.add_plans(name, APPROVED, &["hostname"]).await;
    }

    let mut job = JobResult::new("deploy");
    let summary = fixture
        .deployment()
        .with_runner(Runner::serial())
        .deploy(fixture.plans().await, LogLevel::Info, &mut job)
        .await
        .expect("deploy");

    assert_eq!(summary.total(), 3);
    assert!(summary.all_successful());
    let pushed: Vec<String> = fixture.driver.pushes().into_iter().map(|(d, _)| d).collect();
    assert_eq!(pushed, vec!["r1", "r2", "r3"]);

    let saved = fixture.store.get_job_result(job.id).await.expect("job").expect("saved");
    assert_eq!(saved.status, JobStatus::Completed);
}

#[tokio::test]
async fn test_device_without_platform_is_an_orchestration_error() {
    let fixture = Fixture::new(ScriptedDriver::default());
    let device = Device::new("bare");
    fixture.store.upsert_device(device.clone()).await.expect("device");
    let approved = fixture.store.status_by_name(APPROVED).await.expect("status");
    fixture
        .store
        .insert_plan(ConfigPlan::new(device.id, PlanType::Manual, "x", &approved))
        .await
        .expect("plan");

    let mut job = JobResult::new("deploy");
    let err = fixture
        .deployment()
        .deploy(fixture.plans().await, LogLevel::Info, &mut job)
        .await
        .unwrap_err();

    assert!(matches!(err, GoldenConfigError::Deploy(DeployError::Orchestration { .. })));
    assert_eq!(job.status, JobStatus::Errored);
    assert!(fixture.plans().await.iter().all(|p| p.status == approved.id));
}

#[tokio::test]
async fn test_concurrent_run_is_refused_by_the_lock() {
    let fixture = Fixture::new(ScriptedDriver::default());
    fixture.add_plans("edge-a", APPROVED, &["a"]).await;
    let held = fixture.store.acquire_lock("other-run").await.expect("lock");

    let mut job = JobResult::new("deploy");
    let err = fixture
        .deployment()
        .deploy(fixture.plans().await, LogLevel::Info, &mut job)
        .await
        .unwrap_err();

    assert!(err.to_string().contains("E3011: "));
    assert!(fixture.driver.pushes().is_empty());
    fixture.store.release_lock(&held.lock_id).await.expect("release");
}

#[tokio::test]
async fn test_slow_push_past_the_timeout_fails_the_device() {
    let fixture = Fixture::new(ScriptedDriver::default().reply("edge-a", Reply::Slow(Duration::from_secs(5))));
    let slow = fixture.add_plans("edge-a", APPROVED, &["a"]).await;
    let quick = fixture.add_plans("edge-b", APPROVED, &["b"]).await;

    let mut registry = DriverRegistry::new().with_platform_map(HashMap::from([(
        String::from("ios"),
        String::from("cisco_ios"),
    )]));
    registry.register("cisco_ios", Arc::clone(&fixture.driver) as Arc<dyn ConfigDriver>);
    let dispatcher = Dispatcher::new(registry).with_push_timeout(Duration::from_millis(100));
    let store: Arc<dyn PlanStore> = Arc::clone(&fixture.store) as Arc<dyn PlanStore>;

    let mut job = JobResult::new("deploy");
    let summary = ConfigDeployment::new(store, dispatcher, Arc::new(StaticCredentials))
        .deploy(fixture.plans().await, LogLevel::Info, &mut job)
        .await
        .expect("a timeout stays on its device");

    let report = summary.device("edge-a").expect("report");
    assert_eq!(report.outcome, DeviceOutcome::TransportFailed);
    assert!(report.error.as_deref().is_some_and(|e| e.contains("edge-a")));

    let failed = fixture.status_id(FAILED).await;
    let completed = fixture.status_id(COMPLETED).await;
    assert!(fixture.plans_of(&slow).await.iter().all(|p| p.status == failed));
    assert!(fixture.plans_of(&quick).await.iter().all(|p| p.status == completed));
}

/// Memory store whose plan updates fail for selected plans.
struct FailingUpdates {
    inner: MemoryPlanStore,
    failing: Mutex<Vec<Uuid>>,
}

#[async_trait]
impl PlanStore for FailingUpdates {
    async fn statuses(&self) -> golden_config_deploy::Result<StatusRegistry> {
        self.inner.statuses().await
    }

    async fn status_by_name(&self, name: &str) -> golden_config_deploy::Result<Status> {
        self.inner.status_by_name(name).await
    }

    async fn ensure_status(&self, name: &str) -> golden_config_deploy::Result<Status> {
        self.inner.ensure_status(name).await
    }

    async fn list_devices(&self) -> golden_config_deploy::Result<Vec<Device>> {
        self.inner.list_devices().await
    }

    async fn get_device(&self, reference: &str) -> golden_config_deploy::Result<Device> {
        self.inner.get_device(reference).await
    }

    async fn devices(&self, ids: &[Uuid]) -> golden_config_deploy::Result<Vec<Device>> {
        self.inner.devices(ids).await
    }

    async fn upsert_device(&self, device: Device) -> golden_config_deploy::Result<Uuid> {
        self.inner.upsert_device(device).await
    }

    async fn insert_plan(&self, plan: ConfigPlan) -> golden_config_deploy::Result<()> {
        self.inner.insert_plan(plan).await
    }

    async fn list_plans(&self, filter: &ConfigPlanFilter) -> golden_config_deploy::Result<PlanSet> {
        self.inner.list_plans(filter).await
    }

    async fn get_plan(&self, id: Uuid) -> golden_config_deploy::Result<ConfigPlan> {
        self.inner.get_plan(id).await
    }

    async fn plans(&self, ids: &[Uuid]) -> golden_config_deploy::Result<PlanSet> {
        self.inner.plans(ids).await
    }

    async fn update_plans(&self, ids: &[Uuid], update: &PlanUpdate) -> golden_config_deploy::Result<usize> {
        let failing = self.failing.lock().expect("lock").clone();
        if ids.iter().any(|id| failing.contains(id)) {
            return Err(StoreError::io("disk full").into());
        }
        self.inner.update_plans(ids, update).await
    }

    async fn save_job_result(&self, job: &JobResult) -> golden_config_deploy::Result<()> {
        self.inner.save_job_result(job).await
    }

    async fn get_job_result(&self, id: Uuid) -> golden_config_deploy::Result<Option<JobResult>> {
        self.inner.get_job_result(id).await
    }

    async fn list_job_results(&self) -> golden_config_deploy::Result<Vec<JobResult>> {
        self.inner.list_job_results().await
    }

    async fn acquire_lock(&self, holder: &str) -> golden_config_deploy::Result<LockInfo> {
        self.inner.acquire_lock(holder).await
    }

    async fn refresh_lock(&self, lock_id: &str) -> golden_config_deploy::Result<LockInfo> {
        self.inner.refresh_lock(lock_id).await
    }

    async fn release_lock(&self, lock_id: &str) -> golden_config_deploy::Result<()> {
        self.inner.release_lock(lock_id).await
    }

    fn backend_type(&self) -> &'static str {
        "failing"
    }
}

#[tokio::test]
async fn test_plan_update_failure_stays_on_its_device() {
    let store = Arc::new(FailingUpdates {
        inner: MemoryPlanStore::new(),
        failing: Mutex::new(Vec::new()),
    });
    let broken = add_plans_to(store.as_ref(), "edge-a", APPROVED, &["a"]).await;
    let healthy = add_plans_to(store.as_ref(), "edge-b", APPROVED, &["b"]).await;
    let plans = store.list_plans(&ConfigPlanFilter::new()).await.expect("plans");
    *store.failing.lock().expect("lock") = plans.for_device(broken.id).map(|p| p.id).collect();

    let driver = Arc::new(ScriptedDriver::default());
    let mut job = JobResult::new("deploy");
    let summary = deployment_on(Arc::clone(&store) as Arc<dyn PlanStore>, &driver)
        .deploy(plans, LogLevel::Info, &mut job)
        .await
        .expect("store failures on one device are not raised");

    let report = summary.device("edge-a").expect("report");
    assert_eq!(report.outcome, DeviceOutcome::Error);
    assert!(report.error.as_deref().is_some_and(|e| e.contains("disk full")));
    assert_eq!(summary.device("edge-b").map(|d| d.outcome), Some(DeviceOutcome::Deployed));
    assert_eq!(job.status, JobStatus::Failed);

    assert!(job
        .entries_for("edge-a")
        .any(|e| e.level == LogLevel::Failure && e.message == "Failed deployment to the device."));
    let pushed: Vec<String> = driver.pushes().into_iter().map(|(d, _)| d).collect();
    assert_eq!(pushed, vec!["edge-b"]);

    let completed = store.status_by_name(COMPLETED).await.expect("status");
    let all = store.list_plans(&ConfigPlanFilter::new()).await.expect("plans");
    assert!(all.for_device(healthy.id).all(|p| p.status == completed.id));
}

#[tokio::test]
async fn test_stale_selection_from_another_store_instance_is_rechecked() {
    let temp = TempDir::new().expect("temp dir");
    let path = temp.path().join("data.json");
    let first: Arc<dyn PlanStore> = Arc::new(LocalPlanStore::with_data_path(&path));
    let second: Arc<dyn PlanStore> = Arc::new(LocalPlanStore::with_data_path(&path));
    let driver = Arc::new(ScriptedDriver::default());

    add_plans_to(first.as_ref(), "edge-a", APPROVED, &["a"]).await;
    let stale = second.list_plans(&ConfigPlanFilter::new()).await.expect("plans");

    let mut first_job = JobResult::new("first");
    deployment_on(Arc::clone(&first), &driver)
        .deploy(
            first.list_plans(&ConfigPlanFilter::new()).await.expect("plans"),
            LogLevel::Info,
            &mut first_job,
        )
        .await
        .expect("first run");

    let mut second_job = JobResult::new("second");
    let err = deployment_on(Arc::clone(&second), &driver)
        .deploy(stale, LogLevel::Info, &mut second_job)
        .await
        .unwrap_err();

    assert!(matches!(err, GoldenConfigError::Deploy(DeployError::PlansAlreadyCompleted)));
    assert_eq!(driver.pushes().len(), 1);
    assert_eq!(second_job.status, JobStatus::Failed);

    let saved = second
        .get_job_result(first_job.id)
        .await
        .expect("job")
        .expect("first run's job survives the second run");
    assert_eq!(saved.status, JobStatus::Completed);
    let completed = first.status_by_name(COMPLETED).await.expect("status");
    let plans = first.list_plans(&ConfigPlanFilter::new()).await.expect("plans");
    assert!(plans.iter().all(|p| p.status == completed.id && p.deploy_result == Some(first_job.id)));
}

#[tokio::test]
async fn test_run_longer_than_the_lock_ttl_keeps_the_lock() {
    let fixture = Fixture::with_store(
        MemoryPlanStore::new().with_lock_ttl(Duration::from_millis(300)),
        ScriptedDriver::default().reply("edge-a", Reply::Slow(Duration::from_millis(1000))),
    );
    fixture.add_plans("edge-a", APPROVED, &["a"]).await;

    let mut job = JobResult::new("deploy");
    let deployment = fixture.deployment();
    let plans = fixture.plans().await;
    let (summary, intruder) = tokio::join!(deployment.deploy(plans, LogLevel::Info, &mut job), async {
        tokio::time::sleep(Duration::from_millis(700)).await;
        fixture.store.acquire_lock("second-run").await
    });

    assert!(summary.expect("deploy").all_successful());
    assert!(matches!(
        intruder,
        Err(GoldenConfigError::Store(StoreError::LockedByOther { .. }))
    ));
    fixture.store.acquire_lock("next-run").await.expect("released after the run");
}
