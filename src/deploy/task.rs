//! Per-device deployment task.
//!
//! Within one device the order is fixed: stamp the job result, mark the
//! plans in progress, dispatch, then set the terminal status. Failures on
//! the device are recorded on its plans and in the job log; they are never
//! returned as errors.

use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

use crate::dispatch::{Dispatcher, CHECK_CONNECTIVITY};
use crate::error::Result;
use crate::inventory::Host;
use crate::joblog::JobLogger;
use crate::models::{Device, PlanSet, Status};
use crate::store::{PlanStore, PlanUpdate};

use super::outcome::{payload_digest, DeviceOutcome, DeviceReport};

pub(crate) const FAILED_MESSAGE: &str = "Failed deployment to the device.";
pub(crate) const NOTHING_DEPLOYED_MESSAGE: &str = "Nothing was deployed to the device.";
pub(crate) const DEPLOYED_MESSAGE: &str = "Successfully deployed configuration to device.";
pub(crate) const NOT_COMMITTED_MESSAGE: &str = "Commit not enabled. Configuration not deployed to device.";
pub(crate) const UNEXPECTED_MESSAGE: &str =
    "Driver reported a failure without changing the device; marking plans as failed.";

/// Status records used by the task.
#[derive(Debug, Clone)]
pub(crate) struct TaskStatuses {
    pub(crate) in_progress: Status,
    pub(crate) completed: Status,
    pub(crate) failed: Status,
}

/// State shared by every per-device task of a run.
pub(crate) struct DeploymentContext {
    pub(crate) store: Arc<dyn PlanStore>,
    pub(crate) dispatcher: Dispatcher,
    pub(crate) plans: PlanSet,
    pub(crate) job_id: Uuid,
    pub(crate) commit: bool,
    pub(crate) logger: JobLogger,
    pub(crate) statuses: TaskStatuses,
}

/// Deploys the plans of one host.
pub(crate) async fn run_deployment(host: Host, ctx: Arc<DeploymentContext>) -> DeviceReport {
    let device = host.device();
    let plan_ids: Vec<Uuid> = ctx.plans.for_device(device.id).map(|p| p.id).collect();

    let mut report = DeviceReport {
        device: device.name.clone(),
        device_id: device.id,
        plans: plan_ids.len(),
        outcome: DeviceOutcome::NotCommitted,
        payload_digest: String::new(),
        result: None,
        error: None,
    };

    if let Err(err) = ctx
        .store
        .update_plans(&plan_ids, &PlanUpdate::deploy_result(ctx.job_id))
        .await
    {
        record_store_failure(&ctx, device, &plan_ids, &err.to_string(), &mut report).await;
        return report;
    }

    let payload = ctx
        .plans
        .for_device(device.id)
        .map(|p| p.config_set.as_str())
        .collect::<Vec<_>>()
        .join("\n");
    report.payload_digest = payload_digest(&payload);
    ctx.logger
        .debug(Some(device), &format!("Consolidated config set: {payload}"));

    if !ctx.commit {
        ctx.logger.info(Some(device), NOT_COMMITTED_MESSAGE);
        return report;
    }

    if let Err(err) = set_status(&ctx, &plan_ids, &ctx.statuses.in_progress).await {
        record_store_failure(&ctx, device, &plan_ids, &err.to_string(), &mut report).await;
        return report;
    }

    let params = ctx
        .dispatcher
        .dispatch_params(CHECK_CONNECTIVITY, host.network_driver());
    let outcome = match ctx.dispatcher.push(&host, &payload, &params).await {
        Ok(result) => {
            report.result = result.result;
            DeviceOutcome::from_push(result.changed, result.failed)
        }
        Err(err) => {
            warn!("Deployment to {} failed: {err}", device.name);
            report.error = Some(err.to_string());
            DeviceOutcome::TransportFailed
        }
    };

    let terminal = if outcome.is_success() {
        &ctx.statuses.completed
    } else {
        &ctx.statuses.failed
    };
    if let Err(err) = set_status(&ctx, &plan_ids, terminal).await {
        record_store_failure(&ctx, device, &plan_ids, &err.to_string(), &mut report).await;
        return report;
    }

    match outcome {
        DeviceOutcome::Deployed => ctx.logger.success(Some(device), DEPLOYED_MESSAGE),
        DeviceOutcome::NothingToDeploy => ctx.logger.success(Some(device), NOTHING_DEPLOYED_MESSAGE),
        DeviceOutcome::Unexpected => {
            ctx.logger.warning(Some(device), UNEXPECTED_MESSAGE);
            ctx.logger.failure(Some(device), FAILED_MESSAGE);
        }
        _ => ctx.logger.failure(Some(device), FAILED_MESSAGE),
    }

    report.outcome = outcome;
    report
}

async fn set_status(ctx: &DeploymentContext, plan_ids: &[Uuid], status: &Status) -> Result<usize> {
    ctx.store
        .update_plans(plan_ids, &PlanUpdate::status(status))
        .await
}

/// Records a plan store failure as a per-device failure and makes a best
/// effort to leave the plans `Failed`.
async fn record_store_failure(
    ctx: &DeploymentContext,
    device: &Device,
    plan_ids: &[Uuid],
    message: &str,
    report: &mut DeviceReport,
) {
    warn!("Plan update for {} failed: {message}", device.name);
    if let Err(err) = set_status(ctx, plan_ids, &ctx.statuses.failed).await {
        warn!("Could not mark plans of {} as failed: {err}", device.name);
    }
    ctx.logger.failure(Some(device), FAILED_MESSAGE);
    report.outcome = DeviceOutcome::Error;
    report.error = Some(message.to_string());
}
