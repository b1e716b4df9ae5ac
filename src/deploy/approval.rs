//! Plan approval.

use tracing::info;
use uuid::Uuid;

use crate::error::{DeployError, Result};
use crate::models::{APPROVED, COMPLETED};
use crate::store::{PlanStore, PlanUpdate};

/// Marks plans as `Approved`.
///
/// Nothing is changed if any of the plans is already completed.
///
/// # Errors
///
/// Returns `DeployError::PlansAlreadyCompleted` if a plan is completed and a
/// store error if a plan does not exist.
pub async fn approve_plans(store: &dyn PlanStore, ids: &[Uuid]) -> Result<usize> {
    let completed = store.status_by_name(COMPLETED).await?;
    for id in ids {
        if store.get_plan(*id).await?.status == completed.id {
            return Err(DeployError::PlansAlreadyCompleted.into());
        }
    }

    let approved = store.ensure_status(APPROVED).await?;
    let updated = store.update_plans(ids, &PlanUpdate::status(&approved)).await?;
    info!("Approved {updated} plan(s)");
    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{GoldenConfigError, StoreError};
    use crate::models::{ConfigPlan, Device, PlanType, NOT_APPROVED};
    use crate::store::MemoryPlanStore;

    async fn plan(store: &MemoryPlanStore, status: &str) -> Uuid {
        let device = Device::new("edge-1");
        let device_id = store.upsert_device(device).await.expect("device");
        let status = store.status_by_name(status).await.expect("status");
        let plan = ConfigPlan::new(device_id, PlanType::Remediation, "ntp server 10.0.0.1", &status);
        let id = plan.id;
        store.insert_plan(plan).await.expect("plan");
        id
    }

    #[tokio::test]
    async fn test_approve_sets_status() {
        let store = MemoryPlanStore::new();
        let id = plan(&store, NOT_APPROVED).await;

        assert_eq!(approve_plans(&store, &[id]).await.expect("approve"), 1);

        let approved = store.status_by_name(APPROVED).await.expect("status");
        assert_eq!(store.get_plan(id).await.expect("plan").status, approved.id);
    }

    #[tokio::test]
    async fn test_completed_plan_is_refused() {
        let store = MemoryPlanStore::new();
        let pending = plan(&store, NOT_APPROVED).await;
        let done = plan(&store, COMPLETED).await;

        let err = approve_plans(&store, &[pending, done]).await.unwrap_err();
        assert!(matches!(err, GoldenConfigError::Deploy(DeployError::PlansAlreadyCompleted)));

        let not_approved = store.status_by_name(NOT_APPROVED).await.expect("status");
        assert_eq!(store.get_plan(pending).await.expect("plan").status, not_approved.id);
    }

    #[tokio::test]
    async fn test_unknown_plan() {
        let store = MemoryPlanStore::new();
        let err = approve_plans(&store, &[Uuid::new_v4()]).await.unwrap_err();
        assert!(matches!(err, GoldenConfigError::Store(StoreError::PlanNotFound { .. })));
    }
}
