//! Domain model for golden config deployment.
//!
//! These types mirror the records owned by the source-of-truth platform:
//! devices and their platforms, config plans, the shared status registry,
//! job results with their structured log, and git repositories.

mod device;
mod job;
mod plan;
mod repository;
mod secret;
mod status;

pub use device::{Device, Platform};
pub use job::{JobResult, JobStatus, LogEntry, LogLevel};
pub use plan::{ConfigPlan, PlanSet, PlanType};
pub use repository::GitRepository;
pub use secret::{AccessType, SecretType};
pub use status::{Status, StatusRegistry, APPROVED, COMPLETED, FAILED, IN_PROGRESS, NOT_APPROVED};
