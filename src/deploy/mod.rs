//! Config plan deployment.
//!
//! The orchestrator checks the selected plans, then runs one task per
//! device. Each task consolidates the device's plans into a single payload,
//! pushes it through the driver dispatcher and records the outcome on the
//! plans and in the job log.

mod approval;
mod orchestrator;
mod outcome;
mod task;

pub use approval::approve_plans;
pub use orchestrator::ConfigDeployment;
pub use outcome::{payload_digest, DeploymentSummary, DeviceOutcome, DeviceReport};
