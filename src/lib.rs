// ============================================================================
// Linting
// ============================================================================

#![forbid(unsafe_code)]               // Unsafe code is forbidden
#![warn(missing_docs)]                // All public items must be documented
#![deny(non_camel_case_types)]        // Types must follow CamelCase convention
#![deny(unused_must_use)]             // Must handle Result and Option explicitly
#![deny(nonstandard_style)]           // Non-standard code style is forbidden

// Clippy lints (warnings only)
#![warn(clippy::all)]                 // All standard Clippy lints
#![warn(clippy::pedantic)]            // Very strict Clippy lints
#![warn(clippy::nursery)]             // Experimental lints
#![warn(clippy::unwrap_used)]         // unwrap() warning
#![warn(clippy::expect_used)]         // expect() warning
#![warn(clippy::todo)]                // TODO warning
#![warn(clippy::unimplemented)]       // unimplemented!() warning
#![warn(clippy::redundant_clone)]     // Useless clones warning
#![warn(clippy::cognitive_complexity)] // Limit cognitive complexity
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

// ============================================================================
// Crate Documentation
// ============================================================================

//! # Golden Config Deploy
//!
//! Deploys approved golden config plans to network devices.
//!
//! ## Overview
//!
//! A config plan is one unit of proposed configuration for one device. Plans
//! are imported, reviewed and approved, then deployed in a single run:
//!
//! - Runs refuse plan sets holding unapproved or already completed plans
//! - Every device gets one consolidated payload built from its plans
//! - Devices are deployed in parallel with a bounded number of workers
//! - Each device's plans end `Completed` or `Failed` and the run keeps a
//!   structured, per-device job log
//!
//! ## Architecture
//!
//! 1. **Plan store**: devices, plans, statuses and job results
//! 2. **Inventory**: one host per device, with credentials and its driver
//! 3. **Runner**: executes the per-device task for every host
//! 4. **Dispatcher**: pushes the payload through a registered driver
//!
//! ## Modules
//!
//! - [`config`]: Settings parsing and validation
//! - [`store`]: Plan store backends (memory, JSON file)
//! - [`deploy`]: Deployment orchestrator and per-device task
//! - [`dispatch`]: Driver registry and push dispatch
//! - [`inventory`]: Device-scoped inventory
//! - [`secrets`]: Secrets group resolution
//! - [`cli`]: Command-line interface
//!
//! ## Example
//!
//! ```yaml
//! deploy:
//!   commit: true
//! runner:
//!   strategy: threaded
//!   num_workers: 20
//! platform_network_driver_map:
//!   ios: cisco_ios
//! drivers:
//!   cisco_ios:
//!     scheme: https
//!     path: /api/config
//! ```

// ============================================================================
// Modules
// ============================================================================

pub mod cli;
pub mod config;
pub mod credentials;
pub mod deploy;
pub mod dispatch;
pub mod error;
pub mod filters;
pub mod inventory;
pub mod joblog;
pub mod models;
pub mod runner;
pub mod secrets;
pub mod store;

// ============================================================================
// Re-exports
// ============================================================================

pub use cli::{Cli, Commands, OutputFormatter};
pub use config::{Settings, SettingsParser, SettingsValidator};
pub use deploy::{approve_plans, ConfigDeployment, DeploymentSummary, DeviceOutcome};
pub use dispatch::{ConfigDriver, Dispatcher, DriverRegistry, PushResult};
pub use error::{GoldenConfigError, Result};
pub use inventory::{Host, Inventory, InventoryDefaults};
pub use runner::Runner;
pub use store::{LocalPlanStore, MemoryPlanStore, PlanStore};
