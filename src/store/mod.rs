//! Plan store module for the golden config deployment system.
//!
//! This module provides persistent storage for devices, config plans, the
//! status registry and job results, plus the run lock that keeps two
//! deployment runs apart.

mod backend;
mod data;
mod import;
mod local;
mod lock;
mod memory;

pub use backend::{PlanStore, PlanUpdate};
pub use data::{DATA_VERSION, PlanData};
pub use import::{ImportReport, PlanImport, PlanRecord};
pub use local::LocalPlanStore;
pub use lock::{LOCK_EXPIRY, LockInfo, generate_holder_id};
pub use memory::MemoryPlanStore;
