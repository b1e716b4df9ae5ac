//! Driver dispatch module.
//!
//! This module maps device platforms to push drivers and runs pushes
//! through them:
//! - The `ConfigDriver` capability and its `PushResult`
//! - The driver registry built from the settings
//! - The dispatcher applying connectivity tests and push timeouts
//! - The HTTP push driver for JSON management APIs

mod dispatcher;
mod driver;
mod http;
mod registry;

pub use dispatcher::{CHECK_CONNECTIVITY, DispatchParams, Dispatcher};
#[cfg(test)]
pub use driver::MockConfigDriver;
pub use driver::{ConfigDriver, PushResult};
pub use http::HttpPushDriver;
pub use registry::DriverRegistry;
