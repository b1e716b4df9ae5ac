//! Driver dispatch.
//!
//! Resolves the driver for a host and runs a push through it, with an
//! optional connectivity test and an optional upper bound on push time.

use serde::Serialize;
use std::time::Duration;
use tracing::{debug, info};

use crate::config::Settings;
use crate::error::DispatchError;
use crate::inventory::Host;

use super::driver::PushResult;
use super::registry::DriverRegistry;

/// Operation name of the connectivity test.
pub const CHECK_CONNECTIVITY: &str = "check_connectivity";

/// Parameters handed to the dispatcher for one operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DispatchParams {
    /// Operation name.
    pub method: String,
    /// Dispatch driver identifier derived from the platform.
    pub driver: String,
    /// Whether to test connectivity before running the operation.
    pub connectivity_test: bool,
}

/// Runs pushes through the driver registry.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    registry: DriverRegistry,
    connectivity_test: bool,
    push_timeout: Option<Duration>,
}

impl Dispatcher {
    /// Creates a dispatcher without connectivity tests or timeouts.
    #[must_use]
    pub const fn new(registry: DriverRegistry) -> Self {
        Self {
            registry,
            connectivity_test: false,
            push_timeout: None,
        }
    }

    /// Creates a dispatcher configured by the settings.
    #[must_use]
    pub fn from_settings(registry: DriverRegistry, settings: &Settings) -> Self {
        Self {
            registry,
            connectivity_test: settings.inventory.connectivity_test,
            push_timeout: settings.deploy.push_timeout_secs.map(Duration::from_secs),
        }
    }

    /// Enables or disables the connectivity test.
    #[must_use]
    pub const fn with_connectivity_test(mut self, enabled: bool) -> Self {
        self.connectivity_test = enabled;
        self
    }

    /// Bounds each push.
    #[must_use]
    pub const fn with_push_timeout(mut self, timeout: Duration) -> Self {
        self.push_timeout = Some(timeout);
        self
    }

    /// Returns the driver registry.
    #[must_use]
    pub const fn registry(&self) -> &DriverRegistry {
        &self.registry
    }

    /// Builds the parameters for an operation on a platform.
    #[must_use]
    pub fn dispatch_params(&self, method: &str, network_driver: &str) -> DispatchParams {
        DispatchParams {
            method: method.to_string(),
            driver: self.registry.get_platform(network_driver).to_string(),
            connectivity_test: self.connectivity_test,
        }
    }

    /// Pushes configuration to a host.
    ///
    /// # Errors
    ///
    /// Returns `UnknownDriver` for unregistered drivers, the driver's error
    /// if the connectivity test or push fails, and `Timeout` when the push
    /// exceeds its bound.
    pub async fn push(
        &self,
        host: &Host,
        config: &str,
        params: &DispatchParams,
    ) -> Result<PushResult, DispatchError> {
        let driver = self.registry.resolve(&params.driver)?;

        if params.connectivity_test {
            debug!("Running {} for {}", params.method, host.name());
            driver.check_connectivity(host).await?;
        }

        info!("Pushing configuration to {} with driver {}", host.name(), params.driver);
        let push = driver.push(host, config);
        match self.push_timeout {
            Some(limit) => tokio::time::timeout(limit, push)
                .await
                .map_err(|_| DispatchError::Timeout {
                    device: host.name().to_string(),
                    secs: limit.as_secs(),
                })?,
            None => push.await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::Credentials;
    use crate::dispatch::{ConfigDriver, MockConfigDriver};
    use crate::inventory::InventoryDefaults;
    use crate::models::Device;
    use secrecy::SecretString;
    use std::collections::HashMap;
    use std::sync::Arc;

    fn host() -> Host {
        let credentials = Credentials {
            username: String::from("admin"),
            password: SecretString::from(String::from("admin")),
            secret: None,
        };
        Host::new(
            Device::new("edge-1").with_platform("Cisco IOS", "ios"),
            "cisco_ios",
            credentials,
            Arc::new(InventoryDefaults::now()),
        )
    }

    /// Driver whose pushes take a fixed time.
    struct SlowDriver(Duration);

    #[async_trait::async_trait]
    impl ConfigDriver for SlowDriver {
        async fn push(&self, _host: &Host, _config: &str) -> Result<PushResult, DispatchError> {
            tokio::time::sleep(self.0).await;
            Ok(PushResult::new(true, false))
        }

        async fn check_connectivity(&self, _host: &Host) -> Result<(), DispatchError> {
            Ok(())
        }
    }

    fn dispatcher_with(driver: Arc<dyn ConfigDriver>) -> Dispatcher {
        let mut registry = DriverRegistry::new().with_platform_map(HashMap::from([(
            String::from("ios"),
            String::from("cisco_ios"),
        )]));
        registry.register("cisco_ios", driver);
        Dispatcher::new(registry)
    }

    fn dispatcher(driver: MockConfigDriver) -> Dispatcher {
        dispatcher_with(Arc::new(driver))
    }

    #[test]
    fn test_dispatch_params_map_platform() {
        let dispatcher = dispatcher(MockConfigDriver::new()).with_connectivity_test(true);
        let params = dispatcher.dispatch_params(CHECK_CONNECTIVITY, "ios");
        assert_eq!(
            params,
            DispatchParams {
                method: String::from(CHECK_CONNECTIVITY),
                driver: String::from("cisco_ios"),
                connectivity_test: true,
            }
        );
    }

    #[tokio::test]
    async fn test_push_skips_connectivity_when_disabled() {
        let mut driver = MockConfigDriver::new();
        driver.expect_check_connectivity().never();
        driver
            .expect_push()
            .withf(|_, config| config == "line1\nline2")
            .times(1)
            .returning(|_, _| Ok(PushResult::new(true, false)));

        let dispatcher = dispatcher(driver);
        let params = dispatcher.dispatch_params(CHECK_CONNECTIVITY, "ios");
        let result = dispatcher.push(&host(), "line1\nline2", &params).await.unwrap();
        assert_eq!(result, PushResult::new(true, false));
    }

    #[tokio::test]
    async fn test_failed_connectivity_skips_push() {
        let mut driver = MockConfigDriver::new();
        driver.expect_check_connectivity().returning(|host| {
            Err(DispatchError::ConnectivityFailed {
                device: host.name().to_string(),
                message: String::from("refused"),
            })
        });
        driver.expect_push().never();

        let dispatcher = dispatcher(driver).with_connectivity_test(true);
        let params = dispatcher.dispatch_params(CHECK_CONNECTIVITY, "ios");
        let err = dispatcher.push(&host(), "x", &params).await.unwrap_err();
        assert!(matches!(err, DispatchError::ConnectivityFailed { .. }));
    }

    #[tokio::test]
    async fn test_slow_push_times_out() {
        let dispatcher = dispatcher_with(Arc::new(SlowDriver(Duration::from_secs(5))))
            .with_push_timeout(Duration::from_millis(50));
        let params = dispatcher.dispatch_params(CHECK_CONNECTIVITY, "ios");

        let err = dispatcher.push(&host(), "x", &params).await.unwrap_err();
        assert!(matches!(err, DispatchError::Timeout { ref device, .. } if device == "edge-1"));
    }

    #[tokio::test]
    async fn test_push_within_timeout_succeeds() {
        let dispatcher = dispatcher_with(Arc::new(SlowDriver(Duration::from_millis(10))))
            .with_push_timeout(Duration::from_secs(5));
        let params = dispatcher.dispatch_params(CHECK_CONNECTIVITY, "ios");

        let result = dispatcher.push(&host(), "x", &params).await.unwrap();
        assert_eq!(result, PushResult::new(true, false));
    }

    #[tokio::test]
    async fn test_unknown_driver() {
        let dispatcher = dispatcher(MockConfigDriver::new());
        let params = dispatcher.dispatch_params(CHECK_CONNECTIVITY, "arista_eos");
        let err = dispatcher.push(&host(), "x", &params).await.unwrap_err();
        assert!(matches!(err, DispatchError::UnknownDriver { .. }));
    }
}
