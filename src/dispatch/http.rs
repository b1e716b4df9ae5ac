//! HTTP push driver.
//!
//! Posts merged configuration to a device management API and decodes the
//! device's change report.

use async_trait::async_trait;
use reqwest::{header, Client};
use secrecy::ExposeSecret;
use serde::Serialize;
use std::time::Duration;
use tokio::net::TcpStream;
use tracing::{debug, trace};

use crate::config::DriverConfig;
use crate::error::{DispatchError, Result};
use crate::inventory::Host;

use super::driver::{ConfigDriver, PushResult};

/// Connectivity test timeout in seconds.
const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Request body.
#[derive(Debug, Serialize)]
struct PushRequest<'a> {
    config: &'a str,
}

/// Driver for devices exposing a JSON configuration endpoint.
#[derive(Debug, Clone)]
pub struct HttpPushDriver {
    /// HTTP client.
    client: Client,
    /// URL scheme.
    scheme: String,
    /// Management API port.
    port: u16,
    /// Endpoint path.
    path: String,
}

impl HttpPushDriver {
    /// Creates a driver from its settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(config: &DriverConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .danger_accept_invalid_certs(!config.verify_tls)
            .build()
            .map_err(|e| DispatchError::transport("client", format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            scheme: config.scheme.clone(),
            port: config.effective_port(),
            path: config.path.clone(),
        })
    }

    /// Returns the endpoint URL for a host.
    #[must_use]
    pub fn endpoint(&self, host: &Host) -> String {
        format!("{}://{}:{}{}", self.scheme, host.hostname(), self.port, self.path)
    }
}

#[async_trait]
impl ConfigDriver for HttpPushDriver {
    async fn push(&self, host: &Host, config: &str) -> std::result::Result<PushResult, DispatchError> {
        let url = self.endpoint(host);
        trace!("Posting {} bytes of configuration to {url}", config.len());

        let credentials = host.credentials();
        let response = self
            .client
            .post(&url)
            .header(header::ACCEPT, "application/json")
            .basic_auth(&credentials.username, Some(credentials.password.expose_secret()))
            .json(&PushRequest { config })
            .send()
            .await
            .map_err(|e| DispatchError::transport(host.name(), format!("Request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DispatchError::Driver {
                device: host.name().to_string(),
                status: status.as_u16(),
                message: body,
            });
        }

        let result: PushResult = response.json().await.map_err(|e| DispatchError::InvalidResponse {
            device: host.name().to_string(),
            message: format!("Failed to parse response: {e}"),
        })?;

        debug!(
            "Device {} reported changed={} failed={}",
            host.name(),
            result.changed,
            result.failed
        );
        Ok(result)
    }

    async fn check_connectivity(&self, host: &Host) -> std::result::Result<(), DispatchError> {
        let address = (host.hostname(), self.port);
        let connect = TcpStream::connect(address);
        match tokio::time::timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS), connect).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(DispatchError::ConnectivityFailed {
                device: host.name().to_string(),
                message: e.to_string(),
            }),
            Err(_) => Err(DispatchError::ConnectivityFailed {
                device: host.name().to_string(),
                message: format!("no answer on port {} within {CONNECT_TIMEOUT_SECS}s", self.port),
            }),
        }
    }
}
