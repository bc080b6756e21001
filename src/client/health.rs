use super::config::{ProbeConfig, RequestOptions};
use super::execute_with_deadline;
use super::models::HealthResponse;
use crate::transport::{TcpTransport, Transport};
use crate::{Operation, ProbeError, Result};
use bytes::Bytes;
use http::header::ACCEPT;
use http::{Method, Request, Uri};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Path of the health endpoint, relative to the base URL
pub const HEALTH_PATH: &str = "/healthz";

/// Polls the health endpoint and reports its status string
pub struct HealthChecker<T: Transport = TcpTransport> {
    transport: T,
    url: Uri,
    timeout: Duration,
}

impl HealthChecker<TcpTransport> {
    pub fn new(config: ProbeConfig) -> Result<Self> {
        let transport = TcpTransport::new(config.max_response_size);
        Self::with_transport(config, transport)
    }
}

impl<T: Transport> HealthChecker<T> {
    pub fn with_transport(config: ProbeConfig, transport: T) -> Result<Self> {
        config.validate()?;
        let url = config.endpoint(HEALTH_PATH)?;
        Ok(Self {
            transport,
            url,
            timeout: config.timeout,
        })
    }

    pub fn url(&self) -> &Uri {
        &self.url
    }

    pub async fn check(&self) -> Result<String> {
        self.check_with(RequestOptions::default()).await
    }

    pub async fn check_with(&self, options: RequestOptions) -> Result<String> {
        let timeout = options.timeout_or(self.timeout);
        debug!(url = %self.url, timeout_ms = timeout.as_millis() as u64, "Checking health");

        let request = Request::builder()
            .method(Method::GET)
            .uri(self.url.clone())
            .header(ACCEPT, "application/json")
            .body(Bytes::new())
            .map_err(|e| ProbeError::Config(format!("failed to build request: {e}")))?;

        let response = execute_with_deadline(&self.transport, request, timeout, Operation::Health)
            .await
            .inspect_err(|e| warn!(url = %self.url, error = %e, "Health check failed"))?;

        let status = response.status();
        if !status.is_success() {
            let body = String::from_utf8_lossy(response.body()).into_owned();
            warn!(status = status.as_u16(), body = %body, "Health endpoint returned non-success status");
            return Err(ProbeError::HttpStatus {
                operation: Operation::Health,
                status: status.as_u16(),
                body,
            });
        }

        let value: Value = serde_json::from_slice(response.body()).map_err(|e| {
            warn!(error = %e, "Health endpoint returned invalid JSON");
            ProbeError::Decode {
                operation: Operation::Health,
            }
        })?;

        let health = HealthResponse::from_value(&value).ok_or(ProbeError::MissingField("status"))?;
        info!(status = %health.status, "Health check succeeded");
        Ok(health.status)
    }
}
