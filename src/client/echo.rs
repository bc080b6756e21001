use super::config::{ProbeConfig, RequestOptions};
use super::execute_with_deadline;
use super::models::{EchoPayload, EchoResponse};
use crate::transport::{TcpTransport, Transport};
use crate::{Operation, ProbeError, Result};
use bytes::Bytes;
use http::header::{ACCEPT, CONTENT_TYPE};
use http::{Method, Request, Uri};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, error, info};

/// Path of the echo endpoint, relative to the base URL
pub const ECHO_PATH: &str = "/echo";

/// Sends messages to the echo endpoint
///
/// Each call is independent: it owns its own deadline and cancellation
/// token, so one requester can be shared and called concurrently.
///
/// # Examples
///
/// ```no_run
/// use echoprobe::client::{EchoRequester, ProbeConfig};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let requester = EchoRequester::new(ProbeConfig::default())?;
///     let response = requester.send("Hello world").await?;
///     println!("Server echoed: {:?}", response.message());
///     Ok(())
/// }
/// ```
pub struct EchoRequester<T: Transport = TcpTransport> {
    transport: T,
    url: Uri,
    timeout: Duration,
}

impl EchoRequester<TcpTransport> {
    /// Creates a requester backed by the TCP transport
    pub fn new(config: ProbeConfig) -> Result<Self> {
        let transport = TcpTransport::new(config.max_response_size);
        Self::with_transport(config, transport)
    }
}

impl<T: Transport> EchoRequester<T> {
    /// Creates a requester that sends through `transport`
    pub fn with_transport(config: ProbeConfig, transport: T) -> Result<Self> {
        config.validate()?;
        let url = config.endpoint(ECHO_PATH)?;
        Ok(Self {
            transport,
            url,
            timeout: config.timeout,
        })
    }

    pub fn url(&self) -> &Uri {
        &self.url
    }

    /// Sends `message` with the configured timeout
    ///
    /// The message is sent as given; callers are expected to reject empty
    /// input before calling.
    pub async fn send(&self, message: &str) -> Result<EchoResponse> {
        self.send_with(message, RequestOptions::default()).await
    }

    /// Sends `message`, overriding the timeout for this call
    pub async fn send_with(&self, message: &str, options: RequestOptions) -> Result<EchoResponse> {
        let timeout = options.timeout_or(self.timeout);
        let payload = EchoPayload::new(message);
        let body = serde_json::to_vec(&payload)
            .map_err(|e| ProbeError::Config(format!("failed to encode payload: {e}")))?;

        debug!(url = %self.url, message = %payload.message, timeout_ms = timeout.as_millis() as u64, "Sending echo request");

        let request = Request::builder()
            .method(Method::POST)
            .uri(self.url.clone())
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json")
            .body(Bytes::from(body))
            .map_err(|e| ProbeError::Config(format!("failed to build request: {e}")))?;

        let response = execute_with_deadline(&self.transport, request, timeout, Operation::Echo)
            .await
            .inspect_err(|e| error!(url = %self.url, error = %e, "Echo request failed"))?;

        let status = response.status();
        debug!(status = status.as_u16(), "Echo response received");

        if !status.is_success() {
            let body = String::from_utf8_lossy(response.body()).into_owned();
            error!(status = status.as_u16(), body = %body, "Non-success response from server");
            return Err(ProbeError::HttpStatus {
                operation: Operation::Echo,
                status: status.as_u16(),
                body,
            });
        }

        let value: Value = serde_json::from_slice(response.body()).map_err(|e| {
            error!(error = %e, "Failed to parse JSON response");
            ProbeError::Decode {
                operation: Operation::Echo,
            }
        })?;
        let decoded = EchoResponse::from(value);

        info!(status = status.as_u16(), echoed = ?decoded.message(), "Echo request succeeded");
        Ok(decoded)
    }
}
