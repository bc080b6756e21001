//! Requesters for the toy service endpoints
//!
//! This module provides the echo requester and the health checker, the
//! value types they exchange with the service, and their configuration.

pub mod config;
pub mod echo;
pub mod health;
pub mod models;


pub use config::{
    DEFAULT_BASE_URL, DEFAULT_TIMEOUT, ProbeConfig, ProbeConfigBuilder, RequestOptions,
};
pub use echo::{ECHO_PATH, EchoRequester};
pub use health::{HEALTH_PATH, HealthChecker};
pub use models::{EchoPayload, EchoResponse, HealthResponse};

use crate::transport::{TimeoutGuard, Transport};
use crate::{Operation, ProbeError, Result};
use bytes::Bytes;
use http::{Request, Response};
use std::time::Duration;
use tracing::debug;

/// Runs one exchange under a fresh [`TimeoutGuard`]
///
/// The guard is dropped when this function returns, which clears the timer
/// on success, failure and cancellation alike.
pub(crate) async fn execute_with_deadline<T: Transport + ?Sized>(
    transport: &T,
    request: Request<Bytes>,
    timeout: Duration,
    operation: Operation,
) -> Result<Response<Bytes>> {
    let guard = TimeoutGuard::arm(timeout);
    let result = transport.execute(request, guard.token()).await;
    debug!(%operation, deadline_fired = guard.fired(), "Exchange finished");

    result.map_err(|e| ProbeError::from_transport(e, operation, timeout))
}
