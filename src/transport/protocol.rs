use async_trait::async_trait;
use bytes::Bytes;
use http::{Request, Response};
use std::io;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The cancellation token fired before the exchange completed
    #[error("request cancelled")]
    Cancelled,
    #[error("{0}")]
    Io(#[from] io::Error),
    #[error("{0}")]
    Protocol(String),
}

/// Trait for anything that can carry one HTTP exchange
///
/// Implementations must watch `cancel` for the whole exchange and return
/// `TransportError::Cancelled` once it fires. Each call is independent:
/// nothing is shared between exchanges, so callers may run several at once.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends `request` and returns the full response, body included
    async fn execute(
        &self,
        request: Request<Bytes>,
        cancel: CancellationToken,
    ) -> Result<Response<Bytes>, TransportError>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn execute(
        &self,
        request: Request<Bytes>,
        cancel: CancellationToken,
    ) -> Result<Response<Bytes>, TransportError> {
        (**self).execute(request, cancel).await
    }
}
