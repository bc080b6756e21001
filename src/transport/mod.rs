//! HTTP transport used by the requesters
//!
//! This module provides the `Transport` seam the requesters send through,
//! a minimal HTTP/1.1 client over Tokio TCP streams, and the scoped
//! timeout guard that cancels in-flight calls.

pub mod deadline;
pub mod protocol;
pub mod tcp;

#[cfg(test)]
mod tests;

pub use deadline::TimeoutGuard;
pub use protocol::{Transport, TransportError};
pub use tcp::{TcpTransport, DEFAULT_MAX_RESPONSE_SIZE};
