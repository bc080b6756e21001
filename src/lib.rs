use crate::transport::TransportError;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Which endpoint a failed call was talking to.
///
/// The two requesters share one error type but phrase their messages
/// differently, so every per-call error carries its operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// `POST /echo`
    Echo,
    /// `GET /healthz`
    Health,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Echo => f.write_str("echo"),
            Operation::Health => f.write_str("health"),
        }
    }
}

/// Coarse classification of a [`ProbeError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Timeout,
    Transport,
    HttpStatus,
    Decode,
    MissingField,
    Config,
}

/// Error types for the echoprobe library
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProbeError {
    /// The call did not complete before its deadline and was cancelled
    #[error("{}", timeout_message(.operation, .timeout))]
    Timeout {
        operation: Operation,
        timeout: Duration,
    },

    /// Connection-level failure; the underlying message is kept verbatim
    #[error("{0}")]
    Transport(String),

    /// The server answered with a non-2xx status
    #[error("{}", status_message(.operation, .status, .body))]
    HttpStatus {
        operation: Operation,
        status: u16,
        body: String,
    },

    /// A 2xx response whose body is not the JSON we expected
    #[error("{}", decode_message(.operation))]
    Decode { operation: Operation },

    /// A required response field was absent or empty
    #[error("Health check response missing {0}")]
    MissingField(&'static str),

    /// Configuration errors, raised before any request is sent
    #[error("Configuration error: {0}")]
    Config(String),
}

impl ProbeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ProbeError::Timeout { .. } => ErrorKind::Timeout,
            ProbeError::Transport(_) => ErrorKind::Transport,
            ProbeError::HttpStatus { .. } => ErrorKind::HttpStatus,
            ProbeError::Decode { .. } => ErrorKind::Decode,
            ProbeError::MissingField(_) => ErrorKind::MissingField,
            ProbeError::Config(_) => ErrorKind::Config,
        }
    }

    /// Maps a transport failure into the caller-facing taxonomy.
    ///
    /// A cancelled transport call always becomes a timeout, whichever side
    /// noticed the cancellation first.
    pub(crate) fn from_transport(err: TransportError, operation: Operation, timeout: Duration) -> Self {
        match err {
            TransportError::Cancelled => ProbeError::Timeout { operation, timeout },
            other => ProbeError::Transport(other.to_string()),
        }
    }
}

fn timeout_message(operation: &Operation, timeout: &Duration) -> String {
    let seconds = format_seconds(*timeout);
    match operation {
        Operation::Echo => format!("Request timed out after {seconds} seconds"),
        Operation::Health => format!("Health check timed out after {seconds} seconds"),
    }
}

fn status_message(operation: &Operation, status: &u16, body: &str) -> String {
    match operation {
        Operation::Echo => format!("Server returned status {status}: {body}"),
        Operation::Health => format!("Health check failed with status {status}: {body}"),
    }
}

fn decode_message(operation: &Operation) -> &'static str {
    match operation {
        Operation::Echo => "Server returned invalid JSON",
        Operation::Health => "Health check returned invalid JSON",
    }
}

/// Renders a duration in seconds the way users read it: `10`, `1`, `0.25`.
pub fn format_seconds(duration: Duration) -> String {
    let millis = duration.as_millis();
    if millis % 1000 == 0 {
        format!("{}", millis / 1000)
    } else {
        format!("{}", millis as f64 / 1000.0)
    }
}

/// Result type for the echoprobe library
pub type Result<T> = std::result::Result<T, ProbeError>;

/// What a requester hands back to its caller: the decoded payload or a typed failure
pub type RequestOutcome<T> = Result<T>;

pub mod client;
pub mod common;
pub mod form;
pub mod transport;

// Re-export main types for convenience
pub use client::{
    EchoPayload, EchoRequester, EchoResponse, HealthChecker, HealthResponse, ProbeConfig,
    ProbeConfigBuilder, RequestOptions,
};
pub use form::{EchoForm, Reporter, ResultView, SubmitOutcome, TerminalReporter};
pub use transport::{TcpTransport, TimeoutGuard, Transport};
