use crate::transport::DEFAULT_MAX_RESPONSE_SIZE;
use crate::{ProbeError, Result};
use http::Uri;
use std::time::Duration;

/// Base URL of the toy service when nothing else is configured
pub const DEFAULT_BASE_URL: &str = "http://localhost:8080";

/// Per-call timeout when nothing else is configured
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(10_000);

/// Configuration shared by the echo requester and the health checker
///
/// # Examples
///
/// ```
/// use echoprobe::client::ProbeConfig;
/// use std::time::Duration;
///
/// let config = ProbeConfig::default();
/// assert_eq!(config.base_url, "http://localhost:8080");
/// assert_eq!(config.timeout, Duration::from_secs(10));
/// ```
#[derive(Debug, Clone)]
pub struct ProbeConfig {
    /// Where the service listens, e.g. `http://localhost:8080`
    pub base_url: String,
    /// Default timeout applied to every call unless overridden
    pub timeout: Duration,
    /// Maximum response size accepted by the TCP transport
    pub max_response_size: usize,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            max_response_size: DEFAULT_MAX_RESPONSE_SIZE,
        }
    }
}

impl ProbeConfig {
    pub fn builder() -> ProbeConfigBuilder {
        ProbeConfigBuilder::new()
    }

    /// Checks the configuration without touching the network
    pub fn validate(&self) -> Result<()> {
        if self.timeout.is_zero() {
            return Err(ProbeError::Config("timeout must be greater than zero".to_string()));
        }
        if self.max_response_size == 0 {
            return Err(ProbeError::Config(
                "max_response_size must be greater than zero".to_string(),
            ));
        }
        self.endpoint("/").map(|_| ())
    }

    /// Joins `path` onto the base URL
    pub fn endpoint(&self, path: &str) -> Result<Uri> {
        let base = self.base_url.trim_end_matches('/');
        let uri: Uri = format!("{base}{path}")
            .parse()
            .map_err(|e| ProbeError::Config(format!("invalid base URL {:?}: {e}", self.base_url)))?;

        if uri.scheme_str() != Some("http") {
            return Err(ProbeError::Config(format!(
                "base URL {:?} must use http://",
                self.base_url
            )));
        }
        if uri.host().is_none_or(|host| host.is_empty()) {
            return Err(ProbeError::Config(format!(
                "base URL {:?} has no host",
                self.base_url
            )));
        }
        Ok(uri)
    }
}

/// Per-call overrides
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RequestOptions {
    /// Replaces the configured timeout for this call only
    pub timeout: Option<Duration>,
}

impl RequestOptions {
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout: Some(timeout),
        }
    }

    pub fn with_timeout_ms(timeout_ms: u64) -> Self {
        Self::with_timeout(Duration::from_millis(timeout_ms))
    }

    pub(crate) fn timeout_or(&self, default: Duration) -> Duration {
        self.timeout.unwrap_or(default)
    }
}

/// Builder for probe configuration
pub struct ProbeConfigBuilder {
    config: ProbeConfig,
}

impl ProbeConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: ProbeConfig::default(),
        }
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.config.base_url = base_url.into();
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    pub fn max_response_size(mut self, size: usize) -> Self {
        self.config.max_response_size = size;
        self
    }

    pub fn build(self) -> ProbeConfig {
        self.config
    }
}

impl Default for ProbeConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
