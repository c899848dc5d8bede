//! Configuration for [`FramedServer`](crate::transport::FramedServer).

use std::time::Duration;

use crate::protocol::error::{FramewireError, Result};
use crate::protocol::retry::RetryPolicy;

/// Server-side exchange settings.
///
/// # Fields
///
/// - `bind_addr` - Address to listen on (default: `127.0.0.1:0`, a random port)
/// - `read_timeout` - Idle bound on waiting for each request frame (default: 30 seconds)
/// - `retry` - Retry policy for reading requests and writing replies (default: none)
///
/// # Example
///
/// ```
/// use framewire_common::transport::ServerConfig;
/// use framewire_common::RetryPolicy;
/// use std::time::Duration;
///
/// let config = ServerConfig::new("0.0.0.0:9000")
///     .with_read_timeout(Some(Duration::from_secs(5)))
///     .with_retry(Some(RetryPolicy::from_millis(2, 50)));
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub read_timeout: Option<Duration>,
    pub retry: Option<RetryPolicy>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:0".to_string(),
            read_timeout: Some(Duration::from_secs(30)),
            retry: None,
        }
    }
}

impl ServerConfig {
    pub fn new(bind_addr: impl Into<String>) -> Self {
        Self {
            bind_addr: bind_addr.into(),
            ..Self::default()
        }
    }

    pub fn with_read_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.read_timeout = timeout;
        self
    }

    pub fn with_retry(mut self, retry: Option<RetryPolicy>) -> Self {
        self.retry = retry;
        self
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`FramewireError::InvalidConfig`] if:
    /// - The bind address is empty
    /// - The read timeout is zero (use `None` to wait forever)
    /// - The read timeout is longer than one hour
    pub fn validate(&self) -> Result<()> {
        if self.bind_addr.trim().is_empty() {
            return Err(FramewireError::InvalidConfig("bind address must not be empty".to_string()));
        }

        if let Some(timeout) = self.read_timeout {
            if timeout.is_zero() {
                return Err(FramewireError::InvalidConfig(
                    "read timeout must be greater than zero".to_string(),
                ));
            }
            if timeout.as_secs() > 3600 {
                return Err(FramewireError::InvalidConfig(format!(
                    "read timeout must be <= 1 hour (got {} seconds)",
                    timeout.as_secs()
                )));
            }
        }

        Ok(())
    }
}
