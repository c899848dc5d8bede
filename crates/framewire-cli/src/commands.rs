//! Implementations behind the CLI subcommands.

use std::time::Duration;

use anyhow::{Context, Result};
use framewire_common::transport::{exchange, tcp, FramedServer, ServerConfig};
use framewire_common::{checksum, RetryPolicy};

/// Builds a retry policy from command-line flags.
///
/// Without `--retries` the exchange runs with retries disabled, which is not
/// the same as a zero budget.
pub fn retry_policy(retries: Option<u32>, interval_ms: u64) -> Option<RetryPolicy> {
    retries.map(|count| RetryPolicy::from_millis(count, interval_ms))
}

/// Converts a millisecond flag into an optional duration; zero means "none".
pub fn optional_millis(ms: u64) -> Option<Duration> {
    (ms > 0).then(|| Duration::from_millis(ms))
}

/// Runs a framed echo server until the process is stopped.
pub fn run_serve(config: ServerConfig) -> Result<()> {
    let server = FramedServer::bind(config).context("failed to start server")?;
    tracing::info!("Listening on {}", server.local_addr()?);
    if let Some(timeout) = server.config().read_timeout {
        tracing::info!("Idle read timeout: {}ms", timeout.as_millis());
    }
    if let Some(retry) = server.config().retry {
        tracing::info!(
            "Retry policy: {} retries, {}ms interval",
            retry.count,
            retry.effective_interval().as_millis()
        );
    }

    server.run_with_handler(|payload: &[u8]| {
        tracing::info!(len = payload.len(), checksum = checksum(payload), "echoing frame");
        payload.to_vec()
    })?;

    Ok(())
}

/// Options for a single request/response exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendOptions {
    pub connect_timeout: Option<Duration>,
    pub reply_timeout: Option<Duration>,
    pub retry: Option<RetryPolicy>,
}

impl Default for SendOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Some(Duration::from_secs(5)),
            reply_timeout: Some(Duration::from_secs(30)),
            retry: None,
        }
    }
}

/// Connects to `addr`, sends `payload` as one frame and returns the reply.
pub fn run_send(addr: &str, payload: &[u8], options: &SendOptions) -> Result<Vec<u8>> {
    let mut stream = tcp::connect(addr, options.connect_timeout)?;

    tracing::debug!(len = payload.len(), checksum = checksum(payload), "sending frame");
    let reply = match options.reply_timeout {
        Some(timeout) => exchange::send_receive_with_timeout(&mut stream, payload, timeout, options.retry),
        None => exchange::send_receive(&mut stream, payload, options.retry),
    }
    .with_context(|| format!("exchange with {addr} failed"))?;
    tracing::debug!(len = reply.len(), checksum = checksum(&reply), "received reply");

    Ok(reply)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_retry_policy_absent_without_flag() {
        assert_eq!(retry_policy(None, 250), None);
    }

    #[test]
    fn test_retry_policy_keeps_zero_budget() {
        assert_eq!(retry_policy(Some(0), 0), Some(RetryPolicy::from_millis(0, 0)));
    }

    #[test]
    fn test_optional_millis() {
        assert_eq!(optional_millis(0), None);
        assert_eq!(optional_millis(1500), Some(Duration::from_millis(1500)));
    }

    #[test]
    fn test_run_send_against_echo_server() {
        let server = FramedServer::bind(ServerConfig::default()).unwrap();
        let addr = server.local_addr().unwrap().to_string();
        thread::spawn(move || {
            let _ = server.run_with_handler(|payload: &[u8]| payload.to_vec());
        });

        let reply = run_send(&addr, b"hello framewire", &SendOptions::default()).unwrap();
        assert_eq!(reply, b"hello framewire");
    }

    #[test]
    fn test_run_send_reports_connect_failure() {
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };

        let err = run_send(&format!("127.0.0.1:{port}"), b"x", &SendOptions::default()).unwrap_err();
        assert!(err.to_string().contains("Failed to connect"), "got {err:#}");
    }
}
