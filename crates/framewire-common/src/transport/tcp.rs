use std::io;
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use tracing::debug;

use crate::protocol::error::{FramewireError, Result};

/// TCP connection factory.
///
/// Resolves a `host:port` address and opens a blocking stream, optionally
/// bounded by a connect timeout. There are no retries at this layer: a failed
/// connect is returned to the caller, who owns the reconnect policy as well as
/// the returned stream.
///
/// # Example
///
/// ```no_run
/// use framewire_common::transport::TcpTransport;
/// use std::time::Duration;
///
/// let transport = TcpTransport::new().with_connect_timeout(Duration::from_millis(500));
/// let stream = transport.connect("127.0.0.1:9000").unwrap();
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TcpTransport {
    connect_timeout: Option<Duration>,
}

impl TcpTransport {
    /// Creates a transport that blocks on connect until the OS gives up.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bounds each connect attempt. A zero duration means no bound.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout).filter(|t| !t.is_zero());
        self
    }

    pub fn connect_timeout(&self) -> Option<Duration> {
        self.connect_timeout
    }

    /// Connects to a remote endpoint.
    ///
    /// The address may resolve to several socket addresses; each is tried in
    /// order until one succeeds.
    ///
    /// # Errors
    ///
    /// - [`FramewireError::InvalidAddress`] if the address cannot be resolved
    /// - [`FramewireError::ConnectTimeout`] if the timeout elapsed on the last attempt
    /// - [`FramewireError::Connect`] for any other failure
    pub fn connect(&self, addr: &str) -> Result<TcpStream> {
        let socket_addrs = addr.to_socket_addrs().map_err(|e| FramewireError::InvalidAddress {
            addr: addr.to_string(),
            reason: e.to_string(),
        })?;

        let mut last_err = None;
        for socket_addr in socket_addrs {
            let attempt = match self.connect_timeout {
                Some(timeout) => TcpStream::connect_timeout(&socket_addr, timeout),
                None => TcpStream::connect(socket_addr),
            };
            match attempt {
                Ok(stream) => {
                    debug!(%socket_addr, "connected");
                    return Ok(stream);
                }
                Err(e) => {
                    debug!(%socket_addr, error = %e, "connect attempt failed");
                    last_err = Some(e);
                }
            }
        }

        match last_err {
            Some(e) => Err(self.map_connect_error(addr, e)),
            None => Err(FramewireError::InvalidAddress {
                addr: addr.to_string(),
                reason: "address resolved to nothing".to_string(),
            }),
        }
    }

    fn map_connect_error(&self, addr: &str, err: io::Error) -> FramewireError {
        match (self.connect_timeout, err.kind()) {
            (Some(timeout), io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock) => {
                FramewireError::ConnectTimeout {
                    addr: addr.to_string(),
                    timeout_ms: timeout.as_millis() as u64,
                }
            }
            _ => FramewireError::Connect {
                addr: addr.to_string(),
                source: err,
            },
        }
    }
}

/// Opens a connection to `addr`, bounded by `timeout` when given and non-zero.
pub fn connect(addr: &str, timeout: Option<Duration>) -> Result<TcpStream> {
    let transport = match timeout {
        Some(timeout) => TcpTransport::new().with_connect_timeout(timeout),
        None => TcpTransport::new(),
    };
    transport.connect(addr)
}
