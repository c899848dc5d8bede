use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::thread;

use tracing::{debug, error, info};

use crate::protocol::error::{FramewireError, Result};
use crate::transport::config::ServerConfig;
use crate::transport::deadline::Deadline;
use crate::transport::exchange::{FrameEnd, FramedExchange};

/// Blocking framed server, one thread per connection.
///
/// Each connection is a sequence of request/response exchanges: read a frame,
/// hand it to the handler, send the handler's reply as a frame. The
/// connection ends when the peer closes it or an exchange fails.
pub struct FramedServer {
    listener: TcpListener,
    config: ServerConfig,
}

impl FramedServer {
    /// Validates `config` and binds the listener.
    pub fn bind(config: ServerConfig) -> Result<Self> {
        config.validate()?;
        let listener = TcpListener::bind(&config.bind_addr).map_err(|e| FramewireError::Bind {
            addr: config.bind_addr.clone(),
            source: e,
        })?;

        Ok(Self { listener, config })
    }

    /// Gets the actual bound address.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Accepts connections forever, spawning a thread for each.
    ///
    /// Connection errors are logged and end only that connection. An accept
    /// failure stops the server and is returned.
    pub fn run_with_handler<F>(&self, handler: F) -> Result<()>
    where
        F: Fn(&[u8]) -> Vec<u8> + Send + Sync + 'static,
    {
        let handler = Arc::new(handler);

        loop {
            let (stream, peer_addr) = self.listener.accept()?;
            info!(%peer_addr, "connection established");

            let handler = Arc::clone(&handler);
            let config = self.config.clone();
            thread::spawn(move || {
                match handle_connection(stream, &config, handler.as_ref()) {
                    Ok(()) => {}
                    Err(e) if e.is_timeout() => debug!(%peer_addr, "idle connection timed out"),
                    Err(e) => error!(%peer_addr, error = %e, "connection error"),
                }
            });
        }
    }
}

/// Serves framed exchanges on one connection until the peer closes it.
///
/// A frame cut short by the peer closing is still handed to the handler, but
/// no reply is sent.
pub fn handle_connection<F>(mut stream: TcpStream, config: &ServerConfig, handler: &F) -> Result<()>
where
    F: Fn(&[u8]) -> Vec<u8> + ?Sized,
{
    let exchange = FramedExchange::new();

    loop {
        let frame = match config.read_timeout {
            Some(timeout) => {
                let mut armed = Deadline::arm_read(&mut stream, timeout)?;
                exchange.receive_frame(&mut armed, config.retry)?
            }
            None => exchange.receive_frame(&mut stream, config.retry)?,
        };

        if frame.is_closed_empty() {
            debug!("connection closed by peer");
            return Ok(());
        }

        let reply = handler(&frame.payload);
        if frame.end == FrameEnd::PeerClosed {
            debug!(len = frame.payload.len(), "peer closed after final frame");
            return Ok(());
        }
        exchange.send(&mut stream, &reply, config.retry)?;
    }
}
