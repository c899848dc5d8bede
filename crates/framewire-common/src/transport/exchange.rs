use std::io::{self, Read, Write};
use std::thread;
use std::time::Duration;

use tracing::{debug, trace, warn};

use crate::protocol::error::{FramewireError, Result};
use crate::protocol::framing::{Chunk, FramingStrategy, HeuristicChunkFraming};
use crate::protocol::retry::{RetryBudget, RetryPolicy};
use crate::transport::deadline::{Deadline, TimeoutControl};

/// How a received frame ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameEnd {
    /// The explicit terminator was read.
    Terminator,
    /// A read returned fewer bytes than the buffer size.
    ShortRead,
    /// The peer closed the connection.
    PeerClosed,
}

/// A reassembled frame and the reason reading stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceivedFrame {
    pub payload: Vec<u8>,
    pub end: FrameEnd,
}

impl ReceivedFrame {
    /// True when the peer closed the connection without sending anything.
    pub fn is_closed_empty(&self) -> bool {
        self.end == FrameEnd::PeerClosed && self.payload.is_empty()
    }
}

/// Framed send/receive engine over any blocking duplex stream.
///
/// The engine never takes ownership of a connection: every call borrows it
/// for its duration and leaves closing to the caller. Retry state lives on the
/// stack of each call, so one engine can serve any number of connections.
///
/// # Example
///
/// ```no_run
/// use framewire_common::transport::{tcp, FramedExchange};
/// use framewire_common::RetryPolicy;
/// use std::time::Duration;
///
/// let mut stream = tcp::connect("127.0.0.1:9000", Some(Duration::from_secs(1))).unwrap();
/// let exchange = FramedExchange::new();
///
/// let retry = Some(RetryPolicy::new(3, Duration::from_millis(50)));
/// let reply = exchange
///     .send_receive_with_timeout(&mut stream, b"ping", Duration::from_secs(5), retry)
///     .unwrap();
/// ```
#[derive(Debug, Clone, Default)]
pub struct FramedExchange<F = HeuristicChunkFraming> {
    framing: F,
}

impl FramedExchange<HeuristicChunkFraming> {
    /// Creates an engine using [`HeuristicChunkFraming`] with 1024-byte chunks.
    pub fn new() -> Self {
        Self::default()
    }
}

impl<F: FramingStrategy> FramedExchange<F> {
    pub fn with_framing(framing: F) -> Self {
        Self { framing }
    }

    pub fn framing(&self) -> &F {
        &self.framing
    }

    /// Receives one frame.
    ///
    /// End of stream is a clean termination and returns whatever has been
    /// accumulated, possibly nothing. Other read failures are retried according
    /// to `retry`; once the budget is spent the error is returned carrying the
    /// bytes read so far (see [`FramewireError::partial_payload`]).
    pub fn receive<C: Read + ?Sized>(&self, conn: &mut C, retry: Option<RetryPolicy>) -> Result<Vec<u8>> {
        self.receive_frame(conn, retry).map(|frame| frame.payload)
    }

    /// Like [`receive`](Self::receive) but reports how the frame ended, which
    /// tells an empty frame apart from a closed connection.
    pub fn receive_frame<C: Read + ?Sized>(
        &self,
        conn: &mut C,
        retry: Option<RetryPolicy>,
    ) -> Result<ReceivedFrame> {
        let mut budget = RetryBudget::new(retry);
        let mut payload = Vec::new();
        let mut buffer = vec![0u8; self.framing.read_buffer_size()];

        loop {
            let n = match conn.read(&mut buffer) {
                Ok(0) => {
                    debug!(len = payload.len(), "peer closed connection");
                    return Ok(ReceivedFrame {
                        payload,
                        end: FrameEnd::PeerClosed,
                    });
                }
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    let Some(backoff) = budget.next_backoff() else {
                        if budget.is_enabled() {
                            warn!(retries = budget.used(), error = %e, "read retries exhausted");
                        }
                        return Err(FramewireError::Read {
                            source: e,
                            partial: payload,
                            retries: budget.used(),
                        });
                    };
                    debug!(
                        attempt = budget.used(),
                        backoff_ms = backoff.as_millis() as u64,
                        error = %e,
                        "retrying read"
                    );
                    thread::sleep(backoff);
                    continue;
                }
            };

            let chunk = &buffer[..n];
            trace!(n, "read chunk");
            match self.framing.classify(chunk) {
                Chunk::Terminator => {
                    debug!(len = payload.len(), "frame terminated explicitly");
                    return Ok(ReceivedFrame {
                        payload,
                        end: FrameEnd::Terminator,
                    });
                }
                Chunk::Last => {
                    payload.extend_from_slice(chunk);
                    debug!(len = payload.len(), "frame ended on short read");
                    return Ok(ReceivedFrame {
                        payload,
                        end: FrameEnd::ShortRead,
                    });
                }
                Chunk::More => payload.extend_from_slice(chunk),
            }
        }
    }

    /// Sends one frame, appending the terminator when the framing requires it.
    ///
    /// A failed write is retried according to `retry`, resuming after the bytes
    /// already accepted by the stream. A closed peer fails immediately with
    /// [`FramewireError::EndOfStream`] and is never retried.
    pub fn send<C: Write + ?Sized>(&self, conn: &mut C, payload: &[u8], retry: Option<RetryPolicy>) -> Result<()> {
        let frame = self.framing.encode(payload);
        let mut budget = RetryBudget::new(retry);
        let mut written = 0;

        while written < frame.len() {
            match conn.write(&frame[written..]) {
                Ok(0) => return Err(FramewireError::EndOfStream { written }),
                Ok(n) => {
                    written += n;
                    trace!(n, written, total = frame.len(), "wrote bytes");
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) if is_end_of_stream(&e) => {
                    debug!(written, error = %e, "peer closed connection during send");
                    return Err(FramewireError::EndOfStream { written });
                }
                Err(e) => {
                    let Some(backoff) = budget.next_backoff() else {
                        if budget.is_enabled() {
                            warn!(retries = budget.used(), error = %e, "write retries exhausted");
                        }
                        return Err(FramewireError::Write {
                            source: e,
                            written,
                            retries: budget.used(),
                        });
                    };
                    debug!(
                        attempt = budget.used(),
                        backoff_ms = backoff.as_millis() as u64,
                        written,
                        error = %e,
                        "retrying write"
                    );
                    thread::sleep(backoff);
                }
            }
        }

        conn.flush()?;
        debug!(len = payload.len(), wire_len = frame.len(), "frame sent");
        Ok(())
    }

    /// Arms a read deadline of `now + timeout`, then receives one frame.
    ///
    /// An expired deadline is an ordinary read error and goes through the
    /// same retry path. The deadline is cleared when the call returns.
    pub fn receive_with_timeout<C: Read + TimeoutControl>(
        &self,
        conn: &mut C,
        timeout: Duration,
        retry: Option<RetryPolicy>,
    ) -> Result<Vec<u8>> {
        let mut armed = Deadline::arm_read(conn, timeout)?;
        self.receive(&mut armed, retry)
    }

    /// Arms a write deadline of `now + timeout`, then sends one frame.
    pub fn send_with_timeout<C: Write + TimeoutControl>(
        &self,
        conn: &mut C,
        payload: &[u8],
        timeout: Duration,
        retry: Option<RetryPolicy>,
    ) -> Result<()> {
        let mut armed = Deadline::arm_write(conn, timeout)?;
        self.send(&mut armed, payload, retry)
    }

    /// Sends `payload` and waits for the reply.
    ///
    /// `retry` applies to the send only; the reply is read without retries.
    /// A failed send returns immediately without reading.
    pub fn send_receive<C: Read + Write + ?Sized>(
        &self,
        conn: &mut C,
        payload: &[u8],
        retry: Option<RetryPolicy>,
    ) -> Result<Vec<u8>> {
        self.send(conn, payload, retry)?;
        self.receive(conn, None)
    }

    /// Sends `payload`, then waits at most `timeout` for the reply.
    ///
    /// The send itself is not bounded by the timeout.
    pub fn send_receive_with_timeout<C: Read + Write + TimeoutControl>(
        &self,
        conn: &mut C,
        payload: &[u8],
        timeout: Duration,
        retry: Option<RetryPolicy>,
    ) -> Result<Vec<u8>> {
        self.send(conn, payload, retry)?;
        self.receive_with_timeout(conn, timeout, None)
    }
}

/// Write errors meaning the peer is gone; retrying cannot succeed.
fn is_end_of_stream(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::UnexpectedEof
            | io::ErrorKind::WriteZero
            | io::ErrorKind::BrokenPipe
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::NotConnected
    )
}

/// Receives one frame with the default framing.
pub fn receive<C: Read + ?Sized>(conn: &mut C, retry: Option<RetryPolicy>) -> Result<Vec<u8>> {
    FramedExchange::new().receive(conn, retry)
}

/// Receives one frame under a read deadline with the default framing.
pub fn receive_with_timeout<C: Read + TimeoutControl>(
    conn: &mut C,
    timeout: Duration,
    retry: Option<RetryPolicy>,
) -> Result<Vec<u8>> {
    FramedExchange::new().receive_with_timeout(conn, timeout, retry)
}

/// Sends one frame with the default framing.
pub fn send<C: Write + ?Sized>(conn: &mut C, payload: &[u8], retry: Option<RetryPolicy>) -> Result<()> {
    FramedExchange::new().send(conn, payload, retry)
}

/// Sends one frame under a write deadline with the default framing.
pub fn send_with_timeout<C: Write + TimeoutControl>(
    conn: &mut C,
    payload: &[u8],
    timeout: Duration,
    retry: Option<RetryPolicy>,
) -> Result<()> {
    FramedExchange::new().send_with_timeout(conn, payload, timeout, retry)
}

/// Request/response round trip with the default framing.
pub fn send_receive<C: Read + Write + ?Sized>(
    conn: &mut C,
    payload: &[u8],
    retry: Option<RetryPolicy>,
) -> Result<Vec<u8>> {
    FramedExchange::new().send_receive(conn, payload, retry)
}

/// Request/response round trip with a bounded wait for the reply.
pub fn send_receive_with_timeout<C: Read + Write + TimeoutControl>(
    conn: &mut C,
    payload: &[u8],
    timeout: Duration,
    retry: Option<RetryPolicy>,
) -> Result<Vec<u8>> {
    FramedExchange::new().send_receive_with_timeout(conn, payload, timeout, retry)
}
