//! Absolute read/write deadlines on blocking sockets.
//!
//! `std` sockets only offer per-operation timeouts. [`Deadline`] turns them
//! into an absolute deadline: before every read or write it re-arms the socket
//! with the time remaining, and fails with `TimedOut` once the deadline has
//! passed. The deadline is scoped to the guard. Dropping it puts back whatever
//! timeout the socket had before it was armed.

use std::io::{self, Read, Write};
use std::net::TcpStream;
use std::time::{Duration, Instant};

use crate::protocol::error::{FramewireError, Result};

/// Sockets whose blocking reads and writes can be bounded in time.
pub trait TimeoutControl {
    fn read_timeout(&self) -> io::Result<Option<Duration>>;
    fn write_timeout(&self) -> io::Result<Option<Duration>>;
    fn set_read_timeout(&self, timeout: Option<Duration>) -> io::Result<()>;
    fn set_write_timeout(&self, timeout: Option<Duration>) -> io::Result<()>;
}

impl TimeoutControl for TcpStream {
    fn read_timeout(&self) -> io::Result<Option<Duration>> {
        TcpStream::read_timeout(self)
    }

    fn write_timeout(&self) -> io::Result<Option<Duration>> {
        TcpStream::write_timeout(self)
    }

    fn set_read_timeout(&self, timeout: Option<Duration>) -> io::Result<()> {
        TcpStream::set_read_timeout(self, timeout)
    }

    fn set_write_timeout(&self, timeout: Option<Duration>) -> io::Result<()> {
        TcpStream::set_write_timeout(self, timeout)
    }
}

#[cfg(unix)]
impl TimeoutControl for std::os::unix::net::UnixStream {
    fn read_timeout(&self) -> io::Result<Option<Duration>> {
        std::os::unix::net::UnixStream::read_timeout(self)
    }

    fn write_timeout(&self) -> io::Result<Option<Duration>> {
        std::os::unix::net::UnixStream::write_timeout(self)
    }

    fn set_read_timeout(&self, timeout: Option<Duration>) -> io::Result<()> {
        std::os::unix::net::UnixStream::set_read_timeout(self, timeout)
    }

    fn set_write_timeout(&self, timeout: Option<Duration>) -> io::Result<()> {
        std::os::unix::net::UnixStream::set_write_timeout(self, timeout)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Read,
    Write,
}

/// A connection borrowed with an armed read or write deadline.
///
/// Implements both `Read` and `Write`; only the armed direction is bounded.
/// A timeout too large to represent as an `Instant` leaves the connection
/// untouched and the call unbounded.
pub struct Deadline<'a, C: TimeoutControl> {
    conn: &'a mut C,
    direction: Direction,
    /// `None` when unbounded; the socket is then never touched.
    expires_at: Option<Instant>,
    previous: Option<Duration>,
}

impl<'a, C: TimeoutControl> Deadline<'a, C> {
    /// Arms a read deadline of `now + timeout`.
    pub fn arm_read(conn: &'a mut C, timeout: Duration) -> Result<Self> {
        Self::arm(conn, timeout, Direction::Read)
    }

    /// Arms a write deadline of `now + timeout`.
    pub fn arm_write(conn: &'a mut C, timeout: Duration) -> Result<Self> {
        Self::arm(conn, timeout, Direction::Write)
    }

    fn arm(conn: &'a mut C, timeout: Duration, direction: Direction) -> Result<Self> {
        let Some(expires_at) = Instant::now().checked_add(timeout) else {
            return Ok(Self {
                conn,
                direction,
                expires_at: None,
                previous: None,
            });
        };

        let previous = match direction {
            Direction::Read => conn.read_timeout(),
            Direction::Write => conn.write_timeout(),
        }
        .map_err(FramewireError::Deadline)?;

        let deadline = Self {
            conn,
            direction,
            expires_at: Some(expires_at),
            previous,
        };
        if !timeout.is_zero() {
            deadline.set_timeout(Some(timeout)).map_err(FramewireError::Deadline)?;
        }
        Ok(deadline)
    }

    /// Time left before the deadline, or `None` if the call is unbounded.
    pub fn remaining(&self) -> Option<Duration> {
        self.expires_at
            .map(|at| at.saturating_duration_since(Instant::now()))
    }

    fn set_timeout(&self, timeout: Option<Duration>) -> io::Result<()> {
        match self.direction {
            Direction::Read => self.conn.set_read_timeout(timeout),
            Direction::Write => self.conn.set_write_timeout(timeout),
        }
    }

    /// Re-arms the socket with the remaining time before an operation.
    fn rearm(&self) -> io::Result<()> {
        let Some(remaining) = self.remaining() else {
            return Ok(());
        };
        if remaining.is_zero() {
            return Err(io::Error::new(io::ErrorKind::TimedOut, "deadline exceeded"));
        }
        self.set_timeout(Some(remaining))
    }
}

impl<C: TimeoutControl + Read> Read for Deadline<'_, C> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.direction == Direction::Read {
            self.rearm()?;
        }
        self.conn.read(buf)
    }
}

impl<C: TimeoutControl + Write> Write for Deadline<'_, C> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.direction == Direction::Write {
            self.rearm()?;
        }
        self.conn.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.conn.flush()
    }
}

impl<C: TimeoutControl> Drop for Deadline<'_, C> {
    fn drop(&mut self) {
        if self.expires_at.is_some() {
            // Errors are ignored so drop never panics.
            let _ = self.set_timeout(self.previous);
        }
    }
}
