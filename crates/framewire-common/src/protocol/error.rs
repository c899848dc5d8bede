use std::io;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum FramewireError {
    #[error("Invalid address '{addr}': {reason}")]
    InvalidAddress { addr: String, reason: String },

    #[error("Failed to connect to {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("Failed to bind to {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("Connect to {addr} timed out after {timeout_ms}ms")]
    ConnectTimeout { addr: String, timeout_ms: u64 },

    #[error("Connection closed by peer after {written} bytes written")]
    EndOfStream { written: usize },

    #[error("Read failed after {retries} retries ({} bytes salvaged): {source}", .partial.len())]
    Read {
        #[source]
        source: io::Error,
        /// Bytes accumulated before the failure.
        partial: Vec<u8>,
        retries: u32,
    },

    #[error("Write failed after {retries} retries ({written} bytes written): {source}")]
    Write {
        #[source]
        source: io::Error,
        written: usize,
        retries: u32,
    },

    #[error("Failed to arm deadline: {0}")]
    Deadline(#[source] io::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl FramewireError {
    /// Payload bytes received before a read failure, if any were salvaged.
    pub fn partial_payload(&self) -> Option<&[u8]> {
        match self {
            FramewireError::Read { partial, .. } => Some(partial),
            _ => None,
        }
    }

    /// Consumes the error, returning the salvaged payload of a failed read.
    pub fn into_partial_payload(self) -> Option<Vec<u8>> {
        match self {
            FramewireError::Read { partial, .. } => Some(partial),
            _ => None,
        }
    }

    /// Underlying I/O error kind, when the error wraps one.
    pub fn io_kind(&self) -> Option<io::ErrorKind> {
        match self {
            FramewireError::Connect { source, .. }
            | FramewireError::Bind { source, .. }
            | FramewireError::Read { source, .. }
            | FramewireError::Write { source, .. }
            | FramewireError::Deadline(source)
            | FramewireError::Io(source) => Some(source.kind()),
            FramewireError::ConnectTimeout { .. } => Some(io::ErrorKind::TimedOut),
            FramewireError::EndOfStream { .. } => Some(io::ErrorKind::UnexpectedEof),
            _ => None,
        }
    }

    /// True for read/write failures caused by an expired deadline.
    pub fn is_timeout(&self) -> bool {
        matches!(
            self.io_kind(),
            Some(io::ErrorKind::TimedOut) | Some(io::ErrorKind::WouldBlock)
        )
    }
}

pub type Result<T> = std::result::Result<T, FramewireError>;
