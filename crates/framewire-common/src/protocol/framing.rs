//! Frame boundaries without a length prefix.
//!
//! # Wire Format
//!
//! A frame is the raw payload bytes. When the payload length is an exact
//! multiple of [`CHUNK_SIZE`], the sender appends [`FRAME_TERMINATOR`]:
//!
//! ```text
//! len % 1024 != 0:  [payload]
//! len % 1024 == 0:  [payload] [00 45 4F 50 00]
//! ```
//!
//! The receiver reads in `CHUNK_SIZE` pieces. A short read ends the frame, and
//! a read consisting of exactly the terminator ends it without contributing
//! bytes. This is a heuristic: it relies on the peer's writes arriving as a
//! unit, which holds for request/response exchanges between peers that both
//! follow this discipline. [`FramingStrategy`] keeps the heuristic behind a
//! seam so an explicit length-prefixed scheme can replace it.

use std::borrow::Cow;

/// Read buffer size, and the alignment that triggers the terminator.
pub const CHUNK_SIZE: usize = 1024;

/// Explicit end-of-frame marker for chunk-aligned payloads.
pub const FRAME_TERMINATOR: [u8; 5] = [0, b'E', b'O', b'P', 0];

/// What a single read means for the frame being assembled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Chunk {
    /// The read was the terminator; discard it and stop.
    Terminator,
    /// Append the bytes and stop.
    Last,
    /// Append the bytes and keep reading.
    More,
}

/// Decides where frames begin and end on a byte stream.
pub trait FramingStrategy {
    /// Size of the buffer handed to each read.
    fn read_buffer_size(&self) -> usize;

    /// Bytes to put on the wire for `payload`.
    fn encode<'a>(&self, payload: &'a [u8]) -> Cow<'a, [u8]>;

    /// Classifies the bytes returned by one non-empty read.
    fn classify(&self, chunk: &[u8]) -> Chunk;
}

/// Short-read plus terminator framing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeuristicChunkFraming {
    chunk_size: usize,
}

impl HeuristicChunkFraming {
    /// Creates the framing with a custom chunk size.
    ///
    /// Both peers must agree on the chunk size. Sizes smaller than the
    /// terminator are raised to its length, since a terminator must fit in a
    /// single read.
    pub fn with_chunk_size(chunk_size: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(FRAME_TERMINATOR.len()),
        }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// True when `len` bytes need the terminator appended.
    pub fn needs_terminator(&self, len: usize) -> bool {
        len % self.chunk_size == 0
    }
}

impl Default for HeuristicChunkFraming {
    fn default() -> Self {
        Self {
            chunk_size: CHUNK_SIZE,
        }
    }
}

impl FramingStrategy for HeuristicChunkFraming {
    fn read_buffer_size(&self) -> usize {
        self.chunk_size
    }

    fn encode<'a>(&self, payload: &'a [u8]) -> Cow<'a, [u8]> {
        if !self.needs_terminator(payload.len()) {
            return Cow::Borrowed(payload);
        }
        let mut framed = Vec::with_capacity(payload.len() + FRAME_TERMINATOR.len());
        framed.extend_from_slice(payload);
        framed.extend_from_slice(&FRAME_TERMINATOR);
        Cow::Owned(framed)
    }

    fn classify(&self, chunk: &[u8]) -> Chunk {
        if chunk == FRAME_TERMINATOR {
            Chunk::Terminator
        } else if chunk.len() < self.chunk_size {
            Chunk::Last
        } else {
            Chunk::More
        }
    }
}

/// Sum of all byte values, wrapping on overflow.
///
/// A weak integrity aid for logging and sanity checks, not a hash.
pub fn checksum(buffer: &[u8]) -> u32 {
    buffer
        .iter()
        .fold(0u32, |acc, &b| acc.wrapping_add(u32::from(b)))
}
