pub mod error;
pub mod framing;
pub mod retry;

pub use error::{FramewireError, Result};
pub use framing::{checksum, Chunk, FramingStrategy, HeuristicChunkFraming, CHUNK_SIZE, FRAME_TERMINATOR};
pub use retry::{RetryBudget, RetryPolicy, DEFAULT_RETRY_INTERVAL};
