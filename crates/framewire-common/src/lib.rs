//! Framewire Common Types and Transport
//!
//! A minimal framing and transfer layer on top of raw stream sockets.
//!
//! # Overview
//!
//! Payloads travel without a length header. The receiver reads in fixed
//! 1024-byte chunks and treats a short read as the end of a frame; payloads
//! whose length is an exact multiple of the chunk size are followed by a
//! 5-byte terminator so the receiver still knows where they end.
//!
//! - **Protocol Layer**: framing strategy, retry policy, error taxonomy
//! - **Transport Layer**: TCP connect, framed send/receive, deadlines, server
//!
//! # Components
//!
//! - [`protocol`] - Frame constants, [`FramingStrategy`], [`RetryPolicy`], [`FramewireError`]
//! - [`transport`] - [`transport::TcpTransport`], [`transport::FramedExchange`], [`transport::FramedServer`]
//!
//! # Example
//!
//! ```no_run
//! use framewire_common::transport::{exchange, tcp};
//! use framewire_common::{checksum, RetryPolicy};
//! use std::time::Duration;
//!
//! let mut stream = tcp::connect("127.0.0.1:9000", Some(Duration::from_secs(1))).unwrap();
//!
//! let retry = Some(RetryPolicy::from_millis(3, 0)); // 3 retries, default 100ms backoff
//! exchange::send(&mut stream, b"ping", retry).unwrap();
//! let reply = exchange::receive_with_timeout(&mut stream, Duration::from_secs(5), retry).unwrap();
//! println!("{} bytes, checksum {}", reply.len(), checksum(&reply));
//! ```

pub mod protocol;
pub mod transport;

pub use protocol::*;
