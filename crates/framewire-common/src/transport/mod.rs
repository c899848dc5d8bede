//! Framewire Transport Layer
//!
//! This module opens stream connections and moves framed payloads across them.
//!
//! # Architecture
//!
//! - **Transport**: blocking TCP via `std::net`, with an optional connect timeout
//! - **Framing**: terminator-delimited frames, see [`crate::protocol::framing`]
//! - **Retries**: per-call [`RetryPolicy`](crate::RetryPolicy) budgets for transient I/O failures
//! - **Deadlines**: absolute read/write deadlines scoped to a single call
//!
//! # Components
//!
//! - **[`TcpTransport`]** / [`tcp::connect`]: open a connection
//! - **[`FramedExchange`]**: `send`, `receive`, their timed variants and the
//!   request/response helpers
//! - **[`Deadline`]**: arms a deadline on anything implementing [`TimeoutControl`]
//! - **[`FramedServer`]**: thread-per-connection request/response server
//!
//! # Example
//!
//! ```no_run
//! use framewire_common::transport::{exchange, tcp};
//! use std::time::Duration;
//!
//! let mut stream = tcp::connect("127.0.0.1:9000", None).unwrap();
//! let reply = exchange::send_receive_with_timeout(&mut stream, b"hello", Duration::from_secs(2), None)
//!     .unwrap();
//! ```

pub mod config;
pub mod deadline;
pub mod exchange;
pub mod tcp;
pub mod tcp_server;

pub use config::ServerConfig;
pub use deadline::{Deadline, TimeoutControl};
pub use exchange::{FrameEnd, FramedExchange, ReceivedFrame};
pub use tcp::TcpTransport;
pub use tcp_server::FramedServer;

#[cfg(test)]
mod tests;
