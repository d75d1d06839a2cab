//! Transport layer for the FPM383C protocol
//!
//! The module speaks over a UART. This crate provides the byte channel
//! abstraction the driver consumes, a native serial port implementation and
//! a TCP implementation for serial-to-network bridges.

pub mod error;
pub mod serial;
pub mod tcp;

pub use error::{Error, Result};
pub use serial::SerialTransport;
pub use tcp::TcpTransport;

use std::time::Duration;

use async_trait::async_trait;
use bytes::BytesMut;

/// Duplex byte channel to one module
///
/// Reads are bounded both in size and in time: `receive` returns at most
/// `max_len` bytes, and fails with [`Error::ReadTimeout`] when nothing
/// arrives within `timeout`. The transport must not consume bytes beyond
/// what it returns, so the next packet stays intact for the next read.
#[async_trait]
pub trait Transport: Send {
    /// Open the channel
    async fn connect(&mut self) -> Result<()>;

    /// Close the channel
    async fn disconnect(&mut self) -> Result<()>;

    /// Check if connected
    fn is_connected(&self) -> bool;

    /// Send raw bytes
    async fn send(&mut self, data: &[u8]) -> Result<()>;

    /// Receive up to `max_len` bytes (with timeout)
    async fn receive(&mut self, max_len: usize, timeout: Duration) -> Result<BytesMut>;

    /// Human-readable endpoint (port path or socket address)
    fn endpoint(&self) -> String;
}
