//! TCP transport for serial-to-network bridges
//!
//! Bridges (ser2net and similar) forward the module's UART byte stream over a
//! plain TCP socket, so the framing is identical to the serial port. Many
//! bridges close idle sockets or restart with the module's power; with
//! reconnect enabled the next request opens a fresh socket instead of
//! failing.

use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use async_trait::async_trait;
use bytes::BytesMut;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpStream, lookup_host};
use tokio::time::timeout;
use tracing::{debug, info, trace, warn};

use crate::{Transport, error::*};

/// Bridged FPM383C module reached over TCP
pub struct TcpTransport {
    host: String,
    port: u16,
    peer: Option<SocketAddr>,
    stream: Option<TcpStream>,
    connect_timeout: Duration,
    reconnect: bool,
    dropped_by_bridge: bool,
}

impl TcpTransport {
    /// Bridge listening on `host:port`
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            peer: None,
            stream: None,
            connect_timeout: Duration::from_secs(5),
            reconnect: true,
            dropped_by_bridge: false,
        }
    }

    /// Limit for each connection attempt
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Reopen the socket on the next send after the bridge closed it
    ///
    /// On by default. When off, a closed socket stays closed until
    /// [`Transport::connect`] is called again.
    pub fn with_reconnect(mut self, reconnect: bool) -> Self {
        self.reconnect = reconnect;
        self
    }

    /// Check if the bridge closed the socket since the last connect
    pub fn was_dropped(&self) -> bool {
        self.dropped_by_bridge
    }

    /// Resolve the bridge name and try each address in turn
    ///
    /// Resolution runs on every open, so a bridge that moved to another
    /// address is found again.
    async fn open(&mut self) -> Result<()> {
        let target = format!("{}:{}", self.host, self.port);
        let candidates: Vec<SocketAddr> = lookup_host(&target)
            .await
            .map_err(|e| Error::InvalidAddress(format!("{}: {}", target, e)))?
            .collect();

        let mut last_error = None;
        for addr in candidates {
            debug!("Dialing bridge at {}...", addr);

            match timeout(self.connect_timeout, TcpStream::connect(addr)).await {
                Ok(Ok(stream)) => {
                    // Packets are a dozen bytes; Nagle would hold them back
                    stream.set_nodelay(true)?;
                    debug!("Bridge at {} accepted", addr);

                    self.peer = Some(addr);
                    self.stream = Some(stream);
                    self.dropped_by_bridge = false;
                    return Ok(());
                }
                Ok(Err(e)) => {
                    debug!("Bridge at {} refused: {}", addr, e);
                    last_error = Some(Error::Io(e));
                }
                Err(_) => {
                    debug!("Bridge at {} did not answer", addr);
                    last_error = Some(Error::ConnectionTimeout);
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| Error::InvalidAddress(format!("no addresses for {}", target))))
    }

    /// Forget a socket the bridge closed or broke
    fn lost(&mut self, reason: &str) {
        if self.stream.take().is_some() {
            warn!("Bridge {} {}", self.endpoint(), reason);
        }
        self.dropped_by_bridge = true;
    }
}

async fn write_frame(stream: &mut TcpStream, data: &[u8]) -> io::Result<()> {
    stream.write_all(data).await?;
    stream.flush().await
}

#[async_trait]
impl Transport for TcpTransport {
    async fn connect(&mut self) -> Result<()> {
        if self.stream.is_some() {
            return Err(Error::AlreadyConnected);
        }
        self.open().await
    }

    async fn disconnect(&mut self) -> Result<()> {
        if let Some(mut stream) = self.stream.take() {
            debug!("Closing bridge socket to {}", self.endpoint());
            if let Err(e) = stream.shutdown().await {
                debug!("Shutdown of {} failed: {}", self.endpoint(), e);
            }
        }

        self.dropped_by_bridge = false;
        Ok(())
    }

    /// Open socket, or one the bridge dropped that the next send reopens
    fn is_connected(&self) -> bool {
        self.stream.is_some() || (self.reconnect && self.dropped_by_bridge)
    }

    async fn send(&mut self, data: &[u8]) -> Result<()> {
        if self.stream.is_none() {
            if !(self.reconnect && self.dropped_by_bridge) {
                return Err(Error::NotConnected);
            }
            info!("Reopening bridge socket to {}", self.endpoint());
            self.open().await?;
        }

        let stream = self.stream.as_mut().ok_or(Error::NotConnected)?;

        trace!("Sending {} bytes: {:02X?}", data.len(), &data[..data.len().min(32)]);

        if let Err(e) = write_frame(stream, data).await {
            self.lost("failed on write");
            return Err(Error::Io(e));
        }
        Ok(())
    }

    async fn receive(&mut self, max_len: usize, read_timeout: Duration) -> Result<BytesMut> {
        let stream = self.stream.as_mut().ok_or(Error::NotConnected)?;

        let mut chunk = vec![0u8; max_len.max(1)];

        match timeout(read_timeout, stream.read(&mut chunk)).await {
            Err(_) => Err(Error::ReadTimeout),
            Ok(Ok(0)) => {
                self.lost("closed the socket");
                Err(Error::ConnectionClosed)
            }
            Ok(Ok(n)) => {
                trace!("Received {} bytes: {:02X?}", n, &chunk[..n.min(32)]);
                Ok(BytesMut::from(&chunk[..n]))
            }
            Ok(Err(e)) => {
                self.lost("failed on read");
                Err(Error::Io(e))
            }
        }
    }

    fn endpoint(&self) -> String {
        match self.peer {
            Some(addr) => addr.to_string(),
            None => format!("{}:{}", self.host, self.port),
        }
    }
}

impl Drop for TcpTransport {
    fn drop(&mut self) {
        if self.stream.is_some() {
            warn!("Bridge socket to {} dropped while open", self.endpoint());
        }
    }
}
