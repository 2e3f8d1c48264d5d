//! Transport seam and the raw TCP adapter
//!
//! The queue treats delivery as opaque I/O behind the [`Transport`] trait.
//! Most thermal label printers accept raw payloads on TCP port 9100, so that
//! adapter ships here; hosts with a cloud print relay implement the trait
//! themselves.

use std::net::SocketAddr;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tracing::{info, instrument, warn};

use crate::error::{TransportError, TransportResult};

/// Moves a composed payload to a concrete printing back end.
///
/// The queue places no format requirements on the payload beyond it being
/// the serialized content it produced. Implementations classify failures
/// into [`TransportError`] kinds here, at the boundary; the queue's retry
/// predicate matches on those kinds.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Deliver one payload; any failure is reported as an error.
    async fn send(&self, payload: &str) -> TransportResult<()>;
}

/// Raw TCP transport (port 9100).
#[derive(Debug, Clone)]
pub struct NetworkTransport {
    addr: SocketAddr,
    timeout: Duration,
}

impl NetworkTransport {
    /// Create a transport for a host and port.
    pub fn new(host: &str, port: u16) -> TransportResult<Self> {
        let addr_str = format!("{}:{}", host, port);
        let addr = addr_str
            .parse()
            .map_err(|_| TransportError::InvalidConfig(format!("Invalid address: {}", addr_str)))?;

        Ok(Self {
            addr,
            timeout: Duration::from_secs(5),
        })
    }

    /// Create from a socket address string (e.g., "192.168.1.100:9100").
    pub fn from_addr(addr: &str) -> TransportResult<Self> {
        let addr: SocketAddr = addr
            .parse()
            .map_err(|_| TransportError::InvalidConfig(format!("Invalid address: {}", addr)))?;

        Ok(Self {
            addr,
            timeout: Duration::from_secs(5),
        })
    }

    /// Set the connection timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Get the printer address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Check if the printer is reachable.
    #[instrument(fields(addr = %self.addr))]
    pub async fn is_online(&self) -> bool {
        let check_timeout = Duration::from_millis(500);

        match tokio::time::timeout(check_timeout, TcpStream::connect(self.addr)).await {
            Ok(Ok(_)) => true,
            Ok(Err(e)) => {
                warn!(error = %e, "Printer offline");
                false
            }
            Err(_) => {
                warn!("Printer check timeout");
                false
            }
        }
    }
}

#[async_trait]
impl Transport for NetworkTransport {
    #[instrument(skip(self, payload), fields(addr = %self.addr, bytes = payload.len()))]
    async fn send(&self, payload: &str) -> TransportResult<()> {
        let stream = tokio::time::timeout(self.timeout, TcpStream::connect(self.addr))
            .await
            .map_err(|_| TransportError::Timeout(format!("Connection timeout: {}", self.addr)))?
            .map_err(|e| TransportError::Connection(format!("{}: {}", self.addr, e)))?;

        let mut stream = stream;
        stream
            .write_all(payload.as_bytes())
            .await
            .map_err(|e| TransportError::Io(format!("Write failed: {}", e)))?;

        stream
            .flush()
            .await
            .map_err(|e| TransportError::Io(format!("Flush failed: {}", e)))?;

        info!("Payload spooled");
        Ok(())
    }
}
