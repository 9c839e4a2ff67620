//! Datagram transport: one command line per UDP packet.

use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};
use std::time::Duration;

use stroker_traits::{BoxError, Transport};

use crate::error::{HwError, Result};

pub const DEFAULT_BIND: &str = "0.0.0.0:0";
const WRITE_TIMEOUT: Duration = Duration::from_millis(50);

#[derive(Debug)]
pub struct UdpTransport {
    bind: String,
    socket: Option<UdpSocket>,
    peer: Option<SocketAddr>,
}

impl UdpTransport {
    /// `bind` is the local address the socket is opened on, e.g. `0.0.0.0:0`.
    pub fn new(bind: impl Into<String>) -> Self {
        Self {
            bind: bind.into(),
            socket: None,
            peer: None,
        }
    }

    pub fn peer(&self) -> Option<SocketAddr> {
        self.peer
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.socket.as_ref().and_then(|s| s.local_addr().ok())
    }

    fn open(&mut self, target: &str) -> Result<()> {
        let peer = target
            .to_socket_addrs()
            .map_err(|e| HwError::InvalidTarget(format!("{target}: {e}")))?
            .next()
            .ok_or_else(|| HwError::InvalidTarget(target.to_string()))?;
        let socket = UdpSocket::bind(&self.bind)?;
        socket.connect(peer)?;
        socket.set_write_timeout(Some(WRITE_TIMEOUT))?;
        tracing::debug!(%peer, local = ?socket.local_addr().ok(), "udp transport connected");
        self.socket = Some(socket);
        self.peer = Some(peer);
        Ok(())
    }

    fn write(&mut self, bytes: &[u8]) -> Result<()> {
        let socket = self.socket.as_ref().ok_or(HwError::NotConnected)?;
        let sent = socket.send(bytes).map_err(HwError::from_write)?;
        if sent != bytes.len() {
            return Err(HwError::Io(std::io::Error::new(
                std::io::ErrorKind::WriteZero,
                "short datagram",
            )));
        }
        Ok(())
    }
}

impl Default for UdpTransport {
    fn default() -> Self {
        Self::new(DEFAULT_BIND)
    }
}

impl Transport for UdpTransport {
    fn connect(&mut self, target: &str) -> std::result::Result<(), BoxError> {
        self.disconnect();
        Ok(self.open(target)?)
    }

    fn send(&mut self, bytes: &[u8]) -> std::result::Result<(), BoxError> {
        Ok(self.write(bytes)?)
    }

    fn disconnect(&mut self) {
        if self.socket.take().is_some() {
            tracing::debug!(peer = ?self.peer, "udp transport closed");
        }
        self.peer = None;
    }

    fn is_connected(&self) -> bool {
        self.socket.is_some()
    }
}
