use std::fmt;
use std::io::{Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

use tracing::{debug, info};

use crate::error::{Result, TransportError};

/// A connected TCP link to the control server.
///
/// `try_clone` yields an independent handle over the same socket so one
/// handle can serve a reader thread while another writes. `shutdown` is
/// best-effort and idempotent; after it, reads on every handle return EOF.
pub struct TcpLink {
    stream: TcpStream,
    peer: SocketAddr,
}

impl TcpLink {
    /// Connect to `host:port`, waiting at most `timeout`.
    ///
    /// The first resolved address is used. `TCP_NODELAY` is set; command
    /// frames are small and latency-sensitive.
    pub fn connect(host: &str, port: u16, timeout: Duration) -> Result<Self> {
        let mut addrs = (host, port)
            .to_socket_addrs()
            .map_err(|e| TransportError::Resolve {
                host: host.to_string(),
                port,
                source: e,
            })?;
        let addr = addrs.next().ok_or_else(|| TransportError::Resolve {
            host: host.to_string(),
            port,
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "no address for host"),
        })?;

        let stream = TcpStream::connect_timeout(&addr, timeout)
            .map_err(|e| TransportError::Connect { addr, source: e })?;
        stream.set_nodelay(true)?;

        info!(%addr, "connected to control server");
        Ok(Self { stream, peer: addr })
    }

    /// Address of the connected peer.
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    /// Clone the underlying socket into an independent handle.
    pub fn try_clone(&self) -> Result<Self> {
        let stream = self.stream.try_clone()?;
        Ok(Self {
            stream,
            peer: self.peer,
        })
    }

    /// Set the read timeout on the underlying socket.
    pub fn set_read_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        self.stream.set_read_timeout(timeout).map_err(Into::into)
    }

    /// Shut down both directions of the link. Best-effort and idempotent.
    pub fn shutdown(&self) {
        debug!(peer = %self.peer, "shutting down link");
        let _ = self.stream.shutdown(Shutdown::Both);
    }
}

impl Read for TcpLink {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.stream.read(buf)
    }
}

impl Write for TcpLink {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.stream.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.stream.flush()
    }
}

impl fmt::Debug for TcpLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TcpLink").field("peer", &self.peer).finish()
    }
}
