//! TCP stream links, the reference transport.
//!
//! [`TcpAcceptLink`] is the listening side: it binds a port, accepts exactly
//! one peer, and exposes the resulting byte stream for the lifetime of the
//! link. [`TcpDialLink`] is the connecting side. Both use only portable
//! `tokio::net` APIs.

use std::net::SocketAddr;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info};

use crate::{Link, LinkError};

/// Maps an I/O failure on an established stream: a clean end-of-stream
/// surfaces as [`LinkError::Closed`], everything else as [`LinkError::Io`].
fn map_stream_err(e: std::io::Error) -> LinkError {
    if e.kind() == std::io::ErrorKind::UnexpectedEof {
        LinkError::Closed
    } else {
        LinkError::Io(e)
    }
}

// ── Accept side ───────────────────────────────────────────────────────────────

/// The listening end of a TCP link: binds `bind_addr` and accepts one peer.
///
/// The link serves that single peer for its whole lifetime; re-accepting is
/// a new link. Construct with [`TcpAcceptLink::new`] to bind lazily inside
/// `open()`, or with [`TcpAcceptLink::bind`] to bind eagerly — the latter
/// lets a caller bind port 0 and read the ephemeral port from
/// [`TcpAcceptLink::local_addr`] before any peer connects.
pub struct TcpAcceptLink {
    bind_addr: SocketAddr,
    listener: Option<TcpListener>,
    stream: Option<TcpStream>,
    closed: bool,
}

impl TcpAcceptLink {
    /// Creates an unopened link that will bind `bind_addr` during `open()`.
    pub fn new(bind_addr: SocketAddr) -> Self {
        Self {
            bind_addr,
            listener: None,
            stream: None,
            closed: false,
        }
    }

    /// Binds the listener immediately and returns the unopened link.
    /// `open()` will then only accept.
    ///
    /// # Errors
    ///
    /// Returns [`LinkError::Bind`] when the port is already bound or the
    /// process may not bind it.
    pub async fn bind(bind_addr: SocketAddr) -> Result<Self, LinkError> {
        let listener = TcpListener::bind(bind_addr)
            .await
            .map_err(|source| LinkError::Bind {
                addr: bind_addr,
                source,
            })?;
        Ok(Self {
            bind_addr,
            listener: Some(listener),
            stream: None,
            closed: false,
        })
    }

    /// The bound local address, once a listener exists. Useful after
    /// binding port 0.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.listener
            .as_ref()
            .and_then(|l| l.local_addr().ok())
            .or_else(|| self.stream.as_ref().and_then(|s| s.local_addr().ok()))
    }

    fn stream_mut(&mut self) -> Result<&mut TcpStream, LinkError> {
        if self.closed {
            return Err(LinkError::Closed);
        }
        self.stream.as_mut().ok_or(LinkError::NotOpen)
    }
}

impl Link for TcpAcceptLink {
    async fn open(&mut self) -> Result<(), LinkError> {
        if self.closed {
            return Err(LinkError::Closed);
        }
        let listener = match self.listener.take() {
            Some(listener) => listener,
            None => TcpListener::bind(self.bind_addr)
                .await
                .map_err(|source| LinkError::Bind {
                    addr: self.bind_addr,
                    source,
                })?,
        };
        info!("listening on {}", self.bind_addr);

        let (stream, peer_addr) = listener.accept().await?;
        info!("accepted control connection from {peer_addr}");
        // The listener is dropped here: one peer per link lifetime.
        self.stream = Some(stream);
        Ok(())
    }

    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, LinkError> {
        let stream = self.stream_mut()?;
        stream.read(buf).await.map_err(map_stream_err)
    }

    async fn read_exact(&mut self, buf: &mut [u8]) -> Result<(), LinkError> {
        let stream = self.stream_mut()?;
        stream.read_exact(buf).await.map_err(map_stream_err)?;
        Ok(())
    }

    async fn write_all(&mut self, bytes: &[u8]) -> Result<(), LinkError> {
        let stream = self.stream_mut()?;
        stream.write_all(bytes).await.map_err(map_stream_err)
    }

    async fn close(&mut self) -> Result<(), LinkError> {
        self.closed = true;
        self.listener = None;
        if let Some(mut stream) = self.stream.take() {
            // A failed shutdown still releases the socket on drop.
            let _ = stream.shutdown().await;
            debug!("accept link closed");
        }
        Ok(())
    }
}

// ── Dial side ─────────────────────────────────────────────────────────────────

/// The connecting end of a TCP link: dials `peer_addr` during `open()`.
pub struct TcpDialLink {
    peer_addr: SocketAddr,
    stream: Option<TcpStream>,
    closed: bool,
}

impl TcpDialLink {
    /// Creates an unopened link that will dial `peer_addr` during `open()`.
    pub fn new(peer_addr: SocketAddr) -> Self {
        Self {
            peer_addr,
            stream: None,
            closed: false,
        }
    }

    fn stream_mut(&mut self) -> Result<&mut TcpStream, LinkError> {
        if self.closed {
            return Err(LinkError::Closed);
        }
        self.stream.as_mut().ok_or(LinkError::NotOpen)
    }
}

impl Link for TcpDialLink {
    async fn open(&mut self) -> Result<(), LinkError> {
        if self.closed {
            return Err(LinkError::Closed);
        }
        let stream = TcpStream::connect(self.peer_addr)
            .await
            .map_err(|source| LinkError::Connect {
                addr: self.peer_addr,
                source,
            })?;
        debug!("connected to {}", self.peer_addr);
        self.stream = Some(stream);
        Ok(())
    }

    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, LinkError> {
        let stream = self.stream_mut()?;
        stream.read(buf).await.map_err(map_stream_err)
    }

    async fn read_exact(&mut self, buf: &mut [u8]) -> Result<(), LinkError> {
        let stream = self.stream_mut()?;
        stream.read_exact(buf).await.map_err(map_stream_err)?;
        Ok(())
    }

    async fn write_all(&mut self, bytes: &[u8]) -> Result<(), LinkError> {
        let stream = self.stream_mut()?;
        stream.write_all(bytes).await.map_err(map_stream_err)
    }

    async fn close(&mut self) -> Result<(), LinkError> {
        self.closed = true;
        if let Some(mut stream) = self.stream.take() {
            let _ = stream.shutdown().await;
            debug!("dial link closed");
        }
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
