//! Client connection: framed request/response over a [`Link`].
//!
//! The read side buffers bytes across reads exactly like the agent's input
//! loop does: TCP may deliver a response in pieces or two responses at
//! once, so bytes accumulate in a receive buffer and frames are decoded out
//! of its front.

use std::net::SocketAddr;

use tether_core::{decode_frame, Frame, FrameError};
use tether_link::{Link, LinkError, TcpDialLink};
use thiserror::Error;
use tracing::debug;

/// Errors surfaced by the client connection.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The transport failed: dial, read, or write.
    #[error(transparent)]
    Link(#[from] LinkError),

    /// The agent's bytes did not decode as a frame.
    #[error("framing violation: {0}")]
    Framing(#[from] FrameError),

    /// The agent hung up while a response was outstanding.
    #[error("agent disconnected before responding")]
    Disconnected,
}

/// A connection to an embedded agent, generic over the transport.
///
/// Use [`ClientConnection::connect`] for the TCP case; [`ClientConnection::from_link`]
/// accepts any already-open [`Link`], which is how tests drive a client over
/// an in-memory pair.
pub struct ClientConnection<L: Link> {
    link: L,
    recv_buf: Vec<u8>,
}

impl ClientConnection<TcpDialLink> {
    /// Dials the agent's control port.
    ///
    /// # Errors
    ///
    /// Returns [`LinkError::Connect`] when the agent is not listening there.
    pub async fn connect(addr: SocketAddr) -> Result<Self, ClientError> {
        let mut link = TcpDialLink::new(addr);
        link.open().await?;
        debug!("control channel to {addr} open");
        Ok(Self::from_link(link))
    }
}

impl<L: Link> ClientConnection<L> {
    /// Wraps an already-open link.
    pub fn from_link(link: L) -> Self {
        Self {
            link,
            recv_buf: Vec::with_capacity(4096),
        }
    }

    /// Sends a fire-and-forget command; no response is read.
    pub async fn send(&mut self, frame: &Frame) -> Result<(), ClientError> {
        self.link.write_all(&frame.encode()).await?;
        debug!(key = frame.key, "command written");
        Ok(())
    }

    /// Sends a command and reads exactly one response frame.
    ///
    /// # Errors
    ///
    /// [`ClientError::Disconnected`] when the agent closes the channel
    /// before a complete response arrived.
    pub async fn request(&mut self, frame: &Frame) -> Result<Frame, ClientError> {
        self.send(frame).await?;
        self.read_response().await
    }

    /// Closes the connection. Safe to call more than once.
    pub async fn close(&mut self) -> Result<(), ClientError> {
        self.link.close().await?;
        Ok(())
    }

    async fn read_response(&mut self) -> Result<Frame, ClientError> {
        let mut read_tmp = [0u8; 4096];
        loop {
            match decode_frame(&self.recv_buf) {
                Ok((frame, consumed)) => {
                    self.recv_buf.drain(..consumed);
                    debug!(key = frame.key, len = frame.payload.len(), "response received");
                    return Ok(frame);
                }
                // Not a full response yet; keep reading.
                Err(FrameError::Truncated { .. }) => {}
                Err(e) => return Err(e.into()),
            }

            match self.link.read(&mut read_tmp).await {
                Ok(0) | Err(LinkError::Closed) => return Err(ClientError::Disconnected),
                Ok(n) => self.recv_buf.extend_from_slice(&read_tmp[..n]),
                Err(e) => return Err(e.into()),
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
