//! # tether-link
//!
//! Transport links for Tether. A [`Link`] is an open bidirectional byte
//! channel between exactly two endpoints: one accepting end and one
//! connecting end. The server and client crates are written against the
//! trait, so a transport can be swapped (TCP for an in-process pipe, for
//! example) without touching server or dispatcher code.
//!
//! Lifecycle: *unopened* → *open* (after a successful bind/accept or
//! connect) → *closed* (terminal; links are never reopened).
//!
//! - **`tcp`** – [`TcpAcceptLink`] (bind a port, accept one peer) and
//!   [`TcpDialLink`] (connect to host:port). The reference transport.
//! - **`mem`** – [`MemoryLink`], an in-process duplex pair used by tests and
//!   pipe-like embeddings.

pub mod mem;
pub mod tcp;

pub use mem::MemoryLink;
pub use tcp::{TcpAcceptLink, TcpDialLink};

use std::net::SocketAddr;

use thiserror::Error;

/// Errors surfaced by transport links.
///
/// All of these are fatal to the current connection, never to the process;
/// the server decides what a failure means for its own lifecycle.
#[derive(Debug, Error)]
pub enum LinkError {
    /// The listening side could not bind its port.
    #[error("bind failed on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// The connecting side could not reach the peer.
    #[error("connect to {addr} failed: {source}")]
    Connect {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// Read or write failed on an established channel.
    #[error("link I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// I/O was attempted before `open()` succeeded.
    #[error("link is not open")]
    NotOpen,

    /// The link was closed, either locally via `close()` or by the peer
    /// disconnecting mid-read. Terminates a server loop cleanly; not logged
    /// as an error.
    #[error("link is closed")]
    Closed,
}

/// An open bidirectional byte channel between two endpoints.
///
/// `open()` is not required to be idempotent; opening twice is undefined.
/// `close()` is always safe, on an open or unopened link, and afterwards all
/// I/O fails with [`LinkError::Closed`].
///
/// `read` returning `Ok(0)` signals a clean end-of-stream at a frame
/// boundary, which callers must distinguish from a mid-frame truncation.
#[allow(async_fn_in_trait)]
pub trait Link {
    /// Establishes the channel: bind + accept on the listening side,
    /// connect on the dialing side.
    async fn open(&mut self) -> Result<(), LinkError>;

    /// Reads up to `buf.len()` bytes, returning the count read.
    /// `Ok(0)` means the peer closed the channel.
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, LinkError>;

    /// Reads exactly `buf.len()` bytes, or fails with [`LinkError::Closed`]
    /// when the channel ends first.
    async fn read_exact(&mut self, buf: &mut [u8]) -> Result<(), LinkError>;

    /// Writes all of `bytes`, blocking the task until fully written.
    async fn write_all(&mut self, bytes: &[u8]) -> Result<(), LinkError>;

    /// Releases the underlying resource. Idempotent, and safe to call from
    /// a different task than the one using the link for I/O once ownership
    /// allows it; dropping the transport unblocks any pending peer read.
    async fn close(&mut self) -> Result<(), LinkError>;
}
