//! In-process duplex link.
//!
//! [`MemoryLink`] carries frames over a `tokio::io::duplex` pipe instead of
//! a socket. It exists so server and client code can be exercised end to end
//! in unit tests without binding ports, and doubles as the pipe-like
//! transport for same-process embeddings. Both ends come out of
//! [`MemoryLink::pair`] already connected, so `open()` is a no-op.

use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};

use crate::{Link, LinkError};

/// Default buffer capacity for a memory pair, generous for control frames.
const DEFAULT_CAPACITY: usize = 64 * 1024;

/// One end of an in-process duplex byte channel.
pub struct MemoryLink {
    stream: Option<DuplexStream>,
    closed: bool,
}

impl MemoryLink {
    /// Creates a connected pair of links with the default buffer capacity.
    pub fn pair() -> (MemoryLink, MemoryLink) {
        Self::pair_with_capacity(DEFAULT_CAPACITY)
    }

    /// Creates a connected pair with an explicit per-direction buffer
    /// capacity. A writer blocks once it is `capacity` bytes ahead of the
    /// reader, which mirrors socket backpressure.
    pub fn pair_with_capacity(capacity: usize) -> (MemoryLink, MemoryLink) {
        let (a, b) = tokio::io::duplex(capacity);
        (
            MemoryLink {
                stream: Some(a),
                closed: false,
            },
            MemoryLink {
                stream: Some(b),
                closed: false,
            },
        )
    }

    fn stream_mut(&mut self) -> Result<&mut DuplexStream, LinkError> {
        if self.closed {
            return Err(LinkError::Closed);
        }
        self.stream.as_mut().ok_or(LinkError::NotOpen)
    }
}

impl Link for MemoryLink {
    async fn open(&mut self) -> Result<(), LinkError> {
        if self.closed {
            return Err(LinkError::Closed);
        }
        // Pairs are born connected.
        Ok(())
    }

    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, LinkError> {
        let stream = self.stream_mut()?;
        Ok(stream.read(buf).await?)
    }

    async fn read_exact(&mut self, buf: &mut [u8]) -> Result<(), LinkError> {
        let stream = self.stream_mut()?;
        stream.read_exact(buf).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::UnexpectedEof {
                LinkError::Closed
            } else {
                LinkError::Io(e)
            }
        })?;
        Ok(())
    }

    async fn write_all(&mut self, bytes: &[u8]) -> Result<(), LinkError> {
        let stream = self.stream_mut()?;
        Ok(stream.write_all(bytes).await?)
    }

    async fn close(&mut self) -> Result<(), LinkError> {
        self.closed = true;
        if let Some(mut stream) = self.stream.take() {
            let _ = stream.shutdown().await;
        }
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
