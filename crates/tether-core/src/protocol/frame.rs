//! Frame type and streaming decoder.
//!
//! Wire format:
//! ```text
//! [key:1][payload_len:4][payload:N]
//! ```
//! Total header size: 5 bytes. `payload_len` is big-endian unsigned and
//! counts payload bytes only, never the header. Both endpoints are compiled
//! against the same header size; there is no negotiation, and a mismatch
//! desyncs the stream irrecoverably.

use thiserror::Error;

/// Fixed size of the frame header: 1 key byte + 4 length bytes.
pub const HEADER_SIZE: usize = 5;

/// Errors that can occur while decoding a frame or reading payload fields.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FrameError {
    /// Not enough bytes yet for a complete frame. Retryable: a streaming
    /// caller buffers what it has and tries again after the next read.
    #[error("truncated frame: need at least {needed} bytes, got {available}")]
    Truncated { needed: usize, available: usize },

    /// A field read ran past the end of a complete payload. Unlike
    /// [`FrameError::Truncated`] this is malformed data, not a partial read:
    /// no amount of further bytes can repair it.
    #[error("field {field} overruns payload: need {needed} bytes, got {available}")]
    FieldOverrun {
        field: &'static str,
        needed: usize,
        available: usize,
    },

    /// A length-prefixed field declared a negative length.
    #[error("negative field length: {0}")]
    NegativeLength(i32),

    /// A string field did not contain valid UTF-8.
    #[error("string field is not valid UTF-8")]
    InvalidUtf8,
}

/// One complete wire message: command key plus opaque payload.
///
/// The `length` field of the wire format is not stored; it is always
/// `payload.len()`, re-derived on encode. A frame with an empty payload is
/// a valid frame (`length = 0`), never a "null" payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Command or response type identifier.
    pub key: u8,
    /// Opaque payload bytes; structure is defined per key by the handler
    /// catalog, using the builder/reader field conventions.
    pub payload: Vec<u8>,
}

impl Frame {
    /// Creates a frame from a key and a ready-made payload.
    pub fn new(key: u8, payload: Vec<u8>) -> Self {
        Self { key, payload }
    }

    /// Creates a frame with an empty payload, for bare signal commands.
    pub fn empty(key: u8) -> Self {
        Self {
            key,
            payload: Vec::new(),
        }
    }

    /// Encodes this frame into its wire representation.
    ///
    /// Writing into an in-memory buffer cannot fail, so this is infallible.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(HEADER_SIZE + self.payload.len());
        buf.push(self.key);
        buf.extend_from_slice(&(self.payload.len() as u32).to_be_bytes());
        buf.extend_from_slice(&self.payload);
        buf
    }
}

/// Decodes one [`Frame`] from the beginning of `bytes`.
///
/// Returns the decoded frame and the total number of bytes consumed
/// (header + payload), so a streaming caller can advance its read cursor.
/// TCP is a stream protocol: a single read may deliver less than one frame
/// or several at once, so callers accumulate bytes and retry on
/// [`FrameError::Truncated`].
///
/// # Errors
///
/// Returns [`FrameError::Truncated`] when fewer bytes are available than the
/// header, or than the header's declared payload length, requires.
///
/// # Examples
///
/// ```rust
/// use tether_core::{decode_frame, Frame};
///
/// let bytes = Frame::new(0x01, vec![0xAA]).encode();
/// let (frame, consumed) = decode_frame(&bytes).unwrap();
/// assert_eq!(frame.key, 0x01);
/// assert_eq!(consumed, bytes.len());
/// ```
pub fn decode_frame(bytes: &[u8]) -> Result<(Frame, usize), FrameError> {
    if bytes.len() < HEADER_SIZE {
        return Err(FrameError::Truncated {
            needed: HEADER_SIZE,
            available: bytes.len(),
        });
    }

    let key = bytes[0];
    let payload_len = u32::from_be_bytes([bytes[1], bytes[2], bytes[3], bytes[4]]) as usize;

    let total = HEADER_SIZE + payload_len;
    if bytes.len() < total {
        return Err(FrameError::Truncated {
            needed: total,
            available: bytes.len(),
        });
    }

    let payload = bytes[HEADER_SIZE..total].to_vec();
    Ok((Frame { key, payload }, total))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
