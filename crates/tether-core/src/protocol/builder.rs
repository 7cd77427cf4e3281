//! Append-then-patch frame construction.
//!
//! The total payload length of a frame is unknown until every field has been
//! appended, so the builder reserves the 5-byte header up front, appends
//! fields behind it in call order, and [`FrameBuilder::build`] patches the
//! key and the big-endian payload length into the reserved bytes last.
//!
//! Field encodings (mirrored exactly by [`crate::PayloadReader`]):
//!
//! | Field      | Encoding                                             |
//! |------------|------------------------------------------------------|
//! | string     | 4-byte big-endian signed length, then raw UTF-8 bytes |
//! | byte array | 4-byte big-endian signed length, then raw bytes      |
//! | integer    | 4 bytes, big-endian two's-complement                 |
//! | byte       | 1 byte                                               |
//!
//! A string or byte-array length of `0` encodes both "absent" and "empty";
//! the two are indistinguishable after decoding. This is a documented lossy
//! property of the wire format, not a bug.

use crate::protocol::frame::{Frame, HEADER_SIZE};

/// Builds one frame's wire bytes by appending fields in call order.
///
/// All appends write to an in-memory buffer and cannot fail, so the entire
/// builder API is infallible. Methods consume and return `self` for
/// chaining.
///
/// # Examples
///
/// ```rust
/// use tether_core::{decode_frame, FrameBuilder};
///
/// let bytes = FrameBuilder::new()
///     .append_str("redefine")
///     .append_i32(3)
///     .append_u8(0xFF)
///     .build(0x04);
///
/// let (frame, _) = decode_frame(&bytes).unwrap();
/// assert_eq!(frame.key, 0x04);
/// ```
#[derive(Debug)]
pub struct FrameBuilder {
    buf: Vec<u8>,
}

impl FrameBuilder {
    /// Creates a builder with the 5-byte header reserved as placeholders.
    pub fn new() -> Self {
        Self {
            buf: vec![0u8; HEADER_SIZE],
        }
    }

    /// Appends a string field: 4-byte signed byte length, then the raw bytes.
    pub fn append_str(mut self, data: &str) -> Self {
        self.buf
            .extend_from_slice(&(data.len() as i32).to_be_bytes());
        self.buf.extend_from_slice(data.as_bytes());
        self
    }

    /// Appends an optional string field. `None` is written as length `0`,
    /// identical on the wire to an empty string; callers must not depend on
    /// round-tripping the distinction.
    pub fn append_opt_str(self, data: Option<&str>) -> Self {
        match data {
            Some(s) => self.append_str(s),
            None => self.append_str(""),
        }
    }

    /// Appends a byte-array field: 4-byte signed length, then the raw bytes.
    pub fn append_bytes(mut self, data: &[u8]) -> Self {
        self.buf
            .extend_from_slice(&(data.len() as i32).to_be_bytes());
        self.buf.extend_from_slice(data);
        self
    }

    /// Appends a bare integer field: 4 bytes, big-endian two's-complement.
    pub fn append_i32(mut self, data: i32) -> Self {
        self.buf.extend_from_slice(&data.to_be_bytes());
        self
    }

    /// Appends a bare byte field.
    pub fn append_u8(mut self, data: u8) -> Self {
        self.buf.push(data);
        self
    }

    /// Finalizes the frame: patches byte 0 with `key` and bytes 1..5 with
    /// the big-endian byte length of everything appended after the header,
    /// then returns the complete wire bytes.
    pub fn build(mut self, key: u8) -> Vec<u8> {
        let payload_len = (self.buf.len() - HEADER_SIZE) as u32;
        self.buf[0] = key;
        self.buf[1..HEADER_SIZE].copy_from_slice(&payload_len.to_be_bytes());
        self.buf
    }

    /// Finalizes as a [`Frame`] value instead of wire bytes, for callers
    /// that hand the frame to a writer rather than a byte sink (handlers,
    /// client requests).
    pub fn build_frame(mut self, key: u8) -> Frame {
        let payload = self.buf.split_off(HEADER_SIZE);
        Frame::new(key, payload)
    }
}

impl Default for FrameBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::frame::decode_frame;

    #[test]
    fn test_build_with_no_fields_is_empty_frame() {
        let bytes = FrameBuilder::new().build(0x2A);
        assert_eq!(bytes, vec![0x2A, 0, 0, 0, 0]);
    }

    #[test]
    fn test_build_patches_key_as_first_byte_after_many_appends() {
        // Key patching must hold regardless of how much was appended first.
        let mut builder = FrameBuilder::new();
        for i in 0..100 {
            builder = builder.append_i32(i);
        }
        let bytes = builder.build(0x7F);
        assert_eq!(bytes[0], 0x7F);
    }

    #[test]
    fn test_build_patches_length_to_exact_appended_byte_count() {
        let bytes = FrameBuilder::new()
            .append_str("abc") // 4 + 3
            .append_i32(7) // 4
            .append_u8(1) // 1
            .build(0x01);
        let declared = u32::from_be_bytes([bytes[1], bytes[2], bytes[3], bytes[4]]) as usize;
        assert_eq!(declared, 12);
        assert_eq!(bytes.len(), HEADER_SIZE + declared);
    }

    #[test]
    fn test_append_str_uses_byte_length_not_char_count() {
        // "é" is one char but two UTF-8 bytes; the prefix must say 2.
        let bytes = FrameBuilder::new().append_str("é").build(0x01);
        let field_len =
            i32::from_be_bytes([bytes[5], bytes[6], bytes[7], bytes[8]]);
        assert_eq!(field_len, 2);
    }

    #[test]
    fn test_append_opt_str_none_and_empty_are_identical_on_wire() {
        let none_bytes = FrameBuilder::new().append_opt_str(None).build(0x01);
        let empty_bytes = FrameBuilder::new().append_opt_str(Some("")).build(0x01);
        assert_eq!(none_bytes, empty_bytes);
    }

    #[test]
    fn test_build_frame_matches_wire_bytes() {
        let make = || FrameBuilder::new().append_str("x").append_u8(2);
        let frame = make().build_frame(0x09);
        assert_eq!(frame.encode(), make().build(0x09));
    }

    #[test]
    fn test_built_bytes_decode_as_one_frame() {
        let bytes = FrameBuilder::new()
            .append_bytes(&[9, 8, 7])
            .append_u8(0xEE)
            .build(0x33);
        let (frame, consumed) = decode_frame(&bytes).unwrap();
        assert_eq!(frame.key, 0x33);
        assert_eq!(consumed, bytes.len());
        assert_eq!(frame.payload.len(), 4 + 3 + 1);
    }
}
