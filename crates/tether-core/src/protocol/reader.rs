//! Cursor-based payload reader, the field-for-field mirror of
//! [`crate::FrameBuilder`].
//!
//! Byte order and signedness of every multi-byte field match the builder
//! exactly; there is no negotiation, both ends are compiled against the same
//! format. Reading past the end of the payload is a [`FrameError::FieldOverrun`]
//! — the frame itself was complete, so this is malformed data rather than a
//! partial read.

use crate::protocol::frame::FrameError;

/// Reads builder-encoded fields from a decoded payload, front to back.
///
/// # Examples
///
/// ```rust
/// use tether_core::{decode_frame, FrameBuilder, PayloadReader};
///
/// let bytes = FrameBuilder::new().append_str("hello").append_i32(-1).build(0x02);
/// let (frame, _) = decode_frame(&bytes).unwrap();
///
/// let mut reader = PayloadReader::new(&frame.payload);
/// assert_eq!(reader.read_string().unwrap(), "hello");
/// assert_eq!(reader.read_i32().unwrap(), -1);
/// assert!(reader.is_empty());
/// ```
#[derive(Debug)]
pub struct PayloadReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> PayloadReader<'a> {
    /// Creates a reader positioned at the start of `payload`.
    pub fn new(payload: &'a [u8]) -> Self {
        Self {
            buf: payload,
            pos: 0,
        }
    }

    /// Number of unread bytes remaining.
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// True when every payload byte has been consumed.
    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Reads a bare byte field.
    pub fn read_u8(&mut self) -> Result<u8, FrameError> {
        let bytes = self.take(1, "byte")?;
        Ok(bytes[0])
    }

    /// Reads a bare integer field: 4 bytes, big-endian two's-complement.
    pub fn read_i32(&mut self) -> Result<i32, FrameError> {
        let bytes = self.take(4, "int")?;
        Ok(i32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// Reads a byte-array field: 4-byte signed length, then that many bytes.
    ///
    /// # Errors
    ///
    /// [`FrameError::NegativeLength`] when the prefix is negative, or
    /// [`FrameError::FieldOverrun`] when the declared bytes are not present.
    pub fn read_bytes(&mut self) -> Result<Vec<u8>, FrameError> {
        let len = self.read_i32()?;
        if len < 0 {
            return Err(FrameError::NegativeLength(len));
        }
        let bytes = self.take(len as usize, "byte array")?;
        Ok(bytes.to_vec())
    }

    /// Reads a string field: 4-byte signed length, then that many UTF-8 bytes.
    ///
    /// A length of `0` decodes to `""` whether the writer appended an empty
    /// string or no string at all; the wire format collapses the two.
    pub fn read_string(&mut self) -> Result<String, FrameError> {
        let len = self.read_i32()?;
        if len < 0 {
            return Err(FrameError::NegativeLength(len));
        }
        let bytes = self.take(len as usize, "string")?;
        String::from_utf8(bytes.to_vec()).map_err(|_| FrameError::InvalidUtf8)
    }

    fn take(&mut self, n: usize, field: &'static str) -> Result<&'a [u8], FrameError> {
        if self.remaining() < n {
            return Err(FrameError::FieldOverrun {
                field,
                needed: n,
                available: self.remaining(),
            });
        }
        let slice = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::builder::FrameBuilder;
    use crate::protocol::frame::{decode_frame, FrameError};

    /// Builds a payload through the real encode/decode path so the reader is
    /// always exercised against wire-true bytes.
    fn payload_of(builder: FrameBuilder) -> Vec<u8> {
        let bytes = builder.build(0x01);
        let (frame, _) = decode_frame(&bytes).unwrap();
        frame.payload
    }

    #[test]
    fn test_reader_mirrors_builder_for_every_field_kind() {
        let payload = payload_of(
            FrameBuilder::new()
                .append_str("class-name")
                .append_bytes(&[0xCA, 0xFE, 0xBA, 0xBE])
                .append_i32(-42)
                .append_u8(7),
        );

        let mut reader = PayloadReader::new(&payload);
        assert_eq!(reader.read_string().unwrap(), "class-name");
        assert_eq!(reader.read_bytes().unwrap(), vec![0xCA, 0xFE, 0xBA, 0xBE]);
        assert_eq!(reader.read_i32().unwrap(), -42);
        assert_eq!(reader.read_u8().unwrap(), 7);
        assert!(reader.is_empty());
    }

    #[test]
    fn test_none_and_empty_string_both_decode_to_empty() {
        let from_none = payload_of(FrameBuilder::new().append_opt_str(None));
        let from_empty = payload_of(FrameBuilder::new().append_str(""));

        assert_eq!(
            PayloadReader::new(&from_none).read_string().unwrap(),
            ""
        );
        assert_eq!(
            PayloadReader::new(&from_empty).read_string().unwrap(),
            ""
        );
    }

    #[test]
    fn test_read_past_end_is_field_overrun() {
        let payload = payload_of(FrameBuilder::new().append_u8(1));
        let mut reader = PayloadReader::new(&payload);
        reader.read_u8().unwrap();
        assert!(matches!(
            reader.read_i32(),
            Err(FrameError::FieldOverrun { field: "int", .. })
        ));
    }

    #[test]
    fn test_string_with_declared_length_past_payload_is_overrun() {
        // Hand-craft a string field whose prefix overstates its bytes.
        let mut payload = 100i32.to_be_bytes().to_vec();
        payload.extend_from_slice(b"short");
        let mut reader = PayloadReader::new(&payload);
        assert!(matches!(
            reader.read_string(),
            Err(FrameError::FieldOverrun { field: "string", .. })
        ));
    }

    #[test]
    fn test_negative_length_prefix_is_rejected() {
        let payload = (-1i32).to_be_bytes().to_vec();
        let mut reader = PayloadReader::new(&payload);
        assert_eq!(reader.read_string(), Err(FrameError::NegativeLength(-1)));

        let mut reader = PayloadReader::new(&payload);
        assert_eq!(reader.read_bytes(), Err(FrameError::NegativeLength(-1)));
    }

    #[test]
    fn test_invalid_utf8_in_string_field_is_rejected() {
        let mut payload = 2i32.to_be_bytes().to_vec();
        payload.extend_from_slice(&[0xFF, 0xFE]);
        let mut reader = PayloadReader::new(&payload);
        assert_eq!(reader.read_string(), Err(FrameError::InvalidUtf8));
    }

    #[test]
    fn test_remaining_tracks_cursor() {
        let payload = payload_of(FrameBuilder::new().append_i32(5).append_u8(9));
        let mut reader = PayloadReader::new(&payload);
        assert_eq!(reader.remaining(), 5);
        reader.read_i32().unwrap();
        assert_eq!(reader.remaining(), 1);
    }
}
