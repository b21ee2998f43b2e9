//! BER encoding via a reverse buffer.
//!
//! Content is written back-to-front: value octets first, then the length,
//! then the tag. Nested lengths never need pre-computation; `finish()`
//! reverses the buffer once.

use bytes::Bytes;

use super::length::encode_length;
use super::tag;
use crate::oid::Oid;

/// Reverse encode buffer.
///
/// All `push_*` methods logically PREPEND to the output, so callers emit
/// elements in reverse document order (see [`push_sequence`](Self::push_sequence)).
pub struct EncodeBuf {
    buf: Vec<u8>,
}

impl EncodeBuf {
    pub fn new() -> Self {
        // Enough for any request this crate builds without reallocating.
        Self::with_capacity(256)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
        }
    }

    /// Number of bytes written so far.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Prepend raw content bytes.
    pub fn push_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend(bytes.iter().rev());
    }

    /// Prepend a length field.
    pub fn push_length(&mut self, len: usize) {
        let (bytes, count) = encode_length(len);
        // Already reversed for prepending
        self.buf.extend_from_slice(&bytes[..count]);
    }

    /// Prepend a tag octet.
    pub fn push_tag(&mut self, tag: u8) {
        self.buf.push(tag);
    }

    /// Encode a constructed element: the closure writes the content (in
    /// reverse order), then length and tag are wrapped around whatever it
    /// produced.
    pub fn push_constructed<F>(&mut self, tag: u8, f: F)
    where
        F: FnOnce(&mut Self),
    {
        let before = self.len();
        f(self);
        let content_len = self.len() - before;
        self.push_length(content_len);
        self.push_tag(tag);
    }

    /// Encode a SEQUENCE.
    pub fn push_sequence<F>(&mut self, f: F)
    where
        F: FnOnce(&mut Self),
    {
        self.push_constructed(tag::universal::SEQUENCE, f);
    }

    /// Encode an INTEGER in minimal two's-complement form.
    pub fn push_integer(&mut self, value: i32) {
        let bytes = value.to_be_bytes();
        let mut start = 0;
        if value >= 0 {
            while start < 3 && bytes[start] == 0 && bytes[start + 1] & 0x80 == 0 {
                start += 1;
            }
        } else {
            while start < 3 && bytes[start] == 0xFF && bytes[start + 1] & 0x80 != 0 {
                start += 1;
            }
        }
        self.push_bytes(&bytes[start..]);
        self.push_length(4 - start);
        self.push_tag(tag::universal::INTEGER);
    }

    /// Encode an unsigned 32-bit value under the given application tag
    /// (Counter32, Gauge32, TimeTicks).
    pub fn push_unsigned32(&mut self, tag: u8, value: u32) {
        let mut bytes = [0u8; 5];
        bytes[1..].copy_from_slice(&value.to_be_bytes());
        // Minimal form, with a leading 0x00 kept when the MSB would read as
        // a sign bit.
        let mut start = 1;
        while start < 4 && bytes[start] == 0 {
            start += 1;
        }
        if bytes[start] & 0x80 != 0 {
            start -= 1;
        }
        self.push_bytes(&bytes[start..]);
        self.push_length(5 - start);
        self.push_tag(tag);
    }

    /// Encode a Counter64.
    pub fn push_counter64(&mut self, value: u64) {
        let mut bytes = [0u8; 9];
        bytes[1..].copy_from_slice(&value.to_be_bytes());
        let mut start = 1;
        while start < 8 && bytes[start] == 0 {
            start += 1;
        }
        if bytes[start] & 0x80 != 0 {
            start -= 1;
        }
        self.push_bytes(&bytes[start..]);
        self.push_length(9 - start);
        self.push_tag(tag::application::COUNTER64);
    }

    /// Encode an OCTET STRING.
    pub fn push_octet_string(&mut self, data: &[u8]) {
        self.push_bytes(data);
        self.push_length(data.len());
        self.push_tag(tag::universal::OCTET_STRING);
    }

    /// Encode a NULL.
    pub fn push_null(&mut self) {
        self.push_length(0);
        self.push_tag(tag::universal::NULL);
    }

    /// Encode an OBJECT IDENTIFIER.
    pub fn push_oid(&mut self, oid: &Oid) {
        let ber = oid.to_ber_smallvec();
        self.push_bytes(&ber);
        self.push_length(ber.len());
        self.push_tag(tag::universal::OBJECT_IDENTIFIER);
    }

    /// Encode an IpAddress (application tag, 4 octets).
    pub fn push_ip_address(&mut self, addr: [u8; 4]) {
        self.push_bytes(&addr);
        self.push_length(4);
        self.push_tag(tag::application::IP_ADDRESS);
    }

    /// Encode an empty-content element with the given tag (the varbind
    /// exception values).
    pub fn push_empty(&mut self, tag: u8) {
        self.push_length(0);
        self.push_tag(tag);
    }

    /// Reverse and hand over the finished encoding.
    pub fn finish(mut self) -> Bytes {
        self.buf.reverse();
        Bytes::from(self.buf)
    }
}

impl Default for EncodeBuf {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encoded<F: FnOnce(&mut EncodeBuf)>(f: F) -> Vec<u8> {
        let mut buf = EncodeBuf::new();
        f(&mut buf);
        buf.finish().to_vec()
    }

    #[test]
    fn integer_minimal_form() {
        assert_eq!(encoded(|b| b.push_integer(0)), [0x02, 0x01, 0x00]);
        assert_eq!(encoded(|b| b.push_integer(42)), [0x02, 0x01, 0x2A]);
        assert_eq!(encoded(|b| b.push_integer(127)), [0x02, 0x01, 0x7F]);
        assert_eq!(encoded(|b| b.push_integer(128)), [0x02, 0x02, 0x00, 0x80]);
        assert_eq!(encoded(|b| b.push_integer(-1)), [0x02, 0x01, 0xFF]);
        assert_eq!(encoded(|b| b.push_integer(-128)), [0x02, 0x01, 0x80]);
        assert_eq!(encoded(|b| b.push_integer(-129)), [0x02, 0x02, 0xFF, 0x7F]);
    }

    #[test]
    fn unsigned_keeps_sign_padding() {
        assert_eq!(
            encoded(|b| b.push_unsigned32(0x42, 0)),
            [0x42, 0x01, 0x00]
        );
        assert_eq!(
            encoded(|b| b.push_unsigned32(0x42, 255)),
            [0x42, 0x02, 0x00, 0xFF]
        );
        assert_eq!(
            encoded(|b| b.push_unsigned32(0x41, 256)),
            [0x41, 0x02, 0x01, 0x00]
        );
        assert_eq!(
            encoded(|b| b.push_unsigned32(0x43, u32::MAX)),
            [0x43, 0x05, 0x00, 0xFF, 0xFF, 0xFF, 0xFF]
        );
    }

    #[test]
    fn counter64_wide_values() {
        assert_eq!(encoded(|b| b.push_counter64(0)), [0x46, 0x01, 0x00]);
        assert_eq!(
            encoded(|b| b.push_counter64(u64::MAX)),
            [0x46, 0x09, 0x00, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF]
        );
    }

    #[test]
    fn null_and_string() {
        assert_eq!(encoded(|b| b.push_null()), [0x05, 0x00]);
        assert_eq!(
            encoded(|b| b.push_octet_string(b"abc")),
            [0x04, 0x03, b'a', b'b', b'c']
        );
    }

    #[test]
    fn sequence_wraps_reversed_content() {
        let bytes = encoded(|b| {
            b.push_sequence(|b| {
                // Reverse order: second element pushed first
                b.push_integer(2);
                b.push_integer(1);
            });
        });
        assert_eq!(bytes, [0x30, 0x06, 0x02, 0x01, 0x01, 0x02, 0x01, 0x02]);
    }
}
