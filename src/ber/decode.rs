//! BER decoding over zero-copy buffers.
//!
//! The [`Decoder`] walks a `Bytes` buffer, handing out sub-decoders for
//! constructed elements and slicing string content without copying. Errors
//! carry the absolute input offset of the failing octet.

use bytes::Bytes;

use super::length::decode_length;
use super::tag;
use crate::error::{DecodeErrorKind, Error, Result};
use crate::oid::Oid;

/// Cursor over BER-encoded input.
pub struct Decoder {
    data: Bytes,
    pos: usize,
    /// Absolute offset of `data[0]` in the original message, so errors from
    /// sub-decoders still point at the right place.
    base: usize,
}

impl Decoder {
    /// Decode from the start of `data`.
    pub fn new(data: Bytes) -> Self {
        Self {
            data,
            pos: 0,
            base: 0,
        }
    }

    /// Absolute offset of the next unread octet.
    pub fn offset(&self) -> usize {
        self.base + self.pos
    }

    /// Bytes left in this element.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.pos >= self.data.len()
    }

    /// Look at the next tag without consuming it.
    pub fn peek_tag(&self) -> Result<u8> {
        self.data
            .get(self.pos)
            .copied()
            .ok_or_else(|| Error::decode(self.offset(), DecodeErrorKind::UnexpectedEof))
    }

    /// Consume a tag and length, leaving the content unread.
    ///
    /// Returns `(tag, content_length)` after verifying the content fits the
    /// remaining input.
    pub fn read_header(&mut self) -> Result<(u8, usize)> {
        let tag = self.peek_tag()?;
        self.pos += 1;
        let (len, consumed) = decode_length(&self.data[self.pos..], self.offset())?;
        self.pos += consumed;
        if len > self.remaining() {
            return Err(Error::decode(self.offset(), DecodeErrorKind::UnexpectedEof));
        }
        Ok((tag, len))
    }

    /// Consume `len` content octets as a zero-copy slice.
    pub fn read_content(&mut self, len: usize) -> Result<Bytes> {
        if len > self.remaining() {
            return Err(Error::decode(self.offset(), DecodeErrorKind::UnexpectedEof));
        }
        let content = self.data.slice(self.pos..self.pos + len);
        self.pos += len;
        Ok(content)
    }

    /// Consume a constructed element with the expected tag and return a
    /// decoder scoped to its content.
    pub fn sub_decoder(&mut self, expected: u8) -> Result<Decoder> {
        let header_offset = self.offset();
        let (tag, len) = self.read_header()?;
        if tag != expected {
            return Err(Error::decode(
                header_offset,
                DecodeErrorKind::UnexpectedTag {
                    expected,
                    actual: tag,
                },
            ));
        }
        let base = self.offset();
        let content = self.read_content(len)?;
        Ok(Decoder {
            data: content,
            pos: 0,
            base,
        })
    }

    /// Consume a SEQUENCE and return a decoder over its content.
    pub fn read_sequence(&mut self) -> Result<Decoder> {
        self.sub_decoder(tag::universal::SEQUENCE)
    }

    /// Consume an INTEGER.
    pub fn read_integer(&mut self) -> Result<i32> {
        let header_offset = self.offset();
        let (t, len) = self.read_header()?;
        if t != tag::universal::INTEGER {
            return Err(Error::decode(
                header_offset,
                DecodeErrorKind::UnexpectedTag {
                    expected: tag::universal::INTEGER,
                    actual: t,
                },
            ));
        }
        let content_offset = self.offset();
        let content = self.read_content(len)?;
        int_from_be(&content, content_offset)
    }

    /// Consume an OCTET STRING, zero-copy.
    pub fn read_octet_string(&mut self) -> Result<Bytes> {
        let header_offset = self.offset();
        let (t, len) = self.read_header()?;
        if t != tag::universal::OCTET_STRING {
            return Err(Error::decode(
                header_offset,
                DecodeErrorKind::UnexpectedTag {
                    expected: tag::universal::OCTET_STRING,
                    actual: t,
                },
            ));
        }
        self.read_content(len)
    }

    /// Consume an OBJECT IDENTIFIER.
    pub fn read_oid(&mut self) -> Result<Oid> {
        let header_offset = self.offset();
        let (t, len) = self.read_header()?;
        if t != tag::universal::OBJECT_IDENTIFIER {
            return Err(Error::decode(
                header_offset,
                DecodeErrorKind::UnexpectedTag {
                    expected: tag::universal::OBJECT_IDENTIFIER,
                    actual: t,
                },
            ));
        }
        let content_offset = self.offset();
        let content = self.read_content(len)?;
        Oid::from_ber(&content, content_offset)
    }

    /// Fail if unread octets remain.
    pub fn expect_end(&self) -> Result<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(Error::decode(self.offset(), DecodeErrorKind::TrailingData))
        }
    }
}

/// Parse signed big-endian two's-complement content (1..=4 octets).
pub(crate) fn int_from_be(content: &[u8], offset: usize) -> Result<i32> {
    if content.is_empty() || content.len() > 4 {
        return Err(Error::decode(offset, DecodeErrorKind::IntegerOverflow));
    }
    let mut value: i32 = if content[0] & 0x80 != 0 { -1 } else { 0 };
    for &byte in content {
        value = (value << 8) | i32::from(byte);
    }
    Ok(value)
}

/// Parse unsigned big-endian content into u64, allowing one leading 0x00 pad.
///
/// Content is treated as unsigned even when the high bit is set; some agents
/// omit the sign-padding octet and net-snmp accepts them.
pub(crate) fn uint_from_be(content: &[u8], offset: usize, max_bytes: usize) -> Result<u64> {
    if content.is_empty() {
        return Err(Error::decode(offset, DecodeErrorKind::IntegerOverflow));
    }
    let stripped = if content[0] == 0 && content.len() > 1 {
        &content[1..]
    } else {
        content
    };
    if stripped.len() > max_bytes {
        return Err(Error::decode(offset, DecodeErrorKind::IntegerOverflow));
    }
    let mut value: u64 = 0;
    for &byte in stripped {
        value = (value << 8) | u64::from(byte);
    }
    Ok(value)
}
