//! BER length field encoding and decoding.

use crate::error::{DecodeErrorKind, Error, Result};

/// Maximum element length accepted while decoding (2 MiB).
///
/// SNMP messages from instruments are far smaller; the cap bounds allocation
/// on corrupt or hostile input.
pub const MAX_LENGTH: usize = 0x20_0000;

/// Encode a definite-form length.
///
/// Returns the length bytes in REVERSED order together with the byte count,
/// ready to be pushed into the reverse encode buffer.
pub fn encode_length(len: usize) -> ([u8; 5], usize) {
    let mut out = [0u8; 5];
    if len < 0x80 {
        out[0] = len as u8;
        return (out, 1);
    }
    // Long form: content bytes (big-endian) then the count octet; reversed
    // here so the prepend order comes out right.
    let mut n = 0;
    let mut v = len;
    while v > 0 {
        out[n] = (v & 0xFF) as u8;
        v >>= 8;
        n += 1;
    }
    out[n] = 0x80 | n as u8;
    (out, n + 1)
}

/// Decode a length field at `data[0..]`.
///
/// Returns `(length, bytes_consumed)`. Indefinite form is rejected, as are
/// lengths beyond [`MAX_LENGTH`]. `offset` is the absolute position of the
/// length octet for error reporting.
pub fn decode_length(data: &[u8], offset: usize) -> Result<(usize, usize)> {
    let first = *data
        .first()
        .ok_or_else(|| Error::decode(offset, DecodeErrorKind::UnexpectedEof))?;

    if first & 0x80 == 0 {
        return Ok((first as usize, 1));
    }

    let num_bytes = (first & 0x7F) as usize;
    if num_bytes == 0 {
        return Err(Error::decode(offset, DecodeErrorKind::IndefiniteLength));
    }
    if num_bytes > 4 {
        return Err(Error::decode(offset, DecodeErrorKind::LengthOverflow));
    }
    if data.len() < 1 + num_bytes {
        return Err(Error::decode(offset, DecodeErrorKind::UnexpectedEof));
    }

    let mut len: usize = 0;
    for &byte in &data[1..=num_bytes] {
        len = (len << 8) | byte as usize;
    }
    if len > MAX_LENGTH {
        return Err(Error::decode(offset, DecodeErrorKind::LengthOverflow));
    }
    Ok((len, 1 + num_bytes))
}
