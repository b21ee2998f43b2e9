//! SNMP values.
//!
//! [`Value`] is the tagged variant type crossing the API boundary on both
//! GET and SET. SET call sites use the `From` coercion table instead of
//! picking wire types by hand: `i32` becomes INTEGER, `&str` becomes
//! OCTET STRING, `u32` becomes Gauge32, `u64` becomes Counter64.

use bytes::Bytes;

use crate::ber::{Decoder, EncodeBuf, int_from_be, tag, uint_from_be};
use crate::error::{DecodeErrorKind, Error, Result};
use crate::oid::Oid;

/// A typed SNMP value.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Value {
    /// INTEGER / Integer32.
    Integer(i32),
    /// OCTET STRING. Not necessarily UTF-8.
    OctetString(Bytes),
    /// NULL, the placeholder in request varbinds.
    Null,
    /// OBJECT IDENTIFIER.
    ObjectIdentifier(Oid),
    /// IpAddress (always 4 octets).
    IpAddress([u8; 4]),
    /// Counter32: wraps at 2^32.
    Counter32(u32),
    /// Gauge32 / Unsigned32.
    Gauge32(u32),
    /// TimeTicks, hundredths of a second.
    TimeTicks(u32),
    /// Opaque, carried without interpretation.
    Opaque(Bytes),
    /// Counter64.
    Counter64(u64),
    /// v2c exception: the object does not exist.
    NoSuchObject,
    /// v2c exception: the instance does not exist.
    NoSuchInstance,
    /// v2c exception: walk ran off the end of the MIB.
    EndOfMibView,
}

impl Value {
    /// True for the three v2c varbind exceptions.
    pub fn is_exception(&self) -> bool {
        matches!(
            self,
            Value::NoSuchObject | Value::NoSuchInstance | Value::EndOfMibView
        )
    }

    /// The signed integer, if this is an INTEGER.
    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Value::Integer(v) => Some(*v),
            _ => None,
        }
    }

    /// The unsigned value of Counter32/Gauge32/TimeTicks.
    pub fn as_u32(&self) -> Option<u32> {
        match self {
            Value::Counter32(v) | Value::Gauge32(v) | Value::TimeTicks(v) => Some(*v),
            _ => None,
        }
    }

    /// The Counter64 value.
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Value::Counter64(v) => Some(*v),
            _ => None,
        }
    }

    /// String content, if this is an OCTET STRING holding valid UTF-8.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::OctetString(b) => std::str::from_utf8(b).ok(),
            _ => None,
        }
    }

    /// Raw bytes of an OCTET STRING or Opaque.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::OctetString(b) | Value::Opaque(b) => Some(b),
            _ => None,
        }
    }

    /// The OID, if this is an OBJECT IDENTIFIER.
    pub fn as_oid(&self) -> Option<&Oid> {
        match self {
            Value::ObjectIdentifier(oid) => Some(oid),
            _ => None,
        }
    }

    /// Encode into the reverse buffer.
    pub(crate) fn encode(&self, buf: &mut EncodeBuf) {
        match self {
            Value::Integer(v) => buf.push_integer(*v),
            Value::OctetString(b) => buf.push_octet_string(b),
            Value::Null => buf.push_null(),
            Value::ObjectIdentifier(oid) => buf.push_oid(oid),
            Value::IpAddress(addr) => buf.push_ip_address(*addr),
            Value::Counter32(v) => buf.push_unsigned32(tag::application::COUNTER32, *v),
            Value::Gauge32(v) => buf.push_unsigned32(tag::application::GAUGE32, *v),
            Value::TimeTicks(v) => buf.push_unsigned32(tag::application::TIMETICKS, *v),
            Value::Opaque(b) => {
                buf.push_bytes(b);
                buf.push_length(b.len());
                buf.push_tag(tag::application::OPAQUE);
            }
            Value::Counter64(v) => buf.push_counter64(*v),
            Value::NoSuchObject => buf.push_empty(tag::context::NO_SUCH_OBJECT),
            Value::NoSuchInstance => buf.push_empty(tag::context::NO_SUCH_INSTANCE),
            Value::EndOfMibView => buf.push_empty(tag::context::END_OF_MIB_VIEW),
        }
    }

    /// Decode one value element.
    pub(crate) fn decode(decoder: &mut Decoder) -> Result<Self> {
        let header_offset = decoder.offset();
        let (t, len) = decoder.read_header()?;
        let content_offset = decoder.offset();
        let content = decoder.read_content(len)?;
        match t {
            tag::universal::INTEGER => Ok(Value::Integer(int_from_be(&content, content_offset)?)),
            tag::universal::OCTET_STRING => Ok(Value::OctetString(content)),
            tag::universal::NULL => Ok(Value::Null),
            tag::universal::OBJECT_IDENTIFIER => Ok(Value::ObjectIdentifier(Oid::from_ber(
                &content,
                content_offset,
            )?)),
            tag::application::IP_ADDRESS => {
                let octets: [u8; 4] = content.as_ref().try_into().map_err(|_| {
                    Error::decode(content_offset, DecodeErrorKind::UnexpectedEof)
                })?;
                Ok(Value::IpAddress(octets))
            }
            tag::application::COUNTER32 => Ok(Value::Counter32(
                uint_from_be(&content, content_offset, 4)? as u32,
            )),
            tag::application::GAUGE32 => Ok(Value::Gauge32(
                uint_from_be(&content, content_offset, 4)? as u32,
            )),
            tag::application::TIMETICKS => Ok(Value::TimeTicks(
                uint_from_be(&content, content_offset, 4)? as u32,
            )),
            tag::application::OPAQUE => Ok(Value::Opaque(content)),
            tag::application::COUNTER64 => Ok(Value::Counter64(uint_from_be(
                &content,
                content_offset,
                8,
            )?)),
            tag::context::NO_SUCH_OBJECT => Ok(Value::NoSuchObject),
            tag::context::NO_SUCH_INSTANCE => Ok(Value::NoSuchInstance),
            tag::context::END_OF_MIB_VIEW => Ok(Value::EndOfMibView),
            other => Err(Error::decode(
                header_offset,
                DecodeErrorKind::UnexpectedTag {
                    expected: tag::universal::NULL,
                    actual: other,
                },
            )),
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Integer(v) => write!(f, "{v}"),
            Value::OctetString(b) => match std::str::from_utf8(b) {
                Ok(s) => write!(f, "{s}"),
                Err(_) => {
                    for byte in b.iter() {
                        write!(f, "{byte:02x}")?;
                    }
                    Ok(())
                }
            },
            Value::Null => write!(f, "null"),
            Value::ObjectIdentifier(oid) => write!(f, "{oid}"),
            Value::IpAddress([a, b, c, d]) => write!(f, "{a}.{b}.{c}.{d}"),
            Value::Counter32(v) | Value::Gauge32(v) | Value::TimeTicks(v) => write!(f, "{v}"),
            Value::Opaque(b) => write!(f, "opaque[{}]", b.len()),
            Value::Counter64(v) => write!(f, "{v}"),
            Value::NoSuchObject => write!(f, "noSuchObject"),
            Value::NoSuchInstance => write!(f, "noSuchInstance"),
            Value::EndOfMibView => write!(f, "endOfMibView"),
        }
    }
}

// Coercion table for SET call sites.

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Integer(v)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::Gauge32(v)
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Value::Counter64(v)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::OctetString(Bytes::copy_from_slice(s.as_bytes()))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::OctetString(Bytes::from(s.into_bytes()))
    }
}

impl From<&[u8]> for Value {
    fn from(b: &[u8]) -> Self {
        Value::OctetString(Bytes::copy_from_slice(b))
    }
}

impl From<Bytes> for Value {
    fn from(b: Bytes) -> Self {
        Value::OctetString(b)
    }
}

impl From<Oid> for Value {
    fn from(oid: Oid) -> Self {
        Value::ObjectIdentifier(oid)
    }
}
