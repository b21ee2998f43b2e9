//! Variable bindings: (OID, value) pairs.

use crate::ber::{Decoder, EncodeBuf};
use crate::error::Result;
use crate::oid::Oid;
use crate::value::Value;

/// One variable binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VarBind {
    pub oid: Oid,
    pub value: Value,
}

impl VarBind {
    pub fn new(oid: Oid, value: Value) -> Self {
        Self { oid, value }
    }

    /// A binding with a NULL value, as used in GET/GETNEXT requests.
    pub fn null(oid: Oid) -> Self {
        Self {
            oid,
            value: Value::Null,
        }
    }

    /// Encode as `SEQUENCE { oid, value }`.
    pub(crate) fn encode(&self, buf: &mut EncodeBuf) {
        buf.push_sequence(|buf| {
            self.value.encode(buf);
            buf.push_oid(&self.oid);
        });
    }

    pub(crate) fn decode(decoder: &mut Decoder) -> Result<Self> {
        let mut seq = decoder.read_sequence()?;
        let oid = seq.read_oid()?;
        let value = Value::decode(&mut seq)?;
        seq.expect_end()?;
        Ok(Self { oid, value })
    }
}

impl std::fmt::Display for VarBind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} = {}", self.oid, self.value)
    }
}

/// Encode a varbind list as `SEQUENCE OF VarBind`.
///
/// Iterates in reverse: the encode buffer prepends.
pub(crate) fn encode_varbind_list(buf: &mut EncodeBuf, varbinds: &[VarBind]) {
    buf.push_sequence(|buf| {
        for vb in varbinds.iter().rev() {
            vb.encode(buf);
        }
    });
}

/// Decode a `SEQUENCE OF VarBind`.
pub(crate) fn decode_varbind_list(decoder: &mut Decoder) -> Result<Vec<VarBind>> {
    let mut seq = decoder.read_sequence()?;
    let mut varbinds = Vec::new();
    while !seq.is_empty() {
        varbinds.push(VarBind::decode(&mut seq)?);
    }
    Ok(varbinds)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oid;
    use bytes::Bytes;

    #[test]
    fn round_trip_single() {
        let vb = VarBind::new(
            oid!(1, 3, 6, 1, 4, 1, 39412, 1, 12, 1, 2, 1),
            Value::from("backup.cfg"),
        );
        let mut buf = EncodeBuf::new();
        vb.encode(&mut buf);
        let mut decoder = Decoder::new(buf.finish());
        assert_eq!(VarBind::decode(&mut decoder).unwrap(), vb);
    }

    #[test]
    fn round_trip_list_preserves_order() {
        let varbinds = vec![
            VarBind::null(oid!(1, 3, 6, 1, 1)),
            VarBind::new(oid!(1, 3, 6, 1, 2), Value::Integer(5)),
            VarBind::new(oid!(1, 3, 6, 1, 3), Value::Counter64(9)),
        ];
        let mut buf = EncodeBuf::new();
        encode_varbind_list(&mut buf, &varbinds);
        let mut decoder = Decoder::new(buf.finish());
        let decoded = decode_varbind_list(&mut decoder).unwrap();
        assert_eq!(decoded, varbinds);
    }

    #[test]
    fn empty_list() {
        let mut buf = EncodeBuf::new();
        encode_varbind_list(&mut buf, &[]);
        let bytes = buf.finish();
        assert_eq!(bytes.as_ref(), &[0x30, 0x00]);
        let mut decoder = Decoder::new(bytes);
        assert!(decode_varbind_list(&mut decoder).unwrap().is_empty());
    }

    #[test]
    fn rejects_trailing_garbage_inside_binding() {
        // SEQUENCE { OID 1.3, NULL, extra INTEGER }
        let raw: &[u8] = &[
            0x30, 0x08, 0x06, 0x01, 0x2B, 0x05, 0x00, 0x02, 0x01, 0x01,
        ];
        let mut decoder = Decoder::new(Bytes::copy_from_slice(raw));
        assert!(VarBind::decode(&mut decoder).is_err());
    }
}
