//! Community-authenticated SNMP message wrapper.

use bytes::Bytes;

use crate::ber::{Decoder, EncodeBuf};
use crate::error::{DecodeErrorKind, Error, Result};
use crate::pdu::Pdu;
use crate::version::Version;

/// An SNMPv1/v2c message: `SEQUENCE { version, community, pdu }`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommunityMessage {
    pub version: Version,
    pub community: Bytes,
    pub pdu: Pdu,
}

impl CommunityMessage {
    pub fn new(version: Version, community: Bytes, pdu: Pdu) -> Self {
        Self {
            version,
            community,
            pdu,
        }
    }

    /// Encode to wire bytes.
    pub fn encode(&self) -> Bytes {
        let mut buf = EncodeBuf::new();
        buf.push_sequence(|buf| {
            self.pdu.encode(buf);
            buf.push_octet_string(&self.community);
            buf.push_integer(self.version.as_i32());
        });
        buf.finish()
    }

    /// Decode from wire bytes, rejecting trailing data.
    pub fn decode(data: Bytes) -> Result<Self> {
        let mut decoder = Decoder::new(data);
        let mut seq = decoder.read_sequence()?;
        let version_offset = seq.offset();
        let raw_version = seq.read_integer()?;
        let version = Version::from_i32(raw_version).ok_or_else(|| {
            Error::decode(
                version_offset,
                DecodeErrorKind::UnsupportedVersion {
                    version: raw_version,
                },
            )
        })?;
        let community = seq.read_octet_string()?;
        let pdu = Pdu::decode(&mut seq)?;
        seq.expect_end()?;
        decoder.expect_end()?;
        Ok(Self {
            version,
            community,
            pdu,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oid;
    use crate::pdu::PduType;
    use crate::value::Value;
    use crate::varbind::VarBind;

    #[test]
    fn round_trip() {
        let msg = CommunityMessage::new(
            Version::V2c,
            Bytes::from_static(b"public"),
            Pdu::get_request(99, &[oid!(1, 3, 6, 1, 2, 1, 1, 1, 0)]),
        );
        let decoded = CommunityMessage::decode(msg.encode()).unwrap();
        assert_eq!(decoded, msg);
    }

    #[test]
    fn response_round_trip() {
        let msg = CommunityMessage::new(
            Version::V2c,
            Bytes::from_static(b"private"),
            Pdu {
                pdu_type: PduType::Response,
                request_id: 4242,
                error_status: 0,
                error_index: 0,
                varbinds: vec![VarBind::new(
                    oid!(1, 3, 6, 1, 4, 1, 39412, 1, 12, 1, 8, 1),
                    Value::Integer(3),
                )],
            },
        );
        let decoded = CommunityMessage::decode(msg.encode()).unwrap();
        assert_eq!(decoded.pdu.request_id, 4242);
        assert_eq!(decoded.community.as_ref(), b"private");
    }

    #[test]
    fn rejects_v3_version_integer() {
        let msg = CommunityMessage::new(
            Version::V2c,
            Bytes::from_static(b"public"),
            Pdu::get_request(1, &[oid!(1, 3)]),
        );
        let mut raw = msg.encode().to_vec();
        // Patch the version octet (SEQUENCE hdr is 2 bytes, then 02 01 vv)
        raw[4] = 3;
        assert!(CommunityMessage::decode(Bytes::from(raw)).is_err());
    }

    #[test]
    fn rejects_trailing_data() {
        let msg = CommunityMessage::new(
            Version::V2c,
            Bytes::from_static(b"public"),
            Pdu::get_request(1, &[oid!(1, 3)]),
        );
        let mut raw = msg.encode().to_vec();
        raw.push(0x00);
        assert!(CommunityMessage::decode(Bytes::from(raw)).is_err());
    }
}
