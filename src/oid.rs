//! Object identifier type.
//!
//! An OID is an ordered sequence of non-negative integer arcs. Arcs are held
//! inline in a `SmallVec` sized for typical instrument OIDs (the ALBEDO
//! enterprise subtree plus table indices fits in 16 arcs), so cloning during
//! walks does not allocate.

use smallvec::SmallVec;

use crate::error::{DecodeErrorKind, Error, OidErrorKind, Result};

/// Maximum number of arcs accepted in one OID.
pub const MAX_OID_LEN: usize = 128;

/// An SNMP object identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Oid {
    arcs: SmallVec<[u32; 16]>,
}

impl Oid {
    /// Create an OID from a slice of arcs.
    pub fn from_slice(arcs: &[u32]) -> Self {
        Self {
            arcs: SmallVec::from_slice(arcs),
        }
    }

    /// Parse a dotted-decimal string, e.g. `"1.3.6.1.4.1.39412"`.
    ///
    /// A single leading dot is accepted (`".1.3.6.1"`), matching common
    /// net-snmp output.
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.strip_prefix('.').unwrap_or(s);
        if s.is_empty() {
            return Err(Error::invalid_oid(OidErrorKind::Empty));
        }
        let mut arcs = SmallVec::new();
        for part in s.split('.') {
            let arc: u32 = part.parse().map_err(|_| {
                Error::invalid_oid(OidErrorKind::InvalidArc {
                    arc: part.to_string(),
                })
            })?;
            arcs.push(arc);
        }
        if arcs.len() > MAX_OID_LEN {
            return Err(Error::invalid_oid(OidErrorKind::TooLong { len: arcs.len() }));
        }
        Ok(Self { arcs })
    }

    /// The arcs of this OID.
    pub fn arcs(&self) -> &[u32] {
        &self.arcs
    }

    /// Number of arcs.
    pub fn len(&self) -> usize {
        self.arcs.len()
    }

    /// True if the OID has no arcs.
    pub fn is_empty(&self) -> bool {
        self.arcs.is_empty()
    }

    /// Sequence-prefix test: true if `self` lies within the subtree rooted
    /// at `prefix` (or equals it).
    ///
    /// This is the walk boundary check. It compares arc sequences, never
    /// formatted strings or partial lexicographic order.
    pub fn starts_with(&self, prefix: &Oid) -> bool {
        self.arcs.len() >= prefix.arcs.len() && self.arcs[..prefix.arcs.len()] == prefix.arcs[..]
    }

    /// A new OID with one arc appended.
    pub fn child(&self, arc: u32) -> Self {
        let mut arcs = self.arcs.clone();
        arcs.push(arc);
        Self { arcs }
    }

    /// A new OID with several arcs appended (table row indices).
    pub fn extended(&self, suffix: &[u32]) -> Self {
        let mut arcs = self.arcs.clone();
        arcs.extend_from_slice(suffix);
        Self { arcs }
    }

    /// The arcs following `prefix`, if this OID is inside that subtree.
    pub fn suffix_of(&self, prefix: &Oid) -> Option<&[u32]> {
        self.starts_with(prefix)
            .then(|| &self.arcs[prefix.arcs.len()..])
    }

    /// BER content encoding (X.690 8.19): first two arcs packed as
    /// `40 * X + Y`, remaining arcs in base-128 with continuation bits.
    ///
    /// OIDs with fewer than two arcs cannot be encoded; callers validate
    /// before reaching the wire.
    pub(crate) fn to_ber_smallvec(&self) -> SmallVec<[u8; 32]> {
        let mut out = SmallVec::new();
        if self.arcs.len() < 2 {
            // Degenerate OID; encode the conventional zero-OID 0.0
            out.push(0);
            return out;
        }
        let first = self.arcs[0].saturating_mul(40).saturating_add(self.arcs[1]);
        encode_subidentifier(&mut out, first);
        for &arc in &self.arcs[2..] {
            encode_subidentifier(&mut out, arc);
        }
        out
    }

    /// Decode BER OID content bytes (the content octets, not tag/length).
    ///
    /// `offset` is the absolute input offset of the content, used for error
    /// reporting.
    pub(crate) fn from_ber(content: &[u8], offset: usize) -> Result<Self> {
        if content.is_empty() {
            return Err(Error::decode(offset, DecodeErrorKind::InvalidOid));
        }
        let mut arcs: SmallVec<[u32; 16]> = SmallVec::new();
        let mut value: u64 = 0;
        let mut in_subid = false;
        for (i, &byte) in content.iter().enumerate() {
            // Leading 0x80 padding in a subidentifier is forbidden
            if !in_subid && byte == 0x80 {
                return Err(Error::decode(offset + i, DecodeErrorKind::InvalidOid));
            }
            in_subid = true;
            value = (value << 7) | u64::from(byte & 0x7F);
            if value > u64::from(u32::MAX) {
                return Err(Error::decode(offset + i, DecodeErrorKind::IntegerOverflow));
            }
            if byte & 0x80 == 0 {
                if arcs.is_empty() {
                    // Unpack the combined first subidentifier
                    let v = value as u32;
                    if v < 40 {
                        arcs.push(0);
                        arcs.push(v);
                    } else if v < 80 {
                        arcs.push(1);
                        arcs.push(v - 40);
                    } else {
                        arcs.push(2);
                        arcs.push(v - 80);
                    }
                } else {
                    arcs.push(value as u32);
                }
                value = 0;
                in_subid = false;
            }
        }
        if in_subid {
            // Truncated mid-subidentifier
            return Err(Error::decode(offset + content.len(), DecodeErrorKind::InvalidOid));
        }
        if arcs.len() > MAX_OID_LEN {
            return Err(Error::decode(offset, DecodeErrorKind::InvalidOid));
        }
        Ok(Self { arcs })
    }
}

fn encode_subidentifier(out: &mut SmallVec<[u8; 32]>, value: u32) {
    if value < 0x80 {
        out.push(value as u8);
        return;
    }
    let mut chunks = [0u8; 5];
    let mut n = 0;
    let mut v = value;
    while v > 0 {
        chunks[n] = (v & 0x7F) as u8;
        v >>= 7;
        n += 1;
    }
    for i in (0..n).rev() {
        let mut byte = chunks[i];
        if i != 0 {
            byte |= 0x80;
        }
        out.push(byte);
    }
}

impl std::fmt::Display for Oid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for arc in &self.arcs {
            if !first {
                f.write_str(".")?;
            }
            write!(f, "{arc}")?;
            first = false;
        }
        Ok(())
    }
}

impl std::str::FromStr for Oid {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl PartialOrd for Oid {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Oid {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.arcs.cmp(&other.arcs)
    }
}

impl From<&[u32]> for Oid {
    fn from(arcs: &[u32]) -> Self {
        Self::from_slice(arcs)
    }
}

/// Construct an [`Oid`] from literal arcs: `oid!(1, 3, 6, 1, 4, 1, 39412)`.
#[macro_export]
macro_rules! oid {
    ($($arc:expr),+ $(,)?) => {
        $crate::Oid::from_slice(&[$($arc),+])
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_and_display() {
        let oid = Oid::parse("1.3.6.1.4.1.39412.1.12.1.1.0").unwrap();
        assert_eq!(oid.len(), 11);
        assert_eq!(oid.to_string(), "1.3.6.1.4.1.39412.1.12.1.1.0");

        // Leading dot accepted
        let dotted = Oid::parse(".1.3.6.1").unwrap();
        assert_eq!(dotted, oid!(1, 3, 6, 1));
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(Oid::parse("").is_err());
        assert!(Oid::parse("1.3.x.1").is_err());
        assert!(Oid::parse("1..3").is_err());
        assert!(Oid::parse("-1.3").is_err());
    }

    #[test]
    fn prefix_test() {
        let base = oid!(1, 3, 6, 1, 2, 1, 1);
        assert!(oid!(1, 3, 6, 1, 2, 1, 1, 1, 0).starts_with(&base));
        assert!(base.starts_with(&base));
        // Sibling subtree does not match even though it sorts after
        assert!(!oid!(1, 3, 6, 1, 2, 1, 2, 1, 0).starts_with(&base));
        // Shorter than the prefix never matches
        assert!(!oid!(1, 3, 6).starts_with(&base));
    }

    #[test]
    fn child_and_extended() {
        let col = oid!(1, 3, 6, 1, 4, 1, 39412, 1, 12, 1, 2);
        assert_eq!(col.child(1).to_string(), "1.3.6.1.4.1.39412.1.12.1.2.1");
        assert_eq!(
            col.extended(&[3, 7]).to_string(),
            "1.3.6.1.4.1.39412.1.12.1.2.3.7"
        );
        assert_eq!(col.child(1).suffix_of(&col), Some(&[1u32][..]));
    }

    #[test]
    fn ordering_is_lexicographic_on_arcs() {
        assert!(oid!(1, 3, 6, 1, 1) < oid!(1, 3, 6, 1, 1, 0));
        assert!(oid!(1, 3, 6, 1, 2) > oid!(1, 3, 6, 1, 1, 9, 9));
    }

    #[test]
    fn ber_round_trip() {
        let cases = [
            oid!(1, 3, 6, 1, 2, 1, 1, 1, 0),
            oid!(1, 3, 6, 1, 4, 1, 39412, 1, 12, 1, 1, 0),
            oid!(2, 100, 3),
            oid!(0, 0),
            oid!(1, 3, 6, 1, 4, 1, u32::MAX),
        ];
        for oid in cases {
            let ber = oid.to_ber_smallvec();
            let back = Oid::from_ber(&ber, 0).unwrap();
            assert_eq!(back, oid, "round trip failed for {oid}");
        }
    }

    #[test]
    fn ber_multibyte_subidentifier() {
        // 39412 = 0x99F4 -> 0x82 0xB3 0x74 in base-128
        let oid = oid!(1, 3, 6, 1, 4, 1, 39412);
        let ber = oid.to_ber_smallvec();
        assert_eq!(&ber[..], &[0x2B, 0x06, 0x01, 0x04, 0x01, 0x82, 0xB3, 0x74]);
    }

    #[test]
    fn ber_rejects_padding_and_truncation() {
        // Leading 0x80 padding
        assert!(Oid::from_ber(&[0x2B, 0x80, 0x01], 0).is_err());
        // Continuation bit set on the final byte
        assert!(Oid::from_ber(&[0x2B, 0x86], 0).is_err());
        // Empty content
        assert!(Oid::from_ber(&[], 0).is_err());
    }

    #[test]
    fn first_subidentifier_unpacking() {
        assert_eq!(Oid::from_ber(&[0x00], 0).unwrap(), oid!(0, 0));
        assert_eq!(Oid::from_ber(&[0x27], 0).unwrap(), oid!(0, 39));
        assert_eq!(Oid::from_ber(&[0x28], 0).unwrap(), oid!(1, 0));
        assert_eq!(Oid::from_ber(&[0x4F], 0).unwrap(), oid!(1, 39));
        assert_eq!(Oid::from_ber(&[0x50], 0).unwrap(), oid!(2, 0));
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn ber_round_trip_arbitrary(
                first in 0u32..=2,
                second in 0u32..40,
                rest in proptest::collection::vec(0u32..=u32::MAX, 0..18),
            ) {
                let mut arcs = vec![first, second];
                arcs.extend(rest);
                let oid = Oid::from_slice(&arcs);
                let ber = oid.to_ber_smallvec();
                let back = Oid::from_ber(&ber, 0).unwrap();
                prop_assert_eq!(back, oid);
            }

            #[test]
            fn parse_display_round_trip(arcs in proptest::collection::vec(0u32..=u32::MAX, 1..20)) {
                let oid = Oid::from_slice(&arcs);
                let parsed = Oid::parse(&oid.to_string()).unwrap();
                prop_assert_eq!(parsed, oid);
            }
        }
    }
}
