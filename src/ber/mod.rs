//! BER (Basic Encoding Rules) codec, the X.690 subset used by SNMPv2c.
//!
//! Parsing is permissive where net-snmp is permissive (unpadded unsigned
//! content) and strict where ambiguity would hurt (indefinite lengths,
//! padded OID subidentifiers).

mod decode;
mod encode;
mod length;
pub mod tag;

pub use decode::Decoder;
pub(crate) use decode::{int_from_be, uint_from_be};
pub use encode::EncodeBuf;
pub use length::{MAX_LENGTH, decode_length, encode_length};
