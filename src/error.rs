//! Error types for albedo-snmp.
//!
//! A single crate-wide [`Error`] enum with kind sub-enums for the codec
//! layers. Wire-level failures carry the target address and request id where
//! available so log output can be correlated with packet captures.

use std::net::SocketAddr;
use std::time::Duration;

use crate::oid::Oid;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;

/// What went wrong while decoding BER data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum DecodeErrorKind {
    /// Ran out of input before the announced length was satisfied.
    UnexpectedEof,
    /// A tag other than the expected one was found.
    UnexpectedTag { expected: u8, actual: u8 },
    /// Length field exceeds the maximum supported message size.
    LengthOverflow,
    /// Indefinite-length form is not used by SNMP.
    IndefiniteLength,
    /// Integer content does not fit the target type.
    IntegerOverflow,
    /// OID content is malformed or exceeds the arc limit.
    InvalidOid,
    /// Bytes remained after the outermost element.
    TrailingData,
    /// Response PDU carried fewer varbinds than the request.
    MissingVarBind,
    /// PDU type tag is not one of the supported request/response tags.
    UnknownPduType { tag: u8 },
    /// Version integer is not a supported SNMP version.
    UnsupportedVersion { version: i32 },
}

impl std::fmt::Display for DecodeErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnexpectedEof => write!(f, "unexpected end of input"),
            Self::UnexpectedTag { expected, actual } => {
                write!(f, "expected tag {expected:#04x}, found {actual:#04x}")
            }
            Self::LengthOverflow => write!(f, "length exceeds maximum message size"),
            Self::IndefiniteLength => write!(f, "indefinite length not supported"),
            Self::IntegerOverflow => write!(f, "integer does not fit target type"),
            Self::InvalidOid => write!(f, "malformed object identifier"),
            Self::TrailingData => write!(f, "trailing data after element"),
            Self::MissingVarBind => write!(f, "response is missing a varbind"),
            Self::UnknownPduType { tag } => write!(f, "unknown PDU type tag {tag:#04x}"),
            Self::UnsupportedVersion { version } => {
                write!(f, "unsupported SNMP version {version}")
            }
        }
    }
}

/// What went wrong while constructing or parsing an OID.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum OidErrorKind {
    /// OID has no arcs.
    Empty,
    /// OID exceeds the maximum number of arcs.
    TooLong { len: usize },
    /// A textual arc failed to parse as a non-negative integer.
    InvalidArc { arc: String },
}

impl std::fmt::Display for OidErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => write!(f, "OID is empty"),
            Self::TooLong { len } => write!(f, "OID has {len} arcs, exceeds maximum"),
            Self::InvalidArc { arc } => write!(f, "invalid OID arc {arc:?}"),
        }
    }
}

/// RFC 3416 error-status codes returned by agents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ErrorStatus {
    NoError,
    TooBig,
    NoSuchName,
    BadValue,
    ReadOnly,
    GenErr,
    NoAccess,
    WrongType,
    WrongLength,
    WrongEncoding,
    WrongValue,
    NoCreation,
    InconsistentValue,
    ResourceUnavailable,
    CommitFailed,
    UndoFailed,
    AuthorizationError,
    NotWritable,
    InconsistentName,
    /// A code outside the RFC 3416 range.
    Unknown(i32),
}

impl ErrorStatus {
    /// Map the wire integer to a status.
    pub const fn from_i32(value: i32) -> Self {
        match value {
            0 => Self::NoError,
            1 => Self::TooBig,
            2 => Self::NoSuchName,
            3 => Self::BadValue,
            4 => Self::ReadOnly,
            5 => Self::GenErr,
            6 => Self::NoAccess,
            7 => Self::WrongType,
            8 => Self::WrongLength,
            9 => Self::WrongEncoding,
            10 => Self::WrongValue,
            11 => Self::NoCreation,
            12 => Self::InconsistentValue,
            13 => Self::ResourceUnavailable,
            14 => Self::CommitFailed,
            15 => Self::UndoFailed,
            16 => Self::AuthorizationError,
            17 => Self::NotWritable,
            18 => Self::InconsistentName,
            other => Self::Unknown(other),
        }
    }

    /// The wire integer for this status.
    pub const fn as_i32(self) -> i32 {
        match self {
            Self::NoError => 0,
            Self::TooBig => 1,
            Self::NoSuchName => 2,
            Self::BadValue => 3,
            Self::ReadOnly => 4,
            Self::GenErr => 5,
            Self::NoAccess => 6,
            Self::WrongType => 7,
            Self::WrongLength => 8,
            Self::WrongEncoding => 9,
            Self::WrongValue => 10,
            Self::NoCreation => 11,
            Self::InconsistentValue => 12,
            Self::ResourceUnavailable => 13,
            Self::CommitFailed => 14,
            Self::UndoFailed => 15,
            Self::AuthorizationError => 16,
            Self::NotWritable => 17,
            Self::InconsistentName => 18,
            Self::Unknown(v) => v,
        }
    }
}

impl std::fmt::Display for ErrorStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::NoError => "noError",
            Self::TooBig => "tooBig",
            Self::NoSuchName => "noSuchName",
            Self::BadValue => "badValue",
            Self::ReadOnly => "readOnly",
            Self::GenErr => "genErr",
            Self::NoAccess => "noAccess",
            Self::WrongType => "wrongType",
            Self::WrongLength => "wrongLength",
            Self::WrongEncoding => "wrongEncoding",
            Self::WrongValue => "wrongValue",
            Self::NoCreation => "noCreation",
            Self::InconsistentValue => "inconsistentValue",
            Self::ResourceUnavailable => "resourceUnavailable",
            Self::CommitFailed => "commitFailed",
            Self::UndoFailed => "undoFailed",
            Self::AuthorizationError => "authorizationError",
            Self::NotWritable => "notWritable",
            Self::InconsistentName => "inconsistentName",
            Self::Unknown(v) => return write!(f, "unknown({v})"),
        };
        f.write_str(name)
    }
}

/// Errors produced by this crate.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Socket-level I/O failure.
    #[error("I/O error{}: {source}", fmt_target(.target))]
    Io {
        target: Option<SocketAddr>,
        #[source]
        source: std::io::Error,
    },

    /// No response within the round-trip timeout (after retries).
    #[error("timeout after {elapsed:?}{} (request_id {request_id})", fmt_target(.target))]
    Timeout {
        target: Option<SocketAddr>,
        elapsed: Duration,
        request_id: i32,
    },

    /// The agent rejected the request with a non-zero error-status.
    #[error("agent returned {status} at index {index}{}", fmt_oid(.oid))]
    Snmp {
        status: ErrorStatus,
        /// 1-based varbind index from the response, 0 when not applicable.
        index: i32,
        /// The varbind the index points at, when identifiable.
        oid: Option<Oid>,
    },

    /// BER decoding failed.
    #[error("decode error at offset {offset}: {kind}")]
    Decode { offset: usize, kind: DecodeErrorKind },

    /// OID construction or parsing failed.
    #[error("invalid OID: {kind}")]
    InvalidOid { kind: OidErrorKind },

    /// Response carried a different request id than the request.
    #[error("request id mismatch: expected {expected}, got {actual}")]
    RequestIdMismatch { expected: i32, actual: i32 },

    /// Response carried a different SNMP version than the request.
    #[error("version mismatch: expected {expected}, got {actual}")]
    VersionMismatch { expected: i32, actual: i32 },

    /// GETNEXT returned an OID that did not advance past the previous one.
    /// Walking further would loop forever on such an agent.
    #[error("non-increasing OID during walk: {previous} -> {current}")]
    NonIncreasingOid { previous: Oid, current: Oid },

    /// A subtree walk exceeded the configured maximum step count.
    #[error("walk exceeded maximum of {limit} steps")]
    WalkTruncated { limit: usize },

    /// A symbolic name could not be resolved to a numeric OID.
    #[error("symbol not found: {name}")]
    SymbolNotFound { name: String },

    /// The session's transport has been closed.
    #[error("session is closed")]
    SessionClosed,
}

impl Error {
    /// Construct a decode error at the given input offset.
    pub(crate) fn decode(offset: usize, kind: DecodeErrorKind) -> Self {
        Self::Decode { offset, kind }
    }

    /// Construct an invalid-OID error.
    pub(crate) fn invalid_oid(kind: OidErrorKind) -> Self {
        Self::InvalidOid { kind }
    }

    /// True if this error is a round-trip timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// True if this error is an agent rejection (non-zero error-status).
    pub fn is_agent_rejection(&self) -> bool {
        matches!(self, Self::Snmp { .. })
    }
}

fn fmt_target(target: &Option<SocketAddr>) -> String {
    match target {
        Some(addr) => format!(" (target {addr})"),
        None => String::new(),
    }
}

fn fmt_oid(oid: &Option<Oid>) -> String {
    match oid {
        Some(oid) => format!(" ({oid})"),
        None => String::new(),
    }
}
