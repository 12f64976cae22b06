//! Crate-wide error type
//!
//! Every fallible operation in the codec core returns a [`CodecError`] rather than
//! panicking. The variants mirror the error kinds named by the container and policy
//! specifications: bad magic/version, CRC mismatches, refused meta approval, RS
//! decode failure, and malformed routing/profile/tile/subword configuration.

use std::fmt;

/// A trit, symbol, word, or byte offset that failed a bounds check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutOfRange {
    pub what: &'static str,
    pub index: usize,
    pub limit: usize,
}

#[derive(Debug)]
pub enum CodecError {
    /// Short read/write, or the underlying file could not be opened.
    Io(std::io::Error),
    /// Container magic bytes did not match the expected constant.
    BadMagic { expected: &'static str, found: [u8; 4] },
    /// Container version field is not one this build understands.
    BadVersion { found: u8 },
    /// The superframe header's ternary CRC-12 did not match its CRC symbols.
    HeaderCrcMismatch,
    /// A `.t3p`/`.t3v` container's fixed-field header CRC32 did not match.
    ContainerHeaderCrcMismatch { expected: u32, found: u32 },
    /// The container's payload CRC32 did not match the trailing checksum field.
    PayloadCrcMismatch { expected: u32, found: u32 },
    /// The approve callback refused the meta for this record; this is the designed
    /// security outcome, not a bug (see module docs on `container`).
    MetaNotApproved,
    /// An index, count, or offset fell outside its valid range.
    OutOfRange(OutOfRange),
    /// Reed-Solomon decoding found more errors than the code can correct.
    RsUncorrectable { positions_found: usize, max_correctable: usize },
    /// The subword code byte did not map to a known enum variant.
    InvalidSubword(u8),
    /// The profile id did not map to a known RS profile.
    InvalidProfile(u8),
    /// Tile width/height is zero, or otherwise unusable for 2D interleave.
    InvalidTile { w: u32, h: u32 },
    /// A route/meta field for the policy overlay was missing or malformed.
    InvalidRoute(String),
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodecError::Io(e) => write!(f, "I/O error: {e}"),
            CodecError::BadMagic { expected, found } => write!(
                f,
                "bad magic: expected {expected:?}, found {:?}",
                String::from_utf8_lossy(found)
            ),
            CodecError::BadVersion { found } => write!(f, "unsupported version: {found}"),
            CodecError::HeaderCrcMismatch => write!(f, "superframe header CRC-12 mismatch"),
            CodecError::ContainerHeaderCrcMismatch { expected, found } => write!(
                f,
                "container header CRC32 mismatch: expected {expected:#010x}, found {found:#010x}"
            ),
            CodecError::PayloadCrcMismatch { expected, found } => write!(
                f,
                "payload CRC32 mismatch: expected {expected:#010x}, found {found:#010x}"
            ),
            CodecError::MetaNotApproved => write!(f, "meta approval refused"),
            CodecError::OutOfRange(r) => write!(
                f,
                "{} index {} out of range (limit {})",
                r.what, r.index, r.limit
            ),
            CodecError::RsUncorrectable {
                positions_found,
                max_correctable,
            } => write!(
                f,
                "RS decode uncorrectable: found {positions_found} error positions, can correct at most {max_correctable}"
            ),
            CodecError::InvalidSubword(b) => write!(f, "invalid subword code: {b}"),
            CodecError::InvalidProfile(b) => write!(f, "invalid profile id: {b}"),
            CodecError::InvalidTile { w, h } => write!(f, "invalid tile {w}x{h}"),
            CodecError::InvalidRoute(msg) => write!(f, "invalid route meta: {msg}"),
        }
    }
}

impl std::error::Error for CodecError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CodecError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for CodecError {
    fn from(e: std::io::Error) -> Self {
        CodecError::Io(e)
    }
}

pub fn out_of_range(what: &'static str, index: usize, limit: usize) -> CodecError {
    CodecError::OutOfRange(OutOfRange { what, index, limit })
}

pub type Result<T> = std::result::Result<T, CodecError>;
