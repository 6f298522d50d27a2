//! Error types for decoding operations.

use std::fmt;

/// Errors that can occur while decoding VSTS data and its containers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// A read ran past the end of the buffer.
    UnexpectedEof {
        offset: usize,
        requested: usize,
        len: usize,
    },
    /// The 4-byte file tag did not match.
    InvalidMagic {
        offset: usize,
        expected: [u8; 4],
        found: [u8; 4],
    },
    /// The unit version byte is not the one this decoder understands.
    UnsupportedVersion { expected: u8, found: u8 },
    /// The stored area count disagrees with the grid geometry.
    AreaCountMismatch { expected: usize, found: usize },
    /// The declared voxel section size disagrees with what was consumed.
    SizeMismatch {
        area: usize,
        offset: usize,
        declared: usize,
        consumed: usize,
    },
    /// A rank-derived mask index fell outside its level's array.
    CorruptOctree {
        level: usize,
        index: usize,
        len: usize,
    },
    /// The grid geometry cannot describe a whole number of areas.
    InvalidGeometry { detail: String },
    /// A null-terminated string was unterminated or not UTF-8.
    InvalidString { offset: usize },
    /// A container archive is structurally malformed.
    InvalidArchive {
        context: &'static str,
        detail: String,
    },
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnexpectedEof {
                offset,
                requested,
                len,
            } => {
                write!(
                    f,
                    "unexpected end of buffer: {requested} bytes requested at offset {offset:#x}, buffer is {len} bytes"
                )
            }
            Self::InvalidMagic {
                offset,
                expected,
                found,
            } => {
                write!(
                    f,
                    "invalid magic at offset {offset:#x}: expected {}, found {}",
                    fmt_tag(expected),
                    fmt_tag(found)
                )
            }
            Self::UnsupportedVersion { expected, found } => {
                write!(
                    f,
                    "unsupported version {found:#04x}, expected {expected:#04x}"
                )
            }
            Self::AreaCountMismatch { expected, found } => {
                write!(
                    f,
                    "area count mismatch: geometry implies {expected}, file stores {found}"
                )
            }
            Self::SizeMismatch {
                area,
                offset,
                declared,
                consumed,
            } => {
                write!(
                    f,
                    "voxel section of area {area} at offset {offset:#x} declares {declared} bytes but {consumed} were consumed"
                )
            }
            Self::CorruptOctree { level, index, len } => {
                write!(
                    f,
                    "corrupt octree: index {index} out of bounds for level {level} with {len} masks"
                )
            }
            Self::InvalidGeometry { detail } => write!(f, "invalid geometry: {detail}"),
            Self::InvalidString { offset } => {
                write!(f, "invalid null-terminated string at offset {offset:#x}")
            }
            Self::InvalidArchive { context, detail } => {
                write!(f, "invalid archive in {context}: {detail}")
            }
        }
    }
}

impl std::error::Error for DecodeError {}

/// Render a 4-byte tag as text when printable, hex otherwise.
fn fmt_tag(tag: &[u8; 4]) -> String {
    if tag.iter().all(u8::is_ascii_graphic) {
        format!("\"{}\"", String::from_utf8_lossy(tag))
    } else {
        format!("{tag:02x?}")
    }
}

/// Result type for decoding operations.
pub type DecodeResult<T> = Result<T, DecodeError>;
