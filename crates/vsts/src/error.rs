//! Error types for the vsts crate.

use std::fmt;
use std::path::PathBuf;

/// Result type for vsts operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while reading and decoding a world.
#[derive(Debug)]
pub enum Error {
    /// Reading a file failed.
    Io {
        /// The file that could not be read.
        path: PathBuf,
        /// The underlying error.
        source: std::io::Error,
    },
    /// A decompressed file could not be decoded.
    Decode {
        /// The file whose contents were malformed.
        path: PathBuf,
        /// The underlying error.
        source: vsts_decode::DecodeError,
    },
    /// Zstd decompression failed.
    Decompress {
        /// The file being decompressed.
        path: PathBuf,
        /// The error message.
        message: String,
    },
    /// The dictionary archive lacks a required dictionary.
    MissingDictionary {
        /// The archive entry that was not found.
        name: &'static str,
    },
    /// Decoding one unit of the world grid failed.
    Unit {
        /// Grid column of the unit.
        x: i32,
        /// Grid row of the unit.
        z: i32,
        /// What went wrong.
        source: Box<Error>,
    },
}

impl Error {
    /// An I/O error on `path`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }

    /// A decode error in the contents of `path`.
    pub fn decode(path: impl Into<PathBuf>, source: vsts_decode::DecodeError) -> Self {
        Error::Decode {
            path: path.into(),
            source,
        }
    }

    /// Attach the grid cell of the unit being decoded.
    #[must_use]
    pub fn in_unit(self, x: i32, z: i32) -> Self {
        Error::Unit {
            x,
            z,
            source: Box::new(self),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io { path, source } => {
                write!(f, "failed to read {}: {source}", path.display())
            }
            Error::Decode { path, source } => {
                write!(f, "failed to decode {}: {source}", path.display())
            }
            Error::Decompress { path, message } => {
                write!(f, "failed to decompress {}: {message}", path.display())
            }
            Error::MissingDictionary { name } => {
                write!(f, "dictionary archive has no entry {name}")
            }
            Error::Unit { x, z, source } => write!(f, "unit X{x}_Z{z}: {source}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io { source, .. } => Some(source),
            Error::Decode { source, .. } => Some(source),
            Error::Unit { source, .. } => Some(source.as_ref()),
            Error::Decompress { .. } | Error::MissingDictionary { .. } => None,
        }
    }
}
