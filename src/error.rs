//! Error type shared by every layer of the engine.

use std::fmt;
use std::io;

/// An error produced by the engine.
///
/// Variants match the error kinds a caller needs to distinguish: a bad path,
/// an I/O failure, a malformed superblock, a missing entry, a name collision,
/// an exhausted partition, an inconsistent on-disk structure, or a bad
/// argument. Nothing below this layer ever prints or exits; only the CLI
/// does that.
#[derive(Debug)]
pub enum Error {
    /// A path argument could not be resolved (empty component, traversal
    /// outside of the partition, etc).
    PathInvalid(String),
    /// The underlying image file could not be read or written.
    Io(io::Error),
    /// The superblock's magic or version did not parse.
    BadSuperblock,
    /// A directory entry or partition does not exist.
    NotFound,
    /// A directory entry already exists where one is being created.
    AlreadyExists,
    /// No free region is available in the partition.
    NoSpace,
    /// An on-disk structure did not have the expected shape.
    Corruption(String),
    /// A command-line argument was missing or malformed.
    ArgError(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PathInvalid(msg) => write!(f, "invalid path: {msg}"),
            Self::Io(e) => write!(f, "{e}"),
            Self::BadSuperblock => write!(f, "not an IonicFS image"),
            Self::NotFound => write!(f, "no such file or directory"),
            Self::AlreadyExists => write!(f, "already exists"),
            Self::NoSpace => write!(f, "partition is full"),
            Self::Corruption(msg) => write!(f, "corrupted filesystem: {msg}"),
            Self::ArgError(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
