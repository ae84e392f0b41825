use std::io;
use thiserror::Error;

/// Result type for filesystem operations
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for archive parsing and virtual-filesystem operations
#[derive(Debug, Error)]
pub enum Error {
    /// The logical name did not resolve on any mount, including extension
    /// fallback. Carries the name as originally requested.
    #[error("no such file or directory - {0}")]
    FileNotFound(String),

    /// The underlying storage transport failed. Not recoverable for the
    /// call that produced it.
    #[error("storage backend: {0}")]
    Backend(#[from] io::Error),

    /// The stream is not a readable archive: header mismatch, or a
    /// structural violation found while building the index. Declines the
    /// mount candidate without taking the process down.
    #[error("malformed archive: {0}")]
    MalformedArchive(String),

    /// Write, append, remove and mkdir are permanently refused on archive
    /// mounts.
    #[error("unsupported operation: {0}")]
    Unsupported(&'static str),
}

impl From<Error> for io::Error {
    fn from(err: Error) -> Self {
        match err {
            Error::Backend(e) => e,
            Error::FileNotFound(_) => io::Error::new(io::ErrorKind::NotFound, err.to_string()),
            Error::MalformedArchive(_) => {
                io::Error::new(io::ErrorKind::InvalidData, err.to_string())
            }
            Error::Unsupported(_) => {
                io::Error::new(io::ErrorKind::PermissionDenied, err.to_string())
            }
        }
    }
}
