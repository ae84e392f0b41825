//! Stream shapes handed to consumers of the filesystem facade.
//!
//! Both shapes are mechanical wrappers over the same opened handle: a
//! general-purpose stream for code that wants `Read`/`Seek`, and a
//! transport-level handle for binary consumers that drive explicit
//! size/seek/read calls. Writing fails through either shape — every mount
//! kind this crate produces is read-only.

use std::io::{self, Read, Seek, SeekFrom};

use crate::error::{Error, Result};

/// Anything the facade can hand out as an opened file: a readable,
/// seekable stream that knows its total length.
pub trait VfsFile: Read + Seek + Send {
    /// Total decoded length of the file.
    fn len(&self) -> u64;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// General-purpose stream over an opened file.
pub struct FileStream {
    inner: Box<dyn VfsFile>,
}

impl FileStream {
    pub(crate) fn new(inner: Box<dyn VfsFile>) -> Self {
        Self { inner }
    }

    pub fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        Ok(self.inner.read(buf)?)
    }

    /// Always fails: the stream came from a read-only mount.
    pub fn write(&mut self, _buf: &[u8]) -> Result<usize> {
        Err(Error::Unsupported("write to read-only stream"))
    }

    /// Absolute seek, returning the new position.
    pub fn seek(&mut self, position: u64) -> Result<u64> {
        Ok(self.inner.seek(SeekFrom::Start(position))?)
    }

    pub fn tell(&mut self) -> Result<u64> {
        Ok(self.inner.stream_position()?)
    }

    pub fn size(&self) -> u64 {
        self.inner.len()
    }

    pub fn close(self) {}
}

impl std::fmt::Debug for FileStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileStream")
            .field("len", &self.inner.len())
            .finish_non_exhaustive()
    }
}

impl Read for FileStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

impl Seek for FileStream {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.inner.seek(pos)
    }
}

/// Transport-level handle: explicit size/seek/read/write/close calls for
/// lower-level binary consumers that manage their own buffering.
pub struct TransportHandle {
    inner: Box<dyn VfsFile>,
}

impl TransportHandle {
    pub(crate) fn new(inner: Box<dyn VfsFile>) -> Self {
        Self { inner }
    }

    pub fn size(&self) -> u64 {
        self.inner.len()
    }

    pub fn seek(&mut self, pos: SeekFrom) -> Result<u64> {
        Ok(self.inner.seek(pos)?)
    }

    pub fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        Ok(self.inner.read(buf)?)
    }

    /// Always fails: the handle came from a read-only mount.
    pub fn write(&mut self, _buf: &[u8]) -> Result<usize> {
        Err(Error::Unsupported("write through read-only transport"))
    }

    pub fn close(self) {}
}
