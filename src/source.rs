//! Cloneable seekable byte sources.
//!
//! An archive and every entry opened from it read through a [`ByteSource`].
//! Duplication is the load-bearing capability: each open entry gets its own
//! clone of the backing source, so cursors never share position state and
//! need no synchronization relative to each other.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A positioned byte stream that can be duplicated into an independently
/// owned cursor over the same underlying bytes.
pub trait ByteSource: Read + Seek + Send + Sync {
    /// Create an independent source over the same bytes, positioned where
    /// this one currently is. Clones never share cursor state.
    fn duplicate(&self) -> io::Result<Box<dyn ByteSource>>;

    /// Total length of the underlying byte stream.
    fn len(&self) -> u64;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// File-backed source. Duplication reopens the path so every cursor owns its
/// own file description.
pub struct FileSource {
    path: PathBuf,
    file: File,
    pos: u64,
    len: u64,
}

impl FileSource {
    pub fn open<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path)?;
        let len = file.metadata()?.len();
        Ok(Self {
            path,
            file,
            pos: 0,
            len,
        })
    }
}

impl Read for FileSource {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.file.read(buf)?;
        self.pos += n as u64;
        Ok(n)
    }
}

impl Seek for FileSource {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.pos = self.file.seek(pos)?;
        Ok(self.pos)
    }
}

impl ByteSource for FileSource {
    fn duplicate(&self) -> io::Result<Box<dyn ByteSource>> {
        let mut file = File::open(&self.path)?;
        file.seek(SeekFrom::Start(self.pos))?;
        Ok(Box::new(Self {
            path: self.path.clone(),
            file,
            pos: self.pos,
            len: self.len,
        }))
    }

    fn len(&self) -> u64 {
        self.len
    }
}

/// In-memory source. Duplication clones the shared buffer handle, which
/// makes it the cheapest backing for preloaded archives and tests.
pub struct MemorySource {
    data: Arc<[u8]>,
    pos: u64,
}

impl MemorySource {
    pub fn new(data: impl Into<Arc<[u8]>>) -> Self {
        Self {
            data: data.into(),
            pos: 0,
        }
    }
}

impl Read for MemorySource {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let start = self.pos.min(self.data.len() as u64) as usize;
        let n = buf.len().min(self.data.len() - start);
        buf[..n].copy_from_slice(&self.data[start..start + n]);
        self.pos += n as u64;
        Ok(n)
    }
}

impl Seek for MemorySource {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let next = match pos {
            SeekFrom::Start(offset) => Some(offset),
            SeekFrom::Current(delta) => self.pos.checked_add_signed(delta),
            SeekFrom::End(delta) => (self.data.len() as u64).checked_add_signed(delta),
        };
        match next {
            Some(offset) => {
                self.pos = offset;
                Ok(offset)
            }
            None => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "seek before start of stream",
            )),
        }
    }
}

impl ByteSource for MemorySource {
    fn duplicate(&self) -> io::Result<Box<dyn ByteSource>> {
        Ok(Box::new(Self {
            data: Arc::clone(&self.data),
            pos: self.pos,
        }))
    }

    fn len(&self) -> u64 {
        self.data.len() as u64
    }
}
