//! Per-open-entry cursors that decrypt payload bytes on the fly.

use std::io::{self, Read, Seek, SeekFrom};

use crate::archive::index::EntryData;
use crate::archive::keystream;
use crate::error::{Error, Result};
use crate::source::ByteSource;
use crate::stream::VfsFile;

/// An open archive entry: an independently seekable, decrypting byte
/// stream.
///
/// Every handle owns a private duplicate of the archive's backing source,
/// so handles never contend with each other or with the archive itself.
/// The keystream word is kept in lockstep with the cursor: at offset `o`
/// it is the entry's starting word stepped `o / 4` times, whatever mix of
/// reads, seeks and duplications produced `o`.
pub struct EntryHandle {
    data: EntryData,
    magic: u32,
    offset: u64,
    source: Box<dyn ByteSource>,
}

impl std::fmt::Debug for EntryHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntryHandle")
            .field("offset", &self.offset)
            .finish_non_exhaustive()
    }
}

impl EntryHandle {
    pub(crate) fn new(data: EntryData, source: Box<dyn ByteSource>) -> Self {
        Self {
            data,
            magic: data.start_magic,
            offset: 0,
            source,
        }
    }

    /// Decrypt up to `buf.len()` bytes at the cursor, returning the number
    /// produced. Fewer bytes than requested at the end of the entry is a
    /// normal outcome, not an error.
    pub fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let remaining = self.data.size - self.offset;
        let to_read = (buf.len() as u64).min(remaining) as usize;
        if to_read == 0 {
            return Ok(0);
        }

        self.source
            .seek(SeekFrom::Start(self.data.offset + self.offset))?;
        self.source.read_exact(&mut buf[..to_read])?;

        for byte in &mut buf[..to_read] {
            *byte ^= keystream::mask_at(self.magic, self.offset);
            self.offset += 1;
            if self.offset % 4 == 0 {
                keystream::advance(&mut self.magic);
            }
        }

        Ok(to_read)
    }

    /// Move the cursor to `target`. Positions at or past the end of the
    /// entry are rejected.
    ///
    /// Rewinding restarts the keystream from the entry's starting word;
    /// after that the word is stepped once per 4-byte block between the
    /// block holding the old cursor and the block holding `target`. The
    /// per-byte masks only depend on `target % 4`, so block granularity is
    /// always sufficient.
    pub fn seek_to(&mut self, target: u64) -> Result<()> {
        if target == self.offset {
            return Ok(());
        }
        if target >= self.data.size {
            return Err(Error::Backend(io::Error::new(
                io::ErrorKind::InvalidInput,
                "seek past end of entry",
            )));
        }

        if target < self.offset {
            self.offset = 0;
            self.magic = self.data.start_magic;
        }

        keystream::advance_blocks(&mut self.magic, target / 4 - self.offset / 4);
        self.offset = target;
        self.source
            .seek(SeekFrom::Start(self.data.offset + target))?;

        Ok(())
    }

    /// Current cursor position within the entry.
    pub fn tell(&self) -> u64 {
        self.offset
    }

    /// Decrypted length of the entry.
    pub fn len(&self) -> u64 {
        self.data.size
    }

    pub fn is_empty(&self) -> bool {
        self.data.size == 0
    }

    /// Fork an independent cursor: same entry, same position, own duplicate
    /// of the raw source. Neither handle can disturb the other afterwards.
    pub fn duplicate(&self) -> Result<EntryHandle> {
        Ok(Self {
            data: self.data,
            magic: self.magic,
            offset: self.offset,
            source: self.source.duplicate()?,
        })
    }
}

impl Read for EntryHandle {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        EntryHandle::read(self, buf).map_err(Into::into)
    }
}

impl Seek for EntryHandle {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let target = match pos {
            SeekFrom::Start(offset) => Some(offset),
            SeekFrom::Current(delta) => self.offset.checked_add_signed(delta),
            SeekFrom::End(delta) => self.data.size.checked_add_signed(delta),
        }
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "seek before start of entry"))?;

        self.seek_to(target)?;
        Ok(self.offset)
    }
}

impl VfsFile for EntryHandle {
    fn len(&self) -> u64 {
        self.data.size
    }
}
