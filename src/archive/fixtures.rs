//! Hand-rolled archive bytes for tests.

use crate::archive::entry::EntryHandle;
use crate::archive::index::{ArchiveIndex, HEADER_1, HEADER_2};
use crate::archive::keystream::{self, CIPHER_SEED};
use crate::source::{ByteSource, MemorySource};

/// Builds archive images byte-for-byte the way the parser expects them:
/// integer fields burn one keystream step, name bytes one step each, and
/// payload bytes reuse one word per 4-byte block.
pub(crate) struct ArchiveBuilder {
    buf: Vec<u8>,
    magic: u32,
}

impl ArchiveBuilder {
    pub fn new() -> Self {
        let mut buf = Vec::new();
        buf.extend_from_slice(&HEADER_1.to_le_bytes());
        buf.extend_from_slice(&HEADER_2.to_le_bytes());
        Self {
            buf,
            magic: CIPHER_SEED,
        }
    }

    /// Append one entry. `name` is stored as given; the parser normalizes
    /// backslashes on its side.
    pub fn file(mut self, name: &str, data: &[u8]) -> Self {
        let name_len = name.len() as u32 ^ keystream::advance(&mut self.magic);
        self.buf.extend_from_slice(&name_len.to_le_bytes());
        for byte in name.bytes() {
            self.buf
                .push(byte ^ keystream::advance(&mut self.magic) as u8);
        }
        let size = data.len() as u32 ^ keystream::advance(&mut self.magic);
        self.buf.extend_from_slice(&size.to_le_bytes());

        let mut data_magic = self.magic;
        for (i, byte) in data.iter().enumerate() {
            self.buf
                .push(byte ^ keystream::mask_at(data_magic, i as u64));
            if (i + 1) % 4 == 0 {
                keystream::advance(&mut data_magic);
            }
        }

        self
    }

    pub fn build(self) -> Vec<u8> {
        self.buf
    }

    pub fn into_source(self) -> Box<dyn ByteSource> {
        Box::new(MemorySource::new(self.build()))
    }
}

/// Archive with a single `blob.bin` entry, opened as an entry handle the
/// same way the backend opens one.
pub(crate) fn open_single(data: &[u8]) -> EntryHandle {
    let mut source = ArchiveBuilder::new().file("blob.bin", data).into_source();
    let index = ArchiveIndex::parse(source.as_mut()).unwrap();
    let entry = index.entries["blob.bin"];
    EntryHandle::new(entry, source.duplicate().unwrap())
}
