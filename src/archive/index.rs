//! Entry-table parsing: header validation, name and size decryption, and
//! the directory set inferred from path prefixes.

use std::collections::{HashMap, HashSet};
use std::io::{ErrorKind, SeekFrom};

use tracing::trace;

use crate::archive::keystream::{self, CIPHER_SEED};
use crate::error::{Error, Result};
use crate::source::ByteSource;

/// First four bytes of every archive: "RGSS".
pub(crate) const HEADER_1: u32 = 0x5353_4752;
/// Next four bytes: "AD\0\x01".
pub(crate) const HEADER_2: u32 = 0x0100_4441;

/// Longest accepted entry path, in bytes. A length beyond this is treated
/// as table corruption rather than an allocation request.
pub const MAX_NAME_LEN: u32 = 512;

/// Location of one entry's still-encrypted payload in the backing stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct EntryData {
    /// Byte position of the raw data in the backing stream.
    pub offset: u64,
    /// Payload length in bytes.
    pub size: u64,
    /// Keystream word valid at offset 0 of this entry.
    pub start_magic: u32,
}

/// Path-keyed entry table plus the derived directory set.
///
/// Paths are normalized to forward slashes during decryption; directories
/// are every strict prefix of an entry path that ends at a separator. The
/// index is immutable once built.
#[derive(Debug, Default)]
pub(crate) struct ArchiveIndex {
    pub entries: HashMap<String, EntryData>,
    pub dirs: HashSet<String>,
}

impl ArchiveIndex {
    /// Parse the full entry table from `source`.
    ///
    /// A stream that does not begin with the header pair is reported as
    /// [`Error::MalformedArchive`] so the caller can fall back to another
    /// interpretation of the file. A short read on a `name_len` field is the
    /// format's only end-of-table signal; a short read anywhere else inside
    /// a record means the table is truncated.
    pub fn parse(source: &mut dyn ByteSource) -> Result<Self> {
        source.seek(SeekFrom::Start(0))?;

        match (read_u32(source)?, read_u32(source)?) {
            (Some(HEADER_1), Some(HEADER_2)) => {}
            _ => return Err(Error::MalformedArchive("missing RGSS header".into())),
        }

        let mut index = Self::default();
        let mut magic = CIPHER_SEED;
        let total = source.len();

        while let Some(raw_len) = read_u32(source)? {
            let name_len = raw_len ^ keystream::advance(&mut magic);
            if name_len == 0 || name_len > MAX_NAME_LEN {
                return Err(Error::MalformedArchive(format!(
                    "entry name length {name_len} out of range"
                )));
            }

            let mut name = vec![0u8; name_len as usize];
            read_record(source, &mut name)?;
            for byte in &mut name {
                *byte ^= keystream::advance(&mut magic) as u8;
                if *byte == b'\\' {
                    *byte = b'/';
                }
            }
            let name = String::from_utf8(name)
                .map_err(|_| Error::MalformedArchive("entry name is not valid UTF-8".into()))?;

            let mut size_buf = [0u8; 4];
            read_record(source, &mut size_buf)?;
            let size = u64::from(u32::from_le_bytes(size_buf) ^ keystream::advance(&mut magic));

            let offset = source.stream_position()?;
            if offset + size > total {
                return Err(Error::MalformedArchive(format!(
                    "entry {name} extends past end of archive"
                )));
            }

            let entry = EntryData {
                offset,
                size,
                start_magic: magic,
            };
            trace!(name = %name, offset, size, "indexed entry");

            for (pos, byte) in name.bytes().enumerate() {
                if byte == b'/' {
                    index.dirs.insert(name[..pos].to_owned());
                }
            }
            index.entries.insert(name, entry);

            source.seek(SeekFrom::Start(offset + size))?;
        }

        Ok(index)
    }
}

/// Read a little-endian u32, or `None` if the stream ends first. One to
/// three trailing bytes also count as the end of the table.
fn read_u32(source: &mut dyn ByteSource) -> Result<Option<u32>> {
    let mut buf = [0u8; 4];
    let mut filled = 0;
    while filled < buf.len() {
        let n = source.read(&mut buf[filled..])?;
        if n == 0 {
            return Ok(None);
        }
        filled += n;
    }
    Ok(Some(u32::from_le_bytes(buf)))
}

/// Fill `buf` from the middle of an entry record, where running out of
/// bytes means the table is truncated, not finished.
fn read_record(source: &mut dyn ByteSource, buf: &mut [u8]) -> Result<()> {
    source.read_exact(buf).map_err(|e| {
        if e.kind() == ErrorKind::UnexpectedEof {
            Error::MalformedArchive("truncated entry record".into())
        } else {
            Error::Backend(e)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::fixtures::ArchiveBuilder;
    use crate::source::MemorySource;

    fn parse(bytes: Vec<u8>) -> Result<ArchiveIndex> {
        ArchiveIndex::parse(&mut MemorySource::new(bytes))
    }

    #[test]
    fn parses_entries_and_directories() {
        let bytes = ArchiveBuilder::new()
            .file("Data/Map001.rxdata", b"map data")
            .file("Graphics/Titles/title.png", b"png bytes")
            .build();
        let index = parse(bytes).unwrap();

        assert_eq!(index.entries.len(), 2);
        assert_eq!(index.entries["Data/Map001.rxdata"].size, 8);
        assert_eq!(index.entries["Graphics/Titles/title.png"].size, 9);

        assert_eq!(index.dirs.len(), 3);
        assert!(index.dirs.contains("Data"));
        assert!(index.dirs.contains("Graphics"));
        assert!(index.dirs.contains("Graphics/Titles"));
    }

    #[test]
    fn offsets_point_at_the_raw_payload() {
        let bytes = ArchiveBuilder::new().file("a.txt", b"xyz").build();
        let total = bytes.len() as u64;
        let index = parse(bytes).unwrap();

        let entry = index.entries["a.txt"];
        assert_eq!(entry.offset + entry.size, total);
    }

    #[test]
    fn backslash_paths_are_normalized() {
        let bytes = ArchiveBuilder::new()
            .file("Audio\\BGM\\theme.ogg", b"ogg")
            .build();
        let index = parse(bytes).unwrap();

        assert!(index.entries.contains_key("Audio/BGM/theme.ogg"));
        assert!(index.dirs.contains("Audio"));
        assert!(index.dirs.contains("Audio/BGM"));
    }

    #[test]
    fn rejects_wrong_header() {
        let err = parse(b"PK\x03\x04 not this format".to_vec()).unwrap_err();
        assert!(matches!(err, Error::MalformedArchive(_)));
    }

    #[test]
    fn rejects_short_header() {
        let err = parse(b"RGSS".to_vec()).unwrap_err();
        assert!(matches!(err, Error::MalformedArchive(_)));
    }

    #[test]
    fn empty_table_is_a_valid_archive() {
        let index = parse(ArchiveBuilder::new().build()).unwrap();
        assert!(index.entries.is_empty());
        assert!(index.dirs.is_empty());
    }

    #[test]
    fn stray_trailing_bytes_end_the_table() {
        let mut bytes = ArchiveBuilder::new().file("a.txt", b"data").build();
        bytes.extend_from_slice(&[0xAB, 0xCD]);
        let index = parse(bytes).unwrap();
        assert_eq!(index.entries.len(), 1);
    }

    #[test]
    fn rejects_oversized_name_length() {
        let mut bytes = ArchiveBuilder::new().build();
        let mut magic = CIPHER_SEED;
        bytes.extend_from_slice(&(100_000u32 ^ keystream::advance(&mut magic)).to_le_bytes());
        let err = parse(bytes).unwrap_err();
        assert!(matches!(err, Error::MalformedArchive(_)));
    }

    #[test]
    fn rejects_zero_name_length() {
        let mut bytes = ArchiveBuilder::new().build();
        let mut magic = CIPHER_SEED;
        bytes.extend_from_slice(&(0u32 ^ keystream::advance(&mut magic)).to_le_bytes());
        let err = parse(bytes).unwrap_err();
        assert!(matches!(err, Error::MalformedArchive(_)));
    }

    #[test]
    fn rejects_truncated_name() {
        let mut bytes = ArchiveBuilder::new().build();
        let mut magic = CIPHER_SEED;
        bytes.extend_from_slice(&(10u32 ^ keystream::advance(&mut magic)).to_le_bytes());
        bytes.extend_from_slice(&[0u8; 3]);
        let err = parse(bytes).unwrap_err();
        assert!(matches!(err, Error::MalformedArchive(_)));
    }

    #[test]
    fn rejects_entry_past_end_of_stream() {
        let mut bytes = ArchiveBuilder::new().file("a.bin", b"0123456789").build();
        bytes.truncate(bytes.len() - 4);
        let err = parse(bytes).unwrap_err();
        assert!(matches!(err, Error::MalformedArchive(_)));
    }

    #[test]
    fn rejects_undecodable_names() {
        // 0xFF xored back out of the keystream is not valid UTF-8
        let mut bytes = ArchiveBuilder::new().build();
        let mut magic = CIPHER_SEED;
        bytes.extend_from_slice(&(2u32 ^ keystream::advance(&mut magic)).to_le_bytes());
        bytes.push(0xFF ^ keystream::advance(&mut magic) as u8);
        bytes.push(0xFE ^ keystream::advance(&mut magic) as u8);
        bytes.extend_from_slice(&(0u32 ^ keystream::advance(&mut magic)).to_le_bytes());
        let err = parse(bytes).unwrap_err();
        assert!(matches!(err, Error::MalformedArchive(_)));
    }

    #[test]
    fn last_duplicate_path_wins() {
        let bytes = ArchiveBuilder::new()
            .file("twice.txt", b"first")
            .file("twice.txt", b"second version")
            .build();
        let index = parse(bytes).unwrap();
        assert_eq!(index.entries.len(), 1);
        assert_eq!(index.entries["twice.txt"].size, 14);
    }
}
