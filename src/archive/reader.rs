//! The archive backend: binds the entry table and the handle engine to the
//! virtual-filesystem contract.

use tracing::debug;

use crate::archive::entry::EntryHandle;
use crate::archive::index::ArchiveIndex;
use crate::error::{Error, Result};
use crate::source::ByteSource;
use crate::stream::VfsFile;
use crate::vfs::{Backend, DirEntry, Stat};

/// A mounted read-only archive.
///
/// The index is immutable once built, so a shared reference may be used
/// from any number of threads; every [`open_entry`](Self::open_entry) hands
/// out a cursor with its own duplicate of the backing source. The write
/// half of the [`Backend`] contract always reports failure — the format is
/// read-only by design, not by omission.
pub struct RgssArchive {
    source: Box<dyn ByteSource>,
    index: ArchiveIndex,
}

impl std::fmt::Debug for RgssArchive {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RgssArchive")
            .field("entries", &self.index.entries.len())
            .finish_non_exhaustive()
    }
}

impl RgssArchive {
    /// Open an archive from a raw byte source.
    ///
    /// `for_write` is refused up front: the format has no writable variant.
    /// A stream that does not start with the format's header pair comes
    /// back as [`Error::MalformedArchive`], leaving the caller free to try
    /// other interpretations of the same file.
    pub fn open(mut source: Box<dyn ByteSource>, for_write: bool) -> Result<Self> {
        if for_write {
            return Err(Error::Unsupported("open archive for writing"));
        }

        let index = ArchiveIndex::parse(source.as_mut())?;
        debug!(entries = index.entries.len(), "opened archive");

        Ok(Self { source, index })
    }

    /// Number of file entries in the archive.
    pub fn entry_count(&self) -> usize {
        self.index.entries.len()
    }

    /// Whether `path` names a file or an inferred directory.
    pub fn contains(&self, path: &str) -> bool {
        self.index.entries.contains_key(path) || self.index.dirs.contains(path)
    }

    /// Open one entry as an independent decrypting stream.
    pub fn open_entry(&self, path: &str) -> Result<EntryHandle> {
        let entry = self
            .index
            .entries
            .get(path)
            .copied()
            .ok_or_else(|| Error::FileNotFound(path.to_owned()))?;
        Ok(EntryHandle::new(entry, self.source.duplicate()?))
    }

    /// The children of `dir`, lazily. `""` is the archive root.
    ///
    /// The listing is non-recursive — a child directory appears by name
    /// only — and a fresh call re-enumerates from the start.
    pub fn entries<'a>(&'a self, dir: &str) -> impl Iterator<Item = DirEntry> + 'a {
        let dir = dir.to_owned();
        self.index
            .entries
            .keys()
            .map(|path| (path, false))
            .chain(self.index.dirs.iter().map(|path| (path, true)))
            .filter_map(move |(path, is_dir)| {
                let (parent, base) = path.rsplit_once('/').unwrap_or(("", path.as_str()));
                (parent == dir).then(|| DirEntry {
                    name: base.to_owned(),
                    is_dir,
                })
            })
    }
}

impl Backend for RgssArchive {
    fn exists(&self, path: &str) -> bool {
        self.contains(path)
    }

    fn stat(&self, path: &str) -> Result<Stat> {
        if let Some(entry) = self.index.entries.get(path) {
            Ok(Stat::file(entry.size, true))
        } else if self.index.dirs.contains(path) {
            Ok(Stat::directory(true))
        } else {
            Err(Error::FileNotFound(path.to_owned()))
        }
    }

    fn open_read(&self, path: &str) -> Result<Box<dyn VfsFile>> {
        Ok(Box::new(self.open_entry(path)?))
    }

    fn read_dir(&self, path: &str) -> Result<Vec<DirEntry>> {
        Ok(self.entries(path).collect())
    }
}
