//! The filesystem facade: ordered mounts, extension fallback, and the
//! backend contract every mount kind implements.

use std::fs::{self, File};
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Component, Path, PathBuf};

use tracing::{debug, warn};

use crate::archive::RgssArchive;
use crate::error::{Error, Result};
use crate::source::FileSource;
use crate::stream::{FileStream, TransportHandle, VfsFile};

/// Node kind reported by `stat`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    File,
    Directory,
}

/// Metadata for one virtual node. Archive nodes carry zeroed timestamps:
/// the container stores none.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stat {
    pub size: u64,
    pub kind: FileKind,
    pub readonly: bool,
    pub modified: i64,
    pub created: i64,
    pub accessed: i64,
}

impl Stat {
    pub(crate) fn file(size: u64, readonly: bool) -> Self {
        Self {
            size,
            kind: FileKind::File,
            readonly,
            modified: 0,
            created: 0,
            accessed: 0,
        }
    }

    pub(crate) fn directory(readonly: bool) -> Self {
        Self {
            size: 0,
            kind: FileKind::Directory,
            readonly,
            modified: 0,
            created: 0,
            accessed: 0,
        }
    }
}

/// One name in a directory listing.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct DirEntry {
    pub name: String,
    pub is_dir: bool,
}

/// Contract every mount kind provides to the facade.
///
/// The write family defaults to failure. Read-only backends leave the
/// defaults in place, so the refusal is explicit rather than silent.
pub trait Backend: Send + Sync {
    fn exists(&self, path: &str) -> bool;
    fn stat(&self, path: &str) -> Result<Stat>;
    fn open_read(&self, path: &str) -> Result<Box<dyn VfsFile>>;
    fn read_dir(&self, path: &str) -> Result<Vec<DirEntry>>;

    fn open_write(&self, _path: &str) -> Result<Box<dyn VfsFile>> {
        Err(Error::Unsupported("open for writing"))
    }

    fn remove(&self, _path: &str) -> Result<()> {
        Err(Error::Unsupported("remove"))
    }

    fn create_dir(&self, _path: &str) -> Result<()> {
        Err(Error::Unsupported("create directory"))
    }
}

/// Logical file categories with well-known extension fallbacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileType {
    Image,
    Audio,
    Font,
}

/// Ordered candidate extensions per category, owned by the filesystem
/// instance rather than any process-wide table.
#[derive(Debug, Clone)]
pub struct ExtensionTable {
    image: Vec<String>,
    audio: Vec<String>,
    font: Vec<String>,
}

impl Default for ExtensionTable {
    fn default() -> Self {
        Self {
            image: vec!["jpg".into(), "png".into()],
            audio: vec!["mp3".into(), "ogg".into(), "wav".into(), "wma".into()],
            font: vec!["ttf".into()],
        }
    }
}

impl ExtensionTable {
    /// Table with no fallbacks at all.
    pub fn empty() -> Self {
        Self {
            image: Vec::new(),
            audio: Vec::new(),
            font: Vec::new(),
        }
    }

    /// Replace the candidate list for one category.
    pub fn set<I, S>(&mut self, ty: FileType, extensions: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let list = extensions.into_iter().map(Into::into).collect();
        match ty {
            FileType::Image => self.image = list,
            FileType::Audio => self.audio = list,
            FileType::Font => self.font = list,
        }
    }

    fn candidates(&self, ty: FileType) -> &[String] {
        match ty {
            FileType::Image => &self.image,
            FileType::Audio => &self.audio,
            FileType::Font => &self.font,
        }
    }
}

/// Host file opened through a directory mount.
struct HostFile {
    file: File,
    len: u64,
}

impl Read for HostFile {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.file.read(buf)
    }
}

impl Seek for HostFile {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.file.seek(pos)
    }
}

impl VfsFile for HostFile {
    fn len(&self) -> u64 {
        self.len
    }
}

/// A plain directory mounted into the search path.
pub struct DirMount {
    root: PathBuf,
}

impl DirMount {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Map a logical name below the mount root. Absolute names and names
    /// that climb out of the root resolve to nothing.
    fn locate(&self, path: &str) -> Option<PathBuf> {
        let rel = Path::new(path);
        if rel
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
        {
            return None;
        }
        Some(self.root.join(rel))
    }

    fn not_found(path: &str) -> impl FnOnce(io::Error) -> Error + '_ {
        move |e| match e.kind() {
            io::ErrorKind::NotFound => Error::FileNotFound(path.to_owned()),
            _ => Error::Backend(e),
        }
    }
}

impl Backend for DirMount {
    fn exists(&self, path: &str) -> bool {
        self.locate(path).is_some_and(|full| full.exists())
    }

    fn stat(&self, path: &str) -> Result<Stat> {
        let full = self
            .locate(path)
            .ok_or_else(|| Error::FileNotFound(path.to_owned()))?;
        let meta = fs::metadata(full).map_err(Self::not_found(path))?;
        if meta.is_dir() {
            Ok(Stat::directory(meta.permissions().readonly()))
        } else {
            Ok(Stat::file(meta.len(), meta.permissions().readonly()))
        }
    }

    fn open_read(&self, path: &str) -> Result<Box<dyn VfsFile>> {
        let full = self
            .locate(path)
            .ok_or_else(|| Error::FileNotFound(path.to_owned()))?;
        let file = File::open(full).map_err(Self::not_found(path))?;
        let len = file.metadata()?.len();
        Ok(Box::new(HostFile { file, len }))
    }

    fn read_dir(&self, path: &str) -> Result<Vec<DirEntry>> {
        let full = self
            .locate(path)
            .ok_or_else(|| Error::FileNotFound(path.to_owned()))?;
        let mut listing = Vec::new();
        for entry in fs::read_dir(full).map_err(Self::not_found(path))? {
            let entry = entry?;
            listing.push(DirEntry {
                name: entry.file_name().to_string_lossy().into_owned(),
                is_dir: entry.file_type()?.is_dir(),
            });
        }
        Ok(listing)
    }
}

/// The virtual filesystem: an ordered list of search roots plus the
/// extension table used for category fallback.
///
/// Resolution walks the mounts in mount order and the first root that
/// knows a name wins, exactly like a search path. Adding a mount takes
/// `&mut self`; all lookups take `&self`, so a populated filesystem can be
/// shared freely between threads.
pub struct FileSystem {
    mounts: Vec<Box<dyn Backend>>,
    extensions: ExtensionTable,
}

impl FileSystem {
    pub fn new() -> Self {
        Self::with_extensions(ExtensionTable::default())
    }

    pub fn with_extensions(extensions: ExtensionTable) -> Self {
        Self {
            mounts: Vec::new(),
            extensions,
        }
    }

    /// Append a search root: a plain directory, or a file holding an
    /// archive. Archive files are detected by their header; a file that is
    /// neither comes back as [`Error::MalformedArchive`] and the mount
    /// list is left unchanged.
    pub fn mount<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let path = path.as_ref();
        let meta = fs::metadata(path)?;

        if meta.is_dir() {
            debug!(path = %path.display(), "mounted directory");
            self.mounts.push(Box::new(DirMount::new(path)));
            return Ok(());
        }

        let source = FileSource::open(path)?;
        match RgssArchive::open(Box::new(source), false) {
            Ok(archive) => {
                debug!(
                    path = %path.display(),
                    entries = archive.entry_count(),
                    "mounted archive"
                );
                self.mounts.push(Box::new(archive));
                Ok(())
            }
            Err(err) => {
                warn!(path = %path.display(), %err, "declined mount candidate");
                Err(err)
            }
        }
    }

    /// Open a logical name for reading as a general-purpose stream.
    pub fn open_read(&self, name: &str, ty: Option<FileType>) -> Result<FileStream> {
        let (backend, resolved) = self
            .resolve(name, ty)
            .ok_or_else(|| Error::FileNotFound(name.to_owned()))?;
        Ok(FileStream::new(backend.open_read(&resolved)?))
    }

    /// Open a logical name as a transport-level handle for low-level
    /// binary consumers.
    pub fn open_transport(&self, name: &str, ty: Option<FileType>) -> Result<TransportHandle> {
        let (backend, resolved) = self
            .resolve(name, ty)
            .ok_or_else(|| Error::FileNotFound(name.to_owned()))?;
        Ok(TransportHandle::new(backend.open_read(&resolved)?))
    }

    /// Whether `name` resolves anywhere in the search order, including
    /// category extension fallback.
    pub fn exists(&self, name: &str, ty: Option<FileType>) -> bool {
        self.resolve(name, ty).is_some()
    }

    fn resolve(&self, name: &str, ty: Option<FileType>) -> Option<(&dyn Backend, String)> {
        let name = name.replace('\\', "/");

        if let Some(backend) = self.find(&name) {
            return Some((backend, name));
        }

        if let Some(ty) = ty {
            for ext in self.extensions.candidates(ty) {
                let candidate = format!("{name}.{ext}");
                if let Some(backend) = self.find(&candidate) {
                    return Some((backend, candidate));
                }
            }
        }

        None
    }

    fn find(&self, path: &str) -> Option<&dyn Backend> {
        self.mounts
            .iter()
            .find(|mount| mount.exists(path))
            .map(|mount| mount.as_ref())
    }
}

impl Default for FileSystem {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dir_mount_refuses_escaping_names() {
        let mount = DirMount::new("/tmp/whatever");
        assert!(mount.locate("ok/name.txt").is_some());
        assert!(mount.locate("./also/fine").is_some());
        assert!(mount.locate("../escape").is_none());
        assert!(mount.locate("a/../../b").is_none());
        assert!(mount.locate("/etc/passwd").is_none());
    }

    #[test]
    fn escaping_names_do_not_exist() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("inside.txt"), b"x").unwrap();
        let mount = DirMount::new(dir.path());

        assert!(mount.exists("inside.txt"));
        assert!(!mount.exists("../inside.txt"));
        assert!(matches!(
            mount.open_read("../inside.txt"),
            Err(Error::FileNotFound(_))
        ));
    }

    #[test]
    fn extension_table_defaults_follow_category_order() {
        let table = ExtensionTable::default();
        assert_eq!(table.candidates(FileType::Image), ["jpg", "png"]);
        assert_eq!(
            table.candidates(FileType::Audio),
            ["mp3", "ogg", "wav", "wma"]
        );
        assert_eq!(table.candidates(FileType::Font), ["ttf"]);
    }

    #[test]
    fn extension_table_can_be_replaced_per_category() {
        let mut table = ExtensionTable::empty();
        assert!(table.candidates(FileType::Image).is_empty());

        table.set(FileType::Image, ["webp", "png"]);
        assert_eq!(table.candidates(FileType::Image), ["webp", "png"]);
    }

    #[test]
    fn dir_mount_lists_children() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), b"a").unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        let mount = DirMount::new(dir.path());

        let mut listing = mount.read_dir("").unwrap();
        listing.sort();
        assert_eq!(
            listing,
            [
                DirEntry {
                    name: "a.txt".into(),
                    is_dir: false
                },
                DirEntry {
                    name: "sub".into(),
                    is_dir: true
                },
            ]
        );
    }
}
