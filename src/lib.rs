//! Read-only RGSS encrypted game archives behind a mountable virtual
//! filesystem.
//!
//! The crate has two halves:
//! - [`archive`]: the RGSSAD container — entry-table parsing and
//!   independently seekable, decrypting per-entry streams with full
//!   seek/duplicate support.
//! - [`FileSystem`]: an ordered search path merging plain directories and
//!   archives, with category-based extension fallback, serving opened
//!   files in the stream shapes engine subsystems expect.
//!
//! # Example
//!
//! ```no_run
//! use std::io::Read;
//! use rgssfs::{FileSystem, FileType};
//!
//! let mut fs = FileSystem::new();
//! fs.mount("Game")?;
//! fs.mount("Game.rgssad")?;
//!
//! // "Graphics/Titles/title" falls back to .jpg/.png automatically.
//! let mut stream = fs.open_read("Graphics/Titles/title", Some(FileType::Image))?;
//! let mut title = Vec::new();
//! Read::read_to_end(&mut stream, &mut title)?;
//! # Ok::<(), rgssfs::Error>(())
//! ```

// Core modules
pub mod archive;
pub mod error;
pub mod source;
pub mod stream;
pub mod vfs;

// Re-export commonly used types
pub use archive::{EntryHandle, RgssArchive, MAX_NAME_LEN};
pub use error::{Error, Result};
pub use source::{ByteSource, FileSource, MemorySource};
pub use stream::{FileStream, TransportHandle, VfsFile};
pub use vfs::{
    Backend, DirEntry, DirMount, ExtensionTable, FileKind, FileSystem, FileType, Stat,
};
