//! The encrypted archive container: keystream, entry table, per-entry
//! decrypting streams, and the virtual-filesystem backend adapter.

mod entry;
mod index;
mod keystream;
mod reader;

#[cfg(test)]
pub(crate) mod fixtures;

pub use entry::EntryHandle;
pub use index::MAX_NAME_LEN;
pub use reader::RgssArchive;
