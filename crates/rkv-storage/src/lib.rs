//! # rkv-storage: Append-only log storage for rkv
//!
//! This crate implements the storage core of rkv: a pair of append-only
//! file families (the data log and the index log) plus the in-memory
//! bucket index that binds keys to data locations.
//!
//! # File Layout
//!
//! ```text
//! {namespace_dir}/
//! ├── rkv-index-0000      <- index log, sequence 0
//! ├── rkv-data-0000       <- paired data log, sequence 0
//! ├── rkv-index-0001      <- after one rotation (active)
//! └── rkv-data-0001
//! ```
//!
//! Index file `N` always pairs with data file `N`; the sequence starts at
//! 0 and is contiguous. Values are appended to the data log unframed; the
//! index log is the sole source of `(offset, length)`. On startup the
//! index log is replayed in file-sequence then in-file-position order to
//! reconstruct the in-memory index; later records for the same key win.
//!
//! # Durability
//!
//! Writes are best-effort durable: nothing is fsynced on the hot path.
//! [`Storage::sync`] is the emergency hook that flushes the active index
//! file, invoked by the embedder on signals or admin command. A crash
//! after a data-log append but before the index-log append loses the
//! write and leaves unreferenced bytes in the data file; the index stays
//! consistent.

use rkv_types::FileId;

mod data_log;
mod entry;
mod header;
mod index_log;
mod memory;
mod storage;


pub use data_log::DataLog;
pub use entry::{ENTRY_FIXED_SIZE, IndexEntry};
pub use header::{DATA_MAGIC, FORMAT_VERSION, FileHeader, HEADER_SIZE, INDEX_MAGIC};
pub use index_log::IndexLog;
pub use memory::{IndexStats, MemoryIndex};
pub use storage::Storage;

/// Errors surfaced by the storage core.
///
/// Every variant except the caller-input checks (`InvalidKeyLength`,
/// `ValueTooLarge`) indicates corruption, truncation, or an I/O failure
/// and is process-fatal under the embedder's error policy: the embedder
/// should run the emergency sync hook and abort.
#[derive(thiserror::Error, Debug)]
pub enum StorageError {
    #[error("filesystem error")]
    Io(#[from] std::io::Error),

    #[error("invalid file magic: expected {expected:?}, found {actual:?}")]
    InvalidMagic { expected: [u8; 4], actual: [u8; 4] },

    #[error("unsupported file format version: {0}")]
    UnsupportedVersion(u16),

    #[error("file header truncated: read {actual} of {expected} bytes")]
    TruncatedHeader { expected: usize, actual: usize },

    #[error("index entry truncated at byte {position}")]
    TruncatedEntry { position: u64 },

    #[error("unexpected end of file")]
    UnexpectedEof,

    #[error("key length {0} out of range (1..=255 bytes)")]
    InvalidKeyLength(usize),

    #[error("value length {0} exceeds the per-value maximum")]
    ValueTooLarge(u64),

    #[error("file sequence exhausted: more than {0} files in one namespace")]
    TooManyFiles(u16),
}

/// Formats a file name in the data log family.
pub(crate) fn data_filename(id: FileId) -> String {
    format!("rkv-data-{:04}", id.as_u16())
}

/// Formats a file name in the index log family.
pub(crate) fn index_filename(id: FileId) -> String {
    format!("rkv-index-{:04}", id.as_u16())
}
