//! The per-namespace storage engine binding the three parts together.
//!
//! [`Storage`] owns one data log, one index log, and the in-memory index
//! reconstructed from it. The data and index file families share one
//! sequence number: `index file N` pairs with `data file N` across load
//! and rotation.
//!
//! # Write ordering
//!
//! A put performs, in order: data-log append, in-memory upsert, index-log
//! append. A crash between the two appends loses the write (the value
//! bytes remain on disk, unreferenced) but leaves the index consistent.
//!
//! # Concurrency
//!
//! The engine is single-threaded cooperative: every mutation takes
//! `&mut self` and there are no internal locks. A multi-threaded embedder
//! must serialize whole requests around the owning value.

use std::{fs, path::PathBuf};

use bytes::Bytes;
use rkv_types::{FileId, MAX_KEY_LENGTH, MAX_VALUE_LENGTH};

use crate::{
    StorageError, data_log::DataLog, entry::IndexEntry, index_log::IndexLog,
    memory::{IndexStats, MemoryIndex},
};

/// One namespace's storage: paired append-only logs plus the in-memory
/// index.
///
/// # Invariants
///
/// - The index log and data log are always on the same file sequence
///   number.
/// - After [`Storage::open`], the in-memory index holds, for every key in
///   any index file, the record with the highest file sequence then the
///   highest file position.
/// - Append offsets are monotonically non-decreasing within a file.
#[derive(Debug)]
pub struct Storage {
    index_log: IndexLog,
    data_log: DataLog,
    index: MemoryIndex,
}

impl Storage {
    /// Opens (or initializes) the storage under `dir`, replaying the
    /// index log into memory.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;

        let (index_log, index) = IndexLog::load(&dir)?;
        let data_log = DataLog::open(&dir, index_log.file_id())?;
        debug_assert_eq!(index_log.file_id(), data_log.file_id());

        let stats = index.stats();
        tracing::info!(
            dir = %dir.display(),
            entries = stats.entries,
            data_bytes = stats.data_bytes,
            index_bytes = stats.index_bytes,
            "storage loaded"
        );

        Ok(Self {
            index_log,
            data_log,
            index,
        })
    }

    /// Looks up the latest index entry for a key.
    pub fn lookup(&self, key: &[u8]) -> Option<&IndexEntry> {
        self.index.get(key)
    }

    /// Writes a value under a key.
    ///
    /// Returns the previous value length when the key was overwritten.
    /// Keys are 1..=255 bytes; a single value is bounded at
    /// [`MAX_VALUE_LENGTH`] bytes (zero-length values are allowed).
    pub fn put(&mut self, key: &[u8], value: &[u8]) -> Result<Option<u64>, StorageError> {
        if key.is_empty() || key.len() > MAX_KEY_LENGTH {
            return Err(StorageError::InvalidKeyLength(key.len()));
        }
        if value.len() as u64 > MAX_VALUE_LENGTH {
            return Err(StorageError::ValueTooLarge(value.len() as u64));
        }

        let (offset, length) = self.data_log.append(value)?;
        let entry = IndexEntry::new(
            Bytes::copy_from_slice(key),
            self.data_log.file_id(),
            offset,
            length,
        )?;

        let previous = self.index.upsert(entry.clone());
        self.index_log.append(&entry)?;

        Ok(previous)
    }

    /// Reads the latest value for a key, or `None` if the key is unknown.
    pub fn get(&self, key: &[u8]) -> Result<Option<Bytes>, StorageError> {
        match self.index.get(key) {
            Some(entry) => {
                let value =
                    self.data_log
                        .read(entry.data_file(), entry.offset(), entry.length())?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    /// Rotates both logs to the next file pair.
    pub fn jump_next(&mut self) -> Result<FileId, StorageError> {
        let index_id = self.index_log.rotate()?;
        let data_id = self.data_log.rotate()?;
        debug_assert_eq!(index_id, data_id, "log families must rotate together");
        Ok(index_id)
    }

    /// Flushes the active index file (the emergency hook).
    pub fn sync(&self) -> Result<(), StorageError> {
        self.index_log.sync()
    }

    /// Number of live keys.
    pub fn len(&self) -> u64 {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Sum of live value lengths, for quota enforcement.
    pub fn used_bytes(&self) -> u64 {
        self.index.data_bytes()
    }

    /// Monotonic insertion counter; survives rotation but not restart.
    pub fn next_entry(&self) -> u64 {
        self.index.next_entry()
    }

    /// Current file sequence number of the active pair.
    pub fn file_id(&self) -> FileId {
        self.index_log.file_id()
    }

    pub fn stats(&self) -> IndexStats {
        self.index.stats()
    }
}
