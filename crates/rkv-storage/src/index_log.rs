//! The index log: append-only files persisting every index mutation.
//!
//! Each write appends one self-delimiting [`IndexEntry`] record to the
//! active index file. At startup [`IndexLog::load`] walks the file
//! sequence from 0, replaying every record into a fresh
//! [`MemoryIndex`]; later records for the same key overwrite earlier
//! ones, whether they appear in the same file or a later one.
//!
//! # Recovery
//!
//! The load loop opens each candidate file read/write, creating it if
//! missing:
//!
//! - zero bytes readable and this is file 0: fresh install: write a new
//!   header and stop; this is the active file.
//! - zero bytes readable on a later file: the loop created a file it did
//!   not need. Unlink it, step back to the previous sequence number, and
//!   stop.
//! - a partial header, a wrong magic, an unknown version, or a record
//!   truncated mid-entry: fatal.
//!
//! The chosen final file is then reopened in append mode.

use std::{
    fs::{self, File},
    io::{Read, Seek, Write},
    path::{Path, PathBuf},
};

use bytes::Bytes;
use rkv_types::{FileId, MAX_FILES};

use crate::{
    StorageError,
    entry::IndexEntry,
    header::{FileHeader, HEADER_SIZE, INDEX_MAGIC, format_epoch, open_append, open_rw,
        read_header_prefix},
    index_filename,
    memory::MemoryIndex,
};

/// The append side of one namespace's index file family.
#[derive(Debug)]
pub struct IndexLog {
    dir: PathBuf,
    file_id: FileId,
    file: File,
}

impl IndexLog {
    /// Walks the index file sequence, replays every record, and opens the
    /// final file as the active index.
    ///
    /// Returns the log handle and the reconstructed in-memory index. The
    /// sequence is capped at [`MAX_FILES`] files; exceeding the cap is a
    /// configuration error, not a supported workload.
    pub fn load(dir: &Path) -> Result<(Self, MemoryIndex), StorageError> {
        let mut index = MemoryIndex::new();
        let mut file_id = FileId::FIRST;

        loop {
            if file_id.as_u16() >= MAX_FILES {
                return Err(StorageError::TooManyFiles(MAX_FILES));
            }

            let path = dir.join(index_filename(file_id));
            tracing::debug!(file = %path.display(), "loading index file");

            let mut file = open_rw(&path)?;
            let mut buf = [0u8; HEADER_SIZE];
            let read = read_header_prefix(&mut file, &mut buf)?;

            if read == 0 {
                if file_id == FileId::FIRST {
                    // Fresh install: initialize file 0 and use it.
                    let header = FileHeader::new(INDEX_MAGIC, file_id);
                    header.write_at_start(&mut file)?;
                    tracing::info!(file = %path.display(), "created empty index file");
                    break;
                }

                // We created a file past the end of the sequence; discard
                // it and settle on the previous one.
                drop(file);
                fs::remove_file(&path)?;
                tracing::debug!(file = %path.display(), "discarded surplus index file");
                file_id = file_id.prev();
                break;
            }

            if read < HEADER_SIZE {
                return Err(StorageError::TruncatedHeader {
                    expected: HEADER_SIZE,
                    actual: read,
                });
            }

            let mut header = FileHeader::from_bytes(&buf, INDEX_MAGIC)?;
            header.touch();
            header.write_at_start(&mut file)?;
            tracing::debug!(
                created = %format_epoch(header.created),
                opened = %format_epoch(header.opened),
                "index file header"
            );

            replay_entries(&mut file, file_id, &mut index)?;
            file_id = file_id.next();
        }

        let path = dir.join(index_filename(file_id));
        let file = open_append(&path)?;
        tracing::info!(file = %path.display(), "active index file");

        Ok((
            Self {
                dir: dir.to_path_buf(),
                file_id,
                file,
            },
            index,
        ))
    }

    /// Appends one entry record to the active index file.
    pub fn append(&mut self, entry: &IndexEntry) -> Result<(), StorageError> {
        self.file.write_all(&entry.to_bytes())?;
        Ok(())
    }

    /// Rotates to the next index file: fsync and close the current one,
    /// create the next, write a fresh header.
    pub fn rotate(&mut self) -> Result<FileId, StorageError> {
        let next = self.file_id.next();
        if next.as_u16() >= MAX_FILES {
            return Err(StorageError::TooManyFiles(MAX_FILES));
        }

        self.file.sync_all()?;

        let path = self.dir.join(index_filename(next));
        let mut file = open_append(&path)?;
        let header = FileHeader::new(INDEX_MAGIC, next);
        file.write_all(&header.to_bytes())?;

        self.file = file;
        self.file_id = next;

        tracing::info!(file = %path.display(), "jumped to next index file");
        Ok(next)
    }

    /// Flushes the active index file to disk: the emergency hook.
    pub fn sync(&self) -> Result<(), StorageError> {
        self.file.sync_all()?;
        Ok(())
    }

    pub fn file_id(&self) -> FileId {
        self.file_id
    }
}

/// Replays every record after the header into the in-memory index.
///
/// The file position must be just past the header. Records are framed by
/// their leading `idlength` octet; a record cut short by EOF is fatal.
fn replay_entries(
    file: &mut File,
    file_id: FileId,
    index: &mut MemoryIndex,
) -> Result<(), StorageError> {
    debug_assert_eq!(
        file.stream_position()?,
        HEADER_SIZE as u64,
        "replay must start just past the header"
    );

    let mut raw = Vec::new();
    file.read_to_end(&mut raw)?;
    let data = Bytes::from(raw);

    let mut pos = 0;
    while pos < data.len() {
        let (entry, consumed) =
            IndexEntry::from_bytes(&data.slice(pos..), file_id).map_err(|err| match err {
                StorageError::UnexpectedEof => StorageError::TruncatedEntry {
                    position: (HEADER_SIZE + pos) as u64,
                },
                other => other,
            })?;
        index.upsert(entry);
        pos += consumed;
    }

    Ok(())
}
