//! The data log: append-only files holding raw value bytes.
//!
//! Values are written unframed; the index log is the sole source of
//! `(offset, length)`. The active file is opened in append mode, so the
//! pre-write offset is simply the current file length.

use std::{
    fs::File,
    io::{Read, Seek, SeekFrom, Write},
    path::{Path, PathBuf},
};

use bytes::Bytes;
use rkv_types::{FileId, MAX_FILES};

use crate::{
    StorageError, data_filename,
    header::{DATA_MAGIC, FileHeader, HEADER_SIZE, open_append, open_rw, read_header_prefix},
};

/// The append side of one namespace's data file family.
#[derive(Debug)]
pub struct DataLog {
    dir: PathBuf,
    file_id: FileId,
    file: File,
    position: u64,
}

impl DataLog {
    /// Opens the data file paired with the given sequence number.
    ///
    /// A missing or empty file gets a fresh header; an existing file has
    /// its magic and version validated and its `opened` timestamp
    /// rewritten in place. The file is then reopened in append mode as
    /// the active data file.
    pub fn open(dir: &Path, file_id: FileId) -> Result<Self, StorageError> {
        let path = dir.join(data_filename(file_id));

        {
            let mut file = open_rw(&path)?;
            let mut buf = [0u8; HEADER_SIZE];
            let read = read_header_prefix(&mut file, &mut buf)?;
            if read == 0 {
                let header = FileHeader::new(DATA_MAGIC, file_id);
                header.write_at_start(&mut file)?;
                tracing::info!(file = %path.display(), "created empty data file");
            } else if read < HEADER_SIZE {
                return Err(StorageError::TruncatedHeader {
                    expected: HEADER_SIZE,
                    actual: read,
                });
            } else {
                let mut header = FileHeader::from_bytes(&buf, DATA_MAGIC)?;
                header.touch();
                header.write_at_start(&mut file)?;
            }
        }

        let file = open_append(&path)?;
        let position = file.metadata()?.len();
        tracing::debug!(file = %path.display(), position, "active data file");

        Ok(Self {
            dir: dir.to_path_buf(),
            file_id,
            file,
            position,
        })
    }

    /// Appends raw value bytes to the active file.
    ///
    /// Returns the pre-write offset and the length written. Offsets are
    /// monotonically non-decreasing within a file.
    pub fn append(&mut self, value: &[u8]) -> Result<(u64, u64), StorageError> {
        let offset = self.position;
        self.file.write_all(value)?;
        self.position += value.len() as u64;
        Ok((offset, value.len() as u64))
    }

    /// Reads exactly `length` bytes at `offset` from file `file_id`.
    ///
    /// A short read means the index references bytes the data log does
    /// not hold, meaning corruption or truncation, and is reported as
    /// [`StorageError::UnexpectedEof`].
    pub fn read(&self, file_id: FileId, offset: u64, length: u64) -> Result<Bytes, StorageError> {
        let path = self.dir.join(data_filename(file_id));
        let mut file = File::open(&path)?;
        file.seek(SeekFrom::Start(offset))?;

        let mut buf = vec![0u8; length as usize];
        file.read_exact(&mut buf).map_err(|err| {
            if err.kind() == std::io::ErrorKind::UnexpectedEof {
                StorageError::UnexpectedEof
            } else {
                StorageError::Io(err)
            }
        })?;
        Ok(Bytes::from(buf))
    }

    /// Rotates to the next data file, writing a fresh header.
    pub fn rotate(&mut self) -> Result<FileId, StorageError> {
        let next = self.file_id.next();
        if next.as_u16() >= MAX_FILES {
            return Err(StorageError::TooManyFiles(MAX_FILES));
        }

        let path = self.dir.join(data_filename(next));
        let mut file = open_append(&path)?;
        let header = FileHeader::new(DATA_MAGIC, next);
        file.write_all(&header.to_bytes())?;

        // The previous descriptor closes when the handle is replaced.
        self.file = file;
        self.file_id = next;
        self.position = HEADER_SIZE as u64;

        tracing::info!(file = %path.display(), "jumped to next data file");
        Ok(next)
    }

    pub fn file_id(&self) -> FileId {
        self.file_id
    }
}
