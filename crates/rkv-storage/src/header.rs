//! File headers for the data and index log families.
//!
//! Both families carry the same 16-byte header, differing only in magic:
//!
//! ```text
//! ┌──────────────────────────────────────────────────┐
//! │  Offset  │  Size  │  Description                 │
//! ├──────────────────────────────────────────────────┤
//! │  0       │  4     │  Magic: "IDX0" or "DAT0"     │
//! │  4       │  2     │  Version (u16 LE, currently 1)│
//! │  6       │  4     │  Created (u32 LE, unix epoch) │
//! │  10      │  2     │  File id (u16 LE)             │
//! │  12      │  4     │  Opened (u32 LE, unix epoch)  │
//! └──────────────────────────────────────────────────┘
//! ```
//!
//! `created` is written once when the file is first initialized. `opened`
//! is rewritten in place every time the file is reopened.

use std::{
    fs::{File, OpenOptions},
    io::{self, Read, Seek, SeekFrom, Write},
    path::Path,
};

use rkv_types::{FileId, unix_now};

use crate::StorageError;

/// Magic bytes identifying an index log file.
pub const INDEX_MAGIC: [u8; 4] = *b"IDX0";

/// Magic bytes identifying a data log file.
pub const DATA_MAGIC: [u8; 4] = *b"DAT0";

/// Current on-disk format version.
pub const FORMAT_VERSION: u16 = 1;

// Byte sizes - typed constants prevent mismatch bugs like using u32 for a u16 field
const MAGIC_SIZE: usize = 4;
const VERSION_SIZE: usize = 2;
const CREATED_SIZE: usize = 4;
const FILEID_SIZE: usize = 2;
const OPENED_SIZE: usize = 4;

/// Header size: magic(4) + version(2) + created(4) + fileid(2) + opened(4) = 16 bytes
pub const HEADER_SIZE: usize =
    MAGIC_SIZE + VERSION_SIZE + CREATED_SIZE + FILEID_SIZE + OPENED_SIZE;

/// The fixed header at the start of every log file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileHeader {
    pub magic: [u8; 4],
    pub version: u16,
    pub created: u32,
    pub fileid: u16,
    pub opened: u32,
}

impl FileHeader {
    /// Creates a fresh header for a newly initialized file.
    pub fn new(magic: [u8; 4], file_id: FileId) -> Self {
        let now = unix_now();
        Self {
            magic,
            version: FORMAT_VERSION,
            created: now,
            fileid: file_id.as_u16(),
            opened: now,
        }
    }

    /// Serializes the header to its on-disk form.
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        buf[0..4].copy_from_slice(&self.magic);
        buf[4..6].copy_from_slice(&self.version.to_le_bytes());
        buf[6..10].copy_from_slice(&self.created.to_le_bytes());
        buf[10..12].copy_from_slice(&self.fileid.to_le_bytes());
        buf[12..16].copy_from_slice(&self.opened.to_le_bytes());
        buf
    }

    /// Parses and validates a header read from disk.
    ///
    /// # Errors
    ///
    /// - [`StorageError::InvalidMagic`] if the magic does not match `expected_magic`
    /// - [`StorageError::UnsupportedVersion`] if the version is unknown
    pub fn from_bytes(
        buf: &[u8; HEADER_SIZE],
        expected_magic: [u8; 4],
    ) -> Result<Self, StorageError> {
        let magic: [u8; 4] = buf[0..4].try_into().expect("slice is exactly 4 bytes");
        if magic != expected_magic {
            return Err(StorageError::InvalidMagic {
                expected: expected_magic,
                actual: magic,
            });
        }

        let version = u16::from_le_bytes(buf[4..6].try_into().expect("slice is exactly 2 bytes"));
        if version != FORMAT_VERSION {
            return Err(StorageError::UnsupportedVersion(version));
        }

        Ok(Self {
            magic,
            version,
            created: u32::from_le_bytes(buf[6..10].try_into().expect("slice is exactly 4 bytes")),
            fileid: u16::from_le_bytes(buf[10..12].try_into().expect("slice is exactly 2 bytes")),
            opened: u32::from_le_bytes(buf[12..16].try_into().expect("slice is exactly 4 bytes")),
        })
    }

    /// Stamps the header with the current time as its reopen timestamp.
    pub fn touch(&mut self) {
        self.opened = unix_now();
    }

    /// Rewrites the header in place at the start of the file.
    ///
    /// The file must be opened read/write without append mode; `O_APPEND`
    /// would redirect the write to the end of the file.
    pub fn write_at_start(&self, file: &mut File) -> io::Result<()> {
        file.seek(SeekFrom::Start(0))?;
        file.write_all(&self.to_bytes())
    }
}

/// Opens a log file read/write, creating it if missing, mode 0600.
///
/// This is the handle used during load so the header can be rewritten in
/// place; the active file is reopened with [`open_append`] afterwards.
pub(crate) fn open_rw(path: &Path) -> io::Result<File> {
    let mut opts = OpenOptions::new();
    opts.read(true).write(true).create(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        opts.mode(0o600);
    }
    opts.open(path)
}

/// Opens a log file in append mode, creating it if missing, mode 0600.
pub(crate) fn open_append(path: &Path) -> io::Result<File> {
    let mut opts = OpenOptions::new();
    opts.read(true).append(true).create(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        opts.mode(0o600);
    }
    opts.open(path)
}

/// Reads up to [`HEADER_SIZE`] bytes from the current position, retrying
/// short reads. Returns how many bytes were actually available.
pub(crate) fn read_header_prefix(
    file: &mut File,
    buf: &mut [u8; HEADER_SIZE],
) -> io::Result<usize> {
    let mut total = 0;
    while total < buf.len() {
        let n = file.read(&mut buf[total..])?;
        if n == 0 {
            break;
        }
        total += n;
    }
    Ok(total)
}

/// Formats an epoch-second timestamp for log output.
pub(crate) fn format_epoch(epoch: u32) -> String {
    chrono::DateTime::from_timestamp(i64::from(epoch), 0)
        .map_or_else(|| epoch.to_string(), |t| t.format("%F %T").to_string())
}
