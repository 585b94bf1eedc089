//! Index entries: one key-to-location binding per record.
//!
//! # Record Format
//!
//! ```text
//! [idlength:u8][offset:u64 LE][length:u64 LE][id:bytes[idlength]]
//!      1B            8B              8B            variable
//! ```
//!
//! The fixed fields precede the variable-length id, with `idlength` as the
//! first byte, so a loader can peek one octet and know the full record
//! size. Records are self-delimiting; there is no terminator or checksum.
//!
//! The in-memory entry additionally carries the id of the data file the
//! record points into. On disk that id is implicit in the file name: an
//! entry in index file `N` addresses data file `N`.

use bytes::Bytes;
use rkv_types::{FileId, MAX_KEY_LENGTH};

use crate::StorageError;

/// Fixed prefix size: idlength(1) + offset(8) + length(8) = 17 bytes.
pub const ENTRY_FIXED_SIZE: usize = 17;

/// One key-to-location binding in the index.
///
/// `offset` and `length` address raw value bytes inside data file
/// `data_file`. Entries are mutated in place on overwrite (the location
/// fields are replaced); they are never deleted; tombstones do not exist
/// at this layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    key: Bytes,
    data_file: FileId,
    offset: u64,
    length: u64,
}

impl IndexEntry {
    /// Creates an entry, validating the key length.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::InvalidKeyLength`] unless the key is
    /// 1..=255 bytes.
    pub fn new(
        key: Bytes,
        data_file: FileId,
        offset: u64,
        length: u64,
    ) -> Result<Self, StorageError> {
        if key.is_empty() || key.len() > MAX_KEY_LENGTH {
            return Err(StorageError::InvalidKeyLength(key.len()));
        }
        Ok(Self {
            key,
            data_file,
            offset,
            length,
        })
    }

    pub fn key(&self) -> &Bytes {
        &self.key
    }

    /// The data file this entry points into.
    pub fn data_file(&self) -> FileId {
        self.data_file
    }

    /// Byte offset of the value within the data file.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Value length in bytes. Zero is a legitimate empty value, not a
    /// tombstone.
    pub fn length(&self) -> u64 {
        self.length
    }

    /// Returns true if this entry binds the given key.
    pub fn matches(&self, key: &[u8]) -> bool {
        self.key.len() == key.len() && self.key.as_ref() == key
    }

    /// Points the entry at a new location, keeping the key.
    pub(crate) fn relocate(&mut self, data_file: FileId, offset: u64, length: u64) {
        self.data_file = data_file;
        self.offset = offset;
        self.length = length;
    }

    /// Serializes the entry to its on-disk form.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(ENTRY_FIXED_SIZE + self.key.len());
        buf.push(self.key.len() as u8);
        buf.extend_from_slice(&self.offset.to_le_bytes());
        buf.extend_from_slice(&self.length.to_le_bytes());
        buf.extend_from_slice(&self.key);
        buf
    }

    /// Deserializes an entry from bytes.
    ///
    /// Returns the parsed entry and the number of bytes consumed. The key
    /// is sliced zero-copy out of `data`. `data_file` is supplied by the
    /// caller from the file the record was read from.
    ///
    /// # Errors
    ///
    /// - [`StorageError::UnexpectedEof`] if the record is truncated
    /// - [`StorageError::InvalidKeyLength`] if `idlength` is zero
    pub fn from_bytes(data: &Bytes, data_file: FileId) -> Result<(Self, usize), StorageError> {
        if data.is_empty() {
            return Err(StorageError::UnexpectedEof);
        }

        let idlength = data[0] as usize;
        if idlength == 0 {
            return Err(StorageError::InvalidKeyLength(0));
        }

        let total = ENTRY_FIXED_SIZE + idlength;
        if data.len() < total {
            return Err(StorageError::UnexpectedEof);
        }

        let offset = u64::from_le_bytes(
            data[1..9].try_into().expect("slice is exactly 8 bytes"),
        );
        let length = u64::from_le_bytes(
            data[9..17].try_into().expect("slice is exactly 8 bytes"),
        );
        let key = data.slice(ENTRY_FIXED_SIZE..total);

        Ok((
            Self {
                key,
                data_file,
                offset,
                length,
            },
            total,
        ))
    }
}
