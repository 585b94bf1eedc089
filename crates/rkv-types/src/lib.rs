//! # rkv-types: Core types for rkv
//!
//! Shared types and bounds used across the rkv storage engine:
//! - File sequence identifiers ([`FileId`])
//! - Epoch timestamps ([`unix_now`])
//! - Key, value, and file-sequence bounds

use std::{
    fmt::Display,
    time::{SystemTime, UNIX_EPOCH},
};

use serde::{Deserialize, Serialize};

/// Maximum key length in bytes. The length must fit in one octet.
pub const MAX_KEY_LENGTH: usize = 255;

/// Maximum value length in bytes.
///
/// The on-disk format stores value lengths as `u64`; rkv bounds a single
/// value at `u32::MAX` bytes so a value always fits comfortably within one
/// data file.
pub const MAX_VALUE_LENGTH: u64 = u32::MAX as u64;

/// Maximum number of (data, index) file pairs per namespace.
///
/// The file format itself allows 65536 files ([`FileId`] is a `u16`); the
/// cap bounds the recovery scan. Workloads beyond 10000 files are
/// undefined and treated as a configuration error.
pub const MAX_FILES: u16 = 10_000;

/// Name of the namespace that always exists and whose policy is immutable.
pub const DEFAULT_NAMESPACE: &str = "default";

// ============================================================================
// File sequence identifier
// ============================================================================

/// Sequence number of one file in an append-only log family.
///
/// Data files and index files share the same sequence: index file `N`
/// pairs with data file `N`. The sequence starts at 0 and is contiguous,
/// without gaps.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub struct FileId(u16);

impl FileId {
    /// The first file in a sequence.
    pub const FIRST: FileId = FileId(0);

    pub fn new(id: u16) -> Self {
        Self(id)
    }

    pub fn as_u16(self) -> u16 {
        self.0
    }

    /// Returns the next sequence number.
    ///
    /// # Panics
    ///
    /// Panics if the sequence is exhausted (`u16::MAX`). Callers enforce
    /// [`MAX_FILES`] well before this point.
    pub fn next(self) -> Self {
        Self(self.0.checked_add(1).expect("file sequence exhausted"))
    }

    /// Returns the previous sequence number.
    ///
    /// # Panics
    ///
    /// Panics if called on [`FileId::FIRST`].
    pub fn prev(self) -> Self {
        Self(self.0.checked_sub(1).expect("no file precedes the first"))
    }
}

impl Display for FileId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u16> for FileId {
    fn from(value: u16) -> Self {
        Self(value)
    }
}

impl From<FileId> for u16 {
    fn from(id: FileId) -> Self {
        id.0
    }
}

// ============================================================================
// Timestamps
// ============================================================================

/// Returns the current unix time in seconds, as stored in file headers.
///
/// Headers store epoch seconds as `u32` (sufficient until 2106). A clock
/// before the epoch yields 0 rather than an error; header timestamps are
/// informational only.
pub fn unix_now() -> u32 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as u32)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_id_sequence() {
        let id = FileId::FIRST;
        assert_eq!(id.as_u16(), 0);
        assert_eq!(id.next().as_u16(), 1);
        assert_eq!(id.next().prev(), id);
    }

    #[test]
    #[should_panic(expected = "no file precedes the first")]
    fn file_id_prev_underflow_panics() {
        let _ = FileId::FIRST.prev();
    }

    #[test]
    fn file_id_roundtrips_through_u16() {
        let id = FileId::new(42);
        assert_eq!(FileId::from(u16::from(id)), id);
        assert_eq!(id.to_string(), "42");
    }

    #[test]
    fn unix_now_is_past_2024() {
        // 2024-01-01T00:00:00Z
        assert!(unix_now() > 1_704_067_200);
    }
}
