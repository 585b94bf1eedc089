//! The in-memory bucket index, rebuilt from the index log at startup.
//!
//! Keys hash to one of `2^24` logical branches; each branch is a growable
//! vector of entries scanned linearly. Branches are materialized lazily;
//! an untouched branch consumes no storage.
//!
//! # Invariants
//!
//! - At most one entry per key; overwrites mutate the existing entry in
//!   place.
//! - `data_bytes` equals the sum of `length` over all live entries and
//!   never goes negative.
//! - `next_entry` increments on every insertion and is monotonic for the
//!   lifetime of the index (it does not survive a restart).

use std::collections::HashMap;

use rkv_types::MAX_KEY_LENGTH;

use crate::entry::{ENTRY_FIXED_SIZE, IndexEntry};

/// Initial capacity of a freshly materialized branch.
const BRANCH_CHUNK: usize = 64;

/// Selects the branch for a key: the first up to three key bytes packed
/// into 24 bits.
///
/// This hash is deliberately cheap and low-quality. It is deterministic,
/// which the recovery tests rely on, and branches are scanned linearly so
/// clustering only degrades the probe to a longer scan. It is adversarially
/// weak (uniform keys such as incrementing counters concentrate in few
/// branches), an accepted trade-off for this workload.
pub(crate) fn branch_key(key: &[u8]) -> u32 {
    let mut hash = u32::from(key[0]) << 16;
    if key.len() > 1 {
        hash |= u32::from(key[1]) << 8;
    }
    if key.len() > 2 {
        hash |= u32::from(key[2]);
    }
    hash
}

/// Aggregate statistics over the live entries, reported after recovery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexStats {
    /// Number of live entries.
    pub entries: u64,
    /// Sum of value lengths over all live entries (the namespace's used
    /// bytes, for quota enforcement).
    pub data_bytes: u64,
    /// In-memory overhead of the entries themselves.
    pub index_bytes: u64,
}

/// Maps keys to their latest `(data_file, offset, length)` with O(1)
/// expected lookup.
///
/// Entries are stored inline in the branch vectors; this is safe because
/// a borrow of an entry cannot be held across an insertion.
#[derive(Debug, Default)]
pub struct MemoryIndex {
    branches: HashMap<u32, Vec<IndexEntry>>,
    entries: u64,
    data_bytes: u64,
    index_bytes: u64,
    next_entry: u64,
}

impl MemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up the latest entry for a key.
    ///
    /// The match is the first entry in the branch whose length and byte
    /// content equal the query.
    pub fn get(&self, key: &[u8]) -> Option<&IndexEntry> {
        // Out-of-range keys can never have been inserted.
        if key.is_empty() || key.len() > MAX_KEY_LENGTH {
            return None;
        }

        self.branches
            .get(&branch_key(key))?
            .iter()
            .find(|entry| entry.matches(key))
    }

    /// Inserts or overwrites the binding for `entry`'s key.
    ///
    /// If the key exists, the location fields are replaced in place and
    /// the previous value length is returned so the caller can compute
    /// its quota delta. Otherwise the entry is appended to its branch and
    /// `None` is returned.
    pub fn upsert(&mut self, entry: IndexEntry) -> Option<u64> {
        let branch = self
            .branches
            .entry(branch_key(entry.key()))
            .or_insert_with(|| Vec::with_capacity(BRANCH_CHUNK));

        if let Some(existing) = branch.iter_mut().find(|e| e.matches(entry.key())) {
            let previous = existing.length();
            existing.relocate(entry.data_file(), entry.offset(), entry.length());
            self.data_bytes = self.data_bytes - previous + entry.length();
            return Some(previous);
        }

        self.entries += 1;
        self.data_bytes += entry.length();
        self.index_bytes += (ENTRY_FIXED_SIZE + entry.key().len()) as u64;
        self.next_entry += 1;
        branch.push(entry);
        None
    }

    /// Number of live entries.
    pub fn len(&self) -> u64 {
        self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries == 0
    }

    /// Sum of value lengths over all live entries.
    pub fn data_bytes(&self) -> u64 {
        self.data_bytes
    }

    /// Monotonic insertion counter. Not persisted across restarts.
    pub fn next_entry(&self) -> u64 {
        self.next_entry
    }

    pub fn stats(&self) -> IndexStats {
        IndexStats {
            entries: self.entries,
            data_bytes: self.data_bytes,
            index_bytes: self.index_bytes,
        }
    }
}
