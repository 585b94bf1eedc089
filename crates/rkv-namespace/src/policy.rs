//! Namespace policy records and their on-disk descriptor.
//!
//! The policy is persisted as `namespace.json` inside the namespace
//! directory and reloaded at startup. Accumulated usage is not part of
//! the descriptor; it is recomputed from the index replay.

use std::{fs, path::Path};

use serde::{Deserialize, Serialize};

use crate::NamespaceError;

/// Descriptor filename inside a namespace directory.
pub(crate) const DESCRIPTOR_FILENAME: &str = "namespace.json";

/// Per-namespace policy record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Policy {
    /// Whether the namespace is selectable without its password. A public
    /// namespace with a password grants a read-only view to sessions that
    /// do not present it.
    pub public: bool,
    /// Optional access password. `None` means no password is required.
    pub password: Option<String>,
    /// Maximum accumulated value bytes. Zero disables the limit.
    pub maxsize: u64,
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            public: true,
            password: None,
            maxsize: 0,
        }
    }
}

impl Policy {
    /// Persists the descriptor to disk.
    pub(crate) fn save(&self, dir: &Path) -> Result<(), NamespaceError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(dir.join(DESCRIPTOR_FILENAME), json)?;
        Ok(())
    }

    /// Loads the descriptor, or returns the default policy when the
    /// directory has none yet.
    pub(crate) fn load_or_default(dir: &Path) -> Result<Self, NamespaceError> {
        let path = dir.join(DESCRIPTOR_FILENAME);
        if !path.exists() {
            return Ok(Self::default());
        }
        let json = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }
}
