//! # rkv-namespace: Isolated key spaces over the rkv storage core
//!
//! A [`Registry`] multiplexes independent namespaces under one root
//! directory. Each namespace owns its own (data log, index log, in-memory
//! index) triple plus a policy record: public/private, an optional access
//! password, and a byte quota.
//!
//! ```text
//! {root}/
//! ├── default/            <- always exists; policy is immutable
//! │   ├── namespace.json
//! │   ├── rkv-index-0000
//! │   └── rkv-data-0000
//! └── projects/
//!     ├── namespace.json
//!     ├── rkv-index-0000
//!     └── rkv-data-0000
//! ```
//!
//! # Access model
//!
//! [`Registry::select`] resolves a namespace name and an optional password
//! to an [`Access`] grant:
//!
//! - correct password (full-length, constant-time comparison) → read/write
//! - no password presented, namespace public and passwordless → read/write
//! - no password presented, namespace public but password-protected →
//!   read-only view
//! - everything else → access denied
//!
//! Quota is enforced before any byte is written: a `set` that would push
//! accumulated usage over `maxsize` fails without touching the logs.

use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

use bytes::Bytes;
use rkv_storage::{Storage, StorageError};
use rkv_types::{DEFAULT_NAMESPACE, FileId};
use subtle::ConstantTimeEq;

mod policy;

#[cfg(test)]
mod tests;

pub use policy::Policy;

/// Errors surfaced by the namespace layer.
#[derive(thiserror::Error, Debug)]
pub enum NamespaceError {
    #[error("namespace not found: {0}")]
    NotFound(String),

    #[error("key not found")]
    KeyNotFound,

    #[error("access denied")]
    AuthDenied,

    #[error("namespace is read-only for this session")]
    ReadOnly,

    #[error(
        "quota exceeded: write of {requested} bytes does not fit ({used} of {maxsize} bytes used)"
    )]
    QuotaExceeded {
        used: u64,
        requested: u64,
        maxsize: u64,
    },

    #[error("namespace {0} is protected and cannot be reconfigured")]
    ProtectedNamespace(String),

    #[error("invalid namespace name: {0:?}")]
    InvalidName(String),

    #[error("unknown namespace setting: {0}")]
    InvalidField(String),

    #[error("invalid value {value:?} for namespace setting {field}")]
    InvalidValue { field: String, value: String },

    #[error("descriptor error")]
    Descriptor(#[from] serde_json::Error),

    #[error("storage error")]
    Storage(#[from] StorageError),

    #[error("filesystem error")]
    Io(#[from] std::io::Error),
}

/// What a session may do with its selected namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    ReadWrite,
    /// The public read-only view of a password-protected namespace.
    ReadOnly,
}

impl Access {
    pub fn is_writable(self) -> bool {
        matches!(self, Access::ReadWrite)
    }
}

/// A point-in-time summary of one namespace, for the admin surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespaceInfo {
    pub name: String,
    pub public: bool,
    pub password_protected: bool,
    pub maxsize: u64,
    pub used_bytes: u64,
    pub entries: u64,
    pub file_id: FileId,
}

/// One namespace: its policy plus its storage triple.
#[derive(Debug)]
struct Namespace {
    dir: PathBuf,
    policy: Policy,
    storage: Storage,
}

/// The collection of namespaces under one root directory.
///
/// The registry is single-threaded cooperative, like the storage core:
/// every mutation takes `&mut self`. The namespace `"default"` always
/// exists and rejects policy mutation.
#[derive(Debug)]
pub struct Registry {
    root: PathBuf,
    namespaces: HashMap<String, Namespace>,
}

impl Registry {
    /// Opens the registry, loading every namespace found under `root` and
    /// creating `"default"` if this is a fresh install.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, NamespaceError> {
        let root = root.into();
        fs::create_dir_all(&root)?;

        let mut registry = Self {
            root,
            namespaces: HashMap::new(),
        };

        let mut found: Vec<String> = Vec::new();
        for dirent in fs::read_dir(&registry.root)? {
            let dirent = dirent?;
            if !dirent.file_type()?.is_dir() {
                continue;
            }
            if let Some(name) = dirent.file_name().to_str() {
                found.push(name.to_owned());
            }
        }
        found.sort();

        for name in &found {
            registry.load(name)?;
        }

        if !registry.namespaces.contains_key(DEFAULT_NAMESPACE) {
            registry.create(DEFAULT_NAMESPACE)?;
        }

        tracing::info!(
            root = %registry.root.display(),
            namespaces = registry.namespaces.len(),
            "namespace registry loaded"
        );
        Ok(registry)
    }

    /// Loads one namespace from disk into the registry.
    fn load(&mut self, name: &str) -> Result<(), NamespaceError> {
        let dir = self.root.join(name);
        let policy = Policy::load_or_default(&dir)?;
        let storage = Storage::open(&dir)?;

        tracing::info!(
            namespace = name,
            entries = storage.len(),
            used_bytes = storage.used_bytes(),
            "namespace loaded"
        );

        self.namespaces.insert(
            name.to_owned(),
            Namespace {
                dir,
                policy,
                storage,
            },
        );
        Ok(())
    }

    /// Creates a namespace, or reloads it if it already exists on disk.
    ///
    /// A fresh namespace starts public, passwordless, and unlimited.
    pub fn create(&mut self, name: &str) -> Result<(), NamespaceError> {
        validate_name(name)?;

        if self.namespaces.contains_key(name) {
            return Ok(());
        }

        let dir = self.root.join(name);
        fs::create_dir_all(&dir)?;

        // Re-creating an existing on-disk namespace must keep its policy.
        let policy = Policy::load_or_default(&dir)?;
        policy.save(&dir)?;

        let storage = Storage::open(&dir)?;
        tracing::info!(namespace = name, "namespace created");

        self.namespaces.insert(
            name.to_owned(),
            Namespace {
                dir,
                policy,
                storage,
            },
        );
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.namespaces.contains_key(name)
    }

    /// Resolves a namespace selection to an access grant.
    ///
    /// Password comparison is full-length and constant-time: a correct
    /// prefix, or a longer string with a correct prefix, never matches.
    /// Presenting a password to a passwordless namespace is denied rather
    /// than ignored.
    pub fn select(&self, name: &str, password: Option<&str>) -> Result<Access, NamespaceError> {
        let namespace = self.resolve(name)?;

        match (password, namespace.policy.password.as_deref()) {
            (Some(given), Some(stored)) => {
                if password_matches(stored, given) {
                    Ok(Access::ReadWrite)
                } else {
                    Err(NamespaceError::AuthDenied)
                }
            }
            (Some(_), None) => Err(NamespaceError::AuthDenied),
            (None, Some(_)) => {
                if namespace.policy.public {
                    Ok(Access::ReadOnly)
                } else {
                    Err(NamespaceError::AuthDenied)
                }
            }
            (None, None) => {
                if namespace.policy.public {
                    Ok(Access::ReadWrite)
                } else {
                    Err(NamespaceError::AuthDenied)
                }
            }
        }
    }

    /// Mutates one policy field and re-persists the descriptor.
    ///
    /// Fields: `public` ("0" or "1"), `password` (empty removes),
    /// `maxsize` (decimal byte count, 0 = unlimited). The `default`
    /// namespace rejects every mutation.
    pub fn nsset(&mut self, name: &str, field: &str, value: &str) -> Result<(), NamespaceError> {
        if name == DEFAULT_NAMESPACE {
            return Err(NamespaceError::ProtectedNamespace(name.to_owned()));
        }

        let namespace = self
            .namespaces
            .get_mut(name)
            .ok_or_else(|| NamespaceError::NotFound(name.to_owned()))?;

        match field {
            "public" => {
                namespace.policy.public = match value {
                    "0" => false,
                    "1" => true,
                    _ => {
                        return Err(NamespaceError::InvalidValue {
                            field: field.to_owned(),
                            value: value.to_owned(),
                        });
                    }
                };
            }
            "password" => {
                namespace.policy.password = if value.is_empty() {
                    None
                } else {
                    Some(value.to_owned())
                };
            }
            "maxsize" => {
                namespace.policy.maxsize =
                    value.parse().map_err(|_| NamespaceError::InvalidValue {
                        field: field.to_owned(),
                        value: value.to_owned(),
                    })?;
            }
            _ => return Err(NamespaceError::InvalidField(field.to_owned())),
        }

        namespace.policy.save(&namespace.dir)?;
        tracing::info!(namespace = name, field, "namespace policy updated");
        Ok(())
    }

    /// Writes a value under a key, enforcing the grant and the quota.
    ///
    /// The quota check runs before any byte lands in the logs: on
    /// rejection, persistent state is untouched. An equal-length overwrite
    /// is always permitted; a shrinking overwrite frees quota.
    pub fn set(
        &mut self,
        name: &str,
        access: Access,
        key: &[u8],
        value: &[u8],
    ) -> Result<(), NamespaceError> {
        if !access.is_writable() {
            return Err(NamespaceError::ReadOnly);
        }

        let namespace = self
            .namespaces
            .get_mut(name)
            .ok_or_else(|| NamespaceError::NotFound(name.to_owned()))?;

        let new_length = value.len() as u64;
        let old_length = namespace.storage.lookup(key).map_or(0, |e| e.length());

        if namespace.policy.maxsize > 0 {
            let used = namespace.storage.used_bytes();
            let projected = used - old_length + new_length;
            if projected > namespace.policy.maxsize {
                return Err(NamespaceError::QuotaExceeded {
                    used,
                    requested: new_length,
                    maxsize: namespace.policy.maxsize,
                });
            }
        }

        namespace.storage.put(key, value)?;
        Ok(())
    }

    /// Reads the latest value for a key.
    pub fn get(&self, name: &str, key: &[u8]) -> Result<Bytes, NamespaceError> {
        let namespace = self.resolve(name)?;
        namespace
            .storage
            .get(key)?
            .ok_or(NamespaceError::KeyNotFound)
    }

    /// Rotates the namespace's (data, index) file pair.
    pub fn jump_next(&mut self, name: &str) -> Result<FileId, NamespaceError> {
        let namespace = self
            .namespaces
            .get_mut(name)
            .ok_or_else(|| NamespaceError::NotFound(name.to_owned()))?;
        Ok(namespace.storage.jump_next()?)
    }

    /// Flushes one namespace's active index file.
    pub fn sync(&self, name: &str) -> Result<(), NamespaceError> {
        Ok(self.resolve(name)?.storage.sync()?)
    }

    /// Flushes every namespace's active index file (the emergency hook).
    ///
    /// All namespaces are attempted; the first error is reported after the
    /// sweep completes.
    pub fn sync_all(&self) -> Result<(), NamespaceError> {
        let mut first_error = None;

        for (name, namespace) in &self.namespaces {
            if let Err(err) = namespace.storage.sync() {
                tracing::error!(namespace = name, error = %err, "emergency sync failed");
                if first_error.is_none() {
                    first_error = Some(err);
                }
            }
        }

        match first_error {
            Some(err) => Err(err.into()),
            None => Ok(()),
        }
    }

    /// Sorted namespace names.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.namespaces.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Summarizes one namespace for the admin surface.
    pub fn info(&self, name: &str) -> Result<NamespaceInfo, NamespaceError> {
        let namespace = self.resolve(name)?;
        Ok(NamespaceInfo {
            name: name.to_owned(),
            public: namespace.policy.public,
            password_protected: namespace.policy.password.is_some(),
            maxsize: namespace.policy.maxsize,
            used_bytes: namespace.storage.used_bytes(),
            entries: namespace.storage.len(),
            file_id: namespace.storage.file_id(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, name: &str) -> Result<&Namespace, NamespaceError> {
        self.namespaces
            .get(name)
            .ok_or_else(|| NamespaceError::NotFound(name.to_owned()))
    }
}

/// Namespace names become directory names; keep them to a portable
/// alphabet.
fn validate_name(name: &str) -> Result<(), NamespaceError> {
    let valid = !name.is_empty()
        && name.len() <= 128
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');

    if valid {
        Ok(())
    } else {
        Err(NamespaceError::InvalidName(name.to_owned()))
    }
}

/// Full-length constant-time password equality.
///
/// `subtle` rejects length mismatches up front, so a correct prefix (or a
/// longer string extending the password) never matches.
fn password_matches(stored: &str, provided: &str) -> bool {
    stored.as_bytes().ct_eq(provided.as_bytes()).into()
}
