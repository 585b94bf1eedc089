//! The store value and per-connection sessions.
//!
//! [`Rkv`] is an explicit value the embedding dispatcher owns and passes
//! through; there is no process-wide singleton. [`Session`] carries one
//! connection's selected namespace and its access grant; the dispatcher
//! keeps one per connection and hands both to each command.

use std::path::PathBuf;

use bytes::Bytes;
use rkv_config::RkvConfig;
use rkv_namespace::{Access, NamespaceInfo, Registry};
use rkv_types::{DEFAULT_NAMESPACE, FileId};

use crate::error::Result;

/// One connection's view of the store.
///
/// A session starts on the `default` namespace with write access.
/// [`Rkv::select`] replaces the selection atomically: on failure the
/// previous selection is left intact.
#[derive(Debug, Clone)]
pub struct Session {
    namespace: String,
    access: Access,
}

impl Session {
    /// Name of the currently selected namespace.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Whether the session may write to its selected namespace.
    pub fn is_writable(&self) -> bool {
        self.access.is_writable()
    }
}

/// The store: a namespace registry plus the write-durability knob.
///
/// All mutations take `&mut self`; the core is single-threaded
/// cooperative. A multi-threaded embedder wraps the store in one owning
/// task or one mutex spanning each whole request.
#[derive(Debug)]
pub struct Rkv {
    registry: Registry,
    sync_writes: bool,
}

impl Rkv {
    /// Opens the store as described by the configuration.
    pub fn open(config: &RkvConfig) -> Result<Self> {
        let registry = Registry::open(&config.storage.data_dir)?;
        Ok(Self {
            registry,
            sync_writes: config.storage.sync_writes,
        })
    }

    /// Opens the store under a directory with default settings.
    pub fn open_dir(path: impl Into<PathBuf>) -> Result<Self> {
        let registry = Registry::open(path.into())?;
        Ok(Self {
            registry,
            sync_writes: false,
        })
    }

    /// Creates the initial session: `default`, writable.
    pub fn session(&self) -> Session {
        Session {
            namespace: DEFAULT_NAMESPACE.to_owned(),
            access: Access::ReadWrite,
        }
    }

    /// `SELECT name [password]`: switches the session's namespace.
    ///
    /// The transition is atomic: on any failure the session keeps its
    /// previous selection.
    pub fn select(
        &self,
        session: &mut Session,
        name: &str,
        password: Option<&str>,
    ) -> Result<()> {
        let access = self.registry.select(name, password)?;
        session.namespace = name.to_owned();
        session.access = access;
        Ok(())
    }

    /// `SET key value`: writes through the session's grant.
    pub fn set(&mut self, session: &Session, key: &[u8], value: &[u8]) -> Result<()> {
        self.registry
            .set(&session.namespace, session.access, key, value)?;
        if self.sync_writes {
            self.registry.sync(&session.namespace)?;
        }
        Ok(())
    }

    /// `GET key`: reads from the session's namespace.
    pub fn get(&self, session: &Session, key: &[u8]) -> Result<Bytes> {
        Ok(self.registry.get(&session.namespace, key)?)
    }

    /// `NSNEW name`: creates a namespace (reloading it if it already
    /// exists on disk).
    pub fn nsnew(&mut self, name: &str) -> Result<()> {
        Ok(self.registry.create(name)?)
    }

    /// `NSSET name field value`: mutates a policy field. Fails on
    /// `default`.
    pub fn nsset(&mut self, name: &str, field: &str, value: &str) -> Result<()> {
        Ok(self.registry.nsset(name, field, value)?)
    }

    /// Sorted names of all namespaces.
    pub fn namespaces(&self) -> Vec<&str> {
        self.registry.names()
    }

    /// Summary of one namespace for the admin surface.
    pub fn info(&self, name: &str) -> Result<NamespaceInfo> {
        Ok(self.registry.info(name)?)
    }

    /// Rotates the selected namespace to its next (data, index) file
    /// pair.
    pub fn jump_next(&mut self, session: &Session) -> Result<FileId> {
        Ok(self.registry.jump_next(&session.namespace)?)
    }

    /// Flushes every namespace's active index file. Invoked by the
    /// dispatcher on signals or explicit admin command.
    pub fn emergency(&self) -> Result<()> {
        tracing::warn!("emergency sync requested");
        Ok(self.registry.sync_all()?)
    }

    /// Orderly shutdown: flush everything, then release all files.
    pub fn close(self) -> Result<()> {
        self.registry.sync_all()?;
        Ok(())
    }
}
