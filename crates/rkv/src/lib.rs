//! # rkv
//!
//! A persistent, append-only key-value store with isolated namespaces.
//!
//! rkv keeps every value in an append-only data log and every key-to-
//! location binding in a parallel append-only index log. The in-memory
//! index is rebuilt from the index log at startup; last write wins.
//! Namespaces multiplex independent key spaces, each with its own file
//! family, optional password, and byte quota, atop one root
//! directory.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │                           Rkv                              │
//! │  ┌──────────┐   ┌───────────────┐   ┌───────────────────┐  │
//! │  │ Session  │ → │   Registry    │ → │     Storage       │  │
//! │  │ (grant)  │   │ (policy/quota)│   │ (data+index logs) │  │
//! │  └──────────┘   └───────────────┘   └───────────────────┘  │
//! └────────────────────────────────────────────────────────────┘
//! ```
//!
//! The line protocol, TCP loop, and command dispatch live outside this
//! workspace; they drive the [`Rkv`] value and one [`Session`] per
//! connection.
//!
//! # Quick Start
//!
//! ```no_run
//! use rkv::Rkv;
//!
//! # fn main() -> rkv::Result<()> {
//! let mut store = Rkv::open_dir("./rkv-data")?;
//! let mut session = store.session();
//!
//! store.set(&session, b"hello", b"world")?;
//! assert_eq!(store.get(&session, b"hello")?.as_ref(), b"world");
//!
//! store.nsnew("projects")?;
//! store.select(&mut session, "projects", None)?;
//! store.set(&session, b"hello", b"isolated")?;
//! # Ok(())
//! # }
//! ```

mod error;
mod store;

pub use error::{Result, RkvError};
pub use store::{Rkv, Session};

// Re-export core types
pub use rkv_types::{DEFAULT_NAMESPACE, FileId, MAX_KEY_LENGTH, MAX_VALUE_LENGTH};

// Re-export storage types
pub use rkv_storage::{IndexEntry, IndexStats, Storage, StorageError};

// Re-export namespace types
pub use rkv_namespace::{Access, NamespaceError, NamespaceInfo, Policy, Registry};

// Re-export configuration
pub use rkv_config::{ConfigLoader, RkvConfig};
