//! Configuration management for rkv
//!
//! Settings merge from layered sources, weakest first: built-in
//! defaults, the user config file, the project's `rkv.toml`, a
//! gitignored `rkv.local.toml`, `RKV_*` environment variables, and
//! finally explicit overrides supplied by the embedding front-end. See
//! [`ConfigLoader`] for the mechanics.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

mod error;
mod loader;

pub use error::ConfigError;
pub use loader::ConfigLoader;

/// Main rkv configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RkvConfig {
    pub storage: StorageConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Root directory holding one subdirectory per namespace.
    pub data_dir: PathBuf,
    /// Fsync the active index file after every write. Off by default:
    /// the store offers best-effort durability with an explicit
    /// emergency-sync hook.
    pub sync_writes: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("rkv-data"),
            sync_writes: false,
        }
    }
}

/// Settings consumed by the network front-end sitting on top of the core.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_address: String,
    pub max_connections: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:9900".to_string(),
            max_connections: 1024,
        }
    }
}

impl RkvConfig {
    /// Load configuration from default locations
    pub fn load() -> Result<Self> {
        ConfigLoader::new()
            .load()
            .context("loading rkv configuration")
    }

    /// Load configuration from specific project directory
    pub fn load_from_dir(project_dir: impl AsRef<Path>) -> Result<Self> {
        ConfigLoader::new()
            .with_project_dir(project_dir)
            .load()
            .context("loading rkv configuration")
    }

    /// Resolve relative paths to absolute
    pub fn resolve_paths(&mut self, base_dir: impl AsRef<Path>) {
        let base = base_dir.as_ref();

        if self.storage.data_dir.is_relative() {
            self.storage.data_dir = base.join(&self.storage.data_dir);
        }
    }

    /// Sanity-checks the merged configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.storage.data_dir.as_os_str().is_empty() {
            return Err(ConfigError::Invalid(
                "storage.data_dir must not be empty".to_owned(),
            ));
        }
        if self.server.max_connections == 0 {
            return Err(ConfigError::Invalid(
                "server.max_connections must be at least 1".to_owned(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_usable_as_is() {
        let config = RkvConfig::default();
        assert_eq!(config.storage.data_dir, PathBuf::from("rkv-data"));
        assert!(!config.storage.sync_writes);
        assert_eq!(config.server.bind_address, "127.0.0.1:9900");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn resolve_paths_leaves_absolute_dirs_alone() {
        let mut config = RkvConfig::default();
        config.storage.data_dir = PathBuf::from("/var/lib/rkv");
        config.resolve_paths("/srv/rkv");

        assert_eq!(config.storage.data_dir, PathBuf::from("/var/lib/rkv"));
    }

    #[test]
    fn resolve_paths_anchors_relative_dirs() {
        let mut config = RkvConfig::default();
        config.resolve_paths("/srv/rkv");

        assert_eq!(config.storage.data_dir, PathBuf::from("/srv/rkv/rkv-data"));
    }

    #[test]
    fn validate_rejects_an_empty_data_dir() {
        let mut config = RkvConfig::default();
        config.storage.data_dir = PathBuf::new();

        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }
}
