//! Layered configuration loading.
//!
//! Settings come from up to five layers. The weakest layer is the
//! built-in defaults; each following layer overrides the ones before it:
//!
//! 1. `config.toml` in the user's config directory (for rkv that is
//!    `~/.config/rkv/` on Linux)
//! 2. `rkv.toml` in the project directory
//! 3. `rkv.local.toml` next to it (intended to stay out of version
//!    control)
//! 4. `RKV_*` environment variables
//! 5. explicit key overrides, the hook for whatever front-end parses the
//!    command line
//!
//! A missing file simply contributes nothing. An unreadable or malformed
//! file aborts the load, and the error names the offending path: every
//! layer is read and TOML-checked here before it is handed to the merge
//! engine, which would otherwise swallow the file name.

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use directories::ProjectDirs;

use crate::{ConfigError, RkvConfig};

/// Assembles an [`RkvConfig`] from the layered sources.
pub struct ConfigLoader {
    project_dir: PathBuf,
    env_prefix: String,
    overrides: Vec<(String, String)>,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self {
            project_dir: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            env_prefix: "RKV".to_owned(),
            overrides: Vec::new(),
        }
    }

    /// Directory searched for `rkv.toml` and `rkv.local.toml`, and the
    /// base against which relative paths in the result are resolved.
    pub fn with_project_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.project_dir = dir.as_ref().to_path_buf();
        self
    }

    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    /// Pins one key (dotted form, e.g. `server.bind_address`) to a value
    /// that beats every file and environment layer.
    pub fn with_override(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.overrides.push((key.into(), value.into()));
        self
    }

    /// Reads every layer, merges weakest-first, resolves paths, and
    /// validates the result.
    pub fn load(self) -> Result<RkvConfig, ConfigError> {
        let mut builder =
            config::Config::builder().add_source(config::Config::try_from(&RkvConfig::default())?);

        for path in self.layer_paths() {
            let Some(text) = read_layer(&path)? else {
                continue;
            };
            // TOML-check the layer up front so the error can carry the
            // file name.
            if let Err(source) = toml::from_str::<toml::Table>(&text) {
                return Err(ConfigError::Parse { path, source });
            }
            builder =
                builder.add_source(config::File::from_str(&text, config::FileFormat::Toml));
        }

        builder = builder.add_source(
            config::Environment::with_prefix(&self.env_prefix)
                .separator("_")
                .try_parsing(true),
        );

        for (key, value) in self.overrides {
            builder = builder.set_override(key, value)?;
        }

        let mut merged: RkvConfig = builder.build()?.try_deserialize()?;
        merged.resolve_paths(&self.project_dir);
        merged.validate()?;
        Ok(merged)
    }

    /// Candidate layer files, weakest first.
    fn layer_paths(&self) -> Vec<PathBuf> {
        let mut paths = Vec::with_capacity(3);
        if let Some(dirs) = ProjectDirs::from("io", "rkv", "rkv") {
            paths.push(dirs.config_dir().join("config.toml"));
        }
        paths.push(self.project_dir.join("rkv.toml"));
        paths.push(self.project_dir.join("rkv.local.toml"));
        paths
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Reads one layer file, treating absence as "no layer".
fn read_layer(path: &Path) -> Result<Option<String>, ConfigError> {
    match fs::read_to_string(path) {
        Ok(text) => Ok(Some(text)),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(source) => Err(ConfigError::Read {
            path: path.to_path_buf(),
            source,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn loader_for(dir: &TempDir) -> ConfigLoader {
        ConfigLoader::new().with_project_dir(dir.path())
    }

    #[test]
    fn empty_project_dir_yields_defaults() {
        let dir = TempDir::new().unwrap();
        let config = loader_for(&dir).load().unwrap();

        assert!(!config.storage.sync_writes);
        assert_eq!(config.server.bind_address, "127.0.0.1:9900");
        assert_eq!(config.server.max_connections, 1024);
    }

    #[test]
    fn project_file_overrides_defaults() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("rkv.toml"),
            "[storage]\nsync_writes = true\n\n[server]\nmax_connections = 32\n",
        )
        .unwrap();

        let config = loader_for(&dir).load().unwrap();
        assert!(config.storage.sync_writes);
        assert_eq!(config.server.max_connections, 32);
        // Untouched keys keep their defaults.
        assert_eq!(config.server.bind_address, "127.0.0.1:9900");
    }

    #[test]
    fn local_file_wins_over_project_file() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("rkv.toml"),
            "[server]\nbind_address = \"127.0.0.1:9900\"\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("rkv.local.toml"),
            "[server]\nbind_address = \"127.0.0.1:19900\"\n",
        )
        .unwrap();

        let config = loader_for(&dir).load().unwrap();
        assert_eq!(config.server.bind_address, "127.0.0.1:19900");
    }

    #[test]
    fn explicit_override_beats_every_file() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("rkv.local.toml"),
            "[server]\nbind_address = \"127.0.0.1:19900\"\n",
        )
        .unwrap();

        let config = loader_for(&dir)
            .with_override("server.bind_address", "0.0.0.0:7000")
            .load()
            .unwrap();
        assert_eq!(config.server.bind_address, "0.0.0.0:7000");
    }

    #[test]
    fn malformed_layer_is_reported_with_its_path() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("rkv.toml"), "[storage\nbroken").unwrap();

        let result = loader_for(&dir).load();
        match result {
            Err(ConfigError::Parse { path, .. }) => {
                assert!(path.ends_with("rkv.toml"));
            }
            other => panic!("expected a parse error, got {other:?}"),
        }
    }

    #[test]
    fn relative_data_dir_resolves_under_the_project_dir() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("rkv.toml"), "[storage]\ndata_dir = \"store\"\n").unwrap();

        let config = loader_for(&dir).load().unwrap();
        assert_eq!(config.storage.data_dir, dir.path().join("store"));
    }

    #[test]
    fn zero_max_connections_is_rejected() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("rkv.toml"), "[server]\nmax_connections = 0\n").unwrap();

        let result = loader_for(&dir).load();
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    // Environment layering is exercised end to end rather than here: the
    // process environment is shared across the test harness, so RKV_*
    // variables set by one test would bleed into the others.
}
