//! Configuration error types

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while assembling the configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A layer file exists but could not be read.
    #[error("cannot read {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A layer file is not valid TOML.
    #[error("malformed TOML in {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// The merged configuration fails a sanity check.
    #[error("configuration rejected: {0}")]
    Invalid(String),

    /// The merge engine rejected a source or the merged tree did not
    /// deserialize.
    #[error(transparent)]
    Merge(#[from] config::ConfigError),
}
