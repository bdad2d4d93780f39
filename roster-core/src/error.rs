//! Error types for roster-core.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise from profile persistence.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Underlying I/O failure (permission denied, etc.).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization error (save path).
    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// YAML parse error on load, with the file path.
    #[error("failed to parse profile at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// `dirs::home_dir()` returned `None`, so `~/.roster/` cannot be located.
    #[error("cannot determine home directory; set $HOME or equivalent")]
    HomeNotFound,

    /// A profile key passed to `set` is not known.
    #[error("unknown profile key '{key}'; expected one of: {expected}")]
    UnknownKey { key: String, expected: String },

    /// A profile value could not be parsed for its key.
    #[error("invalid value '{value}' for '{key}'")]
    InvalidValue { key: String, value: String },
}
