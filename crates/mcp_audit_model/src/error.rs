use std::path::PathBuf;

/// Errors shared by every crate that builds or persists the record types
/// in this crate. Other crates define their own error enums for
/// component-specific failures and wrap `ModelError` where they touch
/// records, timestamps, or configuration.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("failed to serialize record to JSON: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("failed to parse record from JSON: {0}")]
    Deserialize(#[source] serde_json::Error),

    #[error("scorer weights must sum to 1.0 (got {sum})")]
    InvalidWeights { sum: f64 },

    #[error("failed to read config file {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: Box<toml::de::Error>,
    },
}
