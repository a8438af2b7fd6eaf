use std::path::PathBuf;

/// Errors from host discovery and the config rewriter.
#[derive(Debug, thiserror::Error)]
pub enum HostsError {
    #[error("failed to read host config at {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write host config at {path}: {source}")]
    ConfigWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("host config at {path} is not valid JSON: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to serialize rewritten host config: {0}")]
    ConfigSerialize(#[source] serde_json::Error),

    #[error("no backup found for {path}; nothing to restore")]
    NoBackupFound { path: PathBuf },

    #[error("unknown host: {0}")]
    UnknownHost(String),

    #[error("could not locate a config file for host {host} (tried {candidates:?})")]
    ConfigNotFound { host: String, candidates: Vec<PathBuf> },
}
