use std::path::PathBuf;

/// Failures from the forwarding, capture, and supervision paths.
///
/// `spec.md` §7 draws a hard line between the forwarding hot path (which
/// never raises — I/O failures there are the only fatal exception) and
/// everything else (which surfaces to the operator via stderr). Variants
/// here are grouped accordingly; see each variant's doc comment.
#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    /// Spawning the target command failed outright. Fatal at startup.
    #[error("failed to spawn target command {command:?}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// An I/O error on the forwarding path itself (not capture). Fatal:
    /// the proxy exits, preserving whatever was already captured.
    #[error("I/O error while forwarding: {0}")]
    Forwarding(#[source] std::io::Error),

    /// The child's stdio handles were not piped as expected.
    #[error("child {0} unavailable")]
    ChildStdioUnavailable(&'static str),

    /// Waiting on the child process failed.
    #[error("failed to wait on child process: {0}")]
    Wait(#[source] std::io::Error),

    /// The message store could not be opened or locked. Capture-path
    /// failures after startup are not fatal (see `CaptureFailure`); this
    /// variant is for the one-time open at supervisor startup.
    #[error("failed to open message store {path}: {source}")]
    StoreOpen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to acquire lock on {path} after {retries} attempts")]
    LockTimeout { path: PathBuf, retries: u32 },

    #[error(transparent)]
    Model(#[from] mcp_audit_model::ModelError),
}

/// A best-effort capture failure: disk full, lock error, or similar.
/// `spec.md` §4.4/§7: this must never break forwarding. Call sites log
/// once, increment `captures_dropped`, and keep going — this type exists
/// purely so that "once" logging has something structured to format.
#[derive(Debug, thiserror::Error)]
#[error("capture enqueue failed: {0}")]
pub struct CaptureFailure(#[source] pub std::io::Error);
