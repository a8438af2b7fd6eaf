//! Top-level CLI error: wraps every component crate's error enum and
//! maps it to the exit-code contract in `spec.md` §6/§7.

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Bad arguments, an unknown `--host`, or a malformed `--since`.
    #[error("{0}")]
    InvalidArgs(String),

    #[error(transparent)]
    Hosts(#[from] mcp_audit_hosts::HostsError),

    #[error(transparent)]
    Proxy(#[from] mcp_audit_proxy::ProxyError),

    #[error(transparent)]
    Analysis(#[from] mcp_audit_analysis::AnalysisError),

    #[error(transparent)]
    Model(#[from] mcp_audit_model::ModelError),

    #[error(transparent)]
    Metrics(#[from] mcp_audit_metrics::MetricsError),

    #[error("{0}")]
    Io(String),
}

impl CliError {
    /// `spec.md` §6: `0` success, `2` invalid arguments, `3` config I/O
    /// error, `4` child spawn failure, `5` capture disk error, `1` other.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::InvalidArgs(_) => 2,
            CliError::Hosts(_) => 3,
            CliError::Model(mcp_audit_model::ModelError::ConfigRead { .. })
            | CliError::Model(mcp_audit_model::ModelError::ConfigParse { .. }) => 3,
            CliError::Proxy(mcp_audit_proxy::ProxyError::Spawn { .. }) => 4,
            CliError::Proxy(mcp_audit_proxy::ProxyError::StoreOpen { .. })
            | CliError::Proxy(mcp_audit_proxy::ProxyError::LockTimeout { .. }) => 5,
            CliError::Analysis(mcp_audit_analysis::AnalysisError::UnsupportedFormat(_))
            | CliError::Analysis(mcp_audit_analysis::AnalysisError::InvalidSince(_)) => 2,
            _ => 1,
        }
    }
}
