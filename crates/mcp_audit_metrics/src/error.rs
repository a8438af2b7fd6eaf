/// Errors from the metrics exporter. Note: per `spec.md` §4.8/§5, a
/// push-sink failure never propagates into the proxy hot path — this
/// type exists for the pull endpoint's startup failures and for push
/// sinks to log their own terminal failure once.
#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    #[error("failed to bind metrics listener on {addr}: {source}")]
    Bind {
        addr: std::net::SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to install the Prometheus recorder: {0}")]
    RecorderInstall(String),

    #[error("push sink {sink} failed after {attempts} attempt(s): {message}")]
    PushFailed {
        sink: String,
        attempts: u32,
        message: String,
    },

    #[error(transparent)]
    Analysis(#[from] mcp_audit_analysis::AnalysisError),

    #[error(transparent)]
    Store(#[from] mcp_audit_proxy::ProxyError),
}
