/// Errors from flow reconstruction, scoring, and report generation.
#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error(transparent)]
    Model(#[from] mcp_audit_model::ModelError),

    #[error("failed to write report to {path}: {source}")]
    ReportWrite {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unsupported report format: {0}")]
    UnsupportedFormat(String),

    #[error("invalid --since duration: {0}")]
    InvalidSince(String),
}
