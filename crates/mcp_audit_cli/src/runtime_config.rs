//! The process-wide runtime configuration struct (`SPEC_FULL.md` §3):
//! built once per invocation from `--config`, the `MCP_AUDIT_*`
//! environment variables, and per-command overrides, then passed
//! explicitly into whichever command is running.

use std::path::{Path, PathBuf};

use mcp_audit_model::ScoringConfig;

use crate::error::CliError;

pub const DEFAULT_HOST: &str = "generic";

#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub host: String,
    pub output_dir: PathBuf,
    pub window_seconds: u64,
    pub scoring: ScoringConfig,
}

impl RuntimeConfig {
    /// Resolves layered configuration: explicit CLI flag, then
    /// environment variable, then the `mcp-audit.toml`-derived default,
    /// then a hardcoded fallback.
    pub fn resolve(
        config_path: Option<&Path>,
        host_override: Option<&str>,
        output_dir_override: Option<&Path>,
        window_override: Option<u64>,
    ) -> Result<Self, CliError> {
        let scoring = match config_path {
            Some(path) => ScoringConfig::load_from_file(path).map_err(CliError::Model)?,
            None => ScoringConfig::default(),
        };

        let host = host_override
            .map(str::to_string)
            .or_else(|| std::env::var("MCP_AUDIT_HOST").ok())
            .unwrap_or_else(|| DEFAULT_HOST.to_string());

        let output_dir = output_dir_override
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os("MCP_AUDIT_OUTPUT_DIR").map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from("."));

        let window_seconds = window_override
            .or_else(|| {
                std::env::var("MCP_AUDIT_WINDOW_SECONDS")
                    .ok()
                    .and_then(|value| value.parse().ok())
            })
            .unwrap_or(scoring.thresholds.window_seconds);

        Ok(Self {
            host,
            output_dir,
            window_seconds,
            scoring,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn falls_back_to_default_host_and_thresholds_window() {
        std::env::remove_var("MCP_AUDIT_HOST");
        std::env::remove_var("MCP_AUDIT_WINDOW_SECONDS");
        let config = RuntimeConfig::resolve(None, None, None, None).unwrap();
        assert_eq!(config.host, DEFAULT_HOST);
        assert_eq!(config.window_seconds, mcp_audit_model::ScorerThresholds::default().window_seconds);
    }

    #[test]
    fn explicit_override_wins_over_everything_else() {
        let config = RuntimeConfig::resolve(None, Some("vscode"), None, Some(99)).unwrap();
        assert_eq!(config.host, "vscode");
        assert_eq!(config.window_seconds, 99);
    }
}
