//! `mcp-audit proxy` / `mcp-audit --target-command ...` (`spec.md` §6):
//! runs the supervisor, or — with `--restore` — swaps the host config
//! back to its pre-rewrite backup instead.

use std::path::{Path, PathBuf};

use clap::Args;

use mcp_audit_proxy::{SupervisorConfig, DEFAULT_SOFT_CAP};

use crate::error::CliError;
use crate::hostutil::resolve_adapter;
use crate::runtime_config::RuntimeConfig;

#[derive(Debug, Clone, Default, Args)]
pub struct ProxyArgs {
    /// The original command the MCP host wanted to launch. Required
    /// unless `--restore` is set.
    #[arg(long)]
    pub target_command: Option<String>,

    /// The original command's arguments. Populated by `crate::argv`
    /// before `clap` parses the rest of argv, not by `clap` itself.
    #[arg(skip)]
    pub target_args: Vec<String>,

    /// Host product label stamped on captured records.
    #[arg(long, env = "MCP_AUDIT_HOST")]
    pub host: Option<String>,

    /// Logical server name this proxy instance is fronting.
    #[arg(long)]
    pub server: Option<String>,

    /// Restore the most recent pre-rewrite backup of the host config
    /// instead of proxying (`spec.md` §6's `proxy --restore`).
    #[arg(long)]
    pub restore: bool,

    /// Explicit host config path, for hosts `--host` doesn't recognize.
    #[arg(long)]
    pub config_path: Option<PathBuf>,

    /// Directory holding the message/decision stores. Defaults to the
    /// resolved host config's directory.
    #[arg(long)]
    pub store_dir: Option<PathBuf>,
}

pub async fn run(mut args: ProxyArgs, config: Option<&Path>) -> Result<i32, CliError> {
    let runtime = RuntimeConfig::resolve(config, args.host.as_deref(), None, None)?;
    let adapter = resolve_adapter(&runtime.host, args.config_path.as_deref());

    if args.restore {
        let config_path = adapter.locate_config()?;
        let restored_from = mcp_audit_hosts::restore(&config_path)?;
        tracing::info!(
            config = %config_path.display(),
            restored_from = %restored_from.display(),
            "restored host config from backup"
        );
        return Ok(0);
    }

    let target_command = args
        .target_command
        .take()
        .ok_or_else(|| CliError::InvalidArgs("--target-command is required unless --restore is set".to_string()))?;
    let server = args.server.clone().unwrap_or_else(|| "default".to_string());

    let store_dir = resolve_store_dir(args.store_dir.as_deref(), adapter.as_ref(), &runtime.output_dir);
    std::fs::create_dir_all(&store_dir).map_err(|source| CliError::Io(source.to_string()))?;
    let store_path = store_dir.join("mcp_audit_messages.jsonl");

    let supervisor_config = SupervisorConfig {
        command: target_command,
        args: args.target_args,
        env: Vec::new(),
        host: runtime.host,
        server,
        store_path,
        capture_soft_cap: DEFAULT_SOFT_CAP,
    };

    let outcome = mcp_audit_proxy::run_supervisor(supervisor_config).await?;
    if outcome.captures_dropped > 0 {
        tracing::warn!(
            captures_dropped = outcome.captures_dropped,
            "some captures were dropped from this run; forwarding was not affected"
        );
    }
    Ok(outcome.exit_code)
}

/// Derives the directory the message/decision stores live in: an
/// explicit `--store-dir` wins, otherwise it's the directory holding
/// the resolved host config, falling back to `--output-dir` if the
/// config can't be located (e.g. a brand-new `generic` host).
fn resolve_store_dir(explicit: Option<&Path>, adapter: &dyn mcp_audit_hosts::HostAdapter, output_dir: &Path) -> PathBuf {
    if let Some(dir) = explicit {
        return dir.to_path_buf();
    }
    adapter
        .locate_config()
        .ok()
        .and_then(|path| path.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| output_dir.to_path_buf())
}
