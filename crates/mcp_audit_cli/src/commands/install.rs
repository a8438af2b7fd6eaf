//! `mcp-audit install` (`SPEC_FULL.md` §2 "Config rewriter", ADDED
//! beyond `spec.md` §6's core CLI subset): the one-shot entry point that
//! actually invokes `mcp_audit_hosts::rewrite`, since the spec's core
//! subset names `proxy --restore` but never a forward direction — one
//! has to exist for the config rewriter to ever run.

use std::path::{Path, PathBuf};

use clap::Args;
use time::OffsetDateTime;

use crate::error::CliError;
use crate::hostutil::resolve_adapter;
use crate::runtime_config::RuntimeConfig;

#[derive(Debug, Clone, Args)]
pub struct InstallArgs {
    #[arg(long, env = "MCP_AUDIT_HOST")]
    pub host: Option<String>,

    #[arg(long)]
    pub config_path: Option<PathBuf>,

    /// Path to the `mcp-audit` executable the rewritten config should
    /// invoke. Defaults to the currently running executable's path.
    #[arg(long)]
    pub proxy_command: Option<String>,
}

pub fn run(args: InstallArgs, config: Option<&Path>) -> Result<i32, CliError> {
    let runtime = RuntimeConfig::resolve(config, args.host.as_deref(), None, None)?;
    let adapter = resolve_adapter(&runtime.host, args.config_path.as_deref());
    let config_path = adapter.locate_config()?;

    let proxy_command = args
        .proxy_command
        .clone()
        .or_else(|| std::env::current_exe().ok().and_then(|path| path.to_str().map(str::to_string)))
        .ok_or_else(|| CliError::InvalidArgs("could not resolve the mcp-audit executable path".to_string()))?;

    let outcome = mcp_audit_hosts::rewrite(&config_path, &proxy_command, adapter.emit_host_label(), OffsetDateTime::now_utc())?;

    println!(
        "wrapped {} server(s) in {} (backup: {})",
        outcome.wrapped.len(),
        config_path.display(),
        outcome.backup_path.display()
    );
    if !outcome.already_wrapped.is_empty() {
        println!("{} server(s) were already wrapped", outcome.already_wrapped.len());
    }
    Ok(0)
}
