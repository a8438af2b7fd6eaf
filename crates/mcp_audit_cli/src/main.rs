#![forbid(unsafe_code)]

//! `mcp-audit`: cognitive observability agent for MCP traffic
//! (`spec.md` §6). CLI dispatch grounded on `crates/xtask/src/main.rs`'s
//! `clap::Subcommand` enum + match-and-exit-code `main`.

mod argv;
mod commands;
mod error;
mod hostutil;
mod runtime_config;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::install::InstallArgs;
use commands::proxy::ProxyArgs;
use commands::report::ReportArgs;
use commands::status::StatusArgs;

/// Cognitive observability agent for MCP traffic: a transparent stdio
/// proxy, flow/usability reports, and a live metrics exporter.
#[derive(Debug, Parser)]
#[command(name = "mcp-audit", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// When no subcommand is given, these flags run the proxy directly —
    /// the shape `mcp_audit_hosts::config::ServerEntry::wrap` actually
    /// emits into a rewritten host config (`command` is this executable;
    /// no subcommand word is in `args`).
    #[command(flatten)]
    proxy: ProxyArgs,

    /// Overrides scorer weights/thresholds; see the `mcp-audit.toml` shape
    /// documented on `mcp_audit_model::ScoringConfig`.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Runs the supervisor (equivalent to the bare top-level flag form).
    Proxy(ProxyArgs),
    /// Generates a trace/detailed/usability report from the message store.
    Report(ReportArgs),
    /// Prints message store size, last record timestamp, and live children.
    ProxyStatus(StatusArgs),
    /// Rewrites a host's MCP config to route its servers through this proxy.
    Install(InstallArgs),
}

#[tokio::main]
async fn main() {
    init_tracing();

    let raw: Vec<String> = std::env::args().collect();
    let (remaining, target_args) = argv::split_target_args(&raw);
    let mut cli = Cli::parse_from(remaining);
    if let Some(target_args) = target_args {
        cli.proxy.target_args = target_args.clone();
        if let Some(Command::Proxy(args)) = &mut cli.command {
            args.target_args = target_args;
        }
    }

    let exit_code = dispatch(cli).await;
    std::process::exit(exit_code);
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .init();
}

async fn dispatch(cli: Cli) -> i32 {
    let config = cli.config.as_deref();
    let result = match cli.command {
        Some(Command::Proxy(args)) => commands::proxy::run(args, config).await,
        Some(Command::Report(args)) => commands::report::run(args, config),
        Some(Command::ProxyStatus(args)) => commands::status::run(args, config),
        Some(Command::Install(args)) => commands::install::run(args, config),
        None => commands::proxy::run(cli.proxy, config).await,
    };

    match result {
        Ok(code) => code,
        Err(err) => {
            eprintln!("mcp-audit: {err}");
            err.exit_code()
        }
    }
}
