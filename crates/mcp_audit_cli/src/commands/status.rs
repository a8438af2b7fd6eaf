//! `mcp-audit proxy-status` (`spec.md` §6): store size, last record
//! timestamp, and which supervised children are still alive, read from
//! the pidfiles `mcp_audit_proxy::run_supervisor` maintains next to the
//! message store.

use std::path::{Path, PathBuf};

use clap::Args;

use crate::error::CliError;
use crate::hostutil::resolve_adapter;
use crate::runtime_config::RuntimeConfig;

#[derive(Debug, Clone, Args)]
pub struct StatusArgs {
    #[arg(long, env = "MCP_AUDIT_HOST")]
    pub host: Option<String>,

    #[arg(long)]
    pub config_path: Option<PathBuf>,

    #[arg(long)]
    pub store_dir: Option<PathBuf>,
}

pub fn run(args: StatusArgs, config: Option<&Path>) -> Result<i32, CliError> {
    let runtime = RuntimeConfig::resolve(config, args.host.as_deref(), None, None)?;
    let adapter = resolve_adapter(&runtime.host, args.config_path.as_deref());

    let store_dir = match &args.store_dir {
        Some(dir) => dir.clone(),
        None => adapter
            .locate_config()
            .ok()
            .and_then(|path| path.parent().map(Path::to_path_buf))
            .unwrap_or_else(|| runtime.output_dir.clone()),
    };
    let store_path = store_dir.join("mcp_audit_messages.jsonl");
    let store = mcp_audit_proxy::MessageStore::new(&store_path);

    println!("store: {}", store_path.display());
    println!("size_bytes: {}", store.size_bytes());
    match store.last_timestamp()? {
        Some(timestamp) => println!("last_record_at: {timestamp}"),
        None => println!("last_record_at: (none)"),
    }

    let live = live_child_pids(&store_dir);
    if live.is_empty() {
        println!("running_children: (none)");
    } else {
        for (server, pid) in live {
            println!("running_children: server={server} pid={pid}");
        }
    }

    Ok(0)
}

fn live_child_pids(store_dir: &Path) -> Vec<(String, u32)> {
    let Ok(entries) = std::fs::read_dir(store_dir) else {
        return Vec::new();
    };

    let mut result = Vec::new();
    for entry in entries.flatten() {
        let path = entry.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let Some(server) = name.strip_prefix("mcp_audit_").and_then(|n| n.strip_suffix(".pid")) else {
            continue;
        };
        let Ok(text) = std::fs::read_to_string(&path) else {
            continue;
        };
        let Ok(pid) = text.trim().parse::<u32>() else {
            continue;
        };
        if process_is_alive(pid) {
            result.push((server.to_string(), pid));
        }
    }
    result.sort();
    result
}

#[cfg(unix)]
fn process_is_alive(pid: u32) -> bool {
    nix::sys::signal::kill(nix::unistd::Pid::from_raw(pid as i32), None).is_ok()
}

#[cfg(not(unix))]
fn process_is_alive(_pid: u32) -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ignores_files_that_are_not_pidfiles() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("mcp_audit_messages.jsonl"), "{}").unwrap();
        assert!(live_child_pids(dir.path()).is_empty());
    }

    #[test]
    fn skips_a_pidfile_whose_process_is_gone() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("mcp_audit_serverA.pid"), "999999").unwrap();
        assert!(live_child_pids(dir.path()).is_empty());
    }

    #[test]
    fn reports_a_pidfile_for_the_current_process() {
        let dir = tempfile::tempdir().unwrap();
        let pid = std::process::id();
        std::fs::write(dir.path().join("mcp_audit_serverA.pid"), pid.to_string()).unwrap();
        let live = live_child_pids(dir.path());
        assert_eq!(live, vec![("serverA".to_string(), pid)]);
    }
}
