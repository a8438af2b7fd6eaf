use std::path::{Path, PathBuf};

use time::OffsetDateTime;

use crate::config::HostConfig;
use crate::error::HostsError;

/// Outcome of a `rewrite` call: which server entries were wrapped and
/// which were already wrapped (and thus left untouched).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RewriteOutcome {
    pub backup_path: PathBuf,
    pub wrapped: Vec<String>,
    pub already_wrapped: Vec<String>,
}

/// Reads the host config at `config_path`, backs it up with a
/// timestamped suffix, and rewrites every `mcpServers` entry to invoke
/// `proxy_command` instead of the original command. Already-wrapped
/// entries (detected via [`crate::config::ServerEntry::is_wrapped`]) are
/// left untouched, making repeated calls idempotent (`spec.md` §8:
/// `rewrite(restore(rewrite(c))) == rewrite(c)`).
pub fn rewrite(config_path: &Path, proxy_command: &str, host_label: &str, now: OffsetDateTime) -> Result<RewriteOutcome, HostsError> {
    let text = std::fs::read_to_string(config_path).map_err(|source| HostsError::ConfigRead {
        path: config_path.to_path_buf(),
        source,
    })?;
    let mut config: HostConfig = serde_json::from_str(&text).map_err(|source| HostsError::ConfigParse {
        path: config_path.to_path_buf(),
        source,
    })?;

    let backup_path = backup_path_for(config_path, now);
    std::fs::write(&backup_path, &text).map_err(|source| HostsError::ConfigWrite {
        path: backup_path.clone(),
        source,
    })?;

    let mut wrapped = Vec::new();
    let mut already_wrapped = Vec::new();
    for (name, entry) in config.mcp_servers.iter_mut() {
        if entry.is_wrapped(proxy_command) {
            already_wrapped.push(name.clone());
            continue;
        }
        *entry = entry.wrap(proxy_command, name, host_label);
        wrapped.push(name.clone());
    }

    write_config(config_path, &config)?;

    Ok(RewriteOutcome {
        backup_path,
        wrapped,
        already_wrapped,
    })
}

/// Swaps the most recent `<config>.backup.<timestamp>` back into place.
/// `spec.md` §4.9's `--restore` mode.
pub fn restore(config_path: &Path) -> Result<PathBuf, HostsError> {
    let latest = latest_backup(config_path)?;
    let text = std::fs::read_to_string(&latest).map_err(|source| HostsError::ConfigRead {
        path: latest.clone(),
        source,
    })?;
    std::fs::write(config_path, text).map_err(|source| HostsError::ConfigWrite {
        path: config_path.to_path_buf(),
        source,
    })?;
    Ok(latest)
}

fn write_config(config_path: &Path, config: &HostConfig) -> Result<(), HostsError> {
    let text = serde_json::to_string_pretty(config).map_err(HostsError::ConfigSerialize)?;
    std::fs::write(config_path, text).map_err(|source| HostsError::ConfigWrite {
        path: config_path.to_path_buf(),
        source,
    })
}

fn backup_path_for(config_path: &Path, now: OffsetDateTime) -> PathBuf {
    let format_desc = time::format_description::parse("[year][month][day]_[hour][minute][second]")
        .expect("static format description is valid");
    let stamp = now.format(&format_desc).unwrap_or_else(|_| "unknown".to_string());
    let file_name = config_path.file_name().and_then(|n| n.to_str()).unwrap_or("mcp.json");
    config_path.with_file_name(format!("{file_name}.backup.{stamp}"))
}

fn latest_backup(config_path: &Path) -> Result<PathBuf, HostsError> {
    let dir = config_path.parent().unwrap_or_else(|| Path::new("."));
    let prefix = format!(
        "{}.backup.",
        config_path.file_name().and_then(|n| n.to_str()).unwrap_or("mcp.json")
    );

    let mut backups: Vec<PathBuf> = std::fs::read_dir(dir)
        .map_err(|source| HostsError::ConfigRead {
            path: dir.to_path_buf(),
            source,
        })?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|name| name.starts_with(&prefix))
        })
        .collect();

    backups.sort();
    backups.pop().ok_or_else(|| HostsError::NoBackupFound {
        path: config_path.to_path_buf(),
    })
}
