use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::config::HostConfig;
use crate::error::HostsError;

/// One `mcpServers` entry as seen by a host adapter: the server's
/// logical name plus its launch command, named (`spec.md` §9 design
/// note's `enumerate_servers() → [ServerSpec]`) separately from
/// [`crate::config::ServerEntry`] so callers outside this crate get a
/// flat, self-contained value rather than a map entry.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerSpec {
    pub name: String,
    pub command: String,
    pub args: Vec<String>,
    pub env: BTreeMap<String, String>,
}

/// A small interface over one MCP host product's on-disk config
/// location and labeling conventions (`spec.md` §9 design note,
/// promoted to a real trait here so the rewriter and CLI are not
/// hardwired to one host's file layout).
pub trait HostAdapter {
    /// Candidate config file paths for this host, most likely first.
    /// `locate_config` picks the first one that exists.
    fn candidate_paths(&self) -> Vec<PathBuf>;

    /// The label stamped on captured records and report filenames.
    fn emit_host_label(&self) -> &str;

    /// Resolves the config file this host actually uses, or an error
    /// naming every candidate tried.
    fn locate_config(&self) -> Result<PathBuf, HostsError> {
        let candidates = self.candidate_paths();
        candidates
            .iter()
            .find(|path| path.is_file())
            .cloned()
            .ok_or_else(|| HostsError::ConfigNotFound {
                host: self.emit_host_label().to_string(),
                candidates,
            })
    }

    /// Reads this host's located config and lists every `mcpServers`
    /// entry it declares. Every adapter shares the same `mcpServers`
    /// JSON shape, so this has one default implementation rather than
    /// a per-host override.
    fn enumerate_servers(&self) -> Result<Vec<ServerSpec>, HostsError> {
        let path = self.locate_config()?;
        let text = std::fs::read_to_string(&path).map_err(|source| HostsError::ConfigRead {
            path: path.clone(),
            source,
        })?;
        let config: HostConfig = serde_json::from_str(&text).map_err(|source| HostsError::ConfigParse {
            path: path.clone(),
            source,
        })?;
        Ok(config
            .mcp_servers
            .into_iter()
            .map(|(name, entry)| ServerSpec {
                name,
                command: entry.command,
                args: entry.args,
                env: entry.env,
            })
            .collect())
    }
}

/// VS Code and VS Code-family forks (the workspace-level `mcp.json`
/// under `.vscode/`, falling back to the user profile).
pub struct VsCodeAdapter;

impl HostAdapter for VsCodeAdapter {
    fn candidate_paths(&self) -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from(".vscode/mcp.json")];
        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("Code").join("User").join("mcp.json"));
        }
        paths
    }

    fn emit_host_label(&self) -> &str {
        "vscode"
    }
}

/// Claude Desktop and its per-platform application-support config.
pub struct ClaudeDesktopAdapter;

impl HostAdapter for ClaudeDesktopAdapter {
    fn candidate_paths(&self) -> Vec<PathBuf> {
        let mut paths = Vec::new();
        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("Claude").join("claude_desktop_config.json"));
        }
        if let Some(home) = dirs::home_dir() {
            paths.push(
                home.join("Library")
                    .join("Application Support")
                    .join("Claude")
                    .join("claude_desktop_config.json"),
            );
        }
        paths
    }

    fn emit_host_label(&self) -> &str {
        "claude-desktop"
    }
}

/// Cursor and Cursor-family forks (mirrors the VS Code layout).
pub struct CursorAdapter;

impl HostAdapter for CursorAdapter {
    fn candidate_paths(&self) -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from(".cursor/mcp.json")];
        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".cursor").join("mcp.json"));
        }
        paths
    }

    fn emit_host_label(&self) -> &str {
        "cursor"
    }
}

/// Any host, driven by an explicit config path rather than discovery —
/// the escape hatch for hosts this crate doesn't special-case.
pub struct GenericAdapter {
    path: PathBuf,
    label: String,
}

impl GenericAdapter {
    pub fn new(path: impl Into<PathBuf>, label: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            label: label.into(),
        }
    }
}

impl HostAdapter for GenericAdapter {
    fn candidate_paths(&self) -> Vec<PathBuf> {
        vec![self.path.clone()]
    }

    fn emit_host_label(&self) -> &str {
        &self.label
    }
}

/// Resolves a `--host` CLI argument to a concrete adapter. `generic` and
/// any unrecognized name falls through to [`GenericAdapter`] driven by an
/// explicit `--config-path`, matched at the call site.
pub fn adapter_for_name(name: &str) -> Option<Box<dyn HostAdapter>> {
    match name {
        "vscode" => Some(Box::new(VsCodeAdapter)),
        "claude-desktop" => Some(Box::new(ClaudeDesktopAdapter)),
        "cursor" => Some(Box::new(CursorAdapter)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_host_names_resolve_to_an_adapter() {
        assert!(adapter_for_name("vscode").is_some());
        assert!(adapter_for_name("claude-desktop").is_some());
        assert!(adapter_for_name("cursor").is_some());
    }

    #[test]
    fn unknown_host_name_resolves_to_none() {
        assert!(adapter_for_name("some-unknown-host").is_none());
    }

    #[test]
    fn generic_adapter_locates_an_existing_path() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("mcp.json");
        std::fs::write(&config_path, "{}").unwrap();
        let adapter = GenericAdapter::new(&config_path, "generic");
        assert_eq!(adapter.locate_config().unwrap(), config_path);
    }

    #[test]
    fn generic_adapter_errors_with_candidates_when_missing() {
        let adapter = GenericAdapter::new("/nonexistent/mcp.json", "generic");
        let err = adapter.locate_config().unwrap_err();
        assert!(matches!(err, HostsError::ConfigNotFound { .. }));
    }

    #[test]
    fn enumerate_servers_lists_every_mcp_servers_entry() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("mcp.json");
        std::fs::write(
            &config_path,
            r#"{"mcpServers":{"serverA":{"command":"node","args":["server.js"]}}}"#,
        )
        .unwrap();
        let adapter = GenericAdapter::new(&config_path, "generic");

        let servers = adapter.enumerate_servers().unwrap();
        assert_eq!(servers.len(), 1);
        assert_eq!(servers[0].name, "serverA");
        assert_eq!(servers[0].command, "node");
        assert_eq!(servers[0].args, vec!["server.js".to_string()]);
    }

    #[test]
    fn enumerate_servers_errors_when_config_missing() {
        let adapter = GenericAdapter::new("/nonexistent/mcp.json", "generic");
        assert!(adapter.enumerate_servers().is_err());
    }
}
