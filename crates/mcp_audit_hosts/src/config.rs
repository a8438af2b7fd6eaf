use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// The host MCP config shape (`spec.md` §6): a JSON document with one
/// `mcpServers` map from logical server name to its launch command.
/// `BTreeMap` keeps key order stable across read/rewrite/restore cycles.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HostConfig {
    #[serde(rename = "mcpServers", default)]
    pub mcp_servers: BTreeMap<String, ServerEntry>,
    /// Fields the host config carries that this crate doesn't model
    /// (editor settings, feature flags, ...) are preserved verbatim
    /// across a rewrite/restore round trip instead of being dropped.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerEntry {
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,
}

impl ServerEntry {
    /// An entry is already wrapped when its command matches the proxy
    /// binary and its args begin with `--target-command`. Used to make
    /// the rewrite idempotent.
    pub fn is_wrapped(&self, proxy_command: &str) -> bool {
        self.command == proxy_command && self.args.first().map(String::as_str) == Some("--target-command")
    }

    /// Wraps this entry to invoke the proxy with the original command
    /// and args preserved as `--target-command`/`--target-args`.
    pub fn wrap(&self, proxy_command: &str, server_name: &str, host_label: &str) -> ServerEntry {
        let mut args = vec!["--target-command".to_string(), self.command.clone()];
        if !self.args.is_empty() {
            args.push("--target-args".to_string());
            args.extend(self.args.iter().cloned());
        }
        args.push("--server".to_string());
        args.push(server_name.to_string());
        args.push("--host".to_string());
        args.push(host_label.to_string());

        ServerEntry {
            command: proxy_command.to_string(),
            args,
            env: self.env.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrap_then_is_wrapped_round_trips() {
        let original = ServerEntry {
            command: "node".into(),
            args: vec!["server.js".into()],
            env: BTreeMap::new(),
        };
        let wrapped = original.wrap("mcp-audit", "serverA", "vscode");
        assert!(wrapped.is_wrapped("mcp-audit"));
        assert!(!original.is_wrapped("mcp-audit"));
    }

    #[test]
    fn extra_fields_round_trip_through_serde_flatten() {
        let json = r#"{"mcpServers":{},"editor.fontSize":14}"#;
        let config: HostConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.extra.get("editor.fontSize").and_then(|v| v.as_i64()), Some(14));
        let reserialized = serde_json::to_value(&config).unwrap();
        assert_eq!(reserialized.get("editor.fontSize").and_then(|v| v.as_i64()), Some(14));
    }
}
