//! Resolves a `--host` CLI argument to a concrete [`HostAdapter`],
//! falling through to [`GenericAdapter`] for any host name this crate
//! doesn't special-case (`mcp_audit_hosts::adapter_for_name`'s own
//! doc comment names this as the intended call-site behavior).

use std::path::Path;

use mcp_audit_hosts::{adapter_for_name, GenericAdapter, HostAdapter};

pub fn resolve_adapter(host: &str, config_path: Option<&Path>) -> Box<dyn HostAdapter> {
    if let Some(adapter) = adapter_for_name(host) {
        return adapter;
    }
    let path = config_path.map(Path::to_path_buf).unwrap_or_else(|| Path::new("mcp.json").to_path_buf());
    Box::new(GenericAdapter::new(path, host))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_host_name_resolves_without_a_config_path() {
        let adapter = resolve_adapter("vscode", None);
        assert_eq!(adapter.emit_host_label(), "vscode");
    }

    #[test]
    fn unknown_host_name_falls_through_to_generic() {
        let adapter = resolve_adapter("my-custom-host", Some(Path::new("/tmp/custom.json")));
        assert_eq!(adapter.emit_host_label(), "my-custom-host");
    }
}
