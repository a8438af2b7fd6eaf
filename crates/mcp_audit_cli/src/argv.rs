//! `--target-args` carries the wrapped child's own argv verbatim,
//! which may itself contain `-`/`--`-prefixed tokens — something
//! `clap`'s normal multi-value flags can't capture without also
//! swallowing the flags that `mcp_audit_hosts::config::ServerEntry::wrap`
//! places right after it (`--server`, `--host`). So this is extracted by
//! hand from the raw argv before `clap` ever sees it, the same way the
//! wrapper crates in this workspace hand-forward an opaque child argv
//! rather than modeling it as typed flags.

/// Flags that `ServerEntry::wrap` is known to emit after `--target-args`'
/// value list, and thus the stop set for where that value list ends.
const STOP_FLAGS: &[&str] = &["--server", "--host", "--restore", "--config", "--store-dir"];

/// Splits `--target-args ...` out of `raw`, returning the remaining
/// argv (safe to hand to `clap::Parser::parse_from`) and the extracted
/// values, if the flag was present.
pub fn split_target_args(raw: &[String]) -> (Vec<String>, Option<Vec<String>>) {
    let Some(flag_index) = raw.iter().position(|a| a == "--target-args") else {
        return (raw.to_vec(), None);
    };

    let mut values = Vec::new();
    let mut end = flag_index + 1;
    while end < raw.len() && !STOP_FLAGS.contains(&raw[end].as_str()) {
        values.push(raw[end].clone());
        end += 1;
    }

    let mut remaining = raw[..flag_index].to_vec();
    remaining.extend_from_slice(&raw[end..]);
    (remaining, Some(values))
}
