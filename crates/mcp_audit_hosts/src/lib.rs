#![forbid(unsafe_code)]

//! Host discovery and the one-shot MCP config rewriter (`spec.md` §4.9).

pub mod adapter;
pub mod config;
pub mod error;
pub mod rewriter;

pub use adapter::{
    adapter_for_name, ClaudeDesktopAdapter, CursorAdapter, GenericAdapter, HostAdapter, ServerSpec, VsCodeAdapter,
};
pub use config::{HostConfig, ServerEntry};
pub use error::HostsError;
pub use rewriter::{restore, rewrite, RewriteOutcome};
