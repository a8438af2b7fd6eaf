//! Transparent stdio JSON-RPC proxy: byte-exact forwarding, an
//! append-only message store, and the supervisor that spawns the real
//! MCP server and wires the two together.

#![forbid(unsafe_code)]

pub mod capture;
pub mod correlation;
pub mod error;
pub mod lock;
pub mod pipe;
pub mod store;
pub mod supervisor;
pub mod writer;

pub use capture::{CaptureQueue, PendingCapture, DEFAULT_SOFT_CAP};
pub use correlation::CorrelationTable;
pub use error::ProxyError;
pub use store::MessageStore;
pub use supervisor::{pid_file_path, run as run_supervisor, run_with_host_io, SupervisorConfig, SupervisorOutcome};
