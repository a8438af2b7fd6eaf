#![forbid(unsafe_code)]

//! Live metrics exporter (`spec.md` §4.8): a pull endpoint publishing
//! counters/gauges derived from a sliding-window flow reconstruction,
//! plus best-effort push sinks. Nothing in this crate runs on the
//! proxy's forwarding hot path — it only reads the message store.

pub mod error;
pub mod exporter;
pub mod push;
pub mod snapshot;

pub use error::MetricsError;
pub use exporter::{run_exporter, ExporterConfig};
pub use push::{PushOutcome, PushSink};
pub use snapshot::{build_snapshot, AtomicMetrics, AverageCognitiveLoad, MetricsSnapshot};
