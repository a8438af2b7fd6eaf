//! The capture writer task: the sole consumer of the [`CaptureQueue`],
//! responsible for parsing queued lines into [`RawMessageRecord`]s,
//! resolving request/response latency, and appending to the
//! [`MessageStore`]. Runs independently of the forwarders so a slow or
//! failing disk never stalls the pipe (`spec.md` §4.4, §5, §7).

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use mcp_audit_model::RawMessageRecord;

use crate::capture::CaptureQueue;
use crate::correlation::{CorrelationTable, DEFAULT_MAX_ENTRIES, DEFAULT_TTL};
use crate::store::MessageStore;

/// Long-lived task that drains the capture queue into the message
/// store. One instance per proxied server.
pub struct CaptureWriter {
    capture: CaptureQueue,
    store: MessageStore,
    host: String,
    server: String,
    correlation: CorrelationTable,
    capture_errors: Arc<AtomicU64>,
    warned: AtomicBool,
}

impl CaptureWriter {
    pub fn new(
        capture: CaptureQueue,
        store: MessageStore,
        host: impl Into<String>,
        server: impl Into<String>,
    ) -> Self {
        Self {
            capture,
            store,
            host: host.into(),
            server: server.into(),
            correlation: CorrelationTable::new(DEFAULT_MAX_ENTRIES, DEFAULT_TTL),
            capture_errors: Arc::new(AtomicU64::new(0)),
            warned: AtomicBool::new(false),
        }
    }

    /// Shared counter of failed store-append attempts, readable by the
    /// supervisor for `captures_dropped` reporting alongside the
    /// queue-overflow counter.
    pub fn capture_errors_handle(&self) -> Arc<AtomicU64> {
        self.capture_errors.clone()
    }

    /// Runs until `shutdown` fires, then drains whatever remains in the
    /// queue with a bounded deadline before returning (`spec.md` §5).
    pub async fn run(mut self, mut shutdown: tokio::sync::watch::Receiver<bool>) {
        loop {
            tokio::select! {
                biased;
                _ = shutdown.changed() => break,
                item = self.capture.pop() => self.handle(item),
            }
        }
        self.drain_with_deadline(Duration::from_secs(2));
    }

    fn drain_with_deadline(&mut self, deadline: Duration) {
        let start = Instant::now();
        while start.elapsed() < deadline {
            match self.capture.try_pop() {
                Some(item) => self.handle(item),
                None => break,
            }
        }
    }

    fn handle(&mut self, item: crate::capture::PendingCapture) {
        let Some(payload) = mcp_audit_model::parse_jsonrpc_line(&item.raw) else {
            return;
        };

        let mut record =
            RawMessageRecord::new(item.observed_at, item.direction, &self.host, &self.server, payload);

        if record.is_request() {
            if let Some(id) = record.payload_id() {
                self.correlation.record_request(&self.server, &id, Instant::now());
            }
        } else if record.is_response() {
            if let Some(id) = record.payload_id() {
                if let Some(latency) =
                    self.correlation.resolve_response(&self.server, &id, Instant::now())
                {
                    record.latency_ms = Some(latency);
                }
            }
        }

        if let Err(error) = self.store.append(&record) {
            self.capture_errors.fetch_add(1, Ordering::Relaxed);
            if !self.warned.swap(true, Ordering::Relaxed) {
                tracing::warn!(%error, "capture enqueue failed; dropping record and continuing to forward");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mcp_audit_model::Direction;
    use time::OffsetDateTime;

    fn line(id: u64, extra: &str) -> Vec<u8> {
        format!(r#"{{"jsonrpc":"2.0","id":{id}{extra}}}"#).into_bytes()
    }

    #[tokio::test]
    async fn request_then_response_gets_a_latency() {
        let dir = tempfile::tempdir().unwrap();
        let store = MessageStore::new(dir.path().join("messages.jsonl"));
        let capture = CaptureQueue::new(16);
        let mut writer = CaptureWriter::new(capture, store.clone(), "vscode", "serverA");

        writer.handle(crate::capture::PendingCapture {
            direction: Direction::HostToServer,
            observed_at: OffsetDateTime::now_utc(),
            raw: line(1, r#","method":"tools/list""#),
        });
        writer.handle(crate::capture::PendingCapture {
            direction: Direction::ServerToHost,
            observed_at: OffsetDateTime::now_utc(),
            raw: line(1, r#","result":{}"#),
        });

        let records = store.read_all().unwrap();
        assert_eq!(records.len(), 2);
        assert!(records[1].latency_ms.is_some());
    }

    #[tokio::test]
    async fn unparseable_lines_are_dropped_silently() {
        let dir = tempfile::tempdir().unwrap();
        let store = MessageStore::new(dir.path().join("messages.jsonl"));
        let capture = CaptureQueue::new(16);
        let mut writer = CaptureWriter::new(capture, store.clone(), "vscode", "serverA");

        writer.handle(crate::capture::PendingCapture {
            direction: Direction::HostToServer,
            observed_at: OffsetDateTime::now_utc(),
            raw: b"not json".to_vec(),
        });

        assert!(store.read_all().unwrap().is_empty());
    }
}
