//! Append-only JSONL message store (`spec.md` §4.3). One store per host,
//! co-located with the host's config directory. Writers serialize via an
//! advisory lock; readers open in shared mode and tolerate a trailing
//! partial line at EOF.

use std::fs::OpenOptions;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use time::OffsetDateTime;

use crate::error::ProxyError;
use crate::lock::{acquire_lock, lock_path_for};
use mcp_audit_model::RawMessageRecord;

const DEFAULT_LOCK_RETRIES: u32 = 5;

/// Handle to an append-only message store file.
#[derive(Debug, Clone)]
pub struct MessageStore {
    path: PathBuf,
}

impl MessageStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends one record as a single compact JSON line. The record is
    /// serialized before the lock is taken so the critical section is
    /// only the write itself — writers must not starve each other.
    pub fn append(&self, record: &RawMessageRecord) -> Result<(), ProxyError> {
        let mut line =
            serde_json::to_string(record).map_err(mcp_audit_model::ModelError::Serialize)?;
        line.push('\n');

        let lock_path = lock_path_for(&self.path);
        let _lock = acquire_lock(&lock_path, DEFAULT_LOCK_RETRIES)?;

        let mut file = OpenOptions::new()
            .append(true)
            .create(true)
            .open(&self.path)
            .map_err(|source| ProxyError::StoreOpen {
                path: self.path.clone(),
                source,
            })?;
        file.write_all(line.as_bytes())
            .map_err(|source| ProxyError::StoreOpen {
                path: self.path.clone(),
                source,
            })
    }

    /// Current size in bytes, or `0` if the store hasn't been created
    /// yet. Used by `proxy-status`.
    pub fn size_bytes(&self) -> u64 {
        std::fs::metadata(&self.path).map(|m| m.len()).unwrap_or(0)
    }

    /// Reads every well-formed record in the store, tolerating a
    /// trailing partial line (the writer may be mid-append). Malformed
    /// lines are skipped rather than treated as a read error, mirroring
    /// the capture codec's "drop, don't corrupt" contract.
    pub fn read_all(&self) -> Result<Vec<RawMessageRecord>, ProxyError> {
        let file = match std::fs::File::open(&self.path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(ProxyError::StoreOpen {
                    path: self.path.clone(),
                    source,
                })
            }
        };
        let reader = BufReader::new(file);
        let mut records = Vec::new();
        for line in reader.lines() {
            let line = match line {
                Ok(l) => l,
                Err(_) => break,
            };
            if line.trim().is_empty() {
                continue;
            }
            if let Ok(record) = serde_json::from_str::<RawMessageRecord>(&line) {
                records.push(record);
            }
        }
        Ok(records)
    }

    /// Reads records with `timestamp >= since` (and `server == server`
    /// when given), matching the reconstructor's `[t_since, t_now)`
    /// filter in `spec.md` §4.5.
    pub fn read_since(
        &self,
        since: OffsetDateTime,
        server: Option<&str>,
    ) -> Result<Vec<RawMessageRecord>, ProxyError> {
        let records = self.read_all()?;
        Ok(records
            .into_iter()
            .filter(|r| r.timestamp >= since)
            .filter(|r| match server {
                Some(s) => r.server == s,
                None => true,
            })
            .collect())
    }

    /// The timestamp of the last record, if any. Used by `proxy-status`.
    pub fn last_timestamp(&self) -> Result<Option<OffsetDateTime>, ProxyError> {
        Ok(self.read_all()?.into_iter().last().map(|r| r.timestamp))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mcp_audit_model::Direction;
    use serde_json::json;

    fn sample_record(host: &str, server: &str) -> RawMessageRecord {
        RawMessageRecord::new(
            OffsetDateTime::now_utc(),
            Direction::HostToServer,
            host,
            server,
            json!({"jsonrpc":"2.0","id":1,"method":"tools/list"}),
        )
    }

    #[test]
    fn append_then_read_all_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = MessageStore::new(dir.path().join("messages.jsonl"));
        let record = sample_record("vscode", "serverA");
        store.append(&record).unwrap();
        let records = store.read_all().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].server, "serverA");
    }

    #[test]
    fn reading_a_missing_store_yields_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = MessageStore::new(dir.path().join("missing.jsonl"));
        assert!(store.read_all().unwrap().is_empty());
    }

    #[test]
    fn trailing_partial_line_is_tolerated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("messages.jsonl");
        let store = MessageStore::new(&path);
        store.append(&sample_record("vscode", "serverA")).unwrap();
        let mut file = OpenOptions::new().append(true).open(&path).unwrap();
        file.write_all(b"{\"incomplete\"").unwrap();
        let records = store.read_all().unwrap();
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn size_bytes_is_monotone_non_decreasing_across_appends() {
        let dir = tempfile::tempdir().unwrap();
        let store = MessageStore::new(dir.path().join("messages.jsonl"));
        let before = store.size_bytes();
        store.append(&sample_record("vscode", "serverA")).unwrap();
        let after = store.size_bytes();
        assert!(after > before);
    }
}
