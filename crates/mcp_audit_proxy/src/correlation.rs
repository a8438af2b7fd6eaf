//! Bounded request↔response correlation table used to compute
//! `latency_ms` for response records (`spec.md` §4.4 point 3, §5).
//! Protected by a single mutex at the call site; operations here are
//! all O(1) amortized.

use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

pub const DEFAULT_MAX_ENTRIES: usize = 10_000;
pub const DEFAULT_TTL: Duration = Duration::from_secs(10 * 60);

#[derive(Debug, Clone)]
struct PendingRequest {
    key: String,
    sent_at: Instant,
}

/// Tracks in-flight `(server, payload_id)` pairs so a later response can
/// be matched to the request it answers and a latency computed. Bounded
/// by both a TTL (stale entries are never matched) and a maximum size
/// (oldest-inserted entries are evicted first once full — a FIFO
/// approximation of LRU that is O(1) and adequate for a correlation
/// window measured in minutes, not a long-lived cache).
pub struct CorrelationTable {
    entries: HashMap<String, Instant>,
    insertion_order: VecDeque<PendingRequest>,
    max_entries: usize,
    ttl: Duration,
}

impl CorrelationTable {
    pub fn new(max_entries: usize, ttl: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            insertion_order: VecDeque::new(),
            max_entries,
            ttl,
        }
    }

    fn key(server: &str, payload_id: &str) -> String {
        format!("{server}\u{0}{payload_id}")
    }

    /// Records that a request was sent at `sent_at`, evicting the oldest
    /// entry first if the table is at capacity.
    pub fn record_request(&mut self, server: &str, payload_id: &str, sent_at: Instant) {
        let key = Self::key(server, payload_id);
        if self.entries.len() >= self.max_entries && !self.entries.contains_key(&key) {
            if let Some(oldest) = self.insertion_order.pop_front() {
                self.entries.remove(&oldest.key);
            }
        }
        self.entries.insert(key.clone(), sent_at);
        self.insertion_order.push_back(PendingRequest { key, sent_at });
    }

    /// Looks up and removes the matching request, returning the elapsed
    /// latency in milliseconds if found and not expired.
    pub fn resolve_response(
        &mut self,
        server: &str,
        payload_id: &str,
        now: Instant,
    ) -> Option<u64> {
        let key = Self::key(server, payload_id);
        let sent_at = self.entries.remove(&key)?;
        if now.duration_since(sent_at) > self.ttl {
            return None;
        }
        Some(now.duration_since(sent_at).as_millis() as u64)
    }

    /// Drops entries older than the TTL. Call periodically; correctness
    /// does not depend on it since `resolve_response` also checks age,
    /// but it bounds memory for requests that never get a response.
    pub fn evict_expired(&mut self, now: Instant) {
        while let Some(front) = self.insertion_order.front() {
            if now.duration_since(front.sent_at) <= self.ttl {
                break;
            }
            let expired = self.insertion_order.pop_front().unwrap();
            self.entries.remove(&expired.key);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_latency_for_matching_request() {
        let mut table = CorrelationTable::new(10, Duration::from_secs(60));
        let start = Instant::now();
        table.record_request("serverA", "1", start);
        let resolved = table.resolve_response("serverA", "1", start + Duration::from_millis(42));
        assert_eq!(resolved, Some(42));
        assert!(table.is_empty());
    }

    #[test]
    fn unmatched_response_yields_none() {
        let mut table = CorrelationTable::new(10, Duration::from_secs(60));
        assert_eq!(
            table.resolve_response("serverA", "nope", Instant::now()),
            None
        );
    }

    #[test]
    fn evicts_oldest_entry_once_at_capacity() {
        let mut table = CorrelationTable::new(2, Duration::from_secs(60));
        let t0 = Instant::now();
        table.record_request("serverA", "1", t0);
        table.record_request("serverA", "2", t0);
        table.record_request("serverA", "3", t0);
        assert_eq!(table.len(), 2);
        assert_eq!(table.resolve_response("serverA", "1", t0), None);
        assert!(table.resolve_response("serverA", "3", t0).is_some());
    }

    #[test]
    fn expired_entries_are_not_resolved() {
        let mut table = CorrelationTable::new(10, Duration::from_millis(10));
        let t0 = Instant::now();
        table.record_request("serverA", "1", t0);
        let resolved = table.resolve_response("serverA", "1", t0 + Duration::from_millis(50));
        assert_eq!(resolved, None);
    }
}
