//! The capture queue described in `spec.md` §5: forwarders push observed
//! lines onto an in-memory queue with a configurable soft cap; on
//! overflow the oldest entry is dropped and a counter incremented. The
//! queue never blocks a push, so a slow disk can never stall a
//! forwarder.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use time::OffsetDateTime;
use tokio::sync::Notify;

use mcp_audit_model::Direction;

pub const DEFAULT_SOFT_CAP: usize = 10_000;

/// One line observed on a forwarded pipe, queued for parsing and
/// persistence by the capture writer task.
#[derive(Debug, Clone)]
pub struct PendingCapture {
    pub direction: Direction,
    pub observed_at: OffsetDateTime,
    pub raw: Vec<u8>,
}

struct Shared {
    queue: std::sync::Mutex<VecDeque<PendingCapture>>,
    notify: Notify,
    dropped: AtomicU64,
    soft_cap: usize,
}

/// A cheaply-cloneable handle shared between both forwarders and the
/// capture writer task.
#[derive(Clone)]
pub struct CaptureQueue {
    shared: Arc<Shared>,
}

impl CaptureQueue {
    pub fn new(soft_cap: usize) -> Self {
        Self {
            shared: Arc::new(Shared {
                queue: std::sync::Mutex::new(VecDeque::new()),
                notify: Notify::new(),
                dropped: AtomicU64::new(0),
                soft_cap,
            }),
        }
    }

    /// Enqueues a line. Never blocks; drops the oldest entry if this
    /// push would exceed the soft cap.
    pub fn push(&self, item: PendingCapture) {
        let dropped = {
            let mut queue = self.shared.queue.lock().unwrap();
            queue.push_back(item);
            if queue.len() > self.shared.soft_cap {
                queue.pop_front();
                true
            } else {
                false
            }
        };
        if dropped {
            self.shared.dropped.fetch_add(1, Ordering::Relaxed);
        }
        self.shared.notify.notify_one();
    }

    /// Pops the oldest queued line, waiting if the queue is empty.
    pub async fn pop(&self) -> PendingCapture {
        loop {
            if let Some(item) = self.shared.queue.lock().unwrap().pop_front() {
                return item;
            }
            self.shared.notify.notified().await;
        }
    }

    /// Non-blocking pop, for drain-with-deadline shutdown.
    pub fn try_pop(&self) -> Option<PendingCapture> {
        self.shared.queue.lock().unwrap().pop_front()
    }

    pub fn len(&self) -> usize {
        self.shared.queue.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn captures_dropped(&self) -> u64 {
        self.shared.dropped.load(Ordering::Relaxed)
    }
}
