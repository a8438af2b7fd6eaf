//! Optional push sinks (`spec.md` §4.8): outbound delivery of the same
//! payload the pull endpoint serves, to a webhook or a generic
//! analytics collector. Delivery is best-effort with bounded retry and
//! must never block the proxy hot path — sinks only ever run from the
//! metrics exporter's background refresh loop, never from a forwarder.
//!
//! Retry shape grounded on `mcp_audit_proxy::supervisor::spawn_with_retry`
//! (bounded attempts, doubling backoff), adapted to an async HTTP call
//! over `reqwest` (the `kilometers-ai-kilometers-cli` manifest in the
//! retrieval pack depends on `reqwest` with `rustls-tls` for exactly
//! this kind of outbound call).

use std::time::Duration;

use async_trait::async_trait;

use crate::error::MetricsError;
use crate::snapshot::MetricsSnapshot;

const PUSH_RETRY_ATTEMPTS: u32 = 3;
const PUSH_RETRY_INITIAL_BACKOFF_MS: u64 = 200;
const PUSH_TOTAL_TIMEOUT: Duration = Duration::from_secs(30);

pub type PushOutcome = Result<(), MetricsError>;

/// A destination for the periodic metrics payload. Implementations
/// should not retry internally — [`PushSink::push`]'s default body
/// already applies `spec.md` §4.8's "3 attempts, exponential backoff"
/// policy around [`PushSink::deliver_once`].
#[async_trait]
pub trait PushSink: Send + Sync {
    /// A short name used in logs and error messages.
    fn name(&self) -> &str;

    /// Performs exactly one delivery attempt.
    async fn deliver_once(&self, snapshot: &MetricsSnapshot) -> Result<(), String>;

    /// Delivers `snapshot`, retrying up to `PUSH_RETRY_ATTEMPTS` times
    /// with exponential backoff, bounded overall by
    /// `PUSH_TOTAL_TIMEOUT`. Never panics; a final failure is returned
    /// to the caller to log, not propagated into the hot path.
    async fn push(&self, snapshot: &MetricsSnapshot) -> PushOutcome {
        let attempt_budget = tokio::time::timeout(PUSH_TOTAL_TIMEOUT, async {
            let mut backoff = Duration::from_millis(PUSH_RETRY_INITIAL_BACKOFF_MS);
            let mut last_error = String::new();
            for attempt in 0..PUSH_RETRY_ATTEMPTS {
                match self.deliver_once(snapshot).await {
                    Ok(()) => return Ok(()),
                    Err(message) => {
                        last_error = message;
                        if attempt + 1 < PUSH_RETRY_ATTEMPTS {
                            tokio::time::sleep(backoff).await;
                            backoff *= 2;
                        }
                    }
                }
            }
            Err(last_error)
        })
        .await;

        match attempt_budget {
            Ok(Ok(())) => Ok(()),
            Ok(Err(message)) => Err(MetricsError::PushFailed {
                sink: self.name().to_string(),
                attempts: PUSH_RETRY_ATTEMPTS,
                message,
            }),
            Err(_) => Err(MetricsError::PushFailed {
                sink: self.name().to_string(),
                attempts: PUSH_RETRY_ATTEMPTS,
                message: "push timed out before exhausting retries".to_string(),
            }),
        }
    }
}

/// Posts the snapshot as a JSON body to an arbitrary webhook URL. Covers
/// both "a webhook" and "a generic analytics sink" from `spec.md` §4.8 —
/// the payload shape is identical; only the destination URL and an
/// optional bearer token differ.
pub struct WebhookSink {
    name: String,
    url: String,
    bearer_token: Option<String>,
    client: reqwest::Client,
}

impl WebhookSink {
    pub fn new(name: impl Into<String>, url: impl Into<String>, bearer_token: Option<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            bearer_token,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl PushSink for WebhookSink {
    fn name(&self) -> &str {
        &self.name
    }

    async fn deliver_once(&self, snapshot: &MetricsSnapshot) -> Result<(), String> {
        let mut request = self.client.post(&self.url).json(snapshot);
        if let Some(token) = &self.bearer_token {
            request = request.bearer_auth(token);
        }
        let response = request.send().await.map_err(|e| e.to_string())?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(format!("sink responded with status {}", response.status()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use time::OffsetDateTime;

    fn sample_snapshot() -> MetricsSnapshot {
        MetricsSnapshot {
            generated_at: OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap(),
            total_flows: 0,
            success_rate: 1.0,
            grade_distribution: Default::default(),
            average_cognitive_load: crate::snapshot::AverageCognitiveLoad {
                prompt_complexity: 0.0,
                context_switching: 0.0,
                retry_frustration: 0.0,
                configuration_friction: 0.0,
                integration_cognition: 0.0,
                composite: 0.0,
            },
            tool_call_counts: Default::default(),
            captures_dropped: 0,
            capture_errors: 0,
        }
    }

    struct FlakySink {
        fail_until_attempt: u32,
        attempts: AtomicU32,
    }

    #[async_trait]
    impl PushSink for FlakySink {
        fn name(&self) -> &str {
            "flaky"
        }

        async fn deliver_once(&self, _snapshot: &MetricsSnapshot) -> Result<(), String> {
            let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
            if attempt < self.fail_until_attempt {
                Err("not yet".to_string())
            } else {
                Ok(())
            }
        }
    }

    struct AlwaysFailsSink;

    #[async_trait]
    impl PushSink for AlwaysFailsSink {
        fn name(&self) -> &str {
            "always-fails"
        }

        async fn deliver_once(&self, _snapshot: &MetricsSnapshot) -> Result<(), String> {
            Err("boom".to_string())
        }
    }

    #[tokio::test]
    async fn succeeds_after_transient_failures_within_retry_budget() {
        let sink = FlakySink { fail_until_attempt: 2, attempts: AtomicU32::new(0) };
        let result = sink.push(&sample_snapshot()).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn gives_up_after_exhausting_retries() {
        let sink = AlwaysFailsSink;
        let result = sink.push(&sample_snapshot()).await;
        match result {
            Err(MetricsError::PushFailed { attempts, .. }) => assert_eq!(attempts, PUSH_RETRY_ATTEMPTS),
            other => panic!("expected PushFailed, got {other:?}"),
        }
    }
}
