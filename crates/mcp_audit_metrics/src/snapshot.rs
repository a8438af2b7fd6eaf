use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use mcp_audit_analysis::{reconstruct_flows, score_aggregate};
use mcp_audit_model::{Flow, LlmDecisionRecord, RawMessageRecord, ScorerThresholds, ScorerWeights};

/// Lock-free counters that live for the lifetime of the proxy process,
/// mirroring the corpus's own `AtomicMetrics` (plain `AtomicU64` fields,
/// `Relaxed` ordering, a `snapshot()` that reads them into a
/// serializable struct). These are the only fields that accumulate
/// across the process lifetime; everything else in a [`MetricsSnapshot`]
/// is re-derived fresh from the current window on every export tick.
#[derive(Debug, Default)]
pub struct AtomicMetrics {
    pub captures_dropped: AtomicU64,
    pub capture_errors: AtomicU64,
}

impl AtomicMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_captures_dropped(&self, count: u64) {
        self.captures_dropped.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_capture_error(&self) {
        self.capture_errors.fetch_add(1, Ordering::Relaxed);
    }
}

/// One point-in-time view of system health, recomputed at most once per
/// `export_interval_seconds` (`spec.md` §4.8) from a sliding-window
/// reconstruction of the message store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    #[serde(with = "time::serde::rfc3339")]
    pub generated_at: OffsetDateTime,
    pub total_flows: u64,
    pub success_rate: f64,
    pub grade_distribution: HashMap<String, u64>,
    pub average_cognitive_load: AverageCognitiveLoad,
    pub tool_call_counts: HashMap<String, u64>,
    pub captures_dropped: u64,
    pub capture_errors: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AverageCognitiveLoad {
    pub prompt_complexity: f64,
    pub context_switching: f64,
    pub retry_frustration: f64,
    pub configuration_friction: f64,
    pub integration_cognition: f64,
    pub composite: f64,
}

/// Rebuilds flows from `records`/`decisions` within the sliding window and
/// folds them into a [`MetricsSnapshot`], reading the atomic counters for
/// the capture-health fields.
pub fn build_snapshot(
    metrics: &AtomicMetrics,
    records: &[RawMessageRecord],
    decisions: &[LlmDecisionRecord],
    window: time::Duration,
    weights: &ScorerWeights,
    thresholds: &ScorerThresholds,
    generated_at: OffsetDateTime,
) -> MetricsSnapshot {
    let flows = reconstruct_flows(records, decisions, window);
    let aggregate = score_aggregate(&flows, weights, thresholds);

    let total_flows = flows.len() as u64;
    let successful = flows.iter().filter(|f| f.success).count() as u64;
    let success_rate = if total_flows == 0 { 1.0 } else { successful as f64 / total_flows as f64 };

    let grade_distribution = grade_distribution(&flows, weights, thresholds);
    let tool_call_counts = tool_call_counts_from_flows(&flows);

    MetricsSnapshot {
        generated_at,
        total_flows,
        success_rate,
        grade_distribution,
        average_cognitive_load: AverageCognitiveLoad {
            prompt_complexity: aggregate.prompt_complexity,
            context_switching: aggregate.context_switching,
            retry_frustration: aggregate.retry_frustration,
            configuration_friction: aggregate.configuration_friction,
            integration_cognition: aggregate.integration_cognition,
            composite: aggregate.composite,
        },
        tool_call_counts,
        captures_dropped: metrics.captures_dropped.load(Ordering::Relaxed),
        capture_errors: metrics.capture_errors.load(Ordering::Relaxed),
    }
}

fn grade_distribution(flows: &[Flow], weights: &ScorerWeights, thresholds: &ScorerThresholds) -> HashMap<String, u64> {
    let mut distribution = HashMap::new();
    for flow in flows {
        let components = mcp_audit_analysis::score_flow(flow, weights, thresholds);
        *distribution.entry(components.grade.to_string()).or_insert(0) += 1;
    }
    distribution
}

fn tool_call_counts_from_flows(flows: &[Flow]) -> HashMap<String, u64> {
    let mut counts = HashMap::new();
    for flow in flows {
        for call in &flow.mcp_calls {
            *counts.entry(call.tool_name.clone()).or_insert(0) += 1;
        }
    }
    counts
}
