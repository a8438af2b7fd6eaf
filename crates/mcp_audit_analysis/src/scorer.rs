//! The five-dimension cognitive-load scorer (`spec.md` §4.6). All
//! scoring is rule-based arithmetic over a bounded feature set: the
//! same flow always produces the same score (`spec.md` §8 property 4).

use std::collections::HashMap;

use mcp_audit_model::{
    CognitiveLoadComponents, ConfigurationFrictionBreakdown, Flow, Grade, RetryFrustrationBreakdown,
    ScorerThresholds, ScorerWeights,
};

const DOMAIN_TERMS: &[&str] = &[
    "authentication",
    "config",
    "api",
    "schema",
    "protocol",
    "token",
    "credential",
    "endpoint",
];
const DOMAIN_TERM_CAP: u32 = 3;
const CONNECTIVES: &[&str] = &["if", "when", "filter", "transform", "unless", "while", "until"];
const REFERENCE_VERBS: &[&str] = &["use", "call", "fetch", "create", "delete", "update", "get", "set"];

const RETRY_ERROR_KEYWORDS: &[&str] = &["timeout", "failed", "denied", "unavailable", "refused", "unable"];
const CONFIG_KEYWORDS: &[&str] = &["config", "setup", "missing", "invalid", "permission", "unauthorized"];

/// Scores a single flow, producing all five sub-scores plus the
/// weighted composite and letter grade.
pub fn score_flow(flow: &Flow, weights: &ScorerWeights, thresholds: &ScorerThresholds) -> CognitiveLoadComponents {
    let prompt_complexity = score_prompt_complexity(&flow.user_prompt);
    let context_switching = score_context_switching(flow);
    let (retry_frustration, retry_breakdown) = score_retry_frustration(flow, thresholds);
    let (configuration_friction, config_breakdown) = score_configuration_friction(flow, thresholds);
    let integration_cognition = score_integration_cognition(flow);

    let composite = weights.prompt_complexity * prompt_complexity
        + weights.context_switching * context_switching
        + weights.retry_frustration * retry_frustration
        + weights.configuration_friction * configuration_friction
        + weights.integration_cognition * integration_cognition;
    let grade = Grade::from_composite(composite);

    CognitiveLoadComponents {
        prompt_complexity,
        context_switching,
        retry_frustration,
        configuration_friction,
        integration_cognition,
        composite,
        grade,
        retry_frustration_breakdown: retry_breakdown,
        configuration_friction_breakdown: config_breakdown,
    }
}

/// Aggregates per-flow components into a single aggregate score by
/// averaging each sub-score across flows, then recomputing the
/// composite/grade from the averaged sub-scores — keeps the weighted
/// formula as the single source of truth for the composite.
pub fn score_aggregate(
    flows: &[Flow],
    weights: &ScorerWeights,
    thresholds: &ScorerThresholds,
) -> CognitiveLoadComponents {
    if flows.is_empty() {
        return CognitiveLoadComponents {
            prompt_complexity: 0.0,
            context_switching: 0.0,
            retry_frustration: 0.0,
            configuration_friction: 0.0,
            integration_cognition: 0.0,
            composite: 0.0,
            grade: Grade::A,
            retry_frustration_breakdown: RetryFrustrationBreakdown::default(),
            configuration_friction_breakdown: ConfigurationFrictionBreakdown::default(),
        };
    }

    let per_flow: Vec<CognitiveLoadComponents> =
        flows.iter().map(|f| score_flow(f, weights, thresholds)).collect();
    let n = per_flow.len() as f64;
    let avg = |f: fn(&CognitiveLoadComponents) -> f64| per_flow.iter().map(f).sum::<f64>() / n;

    let prompt_complexity = avg(|c| c.prompt_complexity);
    let context_switching = avg(|c| c.context_switching);
    let retry_frustration = avg(|c| c.retry_frustration);
    let configuration_friction = avg(|c| c.configuration_friction);
    let integration_cognition = avg(|c| c.integration_cognition);

    let composite = weights.prompt_complexity * prompt_complexity
        + weights.context_switching * context_switching
        + weights.retry_frustration * retry_frustration
        + weights.configuration_friction * configuration_friction
        + weights.integration_cognition * integration_cognition;

    // The aggregate breakdown surfaces totals across all flows rather
    // than an average, since "2 retries" reads more usefully summed
    // than fractional.
    let retry_breakdown = RetryFrustrationBreakdown {
        base: per_flow.iter().map(|c| c.retry_frustration_breakdown.base).sum::<f64>() / n,
        retry_penalty: per_flow.iter().map(|c| c.retry_frustration_breakdown.retry_penalty).sum(),
        retry_count: per_flow.iter().map(|c| c.retry_frustration_breakdown.retry_count).sum(),
        failure_penalty: per_flow.iter().map(|c| c.retry_frustration_breakdown.failure_penalty).sum(),
        error_penalty: per_flow.iter().map(|c| c.retry_frustration_breakdown.error_penalty).sum(),
        latency_penalty: per_flow
            .iter()
            .map(|c| c.retry_frustration_breakdown.latency_penalty)
            .fold(0.0, f64::max),
        latency_ms: per_flow.iter().filter_map(|c| c.retry_frustration_breakdown.latency_ms).max(),
        latency_threshold_ms: per_flow
            .iter()
            .filter_map(|c| c.retry_frustration_breakdown.latency_threshold_ms)
            .min(),
        explanations: per_flow
            .iter()
            .flat_map(|c| c.retry_frustration_breakdown.explanations.clone())
            .collect(),
    };
    let config_breakdown = ConfigurationFrictionBreakdown {
        base: per_flow
            .iter()
            .map(|c| c.configuration_friction_breakdown.base)
            .sum::<f64>()
            / n,
        auth_penalty: per_flow.iter().map(|c| c.configuration_friction_breakdown.auth_penalty).sum(),
        param_penalty: per_flow.iter().map(|c| c.configuration_friction_breakdown.param_penalty).sum(),
        keyword_penalty: per_flow
            .iter()
            .map(|c| c.configuration_friction_breakdown.keyword_penalty)
            .sum(),
        latency_penalty: per_flow
            .iter()
            .map(|c| c.configuration_friction_breakdown.latency_penalty)
            .fold(0.0, f64::max),
        explanations: per_flow
            .iter()
            .flat_map(|c| c.configuration_friction_breakdown.explanations.clone())
            .collect(),
    };

    CognitiveLoadComponents {
        prompt_complexity,
        context_switching,
        retry_frustration,
        configuration_friction,
        integration_cognition,
        composite,
        grade: Grade::from_composite(composite),
        retry_frustration_breakdown: retry_breakdown,
        configuration_friction_breakdown: config_breakdown,
    }
}

fn clamp(value: f64) -> f64 {
    value.clamp(0.0, 100.0)
}

fn score_prompt_complexity(prompt: &str) -> f64 {
    let lower = prompt.to_lowercase();
    let mut score = 20.0;

    let domain_hits = DOMAIN_TERMS.iter().filter(|term| lower.contains(**term)).count() as u32;
    score += 8.0 * domain_hits.min(DOMAIN_TERM_CAP) as f64;

    let connective_hits = CONNECTIVES
        .iter()
        .filter(|word| lower.split_whitespace().any(|w| w.trim_matches(|c: char| !c.is_alphanumeric()) == **word))
        .count() as f64;
    score += 10.0 * connective_hits;

    let len = prompt.len();
    score += match len {
        0..=29 => 0.0,
        30..=80 => 5.0,
        _ => 10.0,
    };

    if lower.chars().any(|c| c.is_ascii_digit()) {
        score += 5.0;
    }
    let verb_hits = REFERENCE_VERBS
        .iter()
        .filter(|word| lower.split_whitespace().any(|w| w.trim_matches(|c: char| !c.is_alphanumeric()) == **word))
        .count();
    if verb_hits >= 2 {
        score += 5.0;
    }

    clamp(score)
}

fn score_context_switching(flow: &Flow) -> f64 {
    let changes = crate::reconstructor::count_direction_changes(&flow.timeline);
    clamp(20.0 + 15.0 * changes as f64)
}

fn score_retry_frustration(
    flow: &Flow,
    thresholds: &ScorerThresholds,
) -> (f64, RetryFrustrationBreakdown) {
    let base = 10.0;

    let mut seen: HashMap<(String, String, String), u32> = HashMap::new();
    for call in &flow.mcp_calls {
        let key = (
            call.request.server.clone(),
            call.tool_name.clone(),
            call.arguments.to_string(),
        );
        *seen.entry(key).or_insert(0) += 1;
    }
    let retry_count: u32 = seen.values().map(|&count| count.saturating_sub(1)).sum();
    let retry_penalty = 25.0 * retry_count as f64;

    let failed_calls = flow.mcp_calls.iter().filter(|c| c.failed()).count() as f64;
    let failure_penalty = 30.0 * failed_calls;

    let error_keyword_hits: usize = flow
        .mcp_calls
        .iter()
        .filter_map(|c| c.response.as_ref())
        .filter_map(|r| r.error_message())
        .map(|msg| {
            let lower = msg.to_lowercase();
            RETRY_ERROR_KEYWORDS.iter().filter(|kw| lower.contains(**kw)).count()
        })
        .sum();
    let error_penalty = 5.0 * error_keyword_hits as f64;

    let max_latency_ms = flow.mcp_calls.iter().filter_map(|c| c.response.as_ref()).filter_map(|r| r.latency_ms).max();
    let (latency_penalty, latency_threshold_ms) = match max_latency_ms {
        Some(ms) if ms >= thresholds.retry_latency_high_ms => (20.0, Some(thresholds.retry_latency_high_ms)),
        Some(ms) if ms >= thresholds.retry_latency_medium_ms => (10.0, Some(thresholds.retry_latency_medium_ms)),
        Some(ms) if ms >= thresholds.retry_latency_low_ms => (5.0, Some(thresholds.retry_latency_low_ms)),
        _ => (0.0, None),
    };

    let mut explanations = Vec::new();
    if retry_count > 0 {
        explanations.push(format!("{retry_count} retry attempt(s) (+{retry_penalty})"));
    }
    if failed_calls > 0.0 {
        explanations.push(format!("{failed_calls} failed call(s) (+{failure_penalty})"));
    }
    if error_keyword_hits > 0 {
        explanations.push(format!("{error_keyword_hits} error keyword hit(s) (+{error_penalty})"));
    }
    if latency_penalty > 0.0 {
        explanations.push(format!(
            "latency reached {}ms (+{latency_penalty})",
            max_latency_ms.unwrap_or(0)
        ));
    }

    let total = clamp(base + retry_penalty + failure_penalty + error_penalty + latency_penalty);
    let breakdown = RetryFrustrationBreakdown {
        base,
        retry_penalty,
        retry_count,
        failure_penalty,
        error_penalty,
        latency_penalty,
        latency_ms: max_latency_ms,
        latency_threshold_ms,
        explanations,
    };
    (total, breakdown)
}

fn score_configuration_friction(
    flow: &Flow,
    thresholds: &ScorerThresholds,
) -> (f64, ConfigurationFrictionBreakdown) {
    let base = 10.0;

    let auth_errors = flow
        .mcp_calls
        .iter()
        .filter_map(|c| c.response.as_ref())
        .filter_map(|r| r.error_code())
        .filter(|code| *code == 401 || *code == 403)
        .count() as f64;
    let auth_penalty = (25.0 * auth_errors).min(50.0);

    let param_errors = flow
        .mcp_calls
        .iter()
        .filter_map(|c| c.response.as_ref())
        .filter_map(|r| r.error_code())
        .filter(|code| *code == 400 || *code == 422)
        .count() as f64;
    let param_penalty = 15.0 * param_errors;

    let keyword_hits: usize = flow
        .mcp_calls
        .iter()
        .filter_map(|c| c.response.as_ref())
        .filter_map(|r| r.error_message())
        .map(|msg| {
            let lower = msg.to_lowercase();
            CONFIG_KEYWORDS.iter().filter(|kw| lower.contains(**kw)).count()
        })
        .sum();
    let keyword_penalty = 8.0 * keyword_hits as f64;

    let over_threshold = flow
        .mcp_calls
        .iter()
        .filter_map(|c| c.response.as_ref())
        .filter_map(|r| r.latency_ms)
        .any(|ms| ms > thresholds.configuration_latency_ms);
    let latency_penalty = if over_threshold { 15.0 } else { 0.0 };

    let mut explanations = Vec::new();
    if auth_errors > 0.0 {
        explanations.push(format!("{auth_errors} auth error(s) (+{auth_penalty})"));
    }
    if param_errors > 0.0 {
        explanations.push(format!("{param_errors} parameter error(s) (+{param_penalty})"));
    }
    if keyword_hits > 0 {
        explanations.push(format!("{keyword_hits} config keyword hit(s) (+{keyword_penalty})"));
    }
    if latency_penalty > 0.0 {
        explanations.push(format!(
            "latency exceeded {}ms (+{latency_penalty})",
            thresholds.configuration_latency_ms
        ));
    }

    let total = clamp(base + auth_penalty + param_penalty + keyword_penalty + latency_penalty);
    let breakdown = ConfigurationFrictionBreakdown {
        base,
        auth_penalty,
        param_penalty,
        keyword_penalty,
        latency_penalty,
        explanations,
    };
    (total, breakdown)
}

fn score_integration_cognition(flow: &Flow) -> f64 {
    let mut score = 20.0;

    let distinct_directions = {
        let mut set = std::collections::HashSet::new();
        for event in &flow.timeline {
            if let Some(direction) = event.direction() {
                set.insert(direction);
            }
        }
        set.len()
    };
    if distinct_directions > 1 {
        score += 10.0 * (distinct_directions - 1) as f64;
    }

    let distinct_methods: std::collections::HashSet<&str> = flow
        .timeline
        .iter()
        .filter_map(|e| match e {
            mcp_audit_model::TimelineEvent::Message(m) => m.method(),
            mcp_audit_model::TimelineEvent::Decision(_) => None,
        })
        .collect();
    score += 3.0 * distinct_methods.len() as f64;

    if distinct_methods.len() <= 3 && flow.servers_involved.len() <= 1 {
        score -= 15.0;
    }

    clamp(score)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mcp_audit_model::{Direction, McpCall, RawMessageRecord, TimelineEvent};
    use serde_json::json;
    use time::OffsetDateTime;

    fn base_flow() -> Flow {
        Flow {
            flow_id: "1".into(),
            start_time: OffsetDateTime::now_utc(),
            end_time: OffsetDateTime::now_utc(),
            duration_ms: 100,
            event_count: 0,
            servers_involved: vec!["serverA".into()],
            cross_server_flow: false,
            mcp_calls: Vec::new(),
            llm_decisions: Vec::new(),
            timeline: Vec::new(),
            success: true,
            has_user_context: false,
            user_prompt: "[Inferred]".into(),
            llm_reasoning: String::new(),
        }
    }

    fn request(id: u64) -> RawMessageRecord {
        RawMessageRecord::new(
            OffsetDateTime::now_utc(),
            Direction::HostToServer,
            "vscode",
            "serverA",
            json!({"jsonrpc":"2.0","id":id,"method":"tools/call","params":{"name":"getWeather","arguments":{"city":"London"}}}),
        )
    }

    fn response_with_error(id: u64, code: i64, message: &str, latency_ms: u64) -> RawMessageRecord {
        let mut r = RawMessageRecord::new(
            OffsetDateTime::now_utc(),
            Direction::ServerToHost,
            "vscode",
            "serverA",
            json!({"jsonrpc":"2.0","id":id,"error":{"code":code,"message":message}}),
        );
        r.latency_ms = Some(latency_ms);
        r
    }

    #[test]
    fn happy_path_has_low_composite_and_grade_a() {
        let mut flow = base_flow();
        flow.timeline = vec![TimelineEvent::Message(request(1))];
        let components = score_flow(&flow, &ScorerWeights::default(), &ScorerThresholds::default());
        assert!(components.composite < 20.0);
        assert_eq!(components.grade, Grade::A);
    }

    #[test]
    fn retries_and_failures_push_grade_to_c_or_worse() {
        let mut flow = base_flow();
        let tool_call = |id: u64, code: i64| McpCall {
            tool_name: "getWeather".into(),
            arguments: json!({"city":"London"}),
            request: request(id),
            response: Some(response_with_error(id, code, "invalid params", 100)),
        };
        flow.mcp_calls = vec![tool_call(1, -32602), tool_call(2, -32602), tool_call(3, -32602)];
        let components = score_flow(&flow, &ScorerWeights::default(), &ScorerThresholds::default());
        assert!(components.retry_frustration >= 60.0);
        assert!(components.grade >= Grade::C);
    }

    #[test]
    fn repeated_auth_errors_cap_at_fifty_and_trigger_high_friction() {
        let mut flow = base_flow();
        flow.mcp_calls = vec![
            McpCall {
                tool_name: "getWeather".into(),
                arguments: json!({}),
                request: request(1),
                response: Some(response_with_error(1, 401, "unauthorized", 100)),
            },
            McpCall {
                tool_name: "getWeather".into(),
                arguments: json!({}),
                request: request(2),
                response: Some(response_with_error(2, 401, "unauthorized", 100)),
            },
        ];
        let components = score_flow(&flow, &ScorerWeights::default(), &ScorerThresholds::default());
        assert_eq!(components.configuration_friction_breakdown.auth_penalty, 50.0);
        assert!(components.configuration_friction >= 45.0);
    }

    #[test]
    fn weight_sum_identity_holds_for_default_weights() {
        let w = ScorerWeights::default();
        let sum = w.prompt_complexity
            + w.context_switching
            + w.retry_frustration
            + w.configuration_friction
            + w.integration_cognition;
        assert!((sum - 1.0).abs() < 1e-9);
    }

    #[test]
    fn grade_monotonicity_holds_for_component_wise_dominance() {
        let weights = ScorerWeights::default();
        let thresholds = ScorerThresholds::default();
        let mut low = base_flow();
        low.user_prompt = "hi".into();
        let mut high = base_flow();
        high.mcp_calls = vec![McpCall {
            tool_name: "x".into(),
            arguments: json!({}),
            request: request(1),
            response: Some(response_with_error(1, 401, "unauthorized config missing", 40_000)),
        }];
        high.user_prompt = "hi".into();

        let low_components = score_flow(&low, &weights, &thresholds);
        let high_components = score_flow(&high, &weights, &thresholds);
        assert!(low_components.composite <= high_components.composite);
        assert!(low_components.grade <= high_components.grade);
    }
}
