//! Groups a slice of the message store into [`Flow`]s by timestamp
//! proximity (`spec.md` §4.5). Flows are ephemeral: recomputed on every
//! call, never persisted.

use time::{Duration, OffsetDateTime};

use mcp_audit_model::{Direction, Flow, LlmDecisionRecord, McpCall, RawMessageRecord, TimelineEvent};

const DECISION_CORRELATION_PAD: Duration = Duration::seconds(1);

/// Rebuilds flows from a (already time/server-filtered) slice of raw
/// records plus the optional correlated LLM decision stream. `window`
/// is the maximum gap between consecutive records (by timestamp) for
/// them to belong to the same flow.
pub fn reconstruct_flows(
    records: &[RawMessageRecord],
    decisions: &[LlmDecisionRecord],
    window: Duration,
) -> Vec<Flow> {
    if records.is_empty() {
        return Vec::new();
    }

    let mut sorted: Vec<&RawMessageRecord> = records.iter().collect();
    sorted.sort_by_key(|r| r.timestamp);

    let mut groups: Vec<Vec<&RawMessageRecord>> = Vec::new();
    let mut current: Vec<&RawMessageRecord> = Vec::new();
    for record in sorted {
        if let Some(last) = current.last() {
            if record.timestamp - last.timestamp > window {
                groups.push(std::mem::take(&mut current));
            }
        }
        current.push(record);
    }
    if !current.is_empty() {
        groups.push(current);
    }

    groups.into_iter().map(|g| build_flow(&g, decisions)).collect()
}

fn build_flow(group: &[&RawMessageRecord], decisions: &[LlmDecisionRecord]) -> Flow {
    let start_time = group.first().expect("non-empty group").timestamp;
    let end_time = group.last().expect("non-empty group").timestamp;
    let duration_ms = (end_time - start_time).whole_milliseconds() as i64;

    let mut servers_involved: Vec<String> = Vec::new();
    for record in group {
        if !servers_involved.contains(&record.server) {
            servers_involved.push(record.server.clone());
        }
    }
    let cross_server_flow = servers_involved.len() > 1;

    let mcp_calls = collect_mcp_calls(group);
    let success = mcp_calls.iter().all(|c| c.response.is_some() && !c.failed());

    let correlated_decisions: Vec<LlmDecisionRecord> = {
        let mut matched: Vec<LlmDecisionRecord> = decisions
            .iter()
            .filter(|d| {
                d.timestamp >= start_time - DECISION_CORRELATION_PAD
                    && d.timestamp <= end_time + DECISION_CORRELATION_PAD
            })
            .cloned()
            .collect();
        matched.sort_by_key(|d| d.timestamp);
        matched
    };

    let mut timeline: Vec<TimelineEvent> = group
        .iter()
        .map(|r| TimelineEvent::Message((*r).clone()))
        .chain(correlated_decisions.iter().cloned().map(TimelineEvent::Decision))
        .collect();
    timeline.sort_by_key(|e| e.timestamp());

    let (has_user_context, user_prompt, llm_reasoning) = match correlated_decisions.first() {
        Some(decision) => (true, decision.user_prompt.clone(), decision.reasoning.clone()),
        None => (
            false,
            LlmDecisionRecord::INFERRED_PROMPT.to_string(),
            format!("[Inferred] derived from {} observed message(s)", group.len()),
        ),
    };

    Flow {
        flow_id: start_time.unix_timestamp().to_string(),
        start_time,
        end_time,
        duration_ms,
        event_count: timeline.len(),
        servers_involved,
        cross_server_flow,
        mcp_calls,
        llm_decisions: correlated_decisions,
        timeline,
        success,
        has_user_context,
        user_prompt,
        llm_reasoning,
    }
}

fn collect_mcp_calls(group: &[&RawMessageRecord]) -> Vec<McpCall> {
    let mut calls = Vec::new();
    for record in group {
        if record.method() != Some("tools/call") {
            continue;
        }
        let params = record.payload.get("params");
        let tool_name = params
            .and_then(|p| p.get("name"))
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .to_string();
        let arguments = params
            .and_then(|p| p.get("arguments"))
            .cloned()
            .unwrap_or(serde_json::Value::Null);

        let request_id = record.payload_id();
        let response = group
            .iter()
            .find(|candidate| {
                candidate.is_response()
                    && candidate.server == record.server
                    && candidate.payload_id() == request_id
                    && candidate.direction != record.direction
            })
            .map(|r| (*r).clone());

        calls.push(McpCall {
            tool_name,
            arguments,
            request: (*record).clone(),
            response,
        });
    }
    calls
}

/// Count of adjacent direction changes within a flow's timeline — only
/// `Message` entries carry a direction; `Decision` entries are skipped
/// when looking for the previous/next direction to compare against.
pub fn count_direction_changes(timeline: &[TimelineEvent]) -> u32 {
    let directions: Vec<Direction> = timeline.iter().filter_map(|e| e.direction()).collect();
    directions.windows(2).filter(|w| w[0] != w[1]).count() as u32
}
