use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// Which way a captured message was travelling on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    HostToServer,
    ServerToHost,
}

/// The atomic unit of capture: one JSON-RPC message observed on a pipe,
/// timestamped and attributed to a `(host, server)` pair.
///
/// Invariant: once written to the message store a record is never
/// mutated; the store only ever appends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawMessageRecord {
    pub id: String,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    pub direction: Direction,
    pub host: String,
    pub server: String,
    pub payload: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
}

impl RawMessageRecord {
    pub fn new(
        timestamp: OffsetDateTime,
        direction: Direction,
        host: impl Into<String>,
        server: impl Into<String>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            timestamp,
            direction,
            host: host.into(),
            server: server.into(),
            payload,
            latency_ms: None,
        }
    }

    /// The JSON-RPC `id` field of the payload, if present, rendered as a
    /// string for use as a correlation key. JSON-RPC ids may be numbers
    /// or strings on the wire; both map to the same key space here.
    pub fn payload_id(&self) -> Option<String> {
        self.payload.get("id").map(|v| match v {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        })
    }

    pub fn method(&self) -> Option<&str> {
        self.payload.get("method").and_then(|v| v.as_str())
    }

    /// A response has no `method` but carries `result` or `error`.
    pub fn is_response(&self) -> bool {
        self.payload.get("method").is_none()
            && (self.payload.get("result").is_some() || self.payload.get("error").is_some())
    }

    pub fn is_request(&self) -> bool {
        self.payload.get("method").is_some()
    }

    pub fn error_code(&self) -> Option<i64> {
        self.payload.get("error")?.get("code")?.as_i64()
    }

    pub fn error_message(&self) -> Option<&str> {
        self.payload.get("error")?.get("message")?.as_str()
    }
}

/// One tool invocation as seen in an `LlmDecisionRecord::tool_calls` list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub tool_name: String,
    pub arguments: serde_json::Value,
    pub call_id: String,
}

/// Optional sibling stream produced by a host adapter when it can observe
/// the host's own reasoning about which tools to call. When absent, flows
/// carry `has_user_context = false` and synthesize placeholder text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmDecisionRecord {
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    pub user_prompt: String,
    pub reasoning: String,
    pub tools_considered: Vec<String>,
    pub tools_selected: Vec<String>,
    pub tool_calls: Vec<ToolCall>,
    pub processing_time_ms: u64,
    pub confidence_score: f64,
    pub success: bool,
}

impl LlmDecisionRecord {
    pub const INFERRED_PROMPT: &'static str = "[Inferred]";

    pub fn is_inferred(&self) -> bool {
        self.user_prompt == Self::INFERRED_PROMPT || self.reasoning.starts_with("[Inferred]")
    }
}

/// One `tools/call` request paired with its (possibly absent) response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct McpCall {
    pub tool_name: String,
    pub arguments: serde_json::Value,
    pub request: RawMessageRecord,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<RawMessageRecord>,
}

impl McpCall {
    pub fn failed(&self) -> bool {
        self.response
            .as_ref()
            .is_some_and(|r| r.payload.get("error").is_some())
    }

    pub fn succeeded(&self) -> bool {
        self.response.is_some() && !self.failed()
    }
}

/// A single entry in a flow's merged timeline: either a raw message or a
/// correlated LLM decision, ordered by timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TimelineEvent {
    Message(RawMessageRecord),
    Decision(LlmDecisionRecord),
}

impl TimelineEvent {
    pub fn timestamp(&self) -> OffsetDateTime {
        match self {
            TimelineEvent::Message(m) => m.timestamp,
            TimelineEvent::Decision(d) => d.timestamp,
        }
    }

    pub fn direction(&self) -> Option<Direction> {
        match self {
            TimelineEvent::Message(m) => Some(m.direction),
            TimelineEvent::Decision(_) => None,
        }
    }
}

/// A cluster of messages (and correlated decisions) grouped by timestamp
/// proximity, representing one user-perceived interaction. Flows are
/// never stored — they are recomputed on demand by the reconstructor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Flow {
    pub flow_id: String,
    #[serde(with = "time::serde::rfc3339")]
    pub start_time: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub end_time: OffsetDateTime,
    pub duration_ms: i64,
    pub event_count: usize,
    pub servers_involved: Vec<String>,
    pub cross_server_flow: bool,
    pub mcp_calls: Vec<McpCall>,
    pub llm_decisions: Vec<LlmDecisionRecord>,
    pub timeline: Vec<TimelineEvent>,
    pub success: bool,
    pub has_user_context: bool,
    pub user_prompt: String,
    pub llm_reasoning: String,
}

/// Letter grade assigned from a composite cognitive-load score. Declared
/// in ascending quality-of-grade order (`A` best) so the derived `Ord`
/// matches `spec.md`'s "A ≤ B ≤ ... ≤ F" monotonicity property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Grade {
    A,
    B,
    C,
    D,
    F,
}

impl Grade {
    /// Thresholds are inclusive upper bounds: A:[0,20], B:[21,40],
    /// C:[41,60], D:[61,80], F:[81,100].
    pub fn from_composite(score: f64) -> Self {
        if score <= 20.0 {
            Grade::A
        } else if score <= 40.0 {
            Grade::B
        } else if score <= 60.0 {
            Grade::C
        } else if score <= 80.0 {
            Grade::D
        } else {
            Grade::F
        }
    }
}

impl std::fmt::Display for Grade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let letter = match self {
            Grade::A => "A",
            Grade::B => "B",
            Grade::C => "C",
            Grade::D => "D",
            Grade::F => "F",
        };
        f.write_str(letter)
    }
}

/// Detailed arithmetic breakdown for one cognitive-load sub-score, kept
/// alongside the numeric value so reports can show their work.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RetryFrustrationBreakdown {
    pub base: f64,
    pub retry_penalty: f64,
    pub retry_count: u32,
    pub failure_penalty: f64,
    pub error_penalty: f64,
    pub latency_penalty: f64,
    pub latency_ms: Option<u64>,
    pub latency_threshold_ms: Option<u64>,
    pub explanations: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigurationFrictionBreakdown {
    pub base: f64,
    pub auth_penalty: f64,
    pub param_penalty: f64,
    pub keyword_penalty: f64,
    pub latency_penalty: f64,
    pub explanations: Vec<String>,
}

/// The five weighted cognitive-load sub-scores plus their composite and
/// letter grade, each scaled `[0,100]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CognitiveLoadComponents {
    pub prompt_complexity: f64,
    pub context_switching: f64,
    pub retry_frustration: f64,
    pub configuration_friction: f64,
    pub integration_cognition: f64,
    pub composite: f64,
    pub grade: Grade,
    pub retry_frustration_breakdown: RetryFrustrationBreakdown,
    pub configuration_friction_breakdown: ConfigurationFrictionBreakdown,
}

impl CognitiveLoadComponents {
    pub fn usability_score(&self) -> f64 {
        (100.0 - self.composite).max(0.0)
    }
}
