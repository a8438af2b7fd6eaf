//! Shared record types, the stdio framing codec, and runtime
//! configuration for the MCP cognitive-observability agent.
//!
//! Every other crate in this workspace depends on this one for its
//! vocabulary: a capture never leaves this crate's types, and a score
//! never leaves [`ScoringConfig`]'s weight table.

#![forbid(unsafe_code)]

pub mod error;
pub mod framing;
pub mod records;
pub mod scoring_config;

pub use error::ModelError;
pub use framing::{parse_jsonrpc_line, AccumulatedLine, LineAccumulator, DEFAULT_MAX_LINE_BYTES};
pub use records::{
    CognitiveLoadComponents, ConfigurationFrictionBreakdown, Direction, Flow, Grade,
    LlmDecisionRecord, McpCall, RawMessageRecord, RetryFrustrationBreakdown, TimelineEvent,
    ToolCall,
};
pub use scoring_config::{ScorerThresholds, ScorerWeights, ScoringConfig};
