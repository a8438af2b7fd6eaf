//! Serializes the three report families (`spec.md` §4.7): `trace`,
//! `detailed`, and `usability`, each in `json`, `html`, or `txt`.

use serde::Serialize;
use time::OffsetDateTime;

use mcp_audit_model::{CognitiveLoadComponents, Flow, ScorerWeights};

use crate::error::AnalysisError;

pub const REPORT_VERSION: &str = "1";
pub const ALGORITHM_NAME: &str = "timestamp-proximity-cognitive-load-v1";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportType {
    Trace,
    Detailed,
    Usability,
}

impl ReportType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportType::Trace => "trace",
            ReportType::Detailed => "detailed",
            ReportType::Usability => "usability",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Json,
    Html,
    Txt,
}

impl ReportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ReportFormat::Json => "json",
            ReportFormat::Html => "html",
            ReportFormat::Txt => "txt",
        }
    }

    pub fn parse(s: &str) -> Result<Self, AnalysisError> {
        match s {
            "json" => Ok(ReportFormat::Json),
            "html" => Ok(ReportFormat::Html),
            "txt" => Ok(ReportFormat::Txt),
            other => Err(AnalysisError::UnsupportedFormat(other.to_string())),
        }
    }
}

/// `trace`: only raw flows restricted to the MCP-side span — no LLM
/// decisions, no scoring.
#[derive(Debug, Clone, Serialize)]
pub struct TraceReport {
    pub flows: Vec<TraceFlow>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TraceFlow {
    pub flow_id: String,
    #[serde(with = "time::serde::rfc3339")]
    pub start_time: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub end_time: OffsetDateTime,
    pub mcp_calls: Vec<mcp_audit_model::McpCall>,
    pub timeline: Vec<mcp_audit_model::TimelineEvent>,
}

/// `detailed`: adds the full LLM decision stream and a `meta` block.
#[derive(Debug, Clone, Serialize)]
pub struct DetailedReport {
    pub meta: ReportMeta,
    pub flows: Vec<DetailedFlow>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportMeta {
    pub report_version: &'static str,
    pub algorithm: &'static str,
    pub time_window_seconds: u64,
    pub data_sources: Vec<&'static str>,
    #[serde(with = "time::serde::rfc3339")]
    pub generated_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize)]
pub struct DetailedFlow {
    pub flow_id: String,
    #[serde(with = "time::serde::rfc3339")]
    pub start_time: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub end_time: OffsetDateTime,
    pub duration_ms: i64,
    pub event_count: usize,
    pub cross_server_flow: bool,
    pub servers_involved: Vec<String>,
    pub success: bool,
    pub has_user_context: bool,
    pub user_prompt: String,
    pub llm_reasoning: String,
    pub mcp_calls: Vec<mcp_audit_model::McpCall>,
    pub llm_decisions: Vec<mcp_audit_model::LlmDecisionRecord>,
    pub timeline: Vec<mcp_audit_model::TimelineEvent>,
}

/// `usability`: aggregate cognitive load, usability metrics and
/// rule-derived insights.
#[derive(Debug, Clone, Serialize)]
pub struct UsabilityReport {
    pub meta: ReportMeta,
    pub flow_count: usize,
    pub cognitive_load: CognitiveLoadComponents,
    pub usability_metrics: UsabilityMetrics,
    pub usability_insights: Vec<String>,
    pub grade_calculation: GradeCalculation,
}

#[derive(Debug, Clone, Serialize)]
pub struct UsabilityMetrics {
    pub usability_score: f64,
    pub success_rate: f64,
    pub cross_server_flow_rate: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct GradeCalculation {
    pub formula: &'static str,
    pub prompt_complexity: f64,
    pub context_switching: f64,
    pub retry_frustration: f64,
    pub configuration_friction: f64,
    pub integration_cognition: f64,
    pub weights: ScorerWeights,
    pub composite: f64,
    pub grade: String,
}

pub fn build_meta(time_window_seconds: u64, generated_at: OffsetDateTime, has_decisions: bool) -> ReportMeta {
    let mut data_sources = vec!["mcp_audit_messages.jsonl"];
    if has_decisions {
        data_sources.push("mcp_audit_decisions.jsonl");
    }
    ReportMeta {
        report_version: REPORT_VERSION,
        algorithm: ALGORITHM_NAME,
        time_window_seconds,
        data_sources,
        generated_at,
    }
}

pub fn build_trace_report(flows: &[Flow]) -> TraceReport {
    TraceReport {
        flows: flows
            .iter()
            .map(|f| TraceFlow {
                flow_id: f.flow_id.clone(),
                start_time: f.start_time,
                end_time: f.end_time,
                mcp_calls: f.mcp_calls.clone(),
                timeline: f
                    .timeline
                    .iter()
                    .filter(|e| matches!(e, mcp_audit_model::TimelineEvent::Message(_)))
                    .cloned()
                    .collect(),
            })
            .collect(),
    }
}

pub fn build_detailed_report(flows: &[Flow], meta: ReportMeta) -> DetailedReport {
    DetailedReport {
        meta,
        flows: flows
            .iter()
            .map(|f| DetailedFlow {
                flow_id: f.flow_id.clone(),
                start_time: f.start_time,
                end_time: f.end_time,
                duration_ms: f.duration_ms,
                event_count: f.event_count,
                cross_server_flow: f.cross_server_flow,
                servers_involved: f.servers_involved.clone(),
                success: f.success,
                has_user_context: f.has_user_context,
                user_prompt: f.user_prompt.clone(),
                llm_reasoning: f.llm_reasoning.clone(),
                mcp_calls: f.mcp_calls.clone(),
                llm_decisions: f.llm_decisions.clone(),
                timeline: f.timeline.clone(),
            })
            .collect(),
    }
}

pub fn build_usability_report(
    flows: &[Flow],
    cognitive_load: CognitiveLoadComponents,
    weights: &ScorerWeights,
    meta: ReportMeta,
) -> UsabilityReport {
    let flow_count = flows.len();
    let successful = flows.iter().filter(|f| f.success).count();
    let cross_server = flows.iter().filter(|f| f.cross_server_flow).count();
    let success_rate = if flow_count == 0 { 1.0 } else { successful as f64 / flow_count as f64 };
    let cross_server_flow_rate = if flow_count == 0 { 0.0 } else { cross_server as f64 / flow_count as f64 };

    let mut insights = Vec::new();
    if cognitive_load.retry_frustration >= 60.0 {
        insights.push("High retry frustration: tools are being retried often; investigate flaky or ambiguous tool contracts.".to_string());
    }
    if cognitive_load.configuration_friction >= 45.0 {
        insights.push("High configuration friction: repeated auth or setup errors are degrading the experience.".to_string());
    }
    if cross_server_flow_rate > 0.3 {
        insights.push("A significant share of flows span multiple servers; consider consolidating tools.".to_string());
    }
    if success_rate < 0.8 {
        insights.push("Success rate is below 80%; review failing tool calls.".to_string());
    }
    if insights.is_empty() {
        insights.push("No significant usability concerns detected in this window.".to_string());
    }

    let grade_calculation = GradeCalculation {
        formula: "S = 0.15*P + 0.20*C + 0.30*R + 0.25*F + 0.10*I",
        prompt_complexity: cognitive_load.prompt_complexity,
        context_switching: cognitive_load.context_switching,
        retry_frustration: cognitive_load.retry_frustration,
        configuration_friction: cognitive_load.configuration_friction,
        integration_cognition: cognitive_load.integration_cognition,
        weights: *weights,
        composite: cognitive_load.composite,
        grade: cognitive_load.grade.to_string(),
    };

    let usability_metrics = UsabilityMetrics {
        usability_score: cognitive_load.usability_score(),
        success_rate,
        cross_server_flow_rate,
    };

    UsabilityReport {
        meta,
        flow_count,
        cognitive_load,
        usability_metrics,
        usability_insights: insights,
        grade_calculation,
    }
}

/// Default output filename: `<type>_report[_<server>]_<YYYYMMDD_HHMMSS>.<ext>`.
pub fn default_filename(
    report_type: ReportType,
    server: Option<&str>,
    format: ReportFormat,
    generated_at: OffsetDateTime,
) -> String {
    let format_desc = time::format_description::parse("[year][month][day]_[hour][minute][second]")
        .expect("static format description is valid");
    let timestamp = generated_at
        .format(&format_desc)
        .unwrap_or_else(|_| "unknown".to_string());
    match server {
        Some(server) => format!("{}_report_{server}_{timestamp}.{}", report_type.as_str(), format.extension()),
        None => format!("{}_report_{timestamp}.{}", report_type.as_str(), format.extension()),
    }
}

pub fn render_json<T: Serialize>(value: &T) -> Result<String, AnalysisError> {
    serde_json::to_string_pretty(value).map_err(|e| AnalysisError::Model(mcp_audit_model::ModelError::Serialize(e)))
}

/// A minimal self-contained HTML document: a `<pre>` block of the JSON
/// body plus a small `<details>` reveal per cognitive-load factor when
/// rendering a usability report. No external assets, per `spec.md` §4.7.
pub fn render_html_usability(report: &UsabilityReport) -> String {
    let mut html = String::new();
    html.push_str("<!doctype html><html><head><meta charset=\"utf-8\">");
    html.push_str("<title>MCP Cognitive Load Report</title></head><body>");
    html.push_str(&format!(
        "<h1>Usability Report — Grade {}</h1>",
        report.cognitive_load.grade
    ));
    html.push_str(&format!(
        "<p>Composite: {:.1} · Usability score: {:.1} · Flows: {}</p>",
        report.cognitive_load.composite, report.usability_metrics.usability_score, report.flow_count
    ));
    html.push_str("<ul>");
    for insight in &report.usability_insights {
        html.push_str(&format!("<li>{insight}</li>"));
    }
    html.push_str("</ul>");

    for (label, value, explanations) in [
        ("Prompt complexity", report.cognitive_load.prompt_complexity, &[][..]),
        ("Context switching", report.cognitive_load.context_switching, &[][..]),
        (
            "Retry frustration",
            report.cognitive_load.retry_frustration,
            report.cognitive_load.retry_frustration_breakdown.explanations.as_slice(),
        ),
        (
            "Configuration friction",
            report.cognitive_load.configuration_friction,
            report
                .cognitive_load
                .configuration_friction_breakdown
                .explanations
                .as_slice(),
        ),
        ("Integration cognition", report.cognitive_load.integration_cognition, &[][..]),
    ] {
        html.push_str(&format!(
            "<details><summary>{label}: {value:.1}</summary><ul>"
        ));
        for explanation in explanations {
            html.push_str(&format!("<li>{explanation}</li>"));
        }
        html.push_str("</ul></details>");
    }

    html.push_str("</body></html>");
    html
}

/// A plain-text rendering for terminals and log capture.
pub fn render_txt_usability(report: &UsabilityReport) -> String {
    format!(
        "MCP Cognitive Load Report\nGrade: {}\nComposite: {:.1}\nUsability score: {:.1}\nFlows analyzed: {}\n\nInsights:\n{}\n",
        report.cognitive_load.grade,
        report.cognitive_load.composite,
        report.usability_metrics.usability_score,
        report.flow_count,
        report
            .usability_insights
            .iter()
            .map(|i| format!("- {i}"))
            .collect::<Vec<_>>()
            .join("\n"),
    )
}

/// `trace`/`detailed` reports have no per-factor cognitive-load
/// breakdown to reveal, so their HTML rendering is a plain `<pre>` of
/// the same JSON body `render_json` would have produced — `spec.md`
/// §4.7's "same data, rendered differently" without the usability
/// report's `<details>` treatment.
fn render_html_pre<T: Serialize>(title: &str, value: &T) -> String {
    let body = serde_json::to_string_pretty(value).unwrap_or_default();
    format!(
        "<!doctype html><html><head><meta charset=\"utf-8\"><title>{title}</title></head><body><h1>{title}</h1><pre>{}</pre></body></html>",
        html_escape(&body)
    )
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

pub fn render_html_trace(report: &TraceReport) -> String {
    render_html_pre("MCP Trace Report", report)
}

pub fn render_html_detailed(report: &DetailedReport) -> String {
    render_html_pre("MCP Detailed Report", report)
}

/// A one-line-per-flow plain-text summary for terminals and log capture.
pub fn render_txt_trace(report: &TraceReport) -> String {
    let mut out = format!("MCP Trace Report\nFlows: {}\n\n", report.flows.len());
    for flow in &report.flows {
        out.push_str(&format!(
            "- flow {} [{} .. {}] mcp_calls={} timeline_events={}\n",
            flow.flow_id,
            flow.start_time,
            flow.end_time,
            flow.mcp_calls.len(),
            flow.timeline.len()
        ));
    }
    out
}

pub fn render_txt_detailed(report: &DetailedReport) -> String {
    let mut out = format!(
        "MCP Detailed Report\nGenerated: {}\nFlows: {}\n\n",
        report.meta.generated_at,
        report.flows.len()
    );
    for flow in &report.flows {
        out.push_str(&format!(
            "- flow {} success={} cross_server={} duration_ms={} servers={:?}\n",
            flow.flow_id, flow.success, flow.cross_server_flow, flow.duration_ms, flow.servers_involved
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_filename_matches_pattern() {
        let generated_at = OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap();
        let name = default_filename(ReportType::Usability, Some("serverA"), ReportFormat::Json, generated_at);
        assert!(name.starts_with("usability_report_serverA_"));
        assert!(name.ends_with(".json"));
    }

    #[test]
    fn default_filename_without_server_omits_segment() {
        let generated_at = OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap();
        let name = default_filename(ReportType::Trace, None, ReportFormat::Html, generated_at);
        assert!(name.starts_with("trace_report_"));
        assert!(!name.contains("__"));
    }

    #[test]
    fn report_format_rejects_unknown_values() {
        assert!(ReportFormat::parse("yaml").is_err());
        assert!(ReportFormat::parse("json").is_ok());
    }

    #[test]
    fn trace_html_embeds_the_flow_id_and_escapes_nothing_dangerous() {
        let report = build_trace_report(&[]);
        let html = render_html_trace(&report);
        assert!(html.starts_with("<!doctype html>"));
        assert!(html.contains("MCP Trace Report"));
    }

    #[test]
    fn detailed_txt_lists_one_line_per_flow() {
        let meta = build_meta(30, OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap(), false);
        let report = build_detailed_report(&[], meta);
        let txt = render_txt_detailed(&report);
        assert!(txt.starts_with("MCP Detailed Report"));
        assert!(txt.contains("Flows: 0"));
    }
}
