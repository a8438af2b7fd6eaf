//! `mcp-audit report` (`spec.md` §6/§4.7): reconstructs flows from the
//! message store over a time window, scores them, and renders one of
//! the three report families in `json`/`html`/`txt`.

use std::path::{Path, PathBuf};

use clap::{Args, ValueEnum};
use time::OffsetDateTime;

use mcp_audit_analysis::{
    build_detailed_report, build_meta, build_trace_report, build_usability_report, default_filename,
    reconstruct_flows, render_html_detailed, render_html_trace, render_html_usability, render_json,
    render_txt_detailed, render_txt_trace, render_txt_usability, score_aggregate, AnalysisError, ReportFormat,
    ReportType,
};
use mcp_audit_model::LlmDecisionRecord;

use crate::error::CliError;
use crate::hostutil::resolve_adapter;
use crate::runtime_config::RuntimeConfig;

#[derive(Debug, Clone, Copy, ValueEnum)]
#[value(rename_all = "lowercase")]
pub enum ReportTypeArg {
    Trace,
    Detailed,
    Usability,
}

impl From<ReportTypeArg> for ReportType {
    fn from(value: ReportTypeArg) -> Self {
        match value {
            ReportTypeArg::Trace => ReportType::Trace,
            ReportTypeArg::Detailed => ReportType::Detailed,
            ReportTypeArg::Usability => ReportType::Usability,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
#[value(rename_all = "lowercase")]
pub enum ReportFormatArg {
    Json,
    Html,
    Txt,
}

impl From<ReportFormatArg> for ReportFormat {
    fn from(value: ReportFormatArg) -> Self {
        match value {
            ReportFormatArg::Json => ReportFormat::Json,
            ReportFormatArg::Html => ReportFormat::Html,
            ReportFormatArg::Txt => ReportFormat::Txt,
        }
    }
}

#[derive(Debug, Clone, Args)]
pub struct ReportArgs {
    #[arg(long = "type", value_enum)]
    pub report_type: ReportTypeArg,

    /// How far back to look, e.g. `30m`, `2h`, `1d`, or a bare number of
    /// seconds. Defaults to the entire store.
    #[arg(long)]
    pub since: Option<String>,

    #[arg(long)]
    pub server: Option<String>,

    #[arg(long, value_enum, default_value = "json")]
    pub format: ReportFormatArg,

    #[arg(long)]
    pub output: Option<PathBuf>,

    #[arg(long, env = "MCP_AUDIT_HOST")]
    pub host: Option<String>,

    #[arg(long)]
    pub config_path: Option<PathBuf>,

    #[arg(long)]
    pub store_dir: Option<PathBuf>,

    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Overrides the flow-grouping gap (`MCP_AUDIT_WINDOW_SECONDS`).
    #[arg(long)]
    pub window_seconds: Option<u64>,
}

pub fn run(args: ReportArgs, config: Option<&Path>) -> Result<i32, CliError> {
    let runtime = RuntimeConfig::resolve(
        config,
        args.host.as_deref(),
        args.output_dir.as_deref(),
        args.window_seconds,
    )?;
    let adapter = resolve_adapter(&runtime.host, args.config_path.as_deref());

    let store_dir = match &args.store_dir {
        Some(dir) => dir.clone(),
        None => adapter
            .locate_config()
            .ok()
            .and_then(|path| path.parent().map(Path::to_path_buf))
            .unwrap_or_else(|| runtime.output_dir.clone()),
    };
    let store_path = store_dir.join("mcp_audit_messages.jsonl");
    let decisions_path = store_dir.join("mcp_audit_decisions.jsonl");

    let store = mcp_audit_proxy::MessageStore::new(&store_path);
    let now = OffsetDateTime::now_utc();
    let since = match &args.since {
        Some(raw) => now - parse_since(raw)?,
        None => OffsetDateTime::UNIX_EPOCH,
    };

    let records = store.read_since(since, args.server.as_deref())?;
    let has_decisions = decisions_path.is_file();
    let decisions = read_decisions(&decisions_path);
    let window = time::Duration::seconds(runtime.window_seconds as i64);
    let flows = reconstruct_flows(&records, &decisions, window);

    let report_type: ReportType = args.report_type.into();
    let format: ReportFormat = args.format.into();
    let meta = build_meta(runtime.window_seconds, now, has_decisions);

    let rendered = match report_type {
        ReportType::Trace => {
            let report = build_trace_report(&flows);
            match format {
                ReportFormat::Json => render_json(&report)?,
                ReportFormat::Html => render_html_trace(&report),
                ReportFormat::Txt => render_txt_trace(&report),
            }
        }
        ReportType::Detailed => {
            let report = build_detailed_report(&flows, meta);
            match format {
                ReportFormat::Json => render_json(&report)?,
                ReportFormat::Html => render_html_detailed(&report),
                ReportFormat::Txt => render_txt_detailed(&report),
            }
        }
        ReportType::Usability => {
            let cognitive_load = score_aggregate(&flows, &runtime.scoring.weights, &runtime.scoring.thresholds);
            let report = build_usability_report(&flows, cognitive_load, &runtime.scoring.weights, meta);
            match format {
                ReportFormat::Json => render_json(&report)?,
                ReportFormat::Html => render_html_usability(&report),
                ReportFormat::Txt => render_txt_usability(&report),
            }
        }
    };

    let output_path = args
        .output
        .clone()
        .unwrap_or_else(|| runtime.output_dir.join(default_filename(report_type, args.server.as_deref(), format, now)));
    if let Some(parent) = output_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|source| CliError::Io(source.to_string()))?;
        }
    }
    std::fs::write(&output_path, rendered).map_err(|source| CliError::Analysis(AnalysisError::ReportWrite {
        path: output_path.clone(),
        source,
    }))?;

    println!("wrote {}", output_path.display());
    Ok(0)
}

fn read_decisions(path: &Path) -> Vec<LlmDecisionRecord> {
    let Ok(text) = std::fs::read_to_string(path) else {
        return Vec::new();
    };
    text.lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| serde_json::from_str(line).ok())
        .collect()
}

/// Parses `--since`: a bare integer (seconds) or an integer suffixed
/// with `s`/`m`/`h`/`d`.
fn parse_since(input: &str) -> Result<time::Duration, AnalysisError> {
    let trimmed = input.trim();
    let invalid = || AnalysisError::InvalidSince(input.to_string());

    let (digits, unit) = match trimmed.chars().last() {
        Some(c) if c.is_ascii_alphabetic() => (&trimmed[..trimmed.len() - c.len_utf8()], c),
        Some(_) => (trimmed, 's'),
        None => return Err(invalid()),
    };
    let value: i64 = digits.parse().map_err(|_| invalid())?;
    let seconds = match unit.to_ascii_lowercase() {
        's' => value,
        'm' => value * 60,
        'h' => value * 3600,
        'd' => value * 86_400,
        _ => return Err(invalid()),
    };
    Ok(time::Duration::seconds(seconds))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_seconds() {
        assert_eq!(parse_since("45").unwrap(), time::Duration::seconds(45));
    }

    #[test]
    fn parses_suffixed_units() {
        assert_eq!(parse_since("30m").unwrap(), time::Duration::seconds(1800));
        assert_eq!(parse_since("2h").unwrap(), time::Duration::seconds(7200));
        assert_eq!(parse_since("1d").unwrap(), time::Duration::seconds(86_400));
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_since("soon").is_err());
        assert!(parse_since("").is_err());
    }
}
