#![forbid(unsafe_code)]

//! Flow reconstruction, cognitive-load scoring, and report rendering
//! over a captured message store.

pub mod error;
pub mod reconstructor;
pub mod report;
pub mod scorer;

pub use error::AnalysisError;
pub use reconstructor::{count_direction_changes, reconstruct_flows};
pub use report::{
    build_detailed_report, build_meta, build_trace_report, build_usability_report, default_filename,
    render_html_detailed, render_html_trace, render_html_usability, render_json, render_txt_detailed,
    render_txt_trace, render_txt_usability, DetailedReport, GradeCalculation, ReportFormat, ReportMeta, ReportType,
    TraceFlow, TraceReport, UsabilityMetrics, UsabilityReport,
};
pub use scorer::{score_aggregate, score_flow};
