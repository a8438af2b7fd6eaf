//! The live metrics pull endpoint (`spec.md` §4.8): an `axum::Router`
//! exposing a Prometheus-format `/metrics` scrape target, a JSON
//! `/snapshot` route, and a `/healthz` liveness probe, backed by a
//! background task that rebuilds a
//! [`MetricsSnapshot`] at most once per `export_interval_seconds` and
//! fans it out to any configured push sinks. Grounded on
//! `turbomcp-proxy`'s `cli::commands::serve::ServeCommand` (an
//! `axum::Router` bootstrapped from a CLI subcommand, bound with
//! `tokio::net::TcpListener` + `axum::serve`).

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use time::OffsetDateTime;
use tokio::time::interval;

use mcp_audit_model::{ScorerThresholds, ScorerWeights};

use crate::error::MetricsError;
use crate::push::PushSink;
use crate::snapshot::{build_snapshot, AtomicMetrics, MetricsSnapshot};

/// Everything the exporter needs to rebuild a snapshot and serve it.
/// Built once at startup (`spec.md` §9's "one process-wide config
/// struct") and passed explicitly into [`run_exporter`].
#[derive(Debug, Clone)]
pub struct ExporterConfig {
    pub bind: SocketAddr,
    pub message_store_path: PathBuf,
    pub decision_store_path: Option<PathBuf>,
    pub server_filter: Option<String>,
    pub window_seconds: u64,
    pub export_interval_seconds: u64,
    pub weights: ScorerWeights,
    pub thresholds: ScorerThresholds,
}

impl ExporterConfig {
    pub const DEFAULT_EXPORT_INTERVAL_SECONDS: u64 = 5;
}

#[derive(Clone)]
struct ExporterState {
    prometheus: PrometheusHandle,
    latest: Arc<RwLock<MetricsSnapshot>>,
}

/// Runs the pull endpoint and the background snapshot-refresh loop
/// until the process is terminated. Push-sink delivery happens inline
/// in the refresh loop but is fire-and-forget with respect to the
/// server: a stuck sink cannot block the next scrape.
pub async fn run_exporter(
    config: ExporterConfig,
    metrics: Arc<AtomicMetrics>,
    sinks: Vec<Box<dyn PushSink>>,
) -> Result<(), MetricsError> {
    let prometheus = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| MetricsError::RecorderInstall(e.to_string()))?;

    let initial = build_snapshot(
        &metrics,
        &[],
        &[],
        time::Duration::seconds(config.window_seconds as i64),
        &config.weights,
        &config.thresholds,
        OffsetDateTime::now_utc(),
    );
    let state = ExporterState {
        prometheus,
        latest: Arc::new(RwLock::new(initial)),
    };

    let refresh_state = state.clone();
    let refresh_config = config.clone();
    let refresh_metrics = metrics.clone();
    let refresh_task = tokio::spawn(async move {
        refresh_loop(refresh_config, refresh_metrics, refresh_state, sinks).await;
    });

    let app = Router::new()
        .route("/metrics", get(metrics_handler))
        .route("/snapshot", get(snapshot_handler))
        .route("/healthz", get(healthz_handler))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .map_err(|source| MetricsError::Bind { addr: config.bind, source })?;

    tracing::info!(addr = %config.bind, "metrics exporter listening");
    axum::serve(listener, app)
        .await
        .map_err(|source| MetricsError::Bind { addr: config.bind, source })?;

    refresh_task.abort();
    Ok(())
}

async fn refresh_loop(
    config: ExporterConfig,
    metrics: Arc<AtomicMetrics>,
    state: ExporterState,
    sinks: Vec<Box<dyn PushSink>>,
) {
    let interval_secs = config.export_interval_seconds.max(1);
    let mut ticker = interval(std::time::Duration::from_secs(interval_secs));
    loop {
        ticker.tick().await;

        let records = match read_records(&config) {
            Ok(records) => records,
            Err(error) => {
                tracing::warn!(%error, "metrics exporter failed to read message store; keeping last snapshot");
                continue;
            }
        };
        let decisions = read_decisions(&config);

        let snapshot = build_snapshot(
            &metrics,
            &records,
            &decisions,
            time::Duration::seconds(config.window_seconds as i64),
            &config.weights,
            &config.thresholds,
            OffsetDateTime::now_utc(),
        );

        publish_gauges(&snapshot);

        if let Ok(mut guard) = state.latest.write() {
            *guard = snapshot.clone();
        }

        for sink in &sinks {
            let outcome = sink.push(&snapshot).await;
            if let Err(error) = outcome {
                tracing::warn!(sink = sink.name(), %error, "push sink delivery failed after retries");
            }
        }
    }
}

/// Sets the Prometheus gauges scraped from `/metrics` from the latest
/// snapshot. Separate from `build_snapshot` itself so that rebuilding a
/// snapshot for `/snapshot` (JSON) never has the side effect of also
/// touching the global metrics registry.
fn publish_gauges(snapshot: &MetricsSnapshot) {
    metrics::gauge!("mcp_audit_flows_total").set(snapshot.total_flows as f64);
    metrics::gauge!("mcp_audit_success_rate").set(snapshot.success_rate);
    metrics::gauge!("mcp_audit_cognitive_load_composite").set(snapshot.average_cognitive_load.composite);
    metrics::gauge!("mcp_audit_captures_dropped_total").set(snapshot.captures_dropped as f64);
    metrics::gauge!("mcp_audit_capture_errors_total").set(snapshot.capture_errors as f64);
    for (grade, count) in &snapshot.grade_distribution {
        metrics::gauge!("mcp_audit_grade_distribution", "grade" => grade.clone()).set(*count as f64);
    }
    for (tool, count) in &snapshot.tool_call_counts {
        metrics::gauge!("mcp_audit_tool_calls_total", "tool" => tool.clone()).set(*count as f64);
    }
}

async fn metrics_handler(State(state): State<ExporterState>) -> String {
    state.prometheus.render()
}

/// Trivial liveness probe, independent of snapshot freshness — a scrape
/// target being reachable is a different fact from its data being
/// recent (`spec.md` §4.8's pull endpoint).
async fn healthz_handler() -> StatusCode {
    StatusCode::OK
}

async fn snapshot_handler(State(state): State<ExporterState>) -> axum::Json<MetricsSnapshot> {
    let snapshot = state
        .latest
        .read()
        .map(|guard| guard.clone())
        .unwrap_or_else(|poisoned| poisoned.into_inner().clone());
    axum::Json(snapshot)
}

fn read_records(config: &ExporterConfig) -> Result<Vec<mcp_audit_model::RawMessageRecord>, MetricsError> {
    let store = mcp_audit_proxy::MessageStore::new(&config.message_store_path);
    let since = OffsetDateTime::now_utc() - time::Duration::seconds(config.window_seconds as i64);
    Ok(store.read_since(since, config.server_filter.as_deref())?)
}

fn read_decisions(config: &ExporterConfig) -> Vec<mcp_audit_model::LlmDecisionRecord> {
    let Some(path) = &config.decision_store_path else {
        return Vec::new();
    };
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(_) => return Vec::new(),
    };
    text.lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| serde_json::from_str(line).ok())
        .collect()
}
