use crate::staging::{CommitPhase, CommitReport};
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
};
use std::sync::{Once, OnceLock};

// Global registry
pub static REGISTRY: OnceLock<Registry> = OnceLock::new();

pub static HTTP_REQUESTS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();
pub static HTTP_REQUEST_DURATION_SECONDS: OnceLock<HistogramVec> = OnceLock::new();
pub static COMMIT_CALLS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();
pub static OPEN_VIEWS: OnceLock<IntGauge> = OnceLock::new();

static INIT: Once = Once::new();

/// Create and register all collectors. Later calls are no-ops.
pub fn init_metrics() {
    INIT.call_once(register_collectors);
}

fn register_collectors() {
    let registry = Registry::new();

    let requests_total = IntCounterVec::new(
        Opts::new("http_requests_total", "Total number of HTTP requests"),
        &["method", "path", "status"],
    )
    .expect("metric can be created");

    let request_duration = HistogramVec::new(
        HistogramOpts::new(
            "http_request_duration_seconds",
            "HTTP request duration in seconds",
        ),
        &["method", "path", "status"],
    )
    .expect("metric can be created");

    let commit_calls = IntCounterVec::new(
        Opts::new(
            "document_commit_calls_total",
            "Backend calls made while committing staged document edits",
        ),
        &["phase", "outcome"],
    )
    .expect("metric can be created");

    let open_views = IntGauge::new("open_views", "Debtor views currently held")
        .expect("metric can be created");

    registry
        .register(Box::new(requests_total.clone()))
        .expect("collector can be registered");
    registry
        .register(Box::new(request_duration.clone()))
        .expect("collector can be registered");
    registry
        .register(Box::new(commit_calls.clone()))
        .expect("collector can be registered");
    registry
        .register(Box::new(open_views.clone()))
        .expect("collector can be registered");

    let _ = REGISTRY.set(registry);
    let _ = HTTP_REQUESTS_TOTAL.set(requests_total);
    let _ = HTTP_REQUEST_DURATION_SECONDS.set(request_duration);
    let _ = COMMIT_CALLS_TOTAL.set(commit_calls);
    let _ = OPEN_VIEWS.set(open_views);
}

pub fn record_http_request(method: &str, path: &str, status: &str, duration_secs: f64) {
    let labels = [method, path, status];
    if let Some(counter) = HTTP_REQUESTS_TOTAL.get() {
        counter.with_label_values(&labels).inc();
    }
    if let Some(histogram) = HTTP_REQUEST_DURATION_SECONDS.get() {
        histogram.with_label_values(&labels).observe(duration_secs);
    }
}

pub fn record_commit(report: &CommitReport) {
    let Some(counter) = COMMIT_CALLS_TOTAL.get() else {
        return;
    };

    let succeeded = [
        (CommitPhase::Delete, report.deleted.len()),
        (CommitPhase::Rename, report.renamed.len()),
        (CommitPhase::Upload, usize::from(report.uploaded > 0)),
    ];
    for (phase, count) in succeeded {
        if count > 0 {
            counter
                .with_label_values(&[phase.as_str(), "success"])
                .inc_by(count as u64);
        }
    }
    for failure in report.failures() {
        counter
            .with_label_values(&[failure.phase.as_str(), "failure"])
            .inc();
    }
}

pub fn set_open_views(count: usize) {
    if let Some(gauge) = OPEN_VIEWS.get() {
        gauge.set(count as i64);
    }
}

pub fn get_metrics() -> String {
    let Some(registry) = REGISTRY.get() else {
        return String::new();
    };

    let mut buffer = Vec::new();
    let encoder = TextEncoder::new();
    if let Err(e) = encoder.encode(&registry.gather(), &mut buffer) {
        tracing::error!(error = %e, "Failed to encode metrics");
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}
