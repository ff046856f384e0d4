use axum::{http::StatusCode, response::IntoResponse};
use lazy_static::lazy_static;
use prometheus::{
    Counter, CounterVec, Encoder, Gauge, GaugeVec, HistogramOpts, HistogramVec, Opts, Registry,
    TextEncoder,
};
use std::time::Duration;

use crate::album_download::{AlbumDownloadSummary, TrackDownloadSummary};
use crate::catalog_store::CatalogCounts;
use crate::ingestion::IngestionStats;
use crate::server_store::JobFamily;

/// Metric name prefix for all harvester metrics
const PREFIX: &str = "harvester";

lazy_static! {
    // Global Prometheus registry
    pub static ref REGISTRY: Registry = Registry::new();

    // HTTP Request Metrics
    pub static ref HTTP_REQUESTS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_http_requests_total"), "Total number of HTTP requests"),
        &["method", "path", "status"]
    ).expect("Failed to create http_requests_total metric");

    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            format!("{PREFIX}_http_request_duration_seconds"),
            "HTTP request duration in seconds"
        )
        .buckets(vec![0.001, 0.01, 0.05, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0]),
        &["method", "path"]
    ).expect("Failed to create http_request_duration_seconds metric");

    // Ingestion Metrics
    pub static ref INGESTED_ENTITIES_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_ingested_entities_total"), "Entities created or updated by ingestion"),
        &["kind"]
    ).expect("Failed to create ingested_entities_total metric");

    pub static ref INGESTION_FAILED_RECORDS_TOTAL: Counter = Counter::new(
        format!("{PREFIX}_ingestion_failed_records_total"),
        "Records that failed to ingest"
    ).expect("Failed to create ingestion_failed_records_total metric");

    // Download Metrics
    pub static ref ALBUM_DOWNLOADS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_album_downloads_total"), "Albums processed by the downloader"),
        &["status"]
    ).expect("Failed to create album_downloads_total metric");

    pub static ref TRACK_DOWNLOADS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_track_downloads_total"), "Tracks processed by the downloader"),
        &["status"]
    ).expect("Failed to create track_downloads_total metric");

    // Job Metrics
    pub static ref JOB_RUNS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_job_runs_total"), "Background job runs by family and outcome"),
        &["family", "status"]
    ).expect("Failed to create job_runs_total metric");

    pub static ref JOB_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            format!("{PREFIX}_job_duration_seconds"),
            "Background job duration in seconds"
        )
        .buckets(vec![1.0, 10.0, 60.0, 300.0, 900.0, 3600.0, 14400.0]),
        &["family"]
    ).expect("Failed to create job_duration_seconds metric");

    pub static ref JOB_RUNNING: GaugeVec = GaugeVec::new(
        Opts::new(format!("{PREFIX}_job_running"), "Whether a job family is running"),
        &["family"]
    ).expect("Failed to create job_running metric");

    // Catalog Metrics
    pub static ref CATALOG_ITEMS_TOTAL: GaugeVec = GaugeVec::new(
        Opts::new(format!("{PREFIX}_catalog_items_total"), "Total items in catalog"),
        &["type"]
    ).expect("Failed to create catalog_items_total metric");

    pub static ref PROCESS_MEMORY_BYTES: Gauge = Gauge::new(
        format!("{PREFIX}_process_memory_bytes"),
        "Process memory usage in bytes"
    ).expect("Failed to create process_memory_bytes metric");
}

/// Initialize all metrics and register them with the Prometheus registry
pub fn init_metrics() {
    // Register all metrics - ignore errors if already registered (for tests)
    let _ = REGISTRY.register(Box::new(HTTP_REQUESTS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(HTTP_REQUEST_DURATION_SECONDS.clone()));
    let _ = REGISTRY.register(Box::new(INGESTED_ENTITIES_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(INGESTION_FAILED_RECORDS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(ALBUM_DOWNLOADS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(TRACK_DOWNLOADS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(JOB_RUNS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(JOB_DURATION_SECONDS.clone()));
    let _ = REGISTRY.register(Box::new(JOB_RUNNING.clone()));
    let _ = REGISTRY.register(Box::new(CATALOG_ITEMS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(PROCESS_MEMORY_BYTES.clone()));

    tracing::info!("Metrics system initialized successfully");
}

/// Set the catalog size gauges
pub fn set_catalog_metrics(counts: &CatalogCounts) {
    for (kind, count) in [
        ("artist", counts.artists),
        ("genre", counts.genres),
        ("label", counts.labels),
        ("album", counts.albums),
        ("track", counts.tracks),
    ] {
        CATALOG_ITEMS_TOTAL
            .with_label_values(&[kind])
            .set(count as f64);
    }
}

/// Record an HTTP request
pub fn record_http_request(method: &str, path: &str, status: u16, duration: Duration) {
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[method, path, &status.to_string()])
        .inc();

    HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&[method, path])
        .observe(duration.as_secs_f64());
}

/// Record the entities resolved by an ingestion run
pub fn record_ingestion(stats: &IngestionStats, failed_records: usize) {
    for (kind, count) in [
        ("artist", stats.artists),
        ("genre", stats.genres),
        ("label", stats.labels),
        ("album", stats.albums),
        ("track", stats.tracks),
    ] {
        INGESTED_ENTITIES_TOTAL
            .with_label_values(&[kind])
            .inc_by(count as f64);
    }
    INGESTION_FAILED_RECORDS_TOTAL.inc_by(failed_records as f64);
}

/// Record the outcome of an album download run
pub fn record_album_downloads(summary: &AlbumDownloadSummary) {
    ALBUM_DOWNLOADS_TOTAL
        .with_label_values(&["success"])
        .inc_by(summary.successful as f64);
    ALBUM_DOWNLOADS_TOTAL
        .with_label_values(&["failed"])
        .inc_by(summary.failed as f64);
    TRACK_DOWNLOADS_TOTAL
        .with_label_values(&["success"])
        .inc_by(summary.total_tracks_downloaded as f64);
    TRACK_DOWNLOADS_TOTAL
        .with_label_values(&["failed"])
        .inc_by(summary.total_tracks_failed as f64);
}

/// Record the outcome of a pending-tracks download run
pub fn record_track_downloads(summary: &TrackDownloadSummary) {
    TRACK_DOWNLOADS_TOTAL
        .with_label_values(&["success"])
        .inc_by(summary.successful as f64);
    TRACK_DOWNLOADS_TOTAL
        .with_label_values(&["failed"])
        .inc_by(summary.failed as f64);
}

/// Record a finished job run
pub fn record_job_run(family: JobFamily, status: &str, duration: Duration) {
    JOB_RUNS_TOTAL
        .with_label_values(&[family.as_str(), status])
        .inc();
    JOB_DURATION_SECONDS
        .with_label_values(&[family.as_str()])
        .observe(duration.as_secs_f64());
}

pub fn set_job_running(family: JobFamily, running: bool) {
    JOB_RUNNING
        .with_label_values(&[family.as_str()])
        .set(if running { 1.0 } else { 0.0 });
}

/// Update process memory usage
pub fn update_memory_usage() {
    #[cfg(target_os = "linux")]
    {
        if let Ok(status) = std::fs::read_to_string("/proc/self/status") {
            for line in status.lines() {
                if line.starts_with("VmRSS:") {
                    // RSS is reported in kB
                    if let Some(kb_str) = line.split_whitespace().nth(1) {
                        if let Ok(kb) = kb_str.parse::<f64>() {
                            PROCESS_MEMORY_BYTES.set(kb * 1024.0);
                            return;
                        }
                    }
                }
            }
        }
    }
}

/// Handler for the /metrics endpoint
pub async fn metrics_handler() -> impl IntoResponse {
    update_memory_usage();

    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();

    let mut buffer = vec![];
    match encoder.encode(&metric_families, &mut buffer) {
        Ok(()) => {
            let response = String::from_utf8(buffer).unwrap_or_else(|_| String::from(""));
            (StatusCode::OK, response)
        }
        Err(e) => {
            tracing::error!("Failed to encode metrics: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to encode metrics: {}", e),
            )
        }
    }
}
