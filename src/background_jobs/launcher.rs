//! Fire-and-forget start operations for ingestion and download jobs.

use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{error, info};

use super::guard::{GuardError, JobLease, JobStateGuard};
use crate::album_download::{AlbumDownloadSummary, DownloadOrchestrator, TrackDownloadSummary};
use crate::catalog_api::AlbumRecord;
use crate::catalog_store::CatalogStore;
use crate::ingestion::{BatchIngestionReport, IngestionPipeline, IngestionReport};
use crate::server::metrics;
use crate::server_store::{JobFamily, JobRunStatus, ServerStore};

/// Why a start request was rejected. Nothing was started in every case.
#[derive(Debug, Error)]
pub enum StartJobError {
    #[error("already in progress")]
    AlreadyInProgress,

    #[error("config not found")]
    ConfigNotFound,

    #[error("{0}")]
    Validation(String),

    #[error("store error: {0:#}")]
    Store(anyhow::Error),
}

impl From<GuardError> for StartJobError {
    fn from(err: GuardError) -> Self {
        match err {
            GuardError::ConfigNotFound => StartJobError::ConfigNotFound,
            GuardError::Store(e) => StartJobError::Store(e),
        }
    }
}

/// Result of a finished job as recorded in the run history.
trait JobOutcome: Serialize {
    /// Error message stored with the run; `Some` marks the run as failed.
    fn failure(&self) -> Option<String> {
        None
    }

    fn record_metrics(&self);
}

impl JobOutcome for IngestionReport {
    fn failure(&self) -> Option<String> {
        self.crawl_error
            .as_ref()
            .map(|e| format!("Crawl of '{}' aborted: {}", self.query, e))
    }

    fn record_metrics(&self) {
        metrics::record_ingestion(&self.stats, self.failed_records);
    }
}

impl JobOutcome for BatchIngestionReport {
    fn record_metrics(&self) {
        for report in &self.reports {
            report.record_metrics();
        }
    }
}

impl JobOutcome for AlbumDownloadSummary {
    fn failure(&self) -> Option<String> {
        // Only a failure to list pending albums leaves nothing processed with errors
        if self.processed == 0 {
            self.errors.first().cloned()
        } else {
            None
        }
    }

    fn record_metrics(&self) {
        metrics::record_album_downloads(self);
    }
}

impl JobOutcome for TrackDownloadSummary {
    fn failure(&self) -> Option<String> {
        if self.processed == 0 {
            self.errors.first().cloned()
        } else {
            None
        }
    }

    fn record_metrics(&self) {
        metrics::record_track_downloads(self);
    }
}

pub struct JobLauncher {
    guard: Arc<JobStateGuard>,
    server_store: Arc<dyn ServerStore>,
    catalog_store: Arc<dyn CatalogStore>,
    ingestion: Arc<IngestionPipeline>,
    downloads: Arc<DownloadOrchestrator>,
}

impl JobLauncher {
    pub fn new(
        guard: Arc<JobStateGuard>,
        server_store: Arc<dyn ServerStore>,
        catalog_store: Arc<dyn CatalogStore>,
        ingestion: Arc<IngestionPipeline>,
        downloads: Arc<DownloadOrchestrator>,
    ) -> Self {
        Self {
            guard,
            server_store,
            catalog_store,
            ingestion,
            downloads,
        }
    }

    pub fn guard(&self) -> &Arc<JobStateGuard> {
        &self.guard
    }

    /// Starts ingesting everything `query` returns.
    pub fn start_ingestion(
        &self,
        query: &str,
    ) -> Result<JoinHandle<Option<IngestionReport>>, StartJobError> {
        let query = query.trim().to_string();
        if query.is_empty() {
            return Err(StartJobError::Validation(
                "Query parameter is required".to_string(),
            ));
        }

        let lease = self.acquire(JobFamily::Metadata)?;
        let pipeline = Arc::clone(&self.ingestion);
        let triggered_by = format!("query:{}", query);
        self.spawn_job(lease, triggered_by, async move {
            pipeline.ingest(&query).await
        })
    }

    /// Starts ingesting several queries in sequence. Blank queries are dropped.
    pub fn start_ingestion_batch(
        &self,
        queries: Vec<String>,
    ) -> Result<JoinHandle<Option<BatchIngestionReport>>, StartJobError> {
        let queries: Vec<String> = queries
            .into_iter()
            .map(|q| q.trim().to_string())
            .filter(|q| !q.is_empty())
            .collect();
        if queries.is_empty() {
            return Err(StartJobError::Validation(
                "At least one non-empty query is required".to_string(),
            ));
        }

        let lease = self.acquire(JobFamily::Metadata)?;
        let pipeline = Arc::clone(&self.ingestion);
        let triggered_by = format!("batch:{} queries", queries.len());
        self.spawn_job(lease, triggered_by, async move {
            pipeline.ingest_all(&queries).await
        })
    }

    /// Starts ingesting a single album and its tracks.
    pub fn start_album_ingestion(
        &self,
        stub: AlbumRecord,
    ) -> Result<JoinHandle<Option<IngestionReport>>, StartJobError> {
        if stub.id.trim().is_empty() {
            return Err(StartJobError::Validation("Album id is required".to_string()));
        }

        let lease = self.acquire(JobFamily::Metadata)?;
        let pipeline = Arc::clone(&self.ingestion);
        let triggered_by = format!("album:{}", stub.id);
        self.spawn_job(lease, triggered_by, async move {
            pipeline.ingest_album(&stub).await
        })
    }

    /// Starts downloading up to `max_count` pending albums.
    pub fn start_album_downloads(
        &self,
        max_count: usize,
    ) -> Result<JoinHandle<Option<AlbumDownloadSummary>>, StartJobError> {
        if max_count == 0 {
            return Err(StartJobError::Validation(
                "albumCountToDownload must be at least 1".to_string(),
            ));
        }

        let lease = self.acquire(JobFamily::Albums)?;
        let downloads = Arc::clone(&self.downloads);
        let triggered_by = format!("count:{}", max_count);
        self.spawn_job(lease, triggered_by, async move {
            downloads.process_pending_albums(max_count).await
        })
    }

    /// Starts downloading pending tracks one by one, up to `max_count` when given.
    ///
    /// Shares the `albums` flag with album downloads.
    pub fn start_track_downloads(
        &self,
        max_count: Option<usize>,
    ) -> Result<JoinHandle<Option<TrackDownloadSummary>>, StartJobError> {
        if max_count == Some(0) {
            return Err(StartJobError::Validation(
                "trackCountToDownload must be at least 1".to_string(),
            ));
        }

        let lease = self.acquire(JobFamily::Albums)?;
        let downloads = Arc::clone(&self.downloads);
        let triggered_by = match max_count {
            Some(count) => format!("tracks:{}", count),
            None => "tracks:all".to_string(),
        };
        self.spawn_job(lease, triggered_by, async move {
            downloads.process_pending_tracks(max_count).await
        })
    }

    fn acquire(&self, family: JobFamily) -> Result<JobLease, StartJobError> {
        match self.guard.lease(family)? {
            Some(lease) => Ok(lease),
            None => {
                info!("Rejected {} job: another job is in progress", family);
                Err(StartJobError::AlreadyInProgress)
            }
        }
    }

    /// Records the run and detaches `work`. The lease is held until the run
    /// is recorded as finished, and released even if `work` panics.
    fn spawn_job<T, Fut>(
        &self,
        lease: JobLease,
        triggered_by: String,
        work: Fut,
    ) -> Result<JoinHandle<Option<T>>, StartJobError>
    where
        T: JobOutcome + Send + 'static,
        Fut: Future<Output = T> + Send + 'static,
    {
        let family = lease.family();
        let run_id = self
            .server_store
            .record_job_start(family.as_str(), &triggered_by)
            .map_err(StartJobError::Store)?;
        info!(
            "Starting {} job (run_id: {}, triggered_by: {})",
            family, run_id, triggered_by
        );

        let server_store = Arc::clone(&self.server_store);
        let catalog_store = Arc::clone(&self.catalog_store);
        Ok(tokio::spawn(async move {
            metrics::set_job_running(family, true);
            let started = Instant::now();
            let result = tokio::spawn(work).await;
            let elapsed = started.elapsed();

            let (status, error_message, summary) = match &result {
                Ok(outcome) => {
                    let failure = outcome.failure();
                    let status = if failure.is_some() {
                        JobRunStatus::Failed
                    } else {
                        JobRunStatus::Completed
                    };
                    outcome.record_metrics();
                    (status, failure, serde_json::to_value(outcome).ok())
                }
                Err(e) => {
                    error!("{} job panicked after {:?}: {}", family, elapsed, e);
                    (JobRunStatus::Failed, Some(format!("Task panic: {}", e)), None)
                }
            };
            info!(
                "{} job {} finished in {:?} ({})",
                family,
                run_id,
                elapsed,
                status.as_str()
            );

            metrics::record_job_run(family, status.as_str(), elapsed);
            metrics::set_job_running(family, false);
            if let Err(e) =
                server_store.record_job_finish(run_id, status, error_message, summary.as_ref())
            {
                error!("Failed to record job finish for run {}: {}", run_id, e);
            }
            match catalog_store.get_counts() {
                Ok(counts) => metrics::set_catalog_metrics(&counts),
                Err(e) => error!("Failed to refresh catalog metrics: {}", e),
            }

            drop(lease);
            result.ok()
        }))
    }
}
