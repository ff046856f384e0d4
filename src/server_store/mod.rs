mod models;
mod schema;
mod sqlite_server_store;

pub use models::*;
pub use schema::SERVER_VERSIONED_SCHEMAS;
pub use sqlite_server_store::SqliteServerStore;

use anyhow::Result;

pub trait ServerStore: Send + Sync {
    // Job flags
    /// Returns `None` when the flags record does not exist.
    fn load_job_flags(&self) -> Result<Option<JobFlags>>;
    fn save_job_flags(&self, flags: &JobFlags) -> Result<()>;

    // Job runs
    fn record_job_start(&self, job_id: &str, triggered_by: &str) -> Result<i64>;
    fn record_job_finish(
        &self,
        run_id: i64,
        status: JobRunStatus,
        error_message: Option<String>,
        summary: Option<&serde_json::Value>,
    ) -> Result<()>;
    fn get_running_jobs(&self) -> Result<Vec<JobRun>>;
    fn get_job_history(&self, job_id: &str, limit: usize) -> Result<Vec<JobRun>>;
    fn mark_stale_jobs_failed(&self) -> Result<usize>;
}
