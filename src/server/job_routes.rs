//! Job flags and run history.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Response,
    routing::get,
    Router,
};
use serde::Deserialize;
use tracing::warn;

use super::responses::{failure, ok};
use super::state::{GuardedJobLauncher, GuardedServerStore, ServerState};
use crate::background_jobs::GuardError;
use crate::server_store::JobFamily;

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub job: String,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    20
}

/// GET /flags - Current processing flags
async fn get_flags(State(launcher): State<GuardedJobLauncher>) -> Response {
    match launcher.guard().flags() {
        Ok(flags) => ok(flags),
        Err(GuardError::ConfigNotFound) => {
            failure(StatusCode::INTERNAL_SERVER_ERROR, "config not found")
        }
        Err(GuardError::Store(e)) => {
            warn!("Failed to load job flags: {:#}", e);
            failure(StatusCode::INTERNAL_SERVER_ERROR, "Failed to load job flags")
        }
    }
}

/// GET /running - Runs that have not finished yet
async fn get_running(State(store): State<GuardedServerStore>) -> Response {
    match store.get_running_jobs() {
        Ok(runs) => ok(runs),
        Err(e) => {
            warn!("Failed to list running jobs: {:#}", e);
            failure(StatusCode::INTERNAL_SERVER_ERROR, "Failed to list running jobs")
        }
    }
}

/// GET /history?job=&limit= - Most recent runs of one job family
async fn get_history(
    State(store): State<GuardedServerStore>,
    Query(params): Query<HistoryQuery>,
) -> Response {
    let Some(family) = JobFamily::parse(&params.job) else {
        return failure(
            StatusCode::BAD_REQUEST,
            format!("Unknown job '{}', expected metadata or albums", params.job),
        );
    };

    match store.get_job_history(family.as_str(), params.limit) {
        Ok(runs) => ok(runs),
        Err(e) => {
            warn!("Failed to load {} job history: {:#}", family, e);
            failure(StatusCode::INTERNAL_SERVER_ERROR, "Failed to load job history")
        }
    }
}

pub fn job_routes() -> Router<ServerState> {
    Router::new()
        .route("/flags", get(get_flags))
        .route("/running", get(get_running))
        .route("/history", get(get_history))
}
