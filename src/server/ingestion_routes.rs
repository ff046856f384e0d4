//! Metadata ingestion routes.
//!
//! Every route only starts a job: the response is sent as soon as the
//! metadata flag is acquired, the crawl continues in the background.

use axum::{
    extract::{Query, State},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde::Deserialize;
use tracing::info;

use super::responses::accepted;
use super::state::{GuardedJobLauncher, ServerState};
use crate::catalog_api::AlbumRecord;

#[derive(Debug, Deserialize)]
pub struct MetadataQuery {
    #[serde(default)]
    pub q: String,
}

#[derive(Debug, Deserialize)]
pub struct BatchBody {
    #[serde(default)]
    pub queries: Vec<String>,
}

/// POST /metadata?q= - Ingest everything a search query returns
async fn start_metadata_ingestion(
    State(launcher): State<GuardedJobLauncher>,
    Query(params): Query<MetadataQuery>,
) -> Response {
    match launcher.start_ingestion(&params.q) {
        Ok(_) => {
            let query = params.q.trim();
            info!("Accepted metadata ingestion for '{}'", query);
            accepted(format!("Metadata ingestion started for '{}'", query))
        }
        Err(e) => e.into_response(),
    }
}

/// POST /batch - Ingest several queries one after the other
async fn start_batch_ingestion(
    State(launcher): State<GuardedJobLauncher>,
    Json(body): Json<BatchBody>,
) -> Response {
    match launcher.start_ingestion_batch(body.queries) {
        Ok(_) => accepted("Batch metadata ingestion started"),
        Err(e) => e.into_response(),
    }
}

/// POST /album - Ingest a single album from its search stub
async fn start_album_ingestion(
    State(launcher): State<GuardedJobLauncher>,
    Json(stub): Json<AlbumRecord>,
) -> Response {
    let album_id = stub.id.clone();
    match launcher.start_album_ingestion(stub) {
        Ok(_) => accepted(format!("Metadata ingestion started for album {}", album_id)),
        Err(e) => e.into_response(),
    }
}

pub fn ingestion_routes() -> Router<ServerState> {
    Router::new()
        .route("/metadata", post(start_metadata_ingestion))
        .route("/batch", post(start_batch_ingestion))
        .route("/album", post(start_album_ingestion))
}
