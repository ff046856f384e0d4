//! Read-only views of ingested albums and their download progress.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Response,
    routing::get,
    Router,
};
use serde::Deserialize;
use tracing::warn;

use super::responses::{failure, ok};
use super::state::{GuardedCatalogStore, ServerState};
use crate::catalog_store::DownloadStatus;

#[derive(Debug, Deserialize)]
pub struct AlbumListQuery {
    #[serde(default = "default_status")]
    pub status: String,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_status() -> String {
    DownloadStatus::Pending.as_db_str().to_string()
}

fn default_limit() -> usize {
    50
}

/// GET /?status=&limit= - Albums in a download state, oldest first
async fn list_albums(
    State(store): State<GuardedCatalogStore>,
    Query(params): Query<AlbumListQuery>,
) -> Response {
    let Some(status) = DownloadStatus::from_db_str(&params.status.to_uppercase()) else {
        return failure(
            StatusCode::BAD_REQUEST,
            format!("Unknown download status '{}'", params.status),
        );
    };

    match store.list_albums_by_download_status(status, params.limit) {
        Ok(albums) => ok(albums),
        Err(e) => {
            warn!("Failed to list {} albums: {:#}", status.as_db_str(), e);
            failure(StatusCode::INTERNAL_SERVER_ERROR, "Failed to list albums")
        }
    }
}

/// GET /{id}/tracks - Tracks of an album with their download state
async fn list_album_tracks(
    State(store): State<GuardedCatalogStore>,
    Path(album_id): Path<String>,
) -> Response {
    match store.get_album(&album_id) {
        Ok(Some(_)) => {}
        Ok(None) => {
            return failure(StatusCode::NOT_FOUND, format!("Album {} not found", album_id))
        }
        Err(e) => {
            warn!("Failed to get album {}: {:#}", album_id, e);
            return failure(StatusCode::INTERNAL_SERVER_ERROR, "Failed to get album");
        }
    }

    match store.list_album_tracks(&album_id) {
        Ok(tracks) => ok(tracks),
        Err(e) => {
            warn!("Failed to list tracks of album {}: {:#}", album_id, e);
            failure(StatusCode::INTERNAL_SERVER_ERROR, "Failed to list tracks")
        }
    }
}

pub fn album_routes() -> Router<ServerState> {
    Router::new()
        .route("/", get(list_albums))
        .route("/{id}/tracks", get(list_album_tracks))
}
