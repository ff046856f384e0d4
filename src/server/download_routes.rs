//! Album and track download routes.

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

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlbumDownloadBody {
    pub album_count_to_download: i64,
}

/// POST /albums - Download up to `albumCountToDownload` pending albums
async fn start_album_downloads(
    State(launcher): State<GuardedJobLauncher>,
    Json(body): Json<AlbumDownloadBody>,
) -> Response {
    // Non-positive counts are rejected by the launcher
    let count = usize::try_from(body.album_count_to_download).unwrap_or(0);
    match launcher.start_album_downloads(count) {
        Ok(_) => {
            info!("Accepted download of up to {} albums", count);
            accepted(format!("Download started for up to {} albums", count))
        }
        Err(e) => e.into_response(),
    }
}

#[derive(Debug, Deserialize)]
pub struct TrackDownloadQuery {
    pub limit: Option<i64>,
}

/// POST /tracks?limit= - Download pending tracks one by one, all of them
/// unless `limit` is given
async fn start_track_downloads(
    State(launcher): State<GuardedJobLauncher>,
    Query(query): Query<TrackDownloadQuery>,
) -> Response {
    let limit = query.limit.map(|n| usize::try_from(n).unwrap_or(0));
    match launcher.start_track_downloads(limit) {
        Ok(_) => {
            info!("Accepted pending track download (limit: {:?})", limit);
            accepted("Pending track download started".to_string())
        }
        Err(e) => e.into_response(),
    }
}

pub fn download_routes() -> Router<ServerState> {
    Router::new()
        .route("/albums", post(start_album_downloads))
        .route("/tracks", post(start_track_downloads))
}
