//! Entity graph stored in the catalog database.
//!
//! Every entity carries a stable internal id (UUIDv7, generated once at
//! insert) and the external id assigned by the upstream catalog.

use serde::{Deserialize, Serialize};

use crate::catalog_api::{AlbumRecord, ArtistImage, TrackRecord};

/// Download (and upload) state of an album or track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DownloadStatus {
    Pending,
    Processing,
    Success, // terminal for one run
    Failed,  // terminal for one run
}

impl DownloadStatus {
    pub fn as_db_str(&self) -> &'static str {
        match self {
            DownloadStatus::Pending => "PENDING",
            DownloadStatus::Processing => "PROCESSING",
            DownloadStatus::Success => "SUCCESS",
            DownloadStatus::Failed => "FAILED",
        }
    }

    pub fn from_db_str(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(DownloadStatus::Pending),
            "PROCESSING" => Some(DownloadStatus::Processing),
            "SUCCESS" => Some(DownloadStatus::Success),
            "FAILED" => Some(DownloadStatus::Failed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Artist {
    pub id: String,
    pub external_id: i64,
    pub name: String,
    pub albums_count: i64,
    pub image: Option<ArtistImage>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Genre {
    pub id: String,
    pub external_id: i64,
    pub name: String,
    pub color: Option<String>,
    pub path: Vec<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Label {
    pub id: String,
    pub external_id: i64,
    pub name: String,
    pub albums_count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Album {
    pub id: String,
    pub external_id: String,
    pub artist_id: Option<String>,
    pub label_id: Option<String>,
    pub genre_id: Option<String>,
    pub upc: Option<String>,
    pub upload_status: DownloadStatus,
    pub download_status: DownloadStatus,
    /// Album payload without its track listing.
    pub data: AlbumRecord,
}

impl Album {
    pub fn title(&self) -> Option<&str> {
        self.data.title.as_deref()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Track {
    pub id: String,
    pub external_id: i64,
    pub album_id: String,
    pub isrc: Option<String>,
    pub folder_path: Option<String>,
    pub upload_status: DownloadStatus,
    pub download_status: DownloadStatus,
    /// Track payload without the embedded album.
    pub data: TrackRecord,
}

impl Track {
    pub fn title(&self) -> Option<&str> {
        self.data.title.as_deref()
    }
}

/// Names joined from an album's artist and genre rows.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AlbumRelations {
    pub artist_name: Option<String>,
    pub genre_name: Option<String>,
}

/// Row counts per entity kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CatalogCounts {
    pub artists: usize,
    pub genres: usize,
    pub labels: usize,
    pub albums: usize,
    pub tracks: usize,
}
