//! Album downloads from the catalog CDN into the local library.

mod naming;
mod orchestrator;

pub use naming::{
    album_folder, cover_url, loose_track_file_name, release_year, sanitize, track_file_name,
};
pub use orchestrator::{
    AlbumDownloadResult, AlbumDownloadSummary, DownloadOrchestrator, DownloadSettings,
    TrackDownloadSummary,
};
