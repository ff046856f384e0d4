//! CatalogStore trait definition.

use anyhow::Result;

use super::models::{
    Album, AlbumRelations, Artist, CatalogCounts, DownloadStatus, Genre, Label, Track,
};

/// Persistence of the normalized entity graph.
///
/// Lookups are keyed by the upstream external id; writes are keyed by the
/// internal id. Every write is a single statement, so each row update is atomic.
pub trait CatalogStore: Send + Sync {
    // =========================================================================
    // Artists, genres, labels
    // =========================================================================

    fn find_artist_by_external_id(&self, external_id: i64) -> Result<Option<Artist>>;
    fn insert_artist(&self, artist: &Artist) -> Result<()>;
    fn update_artist(&self, artist: &Artist) -> Result<()>;

    fn find_genre_by_external_id(&self, external_id: i64) -> Result<Option<Genre>>;
    fn insert_genre(&self, genre: &Genre) -> Result<()>;
    fn update_genre(&self, genre: &Genre) -> Result<()>;

    fn find_label_by_external_id(&self, external_id: i64) -> Result<Option<Label>>;
    fn insert_label(&self, label: &Label) -> Result<()>;
    fn update_label(&self, label: &Label) -> Result<()>;

    // =========================================================================
    // Albums
    // =========================================================================

    fn get_album(&self, id: &str) -> Result<Option<Album>>;
    fn find_album_by_external_id(&self, external_id: &str) -> Result<Option<Album>>;
    fn insert_album(&self, album: &Album) -> Result<()>;

    /// Replaces the album payload. References and statuses are left untouched.
    fn update_album_data(&self, album: &Album) -> Result<()>;

    /// Albums in the given download state. Albums that have tracks come
    /// first, oldest first within each group.
    fn list_albums_by_download_status(
        &self,
        status: DownloadStatus,
        limit: usize,
    ) -> Result<Vec<Album>>;

    fn get_album_relations(&self, album_id: &str) -> Result<AlbumRelations>;
    fn set_album_download_status(&self, album_id: &str, status: DownloadStatus) -> Result<()>;

    // =========================================================================
    // Tracks
    // =========================================================================

    fn find_track_by_external_id(&self, external_id: i64) -> Result<Option<Track>>;
    fn insert_track(&self, track: &Track) -> Result<()>;

    /// Replaces the track payload and ISRC. The album reference is left untouched.
    fn update_track_data(&self, track: &Track) -> Result<()>;

    /// Tracks in the given download state, oldest first. `None` lists them all.
    fn list_tracks_by_download_status(
        &self,
        status: DownloadStatus,
        limit: Option<usize>,
    ) -> Result<Vec<Track>>;

    /// Tracks of an album in listing order.
    fn list_album_tracks(&self, album_id: &str) -> Result<Vec<Track>>;
    fn set_track_download_status(&self, track_id: &str, status: DownloadStatus) -> Result<()>;
    fn set_track_folder_path(&self, track_id: &str, folder_path: &str) -> Result<()>;

    // =========================================================================
    // Counts (for metrics)
    // =========================================================================

    fn get_counts(&self) -> Result<CatalogCounts>;
}
