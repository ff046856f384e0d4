//! Sequential download of pending albums to the local library.

use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use super::naming::{
    album_folder, cover_url, loose_track_file_name, track_file_name, COVER_FILE_NAME,
};
use crate::catalog_api::{AssetFetcher, CatalogApi, DownloadQuality};
use crate::catalog_store::{Album, CatalogStore, DownloadStatus, Track};

#[derive(Debug, Clone)]
pub struct DownloadSettings {
    pub downloads_dir: PathBuf,
    pub quality: DownloadQuality,
    pub track_timeout: Duration,
    pub cover_timeout: Duration,
    /// Pause between two tracks of a pending-tracks run.
    pub track_pause: Duration,
}

impl DownloadSettings {
    pub fn new(downloads_dir: PathBuf) -> Self {
        Self {
            downloads_dir,
            quality: DownloadQuality::default(),
            track_timeout: Duration::from_secs(300),
            cover_timeout: Duration::from_secs(60),
            track_pause: Duration::from_secs(1),
        }
    }
}

/// Outcome of downloading a single album.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlbumDownloadResult {
    pub success: bool,
    /// The album had no tracks and was left PENDING.
    pub no_tracks: bool,
    pub downloaded_tracks: usize,
    pub failed_tracks: usize,
    pub errors: Vec<String>,
}

/// Outcome of one `process_pending_albums` run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlbumDownloadSummary {
    pub processed: usize,
    pub successful: usize,
    pub failed: usize,
    pub total_tracks_downloaded: usize,
    pub total_tracks_failed: usize,
    pub errors: Vec<String>,
}

/// Outcome of one `process_pending_tracks` run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TrackDownloadSummary {
    pub processed: usize,
    pub successful: usize,
    pub failed: usize,
    pub errors: Vec<String>,
}

pub struct DownloadOrchestrator {
    store: Arc<dyn CatalogStore>,
    api: Arc<dyn CatalogApi>,
    fetcher: Arc<dyn AssetFetcher>,
    settings: DownloadSettings,
}

impl DownloadOrchestrator {
    pub fn new(
        store: Arc<dyn CatalogStore>,
        api: Arc<dyn CatalogApi>,
        fetcher: Arc<dyn AssetFetcher>,
        settings: DownloadSettings,
    ) -> Self {
        Self {
            store,
            api,
            fetcher,
            settings,
        }
    }

    /// Downloads up to `max_count` pending albums, one after the other.
    pub async fn process_pending_albums(&self, max_count: usize) -> AlbumDownloadSummary {
        let mut summary = AlbumDownloadSummary::default();

        let pending = match self
            .store
            .list_albums_by_download_status(DownloadStatus::Pending, max_count)
        {
            Ok(albums) => albums,
            Err(e) => {
                let msg = format!("Error fetching pending albums: {:#}", e);
                error!("{}", msg);
                summary.errors.push(msg);
                return summary;
            }
        };
        info!("Found {} pending albums", pending.len());

        let mut empty_albums = 0;
        for album in &pending {
            summary.processed += 1;
            debug!(
                "Processing album {}/{}: {}",
                summary.processed,
                pending.len(),
                album.external_id
            );

            let result = self.download_album(album).await;
            if result.no_tracks {
                empty_albums += 1;
            }
            summary.total_tracks_downloaded += result.downloaded_tracks;
            summary.total_tracks_failed += result.failed_tracks;
            summary.errors.extend(result.errors);

            if result.success {
                summary.successful += 1;
                info!("Downloaded album {}", album.external_id);
            } else {
                summary.failed += 1;
                let msg = format!("Failed to download album {}", album.external_id);
                error!("{}", msg);
                summary.errors.push(msg);
            }
        }

        if empty_albums > 0 && empty_albums == pending.len() {
            warn!(
                "All {} selected albums have no tracks and stay PENDING; re-ingest them to fetch their tracks",
                empty_albums
            );
        }

        info!(
            "Album downloads complete: {} processed, {} successful, {} failed, {} tracks downloaded, {} tracks failed",
            summary.processed,
            summary.successful,
            summary.failed,
            summary.total_tracks_downloaded,
            summary.total_tracks_failed
        );
        summary
    }

    /// Downloads one album's cover and tracks and records the final status.
    ///
    /// An album without tracks is left untouched in PENDING.
    pub async fn download_album(&self, album: &Album) -> AlbumDownloadResult {
        let tracks = match self.store.list_album_tracks(&album.id) {
            Ok(tracks) => tracks,
            Err(e) => {
                return AlbumDownloadResult {
                    errors: vec![format!(
                        "Error processing album {}: {:#}",
                        album.external_id, e
                    )],
                    ..Default::default()
                }
            }
        };

        if tracks.is_empty() {
            warn!("Album {} has no tracks", album.external_id);
            return AlbumDownloadResult {
                no_tracks: true,
                errors: vec!["No tracks found for album".to_string()],
                ..Default::default()
            };
        }

        let mut result = AlbumDownloadResult::default();
        if let Err(e) = self.download_tracks(album, &tracks, &mut result).await {
            error!("Error downloading album {}: {:#}", album.external_id, e);
            if let Err(update_err) = self
                .store
                .set_album_download_status(&album.id, DownloadStatus::Failed)
            {
                error!(
                    "Failed to mark album {} as failed: {:#}",
                    album.external_id, update_err
                );
            }
            result.success = false;
            result
                .errors
                .push(format!("Error downloading album {}: {:#}", album.external_id, e));
        }
        result
    }

    async fn download_tracks(
        &self,
        album: &Album,
        tracks: &[Track],
        result: &mut AlbumDownloadResult,
    ) -> Result<()> {
        self.store
            .set_album_download_status(&album.id, DownloadStatus::Processing)?;

        let folder = self.prepare_album_folder(album).await?;
        self.download_cover(album, &folder).await;

        for (index, track) in tracks.iter().enumerate() {
            let file_name = track_file_name(index + 1, track.title(), track.external_id);
            if self.download_track(track, &folder, &file_name).await {
                result.downloaded_tracks += 1;
            } else {
                result.failed_tracks += 1;
                result
                    .errors
                    .push(format!("Failed to download track {}", track.external_id));
            }
        }

        let status = if result.downloaded_tracks > 0 {
            DownloadStatus::Success
        } else {
            DownloadStatus::Failed
        };
        self.store.set_album_download_status(&album.id, status)?;
        result.success = result.downloaded_tracks > 0;
        Ok(())
    }

    /// Downloads every PENDING track on its own, one after the other, into
    /// its album folder as `<title>.flac`. Album statuses are not touched.
    pub async fn process_pending_tracks(&self, max_count: Option<usize>) -> TrackDownloadSummary {
        let mut summary = TrackDownloadSummary::default();

        let pending = match self
            .store
            .list_tracks_by_download_status(DownloadStatus::Pending, max_count)
        {
            Ok(tracks) => tracks,
            Err(e) => {
                let msg = format!("Error fetching pending tracks: {:#}", e);
                error!("{}", msg);
                summary.errors.push(msg);
                return summary;
            }
        };
        info!("Found {} pending tracks", pending.len());

        // Album id -> prepared folder, the cover being fetched once per album
        let mut folders: HashMap<String, PathBuf> = HashMap::new();
        for (index, track) in pending.iter().enumerate() {
            if index > 0 && !self.settings.track_pause.is_zero() {
                tokio::time::sleep(self.settings.track_pause).await;
            }
            summary.processed += 1;
            debug!(
                "Processing track {}/{}: {}",
                summary.processed,
                pending.len(),
                track.external_id
            );

            let cached = folders.get(&track.album_id).cloned();
            let folder = match cached {
                Some(folder) => folder,
                None => match self.prepare_track_folder(track).await {
                    Ok(folder) => {
                        folders.insert(track.album_id.clone(), folder.clone());
                        folder
                    }
                    Err(e) => {
                        let msg = format!("Error processing track {}: {:#}", track.external_id, e);
                        error!("{}", msg);
                        self.mark_track_failed(track);
                        summary.failed += 1;
                        summary.errors.push(msg);
                        continue;
                    }
                },
            };

            let file_name = loose_track_file_name(track.title(), track.external_id);
            if self.download_track(track, &folder, &file_name).await {
                summary.successful += 1;
                debug!("Downloaded track {}", track.external_id);
            } else {
                summary.failed += 1;
                summary
                    .errors
                    .push(format!("Failed to download track {}", track.external_id));
            }
        }

        info!(
            "Track downloads complete: {} processed, {} successful, {} failed",
            summary.processed, summary.successful, summary.failed
        );
        summary
    }

    async fn prepare_track_folder(&self, track: &Track) -> Result<PathBuf> {
        let album = self
            .store
            .get_album(&track.album_id)?
            .with_context(|| format!("Album {} not found", track.album_id))?;
        let folder = self.prepare_album_folder(&album).await?;
        self.download_cover(&album, &folder).await;
        Ok(folder)
    }

    /// Creates `<artist>/<title> --- <genre> --- <year>` under the downloads root.
    async fn prepare_album_folder(&self, album: &Album) -> Result<PathBuf> {
        let relations = self.store.get_album_relations(&album.id)?;
        let folder = album_folder(
            &self.settings.downloads_dir,
            relations
                .artist_name
                .as_deref()
                .or(album.data.artist_name()),
            album.title(),
            relations
                .genre_name
                .as_deref()
                .or(album.data.genre.as_ref().map(|g| g.name.as_str())),
            album.data.released_at,
        );
        tokio::fs::create_dir_all(&folder)
            .await
            .with_context(|| format!("Failed to create {}", folder.display()))?;
        Ok(folder)
    }

    /// Best effort; a missing or failing cover never fails the album.
    async fn download_cover(&self, album: &Album, folder: &Path) -> bool {
        let Some(url) = album.data.image.as_ref().and_then(cover_url) else {
            debug!("Album {} has no cover image", album.external_id);
            return false;
        };

        let path = folder.join(COVER_FILE_NAME);
        let saved = async {
            let bytes = self.fetcher.fetch(url, self.settings.cover_timeout).await?;
            tokio::fs::write(&path, &bytes)
                .await
                .with_context(|| format!("Failed to write {}", path.display()))
        }
        .await;

        match saved {
            Ok(()) => {
                debug!("Saved cover of album {}", album.external_id);
                true
            }
            Err(e) => {
                warn!(
                    "Failed to download cover of album {}: {:#}",
                    album.external_id, e
                );
                false
            }
        }
    }

    /// Downloads one track; any failure marks it FAILED and returns false.
    async fn download_track(&self, track: &Track, folder: &Path, file_name: &str) -> bool {
        match self.try_download_track(track, folder, file_name).await {
            Ok(()) => true,
            Err(e) => {
                error!("Error downloading track {}: {:#}", track.external_id, e);
                self.mark_track_failed(track);
                false
            }
        }
    }

    fn mark_track_failed(&self, track: &Track) {
        if let Err(e) = self
            .store
            .set_track_download_status(&track.id, DownloadStatus::Failed)
        {
            error!("Failed to mark track {} as failed: {:#}", track.external_id, e);
        }
    }

    async fn try_download_track(&self, track: &Track, folder: &Path, file_name: &str) -> Result<()> {
        self.store
            .set_track_download_status(&track.id, DownloadStatus::Processing)?;

        let url = self
            .api
            .get_download_url(track.external_id, self.settings.quality)
            .await?;
        let bytes = self.fetcher.fetch(&url, self.settings.track_timeout).await?;
        debug!("Fetched {} bytes for track {}", bytes.len(), track.external_id);

        let path = folder.join(file_name);
        tokio::fs::write(&path, &bytes)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;

        // SUCCESS is written last so a failed attempt never passes through it
        self.store
            .set_track_folder_path(&track.id, &folder.to_string_lossy())?;
        self.store
            .set_track_download_status(&track.id, DownloadStatus::Success)?;
        Ok(())
    }
}
