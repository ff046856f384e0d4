//! Metadata ingestion: crawl a query and upsert everything it returns.

use anyhow::Result;
use futures::StreamExt;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

use super::batcher::{fetch_details_batched, DEFAULT_DETAIL_CONCURRENCY};
use super::crawler::{crawl, SearchPage, PAGE_SIZE};
use super::resolver::{is_various_artists, AlbumRefs, EntityResolver, Resolution};
use crate::catalog_api::{AlbumRecord, CatalogApi, TrackRecord};
use crate::catalog_store::{Album, Artist, CatalogStore, Genre, Label, Track};

/// Number of distinct entities resolved during a run, by kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IngestionStats {
    pub artists: usize,
    pub genres: usize,
    pub labels: usize,
    pub albums: usize,
    pub tracks: usize,
}

impl IngestionStats {
    pub fn add(&mut self, other: &IngestionStats) {
        self.artists += other.artists;
        self.genres += other.genres;
        self.labels += other.labels;
        self.albums += other.albums;
        self.tracks += other.tracks;
    }
}

/// Outcome of ingesting one query (or one album).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestionReport {
    pub query: String,
    pub stats: IngestionStats,
    pub pages: usize,
    pub failed_records: usize,
    /// Set when a page fetch failed and the rest of the crawl was abandoned.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crawl_error: Option<String>,
}

/// Outcome of ingesting several queries in sequence.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchIngestionReport {
    pub totals: IngestionStats,
    pub reports: Vec<IngestionReport>,
}

#[derive(Debug, Clone, Copy)]
pub struct IngestionSettings {
    pub page_size: u32,
    pub detail_concurrency: usize,
}

impl Default for IngestionSettings {
    fn default() -> Self {
        Self {
            page_size: PAGE_SIZE,
            detail_concurrency: DEFAULT_DETAIL_CONCURRENCY,
        }
    }
}

/// Entities touched so far in one run, keyed by external id.
#[derive(Default)]
struct RunState {
    artists: HashSet<i64>,
    genres: HashSet<i64>,
    labels: HashSet<i64>,
    albums: HashSet<String>,
    tracks: HashSet<i64>,
    failed_records: usize,
}

impl RunState {
    fn record_artist(&mut self, resolution: &Resolution<Artist>) {
        if let Some(artist) = resolution.entity() {
            self.artists.insert(artist.external_id);
        }
    }

    fn record_genre(&mut self, resolution: &Resolution<Genre>) {
        if let Some(genre) = resolution.entity() {
            self.genres.insert(genre.external_id);
        }
    }

    fn record_label(&mut self, resolution: &Resolution<Label>) {
        if let Some(label) = resolution.entity() {
            self.labels.insert(label.external_id);
        }
    }

    fn record_album(&mut self, resolution: &Resolution<Album>) {
        if let Some(album) = resolution.entity() {
            self.albums.insert(album.external_id.clone());
        }
    }

    fn record_track(&mut self, resolution: &Resolution<Track>) {
        if let Some(track) = resolution.entity() {
            self.tracks.insert(track.external_id);
        }
    }

    fn stats(&self) -> IngestionStats {
        IngestionStats {
            artists: self.artists.len(),
            genres: self.genres.len(),
            labels: self.labels.len(),
            albums: self.albums.len(),
            tracks: self.tracks.len(),
        }
    }
}

pub struct IngestionPipeline {
    api: Arc<dyn CatalogApi>,
    resolver: EntityResolver,
    settings: IngestionSettings,
}

impl IngestionPipeline {
    pub fn new(
        api: Arc<dyn CatalogApi>,
        store: Arc<dyn CatalogStore>,
        settings: IngestionSettings,
    ) -> Self {
        Self {
            api,
            resolver: EntityResolver::new(store),
            settings,
        }
    }

    /// Crawls `query` page by page until exhaustion or the first page failure.
    pub async fn ingest(&self, query: &str) -> IngestionReport {
        let started = Instant::now();
        info!("Starting metadata ingestion for '{}'", query);

        let mut run = RunState::default();
        let mut pages = 0;
        let mut crawl_error = None;

        let mut stream = Box::pin(crawl(self.api.as_ref(), query, self.settings.page_size));
        while let Some(page) = stream.next().await {
            match page {
                Ok(page) => {
                    self.ingest_page(&page, &mut run).await;
                    pages += 1;
                }
                Err(e) => {
                    error!("Aborting crawl of '{}': {}", query, e);
                    crawl_error = Some(e.to_string());
                    break;
                }
            }
        }

        let report = IngestionReport {
            query: query.to_string(),
            stats: run.stats(),
            pages,
            failed_records: run.failed_records,
            crawl_error,
        };
        info!(
            "Ingestion of '{}' finished in {:?}: {} pages, {} artists, {} genres, {} labels, {} albums, {} tracks, {} failed records",
            query,
            started.elapsed(),
            report.pages,
            report.stats.artists,
            report.stats.genres,
            report.stats.labels,
            report.stats.albums,
            report.stats.tracks,
            report.failed_records
        );
        report
    }

    /// Ingests each query in order; a failed crawl does not stop the next query.
    pub async fn ingest_all(&self, queries: &[String]) -> BatchIngestionReport {
        let mut batch = BatchIngestionReport::default();
        for (i, query) in queries.iter().enumerate() {
            debug!("Batch query {}/{}: '{}'", i + 1, queries.len(), query);
            let report = self.ingest(query).await;
            if let Some(e) = &report.crawl_error {
                warn!("Query '{}' ended early: {}", query, e);
            }
            batch.totals.add(&report.stats);
            batch.reports.push(report);
        }
        batch
    }

    /// Fetches one album's detail and upserts it with its tracks.
    pub async fn ingest_album(&self, stub: &AlbumRecord) -> IngestionReport {
        let mut run = RunState::default();
        let detail = match self.api.get_album_detail(&stub.id).await {
            Ok(detail) => Some(detail),
            Err(e) => {
                warn!("Album detail {} unavailable, using stub: {}", stub.id, e);
                None
            }
        };
        self.ingest_album_with_tracks(stub, detail.as_ref(), &mut run);

        let report = IngestionReport {
            query: format!("album:{}", stub.id),
            stats: run.stats(),
            pages: 0,
            failed_records: run.failed_records,
            crawl_error: None,
        };
        info!(
            "Album {} ingested: {} tracks, {} failed records",
            stub.id, report.stats.tracks, report.failed_records
        );
        report
    }

    async fn ingest_page(&self, page: &SearchPage, run: &mut RunState) {
        let results = &page.results;
        debug!(
            "Page at offset {}: {} artists, {} albums, {} tracks",
            page.offset,
            results.artists.items.len(),
            results.albums.items.len(),
            results.tracks.items.len()
        );

        let phase = Instant::now();
        for artist in &results.artists.items {
            match self.resolver.resolve_artist(artist) {
                Ok(resolution) => run.record_artist(&resolution),
                Err(e) => {
                    error!("Failed to resolve artist {}: {:#}", artist.id, e);
                    run.failed_records += 1;
                }
            }
        }
        debug!("Artists phase took {:?}", phase.elapsed());

        let phase = Instant::now();
        let album_ids: Vec<String> = results.albums.items.iter().map(|a| a.id.clone()).collect();
        let details = fetch_details_batched(
            self.api.as_ref(),
            &album_ids,
            self.settings.detail_concurrency,
        )
        .await;
        debug!("Album details phase took {:?}", phase.elapsed());

        let phase = Instant::now();
        for (stub, detail) in results.albums.items.iter().zip(details) {
            self.ingest_album_with_tracks(stub, detail.ok().as_ref(), run);
        }
        debug!("Albums phase took {:?}", phase.elapsed());

        let phase = Instant::now();
        self.ingest_standalone_tracks(&results.tracks.items, run).await;
        debug!("Tracks phase took {:?}", phase.elapsed());
    }

    fn ingest_album_with_tracks(
        &self,
        stub: &AlbumRecord,
        detail: Option<&AlbumRecord>,
        run: &mut RunState,
    ) {
        let album = match self.upsert_album(stub, detail, run) {
            Ok(Some(album)) => album,
            Ok(None) => return,
            Err(e) => {
                error!("Failed to ingest album {}: {:#}", stub.id, e);
                run.failed_records += 1;
                return;
            }
        };

        let Some(detail) = detail else {
            return;
        };
        for track in detail.track_items() {
            match self.resolver.resolve_track(track, &album.id) {
                Ok(resolution) => run.record_track(&resolution),
                Err(e) => {
                    error!(
                        "Failed to ingest track {} of album {}: {:#}",
                        track.id, stub.id, e
                    );
                    run.failed_records += 1;
                }
            }
        }
    }

    async fn ingest_standalone_tracks(&self, tracks: &[TrackRecord], run: &mut RunState) {
        let mut with_album = Vec::with_capacity(tracks.len());
        for track in tracks {
            match track.album.as_deref() {
                Some(album) => with_album.push((track, album)),
                None => warn!("Track {} has no album, skipping", track.id),
            }
        }

        let mut album_ids = Vec::new();
        let mut seen = HashSet::new();
        for (_, album) in &with_album {
            if seen.insert(album.id.clone()) {
                album_ids.push(album.id.clone());
            }
        }

        let fetched = fetch_details_batched(
            self.api.as_ref(),
            &album_ids,
            self.settings.detail_concurrency,
        )
        .await;
        let details: HashMap<String, AlbumRecord> = album_ids
            .into_iter()
            .zip(fetched)
            .filter_map(|(id, detail)| detail.ok().map(|d| (id, d)))
            .collect();

        for (track, album_stub) in with_album {
            let result = self
                .upsert_album(album_stub, details.get(&album_stub.id), run)
                .and_then(|album| match album {
                    Some(album) => self.resolver.resolve_track(track, &album.id).map(Some),
                    None => Ok(None),
                });
            match result {
                Ok(Some(resolution)) => run.record_track(&resolution),
                Ok(None) => {}
                Err(e) => {
                    error!("Failed to ingest track {}: {:#}", track.id, e);
                    run.failed_records += 1;
                }
            }
        }
    }

    /// Resolves an album and the entities it refers to.
    ///
    /// Returns `None` for compilation albums, which are not ingested.
    fn upsert_album(
        &self,
        stub: &AlbumRecord,
        detail: Option<&AlbumRecord>,
        run: &mut RunState,
    ) -> Result<Option<Album>> {
        let source = detail.unwrap_or(stub);
        if let Some(name) = source.artist_name().filter(|n| is_various_artists(n)) {
            debug!("Skipping album {} by '{}'", stub.id, name);
            return Ok(None);
        }

        let refs = self.resolve_refs(source, run)?;
        let resolution = self.resolver.resolve_album(stub, detail, refs)?;
        run.record_album(&resolution);
        Ok(resolution.into_entity())
    }

    fn resolve_refs(&self, source: &AlbumRecord, run: &mut RunState) -> Result<AlbumRefs> {
        let mut refs = AlbumRefs::default();
        if let Some(artist) = &source.artist {
            let resolution = self.resolver.resolve_artist(artist)?;
            run.record_artist(&resolution);
            refs.artist_id = resolution.into_entity().map(|a| a.id);
        }
        if let Some(genre) = &source.genre {
            let resolution = self.resolver.resolve_genre(genre)?;
            run.record_genre(&resolution);
            refs.genre_id = resolution.into_entity().map(|g| g.id);
        }
        if let Some(label) = &source.label {
            let resolution = self.resolver.resolve_label(label)?;
            run.record_label(&resolution);
            refs.label_id = resolution.into_entity().map(|l| l.id);
        }
        Ok(refs)
    }
}
