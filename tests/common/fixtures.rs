//! Fake catalog service and asset CDN
//!
//! The fake catalog serves one search page holding one artist, genre, label
//! and album stub. The album detail lists two tracks.

use super::constants::*;
use async_trait::async_trait;
use music_harvester::catalog_api::{
    AlbumImage, AlbumRecord, ArtistRecord, AssetFetcher, CatalogApi, CatalogApiError,
    DownloadQuality, GenreRecord, ItemPage, LabelRecord, SearchResults, TrackRecord,
};
use std::collections::HashSet;
use std::sync::Mutex;
use std::time::Duration;

pub fn artist_record() -> ArtistRecord {
    ArtistRecord {
        id: ARTIST_ID,
        name: ARTIST_NAME.to_string(),
        albums_count: Some(1),
        image: None,
    }
}

pub fn album_stub() -> AlbumRecord {
    AlbumRecord {
        id: ALBUM_ID.to_string(),
        title: Some(ALBUM_TITLE.to_string()),
        upc: Some("074646193520".to_string()),
        released_at: Some(ALBUM_RELEASED_AT),
        image: Some(AlbumImage {
            small: None,
            thumbnail: None,
            large: Some(COVER_URL.to_string()),
            back: None,
        }),
        artist: Some(artist_record()),
        genre: Some(GenreRecord {
            id: GENRE_ID,
            name: GENRE_NAME.to_string(),
            color: None,
            path: vec![GENRE_ID],
        }),
        label: Some(LabelRecord {
            id: LABEL_ID,
            name: LABEL_NAME.to_string(),
            albums_count: None,
        }),
        tracks_count: Some(2),
        ..Default::default()
    }
}

fn track_record(id: i64, title: &str, track_number: u32) -> TrackRecord {
    TrackRecord {
        id,
        title: Some(title.to_string()),
        version: None,
        track_number: Some(track_number),
        media_number: Some(1),
        duration: Some(540),
        isrc: None,
        performer: None,
        album: None,
        extra: Default::default(),
    }
}

pub fn album_detail() -> AlbumRecord {
    AlbumRecord {
        tracks: Some(ItemPage::from_items(vec![
            track_record(TRACK_1_ID, TRACK_1_TITLE, 1),
            track_record(TRACK_2_ID, TRACK_2_TITLE, 2),
        ])),
        ..album_stub()
    }
}

pub fn search_page() -> SearchResults {
    SearchResults {
        query: None,
        artists: ItemPage::from_items(vec![artist_record()]),
        genres: ItemPage::from_items(album_stub().genre.into_iter().collect()),
        labels: ItemPage::from_items(album_stub().label.into_iter().collect()),
        albums: ItemPage::from_items(vec![album_stub()]),
        tracks: ItemPage::default(),
    }
}

pub fn track_url(track_id: i64) -> String {
    format!("https://cdn.test/tracks/{}.flac", track_id)
}

/// Catalog with a single search page at offset 0.
#[derive(Default)]
pub struct FakeCatalog {
    /// Delay applied to every search call
    pub search_delay: Duration,
    /// Tracks without a download url
    pub unavailable: HashSet<i64>,
    pub search_calls: Mutex<Vec<(String, u32)>>,
}

#[async_trait]
impl CatalogApi for FakeCatalog {
    async fn search(
        &self,
        query: &str,
        _limit: u32,
        offset: u32,
    ) -> Result<SearchResults, CatalogApiError> {
        self.search_calls
            .lock()
            .unwrap()
            .push((query.to_string(), offset));
        tokio::time::sleep(self.search_delay).await;
        if offset == 0 {
            Ok(search_page())
        } else {
            Ok(SearchResults::default())
        }
    }

    async fn get_album_detail(&self, album_id: &str) -> Result<AlbumRecord, CatalogApiError> {
        if album_id == ALBUM_ID {
            Ok(album_detail())
        } else {
            Err(CatalogApiError::Status {
                endpoint: "album/get",
                status: 404,
            })
        }
    }

    async fn get_download_url(
        &self,
        track_id: i64,
        quality: DownloadQuality,
    ) -> Result<String, CatalogApiError> {
        if self.unavailable.contains(&track_id) {
            Err(CatalogApiError::AssetUnavailable { track_id, quality })
        } else {
            Ok(track_url(track_id))
        }
    }
}

/// Serves `url.as_bytes()` for every url not listed as failing.
#[derive(Default)]
pub struct FakeFetcher {
    pub failing: HashSet<String>,
    pub fetched: Mutex<Vec<String>>,
}

#[async_trait]
impl AssetFetcher for FakeFetcher {
    async fn fetch(&self, url: &str, _timeout: Duration) -> anyhow::Result<Vec<u8>> {
        self.fetched.lock().unwrap().push(url.to_string());
        if self.failing.contains(url) {
            anyhow::bail!("HTTP 503 for {}", url);
        }
        Ok(url.as_bytes().to_vec())
    }
}
