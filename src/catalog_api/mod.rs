//! External catalog service integration.
//!
//! The pipeline only talks to the catalog through [`CatalogApi`] and to the
//! asset CDN through [`AssetFetcher`], so both can be replaced in tests.

mod client;
mod models;

pub use client::{CatalogApiClient, CatalogApiCredentials, HttpAssetFetcher};
pub use models::*;

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogApiError {
    #[error("request to {endpoint} failed: {source}")]
    Http {
        endpoint: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{endpoint} returned status {status}")]
    Status { endpoint: &'static str, status: u16 },

    #[error("failed to decode {endpoint} response: {message}")]
    Decode {
        endpoint: &'static str,
        message: String,
    },

    #[error("no download url for track {track_id} at quality {quality}")]
    AssetUnavailable {
        track_id: i64,
        quality: DownloadQuality,
    },
}

/// Read access to the external music catalog.
#[async_trait]
pub trait CatalogApi: Send + Sync {
    /// Keyword search, paginated by `limit` and `offset`.
    async fn search(
        &self,
        query: &str,
        limit: u32,
        offset: u32,
    ) -> Result<SearchResults, CatalogApiError>;

    /// Full album record including its track listing.
    async fn get_album_detail(&self, album_id: &str) -> Result<AlbumRecord, CatalogApiError>;

    /// Time-limited signed URL for a track's audio asset.
    async fn get_download_url(
        &self,
        track_id: i64,
        quality: DownloadQuality,
    ) -> Result<String, CatalogApiError>;
}

/// Fetches binary assets (audio, cover art) from arbitrary URLs.
#[async_trait]
pub trait AssetFetcher: Send + Sync {
    async fn fetch(&self, url: &str, timeout: Duration) -> anyhow::Result<Vec<u8>>;
}
