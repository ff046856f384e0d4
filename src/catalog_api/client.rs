//! HTTP client for the external catalog service.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

use super::models::{AlbumRecord, DownloadQuality, FileUrlResponse, SearchResults};
use super::{AssetFetcher, CatalogApi, CatalogApiError};

/// Application credentials sent with every catalog request.
#[derive(Clone, Debug, Default)]
pub struct CatalogApiCredentials {
    pub app_id: String,
    pub app_secret: String,
    pub user_auth_token: Option<String>,
}

/// HTTP client for communicating with the catalog service.
pub struct CatalogApiClient {
    client: reqwest::Client,
    base_url: String,
    credentials: CatalogApiCredentials,
}

impl CatalogApiClient {
    /// Create a new catalog client.
    ///
    /// # Arguments
    /// * `base_url` - Base URL of the catalog API (e.g., "https://www.qobuz.com/api.json/0.2")
    /// * `credentials` - App id/secret and optional user token
    /// * `timeout_sec` - Timeout for metadata requests in seconds
    pub fn new(base_url: String, credentials: CatalogApiCredentials, timeout_sec: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_sec))
            .build()
            .context("Failed to create HTTP client")?;

        let base_url = base_url.trim_end_matches('/').to_string();

        Ok(Self {
            client,
            base_url,
            credentials,
        })
    }

    fn get(&self, path: &str) -> reqwest::RequestBuilder {
        let mut request = self
            .client
            .get(format!("{}/{}", self.base_url, path))
            .header("X-App-Id", &self.credentials.app_id);
        if let Some(token) = &self.credentials.user_auth_token {
            request = request.header("X-User-Auth-Token", token);
        }
        request
    }

    async fn send_json<T: serde::de::DeserializeOwned>(
        request: reqwest::RequestBuilder,
        endpoint: &'static str,
    ) -> Result<T, CatalogApiError> {
        let response = request
            .send()
            .await
            .map_err(|source| CatalogApiError::Http { endpoint, source })?;

        let status = response.status();
        if !status.is_success() {
            return Err(CatalogApiError::Status {
                endpoint,
                status: status.as_u16(),
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|e| CatalogApiError::Decode {
                endpoint,
                message: e.to_string(),
            })
    }
}

/// Signature required by the file URL endpoint.
pub(crate) fn sign_file_url_request(
    track_id: i64,
    format_id: &str,
    request_ts: i64,
    app_secret: &str,
) -> String {
    let payload = format!(
        "trackgetFileUrlformat_id{}intentstreamtrack_id{}{}{}",
        format_id, track_id, request_ts, app_secret
    );
    format!("{:x}", md5::compute(payload.as_bytes()))
}

#[async_trait]
impl CatalogApi for CatalogApiClient {
    async fn search(
        &self,
        query: &str,
        limit: u32,
        offset: u32,
    ) -> Result<SearchResults, CatalogApiError> {
        debug!("Catalog search '{}' offset={} limit={}", query, offset, limit);
        let request = self.get("catalog/search").query(&[
            ("query", query.to_string()),
            ("limit", limit.to_string()),
            ("offset", offset.to_string()),
        ]);
        Self::send_json(request, "catalog/search").await
    }

    async fn get_album_detail(&self, album_id: &str) -> Result<AlbumRecord, CatalogApiError> {
        let request = self.get("album/get").query(&[("album_id", album_id)]);
        Self::send_json(request, "album/get").await
    }

    async fn get_download_url(
        &self,
        track_id: i64,
        quality: DownloadQuality,
    ) -> Result<String, CatalogApiError> {
        let request_ts = chrono::Utc::now().timestamp();
        let signature = sign_file_url_request(
            track_id,
            quality.format_id(),
            request_ts,
            &self.credentials.app_secret,
        );
        let request = self.get("track/getFileUrl").query(&[
            ("track_id", track_id.to_string()),
            ("format_id", quality.format_id().to_string()),
            ("intent", "stream".to_string()),
            ("request_ts", request_ts.to_string()),
            ("request_sig", signature),
        ]);

        let response: FileUrlResponse = Self::send_json(request, "track/getFileUrl").await?;
        response
            .url
            .filter(|url| !url.is_empty())
            .ok_or(CatalogApiError::AssetUnavailable { track_id, quality })
    }
}

/// Plain HTTP GET fetcher for audio files and cover art.
pub struct HttpAssetFetcher {
    client: reqwest::Client,
}

impl HttpAssetFetcher {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self { client })
    }
}

#[async_trait]
impl AssetFetcher for HttpAssetFetcher {
    async fn fetch(&self, url: &str, timeout: Duration) -> Result<Vec<u8>> {
        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .with_context(|| format!("Failed to fetch {}", url))?;

        if !response.status().is_success() {
            anyhow::bail!("Fetching {} failed with status {}", url, response.status());
        }

        let bytes = response
            .bytes()
            .await
            .with_context(|| format!("Failed to read body of {}", url))?;
        Ok(bytes.to_vec())
    }
}
