//! HTTP client for end-to-end tests
//!
//! This module wraps reqwest with one method per harvester endpoint.
//! When API routes or request formats change, update only this file.

use super::constants::*;
use reqwest::Response;
use serde_json::{json, Value};
use std::time::{Duration, Instant};

pub struct TestClient {
    /// The underlying reqwest client (public for custom requests in tests)
    pub client: reqwest::Client,
    /// The base URL of the test server
    pub base_url: String,
}

impl TestClient {
    pub fn new(base_url: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("Failed to build reqwest client");

        Self { client, base_url }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    // ========================================================================
    // Job start endpoints
    // ========================================================================

    pub async fn start_metadata_ingestion(&self, query: &str) -> Response {
        self.client
            .post(self.url("/v1/ingestion/metadata"))
            .query(&[("q", query)])
            .send()
            .await
            .expect("Metadata ingestion request failed")
    }

    pub async fn start_batch_ingestion(&self, queries: &[&str]) -> Response {
        self.client
            .post(self.url("/v1/ingestion/batch"))
            .json(&json!({ "queries": queries }))
            .send()
            .await
            .expect("Batch ingestion request failed")
    }

    pub async fn start_album_ingestion(&self, album: &Value) -> Response {
        self.client
            .post(self.url("/v1/ingestion/album"))
            .json(album)
            .send()
            .await
            .expect("Album ingestion request failed")
    }

    pub async fn start_album_downloads(&self, count: i64) -> Response {
        self.client
            .post(self.url("/v1/downloads/albums"))
            .json(&json!({ "albumCountToDownload": count }))
            .send()
            .await
            .expect("Album download request failed")
    }

    pub async fn start_track_downloads(&self) -> Response {
        self.client
            .post(self.url("/v1/downloads/tracks"))
            .send()
            .await
            .expect("Track download request failed")
    }

    // ========================================================================
    // Read endpoints
    // ========================================================================

    pub async fn get_flags(&self) -> Response {
        self.client
            .get(self.url("/v1/jobs/flags"))
            .send()
            .await
            .expect("Flags request failed")
    }

    pub async fn get_job_history(&self, job: &str) -> Response {
        self.client
            .get(self.url("/v1/jobs/history"))
            .query(&[("job", job)])
            .send()
            .await
            .expect("History request failed")
    }

    pub async fn list_albums(&self, status: &str) -> Response {
        self.client
            .get(self.url("/v1/albums"))
            .query(&[("status", status)])
            .send()
            .await
            .expect("Album list request failed")
    }

    pub async fn list_album_tracks(&self, album_id: &str) -> Response {
        self.client
            .get(self.url(&format!("/v1/albums/{}/tracks", album_id)))
            .send()
            .await
            .expect("Album tracks request failed")
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    /// Returns the `data` field of a successful envelope.
    pub async fn data(response: Response) -> Value {
        assert!(
            response.status().is_success(),
            "Unexpected status {}",
            response.status()
        );
        let body: Value = response.json().await.expect("Invalid JSON body");
        assert_eq!(body["success"], true);
        body["data"].clone()
    }

    /// Polls the flags until no job is running.
    pub async fn wait_until_idle(&self) {
        let start = Instant::now();
        let timeout = Duration::from_millis(JOB_IDLE_TIMEOUT_MS);

        while start.elapsed() < timeout {
            let flags = Self::data(self.get_flags().await).await;
            if flags["metadata_processing"] == false && flags["albums_processing"] == false {
                return;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }

        panic!("Jobs still running after {:?}", timeout);
    }

    /// Latest recorded run of `job`.
    pub async fn last_run(&self, job: &str) -> Value {
        let history = Self::data(self.get_job_history(job).await).await;
        history
            .as_array()
            .and_then(|runs| runs.first())
            .cloned()
            .expect("No job run recorded")
    }
}
