//! End-to-end tests for album downloads
//!
//! Albums are ingested from the fake catalog first, then downloaded into the
//! server's temporary download root.

mod common;

use common::{
    track_url, FakeCatalog, FakeFetcher, TestClient, TestServer, ALBUM_ID, ARTIST_NAME,
    COVER_URL, TRACK_1_ID, TRACK_2_ID,
};
use reqwest::StatusCode;
use serde_json::Value;
use std::collections::HashSet;
use std::path::PathBuf;

fn album_folder(server: &TestServer) -> PathBuf {
    server
        .downloads_dir
        .join(ARTIST_NAME)
        .join("Kind of Blue --- Jazz --- 1959")
}

async fn ingest(client: &TestClient) {
    let response = client.start_metadata_ingestion("miles davis").await;
    assert_eq!(response.status(), StatusCode::OK);
    client.wait_until_idle().await;
}

async fn download(client: &TestClient, count: i64) -> Value {
    let response = client.start_album_downloads(count).await;
    assert_eq!(response.status(), StatusCode::OK);
    client.wait_until_idle().await;
    client.last_run("albums").await
}

#[tokio::test]
async fn test_download_writes_album_folder() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());
    ingest(&client).await;

    let run = download(&client, 1).await;
    assert_eq!(run["status"], "completed");
    assert_eq!(run["triggered_by"], "count:1");
    assert_eq!(run["summary"]["processed"], 1);
    assert_eq!(run["summary"]["successful"], 1);
    assert_eq!(run["summary"]["totalTracksDownloaded"], 2);
    assert_eq!(run["summary"]["totalTracksFailed"], 0);

    let folder = album_folder(&server);
    assert_eq!(
        std::fs::read(folder.join("1 - So What.flac")).unwrap(),
        track_url(TRACK_1_ID).into_bytes()
    );
    assert_eq!(
        std::fs::read(folder.join("2 - Freddie Freeloader.flac")).unwrap(),
        track_url(TRACK_2_ID).into_bytes()
    );
    assert_eq!(
        std::fs::read(folder.join("cover.jpg")).unwrap(),
        COVER_URL.as_bytes()
    );

    let albums = TestClient::data(client.list_albums("SUCCESS").await).await;
    let albums = albums.as_array().unwrap();
    assert_eq!(albums.len(), 1);
    let tracks = TestClient::data(
        client
            .list_album_tracks(albums[0]["id"].as_str().unwrap())
            .await,
    )
    .await;
    for track in tracks.as_array().unwrap() {
        assert_eq!(track["download_status"], "SUCCESS");
        assert_eq!(track["folder_path"], folder.to_string_lossy().as_ref());
    }
}

#[tokio::test]
async fn test_partial_track_failure_keeps_album_successful() {
    let catalog = FakeCatalog {
        unavailable: HashSet::from([TRACK_2_ID]),
        ..Default::default()
    };
    let server = TestServer::spawn_with(catalog, FakeFetcher::default()).await;
    let client = TestClient::new(server.base_url.clone());
    ingest(&client).await;

    let run = download(&client, 5).await;
    assert_eq!(run["summary"]["successful"], 1);
    assert_eq!(run["summary"]["failed"], 0);
    assert_eq!(run["summary"]["totalTracksDownloaded"], 1);
    assert_eq!(run["summary"]["totalTracksFailed"], 1);
    let errors: Vec<&str> = run["summary"]["errors"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e.as_str().unwrap())
        .collect();
    assert_eq!(errors, vec![format!("Failed to download track {}", TRACK_2_ID)]);

    let folder = album_folder(&server);
    assert!(folder.join("1 - So What.flac").exists());
    assert!(!folder.join("2 - Freddie Freeloader.flac").exists());

    let albums = TestClient::data(client.list_albums("SUCCESS").await).await;
    let album_id = albums[0]["id"].as_str().unwrap().to_string();
    let tracks = TestClient::data(client.list_album_tracks(&album_id).await).await;
    let statuses: Vec<&str> = tracks
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["download_status"].as_str().unwrap())
        .collect();
    assert_eq!(statuses, vec!["SUCCESS", "FAILED"]);
}

#[tokio::test]
async fn test_album_fails_when_every_track_fails() {
    let fetcher = FakeFetcher {
        failing: HashSet::from([track_url(TRACK_1_ID), track_url(TRACK_2_ID)]),
        ..Default::default()
    };
    let server = TestServer::spawn_with(FakeCatalog::default(), fetcher).await;
    let client = TestClient::new(server.base_url.clone());
    ingest(&client).await;

    let run = download(&client, 1).await;
    assert_eq!(run["status"], "completed");
    assert_eq!(run["summary"]["failed"], 1);
    assert_eq!(run["summary"]["totalTracksFailed"], 2);
    assert!(run["summary"]["errors"]
        .as_array()
        .unwrap()
        .iter()
        .any(|e| e == &Value::from(format!("Failed to download album {}", ALBUM_ID))));

    let failed = TestClient::data(client.list_albums("FAILED").await).await;
    assert_eq!(failed.as_array().unwrap().len(), 1);
    let pending = TestClient::data(client.list_albums("PENDING").await).await;
    assert!(pending.as_array().unwrap().is_empty());
    // Nothing is left half-processed
    let processing = TestClient::data(client.list_albums("PROCESSING").await).await;
    assert!(processing.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_downloaded_albums_are_not_picked_again() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());
    ingest(&client).await;

    download(&client, 1).await;
    let fetched_after_first = server.fetcher.fetched.lock().unwrap().len();

    let run = download(&client, 1).await;
    assert_eq!(run["summary"]["processed"], 0);
    assert_eq!(
        server.fetcher.fetched.lock().unwrap().len(),
        fetched_after_first
    );

    let history = TestClient::data(client.get_job_history("albums").await).await;
    assert_eq!(history.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_pending_tracks_download_without_album_run() {
    let catalog = FakeCatalog {
        unavailable: HashSet::from([TRACK_2_ID]),
        ..Default::default()
    };
    let server = TestServer::spawn_with(catalog, FakeFetcher::default()).await;
    let client = TestClient::new(server.base_url.clone());
    ingest(&client).await;

    let response = client.start_track_downloads().await;
    assert_eq!(response.status(), StatusCode::OK);
    client.wait_until_idle().await;

    let run = client.last_run("albums").await;
    assert_eq!(run["status"], "completed");
    assert_eq!(run["triggered_by"], "tracks:all");
    assert_eq!(run["summary"]["processed"], 2);
    assert_eq!(run["summary"]["successful"], 1);
    assert_eq!(run["summary"]["failed"], 1);
    assert_eq!(
        run["summary"]["errors"],
        serde_json::json!([format!("Failed to download track {}", TRACK_2_ID)])
    );

    let folder = album_folder(&server);
    assert_eq!(
        std::fs::read(folder.join("So What.flac")).unwrap(),
        track_url(TRACK_1_ID).into_bytes()
    );
    assert!(!folder.join("Freddie Freeloader.flac").exists());
    assert!(folder.join("cover.jpg").exists());

    // The album itself is still waiting for an album run
    let pending = TestClient::data(client.list_albums("PENDING").await).await;
    assert_eq!(pending.as_array().unwrap().len(), 1);

    // Nothing is pending anymore, a second run has no work
    client.start_track_downloads().await;
    client.wait_until_idle().await;
    let run = client.last_run("albums").await;
    assert_eq!(run["summary"]["processed"], 0);
}

#[tokio::test]
async fn test_download_count_must_be_positive() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let response = client.start_album_downloads(0).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "albumCountToDownload must be at least 1");

    let flags = TestClient::data(client.get_flags().await).await;
    assert_eq!(flags["albums_processing"], false);
}
