//! Test server lifecycle management
//!
//! Each test gets an isolated server with its own databases and download
//! root, talking to the fake catalog from `fixtures`.

use super::constants::*;
use super::fixtures::{FakeCatalog, FakeFetcher};
use music_harvester::album_download::{DownloadOrchestrator, DownloadSettings};
use music_harvester::background_jobs::{JobLauncher, JobStateGuard};
use music_harvester::catalog_api::CatalogApi;
use music_harvester::catalog_store::SqliteCatalogStore;
use music_harvester::ingestion::{IngestionPipeline, IngestionSettings};
use music_harvester::server::{make_app, RequestsLoggingLevel, ServerConfig, ServerState};
use music_harvester::server_store::SqliteServerStore;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tempfile::TempDir;
use tokio::net::TcpListener;

/// Test server instance with isolated databases
///
/// When dropped, the server gracefully shuts down and temp resources are cleaned up.
pub struct TestServer {
    /// Base URL for making requests (e.g., "http://127.0.0.1:12345")
    pub base_url: String,

    /// Stores for direct database access in tests
    pub catalog_store: Arc<SqliteCatalogStore>,
    pub server_store: Arc<SqliteServerStore>,

    pub catalog: Arc<FakeCatalog>,
    pub fetcher: Arc<FakeFetcher>,

    /// Root of the downloaded albums
    pub downloads_dir: PathBuf,

    // Private fields - keep resources alive until drop
    _temp_dir: TempDir,
    _shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

impl TestServer {
    pub async fn spawn() -> Self {
        Self::spawn_with(FakeCatalog::default(), FakeFetcher::default()).await
    }

    /// Spawns a new test server on a random port
    ///
    /// # Panics
    ///
    /// Panics if the databases cannot be created, the port cannot be bound or
    /// the server doesn't become ready within timeout.
    pub async fn spawn_with(catalog: FakeCatalog, fetcher: FakeFetcher) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let downloads_dir = temp_dir.path().join("downloads");

        let catalog_store = Arc::new(
            SqliteCatalogStore::new(temp_dir.path().join("catalog.db"))
                .expect("Failed to open catalog store"),
        );
        let server_store = Arc::new(
            SqliteServerStore::new(temp_dir.path().join("server.db"))
                .expect("Failed to open server store"),
        );

        let catalog = Arc::new(catalog);
        let fetcher = Arc::new(fetcher);
        let api: Arc<dyn CatalogApi> = catalog.clone();

        let pipeline = IngestionPipeline::new(
            api.clone(),
            catalog_store.clone(),
            IngestionSettings::default(),
        );
        let downloads = DownloadOrchestrator::new(
            catalog_store.clone(),
            api,
            fetcher.clone(),
            DownloadSettings {
                track_pause: Duration::ZERO,
                ..DownloadSettings::new(downloads_dir.clone())
            },
        );
        let launcher = JobLauncher::new(
            Arc::new(JobStateGuard::new(server_store.clone())),
            server_store.clone(),
            catalog_store.clone(),
            Arc::new(pipeline),
            Arc::new(downloads),
        );

        // Bind to random port
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");
        let port = listener
            .local_addr()
            .expect("Failed to get local address")
            .port();
        let base_url = format!("http://127.0.0.1:{}", port);

        let state = ServerState {
            config: ServerConfig {
                port,
                requests_logging_level: RequestsLoggingLevel::None,
            },
            start_time: Instant::now(),
            catalog_store: catalog_store.clone(),
            server_store: server_store.clone(),
            launcher: Arc::new(launcher),
            hash: "test".to_string(),
        };
        let app = make_app(state);

        // Create shutdown channel
        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

        // Spawn server in background task with graceful shutdown
        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .expect("Server failed");
        });

        let server = Self {
            base_url,
            catalog_store,
            server_store,
            catalog,
            fetcher,
            downloads_dir,
            _temp_dir: temp_dir,
            _shutdown_tx: Some(shutdown_tx),
        };

        server.wait_for_ready().await;

        server
    }

    /// Waits for the server to become ready by polling the home endpoint
    async fn wait_for_ready(&self) {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(100))
            .build()
            .expect("Failed to build reqwest client");

        let start = Instant::now();
        let timeout = Duration::from_millis(SERVER_READY_TIMEOUT_MS);

        while start.elapsed() < timeout {
            if let Ok(response) = client.get(&self.base_url).send().await {
                if response.status().is_success() {
                    return;
                }
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        panic!("Server did not become ready within {:?}", timeout);
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self._shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}
