use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, level_filters::LevelFilter, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use music_harvester::album_download::DownloadOrchestrator;
use music_harvester::background_jobs::{JobLauncher, JobStateGuard};
use music_harvester::catalog_api::{CatalogApi, CatalogApiClient, HttpAssetFetcher};
use music_harvester::catalog_store::{CatalogStore, SqliteCatalogStore};
use music_harvester::config::{AppConfig, CliConfig, FileConfig, DEFAULT_CATALOG_API_URL};
use music_harvester::ingestion::{IngestionPipeline, DEFAULT_DETAIL_CONCURRENCY, PAGE_SIZE};
use music_harvester::server::{self, run_server, RequestsLoggingLevel, ServerConfig, ServerState};
use music_harvester::server_store::{ServerStore, SqliteServerStore};

fn parse_path(s: &str) -> Result<PathBuf> {
    let path_buf = PathBuf::from(s);
    let original_path = match path_buf.canonicalize() {
        Ok(path) => path,
        Err(msg) => {
            if msg.kind() == std::io::ErrorKind::NotFound {
                path_buf
            } else {
                return Err(msg).with_context(|| format!("Error resolving path: {}", s));
            }
        }
    };
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(original_path))
}

#[derive(Parser, Debug)]
struct CliArgs {
    /// Path to a TOML config file. Values in the file override the flags.
    #[clap(long, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    /// Directory holding catalog.db and server.db.
    #[clap(long, value_parser = parse_path)]
    pub db_dir: Option<PathBuf>,

    /// Root directory for downloaded albums. Defaults to <db-dir>/downloads.
    #[clap(long, value_parser = parse_path)]
    pub downloads_dir: Option<PathBuf>,

    /// The port to listen on.
    #[clap(short, long, default_value_t = 3002)]
    pub port: u16,

    /// The level of logging to perform on each request.
    #[clap(long, default_value = "path")]
    pub logging_level: RequestsLoggingLevel,

    /// Clear processing flags left behind by a previous run.
    #[clap(long)]
    pub reset_stale_flags: bool,

    /// Base URL of the catalog API.
    #[clap(long, default_value = DEFAULT_CATALOG_API_URL)]
    pub catalog_api_url: String,

    #[clap(long, env = "HARVESTER_APP_ID")]
    pub app_id: Option<String>,

    #[clap(long, env = "HARVESTER_APP_SECRET")]
    pub app_secret: Option<String>,

    #[clap(long, env = "HARVESTER_USER_AUTH_TOKEN")]
    pub user_auth_token: Option<String>,

    /// Timeout in seconds for catalog metadata requests.
    #[clap(long, default_value_t = 30)]
    pub metadata_timeout_sec: u64,

    /// Timeout in seconds for a single track download.
    #[clap(long, default_value_t = 300)]
    pub track_timeout_sec: u64,

    /// Timeout in seconds for a cover image download.
    #[clap(long, default_value_t = 60)]
    pub cover_timeout_sec: u64,

    /// Format id requested for track downloads.
    #[clap(long, default_value = "27")]
    pub download_quality: String,

    /// Search results requested per page.
    #[clap(long, default_value_t = PAGE_SIZE)]
    pub page_size: u32,

    /// Album detail requests in flight at once.
    #[clap(long, default_value_t = DEFAULT_DETAIL_CONCURRENCY)]
    pub detail_concurrency: usize,
}

impl CliArgs {
    fn to_cli_config(&self) -> CliConfig {
        CliConfig {
            db_dir: self.db_dir.clone(),
            downloads_dir: self.downloads_dir.clone(),
            port: self.port,
            logging_level: self.logging_level.clone(),
            reset_stale_flags_on_startup: self.reset_stale_flags,
            catalog_api_url: self.catalog_api_url.clone(),
            app_id: self.app_id.clone(),
            app_secret: self.app_secret.clone(),
            user_auth_token: self.user_auth_token.clone(),
            metadata_timeout_sec: self.metadata_timeout_sec,
            track_timeout_sec: self.track_timeout_sec,
            cover_timeout_sec: self.cover_timeout_sec,
            download_quality: self.download_quality.clone(),
            page_size: self.page_size,
            detail_concurrency: self.detail_concurrency,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()?;

    let file_config = match &cli_args.config {
        Some(path) => {
            info!("Loading config from {:?}", path);
            Some(FileConfig::load(path)?)
        }
        None => None,
    };
    let config = AppConfig::resolve(&cli_args.to_cli_config(), file_config)?;

    info!(
        "Opening SQLite catalog database at {:?}...",
        config.catalog_db_path()
    );
    let catalog_store = Arc::new(SqliteCatalogStore::new(config.catalog_db_path())?);

    info!(
        "Opening SQLite server database at {:?}...",
        config.server_db_path()
    );
    let server_store = Arc::new(SqliteServerStore::new(config.server_db_path())?);

    let stale_runs = server_store.mark_stale_jobs_failed()?;
    if stale_runs > 0 {
        warn!("Marked {} job runs from a previous process as failed", stale_runs);
    }

    let guard = Arc::new(JobStateGuard::new(server_store.clone()));
    if config.reset_stale_flags_on_startup {
        guard.reset_stale_flags()?;
    } else {
        let flags = guard.flags()?;
        if flags.any_set() {
            warn!(
                "Processing flags are still set ({:?}), start with --reset-stale-flags to clear them",
                flags
            );
        }
    }

    // Initialize metrics system
    info!("Initializing metrics...");
    server::metrics::init_metrics();
    server::metrics::set_catalog_metrics(&catalog_store.get_counts()?);

    let api: Arc<dyn CatalogApi> = Arc::new(CatalogApiClient::new(
        config.catalog_api.base_url.clone(),
        config.catalog_api.credentials(),
        config.catalog_api.metadata_timeout_sec,
    )?);
    let fetcher = Arc::new(HttpAssetFetcher::new()?);

    let pipeline = IngestionPipeline::new(api.clone(), catalog_store.clone(), config.ingestion);
    let downloads = DownloadOrchestrator::new(
        catalog_store.clone(),
        api,
        fetcher,
        config.download_settings(),
    );
    info!("Downloads go to {:?}", config.downloads_dir);

    let launcher = JobLauncher::new(
        guard,
        server_store.clone(),
        catalog_store.clone(),
        Arc::new(pipeline),
        Arc::new(downloads),
    );

    let state = ServerState {
        config: ServerConfig {
            requests_logging_level: config.logging_level.clone(),
            port: config.port,
        },
        start_time: Instant::now(),
        catalog_store,
        server_store,
        launcher: Arc::new(launcher),
        hash: env!("GIT_HASH").to_string(),
    };

    info!("Ready to serve at port {}!", config.port);
    run_server(state).await
}
