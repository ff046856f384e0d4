mod file_config;

pub use file_config::{CatalogApiConfig, FileConfig, IngestionConfig};

use crate::album_download::DownloadSettings;
use crate::catalog_api::{CatalogApiCredentials, DownloadQuality};
use crate::ingestion::{IngestionSettings, DEFAULT_DETAIL_CONCURRENCY, PAGE_SIZE};
use crate::server::RequestsLoggingLevel;
use anyhow::{anyhow, bail, Result};
use clap::ValueEnum;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_CATALOG_API_URL: &str = "https://www.qobuz.com/api.json/0.2";

/// CLI arguments that can be used for config resolution.
/// This struct mirrors the CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone)]
pub struct CliConfig {
    pub db_dir: Option<PathBuf>,
    pub downloads_dir: Option<PathBuf>,
    pub port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub reset_stale_flags_on_startup: bool,
    pub catalog_api_url: String,
    pub app_id: Option<String>,
    pub app_secret: Option<String>,
    pub user_auth_token: Option<String>,
    pub metadata_timeout_sec: u64,
    pub track_timeout_sec: u64,
    pub cover_timeout_sec: u64,
    pub download_quality: String,
    pub page_size: u32,
    pub detail_concurrency: usize,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            db_dir: None,
            downloads_dir: None,
            port: 3002,
            logging_level: RequestsLoggingLevel::Path,
            reset_stale_flags_on_startup: false,
            catalog_api_url: DEFAULT_CATALOG_API_URL.to_string(),
            app_id: None,
            app_secret: None,
            user_auth_token: None,
            metadata_timeout_sec: 30,
            track_timeout_sec: 300,
            cover_timeout_sec: 60,
            download_quality: DownloadQuality::default().format_id().to_string(),
            page_size: PAGE_SIZE,
            detail_concurrency: DEFAULT_DETAIL_CONCURRENCY,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    // Core settings
    pub db_dir: PathBuf,
    pub downloads_dir: PathBuf,
    pub port: u16,
    pub logging_level: RequestsLoggingLevel,
    /// Clears both processing flags at startup, for runs killed mid-job.
    pub reset_stale_flags_on_startup: bool,

    // Feature configs (with defaults)
    pub catalog_api: CatalogApiSettings,
    pub ingestion: IngestionSettings,
}

#[derive(Debug, Clone)]
pub struct CatalogApiSettings {
    pub base_url: String,
    pub app_id: String,
    pub app_secret: String,
    pub user_auth_token: Option<String>,
    pub metadata_timeout_sec: u64,
    pub track_timeout_sec: u64,
    pub cover_timeout_sec: u64,
    pub download_quality: DownloadQuality,
}

impl CatalogApiSettings {
    pub fn credentials(&self) -> CatalogApiCredentials {
        CatalogApiCredentials {
            app_id: self.app_id.clone(),
            app_secret: self.app_secret.clone(),
            user_auth_token: self.user_auth_token.clone(),
        }
    }
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        // TOML overrides CLI for each field
        let db_dir = file
            .db_dir
            .map(PathBuf::from)
            .or_else(|| cli.db_dir.clone())
            .ok_or_else(|| anyhow!("db_dir must be specified via --db-dir or in config file"))?;

        // Validate db_dir exists
        if !db_dir.exists() {
            bail!("Database directory does not exist: {:?}", db_dir);
        }
        if !db_dir.is_dir() {
            bail!("db_dir is not a directory: {:?}", db_dir);
        }

        let downloads_dir = file
            .downloads_dir
            .map(PathBuf::from)
            .or_else(|| cli.downloads_dir.clone())
            .unwrap_or_else(|| db_dir.join("downloads"));

        let port = file.port.unwrap_or(cli.port);

        let logging_level = file
            .logging_level
            .and_then(|s| parse_logging_level(&s))
            .unwrap_or_else(|| cli.logging_level.clone());

        let reset_stale_flags_on_startup = file
            .reset_stale_flags_on_startup
            .unwrap_or(cli.reset_stale_flags_on_startup);

        let api_file = file.catalog_api.unwrap_or_default();
        let app_id = api_file
            .app_id
            .or_else(|| cli.app_id.clone())
            .ok_or_else(|| anyhow!("app_id must be specified via --app-id or in config file"))?;
        let app_secret = api_file
            .app_secret
            .or_else(|| cli.app_secret.clone())
            .ok_or_else(|| {
                anyhow!("app_secret must be specified via --app-secret or in config file")
            })?;
        let quality_str = api_file
            .download_quality
            .unwrap_or_else(|| cli.download_quality.clone());
        let download_quality = DownloadQuality::parse(&quality_str)
            .ok_or_else(|| anyhow!("Unsupported download quality: {}", quality_str))?;

        let catalog_api = CatalogApiSettings {
            base_url: api_file
                .base_url
                .unwrap_or_else(|| cli.catalog_api_url.clone()),
            app_id,
            app_secret,
            user_auth_token: api_file
                .user_auth_token
                .or_else(|| cli.user_auth_token.clone()),
            metadata_timeout_sec: api_file
                .metadata_timeout_sec
                .unwrap_or(cli.metadata_timeout_sec),
            track_timeout_sec: api_file.track_timeout_sec.unwrap_or(cli.track_timeout_sec),
            cover_timeout_sec: api_file.cover_timeout_sec.unwrap_or(cli.cover_timeout_sec),
            download_quality,
        };

        let ingestion_file = file.ingestion.unwrap_or_default();
        let ingestion = IngestionSettings {
            page_size: ingestion_file.page_size.unwrap_or(cli.page_size),
            detail_concurrency: ingestion_file
                .detail_concurrency
                .unwrap_or(cli.detail_concurrency),
        };
        if ingestion.page_size == 0 {
            bail!("page_size must be at least 1");
        }
        if ingestion.detail_concurrency == 0 {
            bail!("detail_concurrency must be at least 1");
        }

        Ok(Self {
            db_dir,
            downloads_dir,
            port,
            logging_level,
            reset_stale_flags_on_startup,
            catalog_api,
            ingestion,
        })
    }

    pub fn catalog_db_path(&self) -> PathBuf {
        self.db_dir.join("catalog.db")
    }

    pub fn server_db_path(&self) -> PathBuf {
        self.db_dir.join("server.db")
    }

    pub fn download_settings(&self) -> DownloadSettings {
        DownloadSettings {
            downloads_dir: self.downloads_dir.clone(),
            quality: self.catalog_api.download_quality,
            track_timeout: Duration::from_secs(self.catalog_api.track_timeout_sec),
            cover_timeout: Duration::from_secs(self.catalog_api.cover_timeout_sec),
            ..DownloadSettings::new(self.downloads_dir.clone())
        }
    }
}

/// Parses a logging level string into RequestsLoggingLevel.
/// Uses clap's ValueEnum trait for parsing.
fn parse_logging_level(s: &str) -> Option<RequestsLoggingLevel> {
    RequestsLoggingLevel::from_str(s, true).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn make_temp_db_dir() -> TempDir {
        TempDir::new().unwrap()
    }

    fn cli_with_credentials(db_dir: Option<PathBuf>) -> CliConfig {
        CliConfig {
            db_dir,
            app_id: Some("cli-app".to_string()),
            app_secret: Some("cli-secret".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_parse_logging_level() {
        assert!(matches!(
            parse_logging_level("none"),
            Some(RequestsLoggingLevel::None)
        ));
        assert!(matches!(
            parse_logging_level("headers"),
            Some(RequestsLoggingLevel::Headers)
        ));
        // Case insensitive
        assert!(matches!(
            parse_logging_level("PATH"),
            Some(RequestsLoggingLevel::Path)
        ));
        // Invalid
        assert!(parse_logging_level("invalid").is_none());
    }

    #[test]
    fn test_resolve_cli_only() {
        let temp_dir = make_temp_db_dir();
        let cli = CliConfig {
            downloads_dir: Some(PathBuf::from("/music")),
            port: 3100,
            logging_level: RequestsLoggingLevel::Headers,
            user_auth_token: Some("token".to_string()),
            download_quality: "7".to_string(),
            detail_concurrency: 10,
            ..cli_with_credentials(Some(temp_dir.path().to_path_buf()))
        };

        let config = AppConfig::resolve(&cli, None).unwrap();

        assert_eq!(config.db_dir, temp_dir.path());
        assert_eq!(config.downloads_dir, PathBuf::from("/music"));
        assert_eq!(config.port, 3100);
        assert_eq!(config.logging_level, RequestsLoggingLevel::Headers);
        assert!(!config.reset_stale_flags_on_startup);
        assert_eq!(config.catalog_api.base_url, DEFAULT_CATALOG_API_URL);
        assert_eq!(config.catalog_api.app_id, "cli-app");
        assert_eq!(
            config.catalog_api.credentials().user_auth_token.as_deref(),
            Some("token")
        );
        assert_eq!(config.catalog_api.download_quality, DownloadQuality::HiRes96);
        assert_eq!(config.ingestion.page_size, 500);
        assert_eq!(config.ingestion.detail_concurrency, 10);
    }

    #[test]
    fn test_resolve_toml_overrides_cli() {
        let temp_dir = make_temp_db_dir();
        let cli = CliConfig {
            port: 3001,
            ..cli_with_credentials(Some(PathBuf::from("/should/be/overridden")))
        };

        let file_config = FileConfig {
            db_dir: Some(temp_dir.path().to_string_lossy().to_string()),
            logging_level: Some("body".to_string()),
            reset_stale_flags_on_startup: Some(true),
            catalog_api: Some(CatalogApiConfig {
                app_secret: Some("toml-secret".to_string()),
                track_timeout_sec: Some(900),
                ..Default::default()
            }),
            ingestion: Some(IngestionConfig {
                page_size: Some(50),
                ..Default::default()
            }),
            ..Default::default()
        };

        let config = AppConfig::resolve(&cli, Some(file_config)).unwrap();

        // TOML values should override CLI
        assert_eq!(config.db_dir, temp_dir.path());
        assert_eq!(config.logging_level, RequestsLoggingLevel::Body);
        assert!(config.reset_stale_flags_on_startup);
        assert_eq!(config.catalog_api.app_secret, "toml-secret");
        assert_eq!(config.catalog_api.track_timeout_sec, 900);
        assert_eq!(config.ingestion.page_size, 50);
        // CLI value used when TOML doesn't specify
        assert_eq!(config.port, 3001);
        assert_eq!(config.catalog_api.app_id, "cli-app");
        assert_eq!(config.catalog_api.cover_timeout_sec, 60);
        assert_eq!(config.ingestion.detail_concurrency, 100);
    }

    #[test]
    fn test_resolve_missing_db_dir_error() {
        let cli = cli_with_credentials(None);
        let result = AppConfig::resolve(&cli, None);
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("db_dir must be specified"));
    }

    #[test]
    fn test_resolve_nonexistent_db_dir_error() {
        let cli = cli_with_credentials(Some(PathBuf::from(
            "/nonexistent/path/that/should/not/exist",
        )));
        let result = AppConfig::resolve(&cli, None);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("does not exist"));
    }

    #[test]
    fn test_resolve_db_dir_not_directory_error() {
        // Create a temporary file (not a directory)
        let temp_file = tempfile::NamedTempFile::new().unwrap();
        let cli = cli_with_credentials(Some(temp_file.path().to_path_buf()));
        let result = AppConfig::resolve(&cli, None);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("not a directory"));
    }

    #[test]
    fn test_resolve_missing_credentials_error() {
        let temp_dir = make_temp_db_dir();
        let cli = CliConfig {
            db_dir: Some(temp_dir.path().to_path_buf()),
            app_id: Some("app".to_string()),
            ..Default::default()
        };
        let err = AppConfig::resolve(&cli, None).unwrap_err();
        assert!(err.to_string().contains("app_secret must be specified"));
    }

    #[test]
    fn test_resolve_rejects_bad_values() {
        let temp_dir = make_temp_db_dir();
        let db_dir = Some(temp_dir.path().to_path_buf());

        let cli = CliConfig {
            download_quality: "99".to_string(),
            ..cli_with_credentials(db_dir.clone())
        };
        let err = AppConfig::resolve(&cli, None).unwrap_err();
        assert!(err.to_string().contains("Unsupported download quality"));

        let cli = CliConfig {
            detail_concurrency: 0,
            ..cli_with_credentials(db_dir)
        };
        let err = AppConfig::resolve(&cli, None).unwrap_err();
        assert!(err.to_string().contains("detail_concurrency"));
    }

    #[test]
    fn test_path_helpers() {
        let temp_dir = make_temp_db_dir();
        let cli = cli_with_credentials(Some(temp_dir.path().to_path_buf()));

        let config = AppConfig::resolve(&cli, None).unwrap();

        assert_eq!(config.catalog_db_path(), temp_dir.path().join("catalog.db"));
        assert_eq!(config.server_db_path(), temp_dir.path().join("server.db"));
        assert_eq!(config.downloads_dir, temp_dir.path().join("downloads"));

        let download = config.download_settings();
        assert_eq!(download.downloads_dir, temp_dir.path().join("downloads"));
        assert_eq!(download.track_timeout, Duration::from_secs(300));
        assert_eq!(download.cover_timeout, Duration::from_secs(60));
        assert_eq!(download.quality, DownloadQuality::HiRes192);
    }
}
