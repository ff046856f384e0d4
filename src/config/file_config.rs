use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct FileConfig {
    // Core settings (can override CLI)
    pub db_dir: Option<String>,
    pub downloads_dir: Option<String>,
    pub port: Option<u16>,
    pub logging_level: Option<String>,
    pub reset_stale_flags_on_startup: Option<bool>,

    // Feature configs
    pub catalog_api: Option<CatalogApiConfig>,
    pub ingestion: Option<IngestionConfig>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct CatalogApiConfig {
    pub base_url: Option<String>,
    pub app_id: Option<String>,
    pub app_secret: Option<String>,
    pub user_auth_token: Option<String>,
    pub metadata_timeout_sec: Option<u64>,
    pub track_timeout_sec: Option<u64>,
    pub cover_timeout_sec: Option<u64>,
    /// Format id, "27" being the best available FLAC.
    pub download_quality: Option<String>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct IngestionConfig {
    pub page_size: Option<u32>,
    pub detail_concurrency: Option<usize>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }
}
