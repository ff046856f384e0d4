//! Music Harvester Library
//!
//! This library exposes the internal modules for testing and potential reuse.

pub mod album_download;
pub mod background_jobs;
pub mod catalog_api;
pub mod catalog_store;
pub mod config;
pub mod ingestion;
pub mod server;
pub mod server_store;
pub mod sqlite_persistence;

// Re-export commonly used types for convenience
pub use catalog_store::{CatalogStore, SqliteCatalogStore};
pub use server::{make_app, run_server, RequestsLoggingLevel};
pub use server_store::{ServerStore, SqliteServerStore};
