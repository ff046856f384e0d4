//! Metadata ingestion from the external catalog.
//!
//! A keyword query is crawled page by page; every page is resolved into the
//! entity graph (artists, genres, labels, albums, tracks), fetching album
//! details in bounded concurrent chunks.

mod batcher;
mod crawler;
mod pipeline;
mod resolver;

pub use batcher::{fetch_details_batched, DEFAULT_DETAIL_CONCURRENCY};
pub use crawler::{crawl, SearchPage, PAGE_SIZE};
pub use pipeline::{
    BatchIngestionReport, IngestionPipeline, IngestionReport, IngestionSettings, IngestionStats,
};
pub use resolver::{is_various_artists, AlbumRefs, EntityResolver, Resolution};
