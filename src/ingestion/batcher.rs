//! Bounded-concurrency album detail fetching.

use futures::future::join_all;
use tracing::{debug, warn};

use crate::catalog_api::{AlbumRecord, CatalogApi, CatalogApiError};

/// Default number of concurrent detail requests per chunk.
pub const DEFAULT_DETAIL_CONCURRENCY: usize = 100;

/// Fetches album details for `album_ids`, `concurrency` at a time.
///
/// Ids are split into consecutive chunks; every fetch in a chunk runs
/// concurrently and the next chunk starts only when the whole chunk is done.
/// The output is aligned 1:1 with the input, a failed fetch leaving its error
/// at its position.
pub async fn fetch_details_batched(
    api: &dyn CatalogApi,
    album_ids: &[String],
    concurrency: usize,
) -> Vec<Result<AlbumRecord, CatalogApiError>> {
    let chunk_size = concurrency.max(1);
    let mut details = Vec::with_capacity(album_ids.len());

    for (chunk_index, chunk) in album_ids.chunks(chunk_size).enumerate() {
        debug!(
            "Fetching album details chunk {} ({} albums)",
            chunk_index,
            chunk.len()
        );
        let results = join_all(chunk.iter().map(|id| api.get_album_detail(id))).await;
        for (id, result) in chunk.iter().zip(results.iter()) {
            if let Err(e) = result {
                warn!("Failed to fetch album detail {}: {}", id, e);
            }
        }
        details.extend(results);
    }

    details
}
