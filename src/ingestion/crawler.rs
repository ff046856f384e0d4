//! Paginated keyword crawl over the catalog search endpoint.

use futures::stream::{self, Stream};
use tracing::debug;

use crate::catalog_api::{CatalogApi, CatalogApiError, SearchResults};

/// Number of records requested per search page.
pub const PAGE_SIZE: u32 = 500;

/// One non-empty page of search results.
#[derive(Debug, Clone)]
pub struct SearchPage {
    pub offset: u32,
    pub results: SearchResults,
}

/// Lazily crawls `query` from offset 0 in steps of `page_size`.
///
/// The stream ends at the first page whose album list is empty (that page
/// is not yielded). A fetch error is yielded once and ends the stream.
pub fn crawl<'a>(
    api: &'a dyn CatalogApi,
    query: &'a str,
    page_size: u32,
) -> impl Stream<Item = Result<SearchPage, CatalogApiError>> + 'a {
    stream::try_unfold(Some(0u32), move |next_offset| async move {
        let Some(offset) = next_offset else {
            return Ok::<_, CatalogApiError>(None);
        };

        let results = api.search(query, page_size, offset).await?;
        if results.albums.items.is_empty() {
            debug!("Crawl of '{}' exhausted at offset {}", query, offset);
            return Ok(None);
        }

        let next = offset.checked_add(page_size);
        Ok(Some((SearchPage { offset, results }, next)))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog_api::{AlbumRecord, DownloadQuality, ItemPage};
    use async_trait::async_trait;
    use futures::StreamExt;
    use std::sync::Mutex;

    /// Serves `pages` non-empty pages, then empty ones; optionally fails at one offset.
    struct PagedApi {
        pages: u32,
        fail_at: Option<u32>,
        offsets: Mutex<Vec<u32>>,
    }

    impl PagedApi {
        fn new(pages: u32) -> Self {
            Self {
                pages,
                fail_at: None,
                offsets: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl CatalogApi for PagedApi {
        async fn search(
            &self,
            _query: &str,
            limit: u32,
            offset: u32,
        ) -> Result<SearchResults, CatalogApiError> {
            self.offsets.lock().unwrap().push(offset);
            if self.fail_at == Some(offset) {
                return Err(CatalogApiError::Status {
                    endpoint: "catalog/search",
                    status: 503,
                });
            }
            let page_index = offset / limit;
            let items = if page_index < self.pages {
                vec![AlbumRecord {
                    id: format!("album-{}", page_index),
                    ..Default::default()
                }]
            } else {
                vec![]
            };
            Ok(SearchResults {
                albums: ItemPage::from_items(items),
                ..Default::default()
            })
        }

        async fn get_album_detail(&self, _album_id: &str) -> Result<AlbumRecord, CatalogApiError> {
            unimplemented!()
        }

        async fn get_download_url(
            &self,
            _track_id: i64,
            _quality: DownloadQuality,
        ) -> Result<String, CatalogApiError> {
            unimplemented!()
        }
    }

    #[tokio::test]
    async fn test_empty_first_page_fetches_once() {
        let api = PagedApi::new(0);
        let pages: Vec<_> = crawl(&api, "nothing", PAGE_SIZE).collect().await;

        assert!(pages.is_empty());
        assert_eq!(*api.offsets.lock().unwrap(), vec![0]);
    }

    #[tokio::test]
    async fn test_offsets_advance_by_page_size() {
        let api = PagedApi::new(3);
        let pages: Vec<_> = crawl(&api, "jazz", PAGE_SIZE).collect().await;

        assert_eq!(pages.len(), 3);
        let yielded: Vec<u32> = pages.iter().map(|p| p.as_ref().unwrap().offset).collect();
        assert_eq!(yielded, vec![0, 500, 1000]);
        assert_eq!(*api.offsets.lock().unwrap(), vec![0, 500, 1000, 1500]);
    }

    #[tokio::test]
    async fn test_fetch_error_ends_the_crawl() {
        let api = PagedApi {
            fail_at: Some(500),
            ..PagedApi::new(5)
        };
        let pages: Vec<_> = crawl(&api, "jazz", PAGE_SIZE).collect().await;

        assert_eq!(pages.len(), 2);
        assert!(pages[0].is_ok());
        assert!(pages[1].is_err());
        assert_eq!(*api.offsets.lock().unwrap(), vec![0, 500]);
    }
}
