use super::{FetchError, TrackCatalog};
use crate::models::{Credential, TrackPage};
use futures::stream::{self, BoxStream, StreamExt};
use std::sync::Arc;

/// Walks a library page by page, in catalog order
#[derive(Clone)]
pub struct TrackFetcher {
    catalog: Arc<dyn TrackCatalog>,
    page_size: usize,
}

impl TrackFetcher {
    pub fn new(catalog: Arc<dyn TrackCatalog>, page_size: usize) -> Self {
        Self {
            catalog,
            page_size: page_size.max(1),
        }
    }

    /// Lazy page sequence for one run. Ends at the first empty page or when the
    /// catalog reports no further page; a fresh call starts again from offset 0.
    pub fn pages(&self, credential: Credential) -> BoxStream<'static, Result<TrackPage, FetchError>> {
        let catalog = Arc::clone(&self.catalog);
        let page_size = self.page_size;

        stream::try_unfold(Some(0usize), move |offset| {
            let catalog = Arc::clone(&catalog);
            let credential = credential.clone();
            async move {
                let Some(offset) = offset else {
                    return Ok(None);
                };
                let page = catalog.fetch_page(&credential, offset, page_size).await?;
                if page.tracks.is_empty() && !page.has_next {
                    return Ok(None);
                }
                let next = page.has_next.then_some(offset + page_size);
                Ok(Some((page, next)))
            }
        })
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Track;
    use async_trait::async_trait;
    use futures::TryStreamExt;
    use parking_lot::Mutex;

    struct PagedCatalog {
        tracks: Vec<Track>,
        offsets: Mutex<Vec<usize>>,
    }

    #[async_trait]
    impl TrackCatalog for PagedCatalog {
        async fn fetch_page(
            &self,
            _credential: &Credential,
            offset: usize,
            limit: usize,
        ) -> Result<TrackPage, FetchError> {
            self.offsets.lock().push(offset);
            let end = (offset + limit).min(self.tracks.len());
            let tracks = self.tracks.get(offset..end).unwrap_or_default().to_vec();
            Ok(TrackPage {
                tracks,
                total: self.tracks.len(),
                has_next: end < self.tracks.len(),
            })
        }
    }

    fn library(n: usize) -> Vec<Track> {
        (0..n)
            .map(|i| Track::new(i.to_string(), format!("Song {}", i), vec!["Artist".into()]))
            .collect()
    }

    #[tokio::test]
    async fn test_pages_preserve_catalog_order() {
        let catalog = Arc::new(PagedCatalog {
            tracks: library(5),
            offsets: Mutex::new(Vec::new()),
        });
        let fetcher = TrackFetcher::new(catalog.clone(), 2);

        let pages: Vec<TrackPage> = fetcher
            .pages(Credential::new("t"))
            .try_collect()
            .await
            .unwrap();

        let ids: Vec<String> = pages
            .iter()
            .flat_map(|p| p.tracks.iter().map(|t| t.id.clone()))
            .collect();
        assert_eq!(ids, vec!["0", "1", "2", "3", "4"]);
        assert_eq!(*catalog.offsets.lock(), vec![0, 2, 4]);
    }

    #[tokio::test]
    async fn test_empty_library_yields_no_pages() {
        let catalog = Arc::new(PagedCatalog {
            tracks: Vec::new(),
            offsets: Mutex::new(Vec::new()),
        });
        let fetcher = TrackFetcher::new(catalog, 50);

        let pages: Vec<TrackPage> = fetcher
            .pages(Credential::new("t"))
            .try_collect()
            .await
            .unwrap();
        assert!(pages.is_empty());
    }
}
