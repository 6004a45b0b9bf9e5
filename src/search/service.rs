//! Search service scoped to a session

use super::{SearchQueryBuilder, SearchRequest};
use crate::config::SearchConfig;
use crate::error::{AppError, Result};
use crate::metrics;
use crate::models::Document;
use crate::session::Session;
use crate::store::{DocumentStore, StoreHits};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use validator::Validate;

/// Search response: total match count and the requested page of documents
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResults {
    pub total: usize,
    pub results: Vec<Document>,
}

impl From<StoreHits> for SearchResults {
    fn from(hits: StoreHits) -> Self {
        Self {
            total: hits.total,
            results: hits.hits.into_iter().map(|hit| hit.document).collect(),
        }
    }
}

pub struct SearchService {
    store: Arc<dyn DocumentStore>,
    timeout: Duration,
    max_limit: usize,
}

impl SearchService {
    pub fn new(store: Arc<dyn DocumentStore>, config: &SearchConfig) -> Self {
        Self {
            store,
            timeout: config.timeout(),
            max_limit: config.max_limit,
        }
    }

    /// Search the tracks indexed for `session`
    pub async fn search(&self, session: &Session, request: &SearchRequest) -> Result<SearchResults> {
        request.validate()?;
        if request.limit > self.max_limit {
            return Err(AppError::Validation(format!(
                "limit must not exceed {}",
                self.max_limit
            )));
        }

        let Some(query) = SearchQueryBuilder::build(session.indexed_snapshot(), request) else {
            debug!(session_id = %session.id(), "Short-circuiting search, nothing indexed");
            metrics::record_search("short_circuit");
            return Ok(SearchResults::default());
        };

        let hits = tokio::time::timeout(self.timeout, self.store.search(&query))
            .await
            .map_err(|_| AppError::Timeout(format!("search exceeded {:?}", self.timeout)))
            .and_then(|result| result.map_err(AppError::from))
            .inspect_err(|_| metrics::record_search("error"))?;

        debug!(
            session_id = %session.id(),
            q = %request.q,
            total = hits.total,
            "Search completed"
        );
        metrics::record_search("hit");
        Ok(hits.into())
    }
}
