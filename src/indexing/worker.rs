use super::{filter_unindexed, DocumentIndexer, IndexError, IndexOutcome, INDEXING_TEXT};
use crate::catalog::{FetchError, TrackFetcher};
use crate::metrics;
use crate::models::Progress;
use crate::session::Session;
use crate::store::StoreError;
use futures::StreamExt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Run-level failures; each aborts the run
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("could not fetch library: {0}")]
    Fetch(#[from] FetchError),

    #[error("could not index track {track_id}: {source}")]
    Store {
        track_id: String,
        #[source]
        source: StoreError,
    },
}

/// Counters for one worker pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Tracks seen in the catalog
    pub fetched: usize,
    /// Tracks left after dedup
    pub pending: usize,
    pub indexed: usize,
    pub already_present: usize,
    /// Tracks whose lyric lookup failed
    pub skipped: usize,
    /// The run stopped early on the halt signal
    pub halted: bool,
}

/// Fetches a session's library and indexes every track not yet indexed
pub struct IndexWorker {
    fetcher: TrackFetcher,
    indexer: Arc<DocumentIndexer>,
}

impl IndexWorker {
    pub fn new(fetcher: TrackFetcher, indexer: Arc<DocumentIndexer>) -> Self {
        Self { fetcher, indexer }
    }

    /// Run to completion, error or halt. Always signals `halt` on exit.
    pub async fn run(
        &self,
        session: &Session,
        halt: &CancellationToken,
    ) -> Result<RunSummary, RunError> {
        let result = self.process(session, halt).await;
        halt.cancel();
        result
    }

    async fn process(
        &self,
        session: &Session,
        halt: &CancellationToken,
    ) -> Result<RunSummary, RunError> {
        let mut summary = RunSummary::default();

        session.set_progress(Progress::status("Fetching library"));
        let mut pages = self.fetcher.pages(session.credential().clone());
        let mut fetched = Vec::new();
        loop {
            if halt.is_cancelled() {
                summary.halted = true;
                return Ok(summary);
            }
            let Some(page) = pages.next().await else {
                break;
            };
            let page = page?;
            fetched.extend(page.tracks);
            session.set_progress(Progress::status(format!(
                "Fetching library: {} of {} tracks",
                fetched.len(),
                page.total
            )));
        }
        summary.fetched = fetched.len();

        let pending = filter_unindexed(fetched, session.indexed());
        summary.pending = pending.len();
        info!(
            session_id = %session.id(),
            fetched = summary.fetched,
            pending = summary.pending,
            "Library fetched"
        );
        session.set_progress(Progress {
            text: INDEXING_TEXT.to_string(),
            complete: false,
            total: pending.len(),
            n: 0,
        });

        for (idx, track) in pending.iter().enumerate() {
            if halt.is_cancelled() {
                summary.halted = true;
                return Ok(summary);
            }

            match self.indexer.index_if_absent(track).await {
                Ok(IndexOutcome::Indexed(_)) => {
                    session.mark_indexed(&track.id);
                    metrics::record_track("indexed");
                    summary.indexed += 1;
                }
                Ok(IndexOutcome::AlreadyPresent) => {
                    session.mark_indexed(&track.id);
                    metrics::record_track("already_present");
                    summary.already_present += 1;
                }
                Err(IndexError::Resolution(e)) => {
                    warn!(session_id = %session.id(), track_id = %track.id, error = %e, "Skipping track");
                    metrics::record_track("skipped");
                    summary.skipped += 1;
                }
                Err(IndexError::Store(source)) => {
                    return Err(RunError::Store {
                        track_id: track.id.clone(),
                        source,
                    });
                }
            }

            session.update_progress(|p| p.n = idx + 1);
            debug!(session_id = %session.id(), n = idx + 1, total = pending.len(), "Track processed");
        }

        Ok(summary)
    }
}
