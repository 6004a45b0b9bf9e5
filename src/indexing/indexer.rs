use crate::lyrics::{LyricResolver, ResolutionError};
use crate::models::{Document, Track};
use crate::store::{DocumentStore, StoreError, StoreResult};
use dashmap::DashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::debug;

/// What `index_if_absent` did with a track
#[derive(Debug, Clone, PartialEq)]
pub enum IndexOutcome {
    /// A new document was written
    Indexed(Document),
    /// The store already held the track
    AlreadyPresent,
}

#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    /// Lyrics could not be resolved; the track is skipped
    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    /// The store failed; the run cannot continue
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Check-then-write against the shared store, serialized per catalog id.
///
/// The store has no conditional insert, so two callers racing on one id would
/// both see it absent. A keyed async mutex makes the check, the lyric lookup
/// and the write one critical section per id while other ids proceed in parallel.
pub struct DocumentIndexer {
    store: Arc<dyn DocumentStore>,
    resolver: Arc<LyricResolver>,
    locks: DashMap<String, Arc<Mutex<()>>>,
    timeout: Duration,
}

impl DocumentIndexer {
    pub fn new(store: Arc<dyn DocumentStore>, resolver: Arc<LyricResolver>, timeout: Duration) -> Self {
        Self {
            store,
            resolver,
            locks: DashMap::new(),
            timeout,
        }
    }

    pub async fn index_if_absent(&self, track: &Track) -> Result<IndexOutcome, IndexError> {
        let lock = Arc::clone(
            self.locks
                .entry(track.id.clone())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .value(),
        );

        let result = {
            let _guard = lock.lock().await;
            self.index_locked(track).await
        };

        drop(lock);
        self.locks
            .remove_if(&track.id, |_, lock| Arc::strong_count(lock) == 1);

        result
    }

    async fn index_locked(&self, track: &Track) -> Result<IndexOutcome, IndexError> {
        if self.bounded("exists", self.store.exists(&track.id)).await? {
            debug!(track_id = %track.id, "Track already indexed");
            return Ok(IndexOutcome::AlreadyPresent);
        }

        let resolved = self.resolver.resolve(track).await?;
        let document = Document::from_track(track, resolved.lyrics, resolved.source);

        self.bounded("upsert", self.store.upsert(&document)).await?;
        debug!(
            track_id = %track.id,
            has_lyrics = document.has_lyrics(),
            "Track indexed"
        );
        Ok(IndexOutcome::Indexed(document))
    }

    async fn bounded<T>(
        &self,
        operation: &str,
        call: impl Future<Output = StoreResult<T>>,
    ) -> StoreResult<T> {
        tokio::time::timeout(self.timeout, call)
            .await
            .map_err(|_| StoreError::Timeout(format!("{} exceeded {:?}", operation, self.timeout)))?
    }

    /// Number of ids currently holding a lock entry
    pub fn pending_locks(&self) -> usize {
        self.locks.len()
    }
}
