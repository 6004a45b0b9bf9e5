//! Shared fakes for the integration tests: a scripted catalog, scripted lyric
//! sources, a recording progress channel and a store wrapper that counts calls.

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use versefind::catalog::{FetchError, TrackCatalog, TrackFetcher};
use versefind::indexing::{DocumentIndexer, IndexWorker, ProgressReporter, SessionCoordinator};
use versefind::lyrics::{LyricResolver, LyricSource, LyricSourceError};
use versefind::models::{Credential, Document, Progress, Track, TrackPage};
use versefind::session::{ChannelError, ProgressChannel};
use versefind::store::{DocumentStore, InMemoryDocumentStore, StoreError, StoreHits, StoreQuery, StoreResult};

pub fn track(id: &str, title: &str, artist: &str) -> Track {
    Track::new(id, title, vec![artist.to_string()])
}

pub fn library(n: usize) -> Vec<Track> {
    (0..n)
        .map(|i| track(&format!("t{}", i), &format!("Song {}", i), "Artist"))
        .collect()
}

/// Catalog that serves a fixed library in pages
#[derive(Default)]
pub struct FakeCatalog {
    tracks: Mutex<Vec<Track>>,
    fail: Mutex<Option<String>>,
    fetches: AtomicUsize,
    delay: Duration,
}

impl FakeCatalog {
    pub fn new(tracks: Vec<Track>) -> Arc<Self> {
        Arc::new(Self {
            tracks: Mutex::new(tracks),
            ..Default::default()
        })
    }

    pub fn slow(tracks: Vec<Track>, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            tracks: Mutex::new(tracks),
            delay,
            ..Default::default()
        })
    }

    pub fn failing(message: &str) -> Arc<Self> {
        Arc::new(Self {
            fail: Mutex::new(Some(message.to_string())),
            ..Default::default()
        })
    }

    pub fn set_tracks(&self, tracks: Vec<Track>) {
        *self.tracks.lock() = tracks;
    }

    pub fn calls(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TrackCatalog for FakeCatalog {
    async fn fetch_page(
        &self,
        _credential: &Credential,
        offset: usize,
        limit: usize,
    ) -> Result<TrackPage, FetchError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if let Some(message) = self.fail.lock().clone() {
            return Err(FetchError::Status {
                status: 500,
                message,
            });
        }

        let tracks = self.tracks.lock().clone();
        let end = (offset + limit).min(tracks.len());
        let page = tracks.get(offset..end).map(<[Track]>::to_vec).unwrap_or_default();
        Ok(TrackPage {
            has_next: end < tracks.len(),
            total: tracks.len(),
            tracks: page,
        })
    }
}

/// Lyric source answering from a query map
pub struct ScriptedLyricSource {
    name: &'static str,
    answers: HashMap<String, Result<Option<String>, LyricSourceError>>,
    delay: Duration,
    pub queries: Mutex<Vec<String>>,
}

impl ScriptedLyricSource {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            answers: HashMap::new(),
            delay: Duration::ZERO,
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn answer(mut self, query: &str, lyrics: &str) -> Self {
        self.answers.insert(query.to_string(), Ok(Some(lyrics.to_string())));
        self
    }

    pub fn fail(mut self, query: &str, error: LyricSourceError) -> Self {
        self.answers.insert(query.to_string(), Err(error));
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn lookups(&self) -> usize {
        self.queries.lock().len()
    }
}

#[async_trait]
impl LyricSource for ScriptedLyricSource {
    fn name(&self) -> &str {
        self.name
    }

    async fn lookup(&self, query: &str) -> Result<Option<String>, LyricSourceError> {
        self.queries.lock().push(query.to_string());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.answers.get(query).cloned().unwrap_or(Ok(None))
    }
}

/// How a `RecordingChannel` answers the final handshake
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Ack {
    Immediately,
    Never,
    Disconnect,
}

/// What a `RecordingChannel` saw
#[derive(Debug, Default)]
pub struct ChannelLog {
    pub frames: Vec<Progress>,
    pub acks_awaited: usize,
    pub closed: bool,
}

/// Progress channel that records frames; optionally fails after N sends or
/// never completes a send at all
pub struct RecordingChannel {
    log: Arc<Mutex<ChannelLog>>,
    fail_after: Option<usize>,
    stalled: bool,
    ack: Ack,
}

impl RecordingChannel {
    pub fn new(ack: Ack) -> (Self, Arc<Mutex<ChannelLog>>) {
        let log = Arc::new(Mutex::new(ChannelLog::default()));
        (
            Self {
                log: log.clone(),
                fail_after: None,
                stalled: false,
                ack,
            },
            log,
        )
    }

    pub fn disconnecting_after(sends: usize) -> (Self, Arc<Mutex<ChannelLog>>) {
        let (mut channel, log) = Self::new(Ack::Disconnect);
        channel.fail_after = Some(sends);
        (channel, log)
    }

    /// A peer that stops reading: every send hangs
    pub fn stalled() -> (Self, Arc<Mutex<ChannelLog>>) {
        let (mut channel, log) = Self::new(Ack::Never);
        channel.stalled = true;
        (channel, log)
    }
}

#[async_trait]
impl ProgressChannel for RecordingChannel {
    async fn send(&mut self, progress: &Progress) -> Result<(), ChannelError> {
        if self.stalled {
            std::future::pending::<()>().await;
        }
        let mut log = self.log.lock();
        if matches!(self.fail_after, Some(limit) if log.frames.len() >= limit) {
            return Err(ChannelError::Closed);
        }
        log.frames.push(progress.clone());
        Ok(())
    }

    async fn await_ack(&mut self) -> Result<(), ChannelError> {
        self.log.lock().acks_awaited += 1;
        match self.ack {
            Ack::Immediately => Ok(()),
            Ack::Disconnect => Err(ChannelError::Closed),
            Ack::Never => {
                std::future::pending::<()>().await;
                Ok(())
            }
        }
    }

    async fn close(&mut self) {
        self.log.lock().closed = true;
    }
}

/// Store wrapper counting calls, with injectable failures and latency
#[derive(Default)]
pub struct CountingStore {
    pub inner: InMemoryDocumentStore,
    pub exists_calls: AtomicUsize,
    pub upsert_calls: AtomicUsize,
    pub search_calls: AtomicUsize,
    pub fail_upserts: Mutex<Option<String>>,
    pub search_delay: Mutex<Duration>,
}

impl CountingStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn upserts(&self) -> usize {
        self.upsert_calls.load(Ordering::SeqCst)
    }

    pub fn searches(&self) -> usize {
        self.search_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DocumentStore for CountingStore {
    async fn exists(&self, id: &str) -> StoreResult<bool> {
        self.exists_calls.fetch_add(1, Ordering::SeqCst);
        // Widen the check-then-write window
        tokio::task::yield_now().await;
        self.inner.exists(id).await
    }

    async fn upsert(&self, document: &Document) -> StoreResult<()> {
        self.upsert_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = self.fail_upserts.lock().clone() {
            return Err(StoreError::Unavailable(message));
        }
        tokio::task::yield_now().await;
        self.inner.upsert(document).await
    }

    async fn search(&self, query: &StoreQuery) -> StoreResult<StoreHits> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.search_delay.lock();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.inner.search(query).await
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}

/// Wire a coordinator over fakes the way the server binary wires the real parts
pub fn coordinator(
    catalog: Arc<FakeCatalog>,
    sources: Vec<Arc<dyn LyricSource>>,
    store: Arc<dyn DocumentStore>,
) -> SessionCoordinator {
    let fetcher = TrackFetcher::new(catalog, 2);
    let resolver = Arc::new(LyricResolver::new(sources, Duration::from_secs(5)));
    let indexer = Arc::new(DocumentIndexer::new(store, resolver, Duration::from_secs(5)));
    SessionCoordinator::new(
        IndexWorker::new(fetcher, indexer),
        ProgressReporter::new(Duration::from_millis(5), Duration::from_millis(100)),
        Duration::from_millis(200),
    )
}
