//! End-to-end indexing runs over fake collaborators

mod common;

use common::*;
use std::sync::Arc;
use std::time::Duration;
use versefind::lyrics::{LyricSource, LyricSourceError};
use versefind::models::{Credential, Progress};
use versefind::session::SessionRegistry;
use versefind::store::DocumentStore;

fn sources(list: Vec<ScriptedLyricSource>) -> Vec<Arc<dyn LyricSource>> {
    list.into_iter()
        .map(|s| Arc::new(s) as Arc<dyn LyricSource>)
        .collect()
}

#[tokio::test]
async fn test_run_indexes_whole_library() {
    let catalog = FakeCatalog::new(vec![
        track("1", "Hello", "Adele"),
        track("2", "Yellow", "Coldplay"),
        track("3", "Unknown", "Nobody"),
    ]);
    let genius = ScriptedLyricSource::new("genius").answer("Hello Adele", "hello from the other side");
    let azlyrics = ScriptedLyricSource::new("azlyrics").answer("Yellow Coldplay", "look at the stars");
    let store = CountingStore::new();
    let coordinator = coordinator(catalog.clone(), sources(vec![genius, azlyrics]), store.clone());

    let registry = SessionRegistry::new();
    let session = registry.register(Credential::new("token"));
    let (channel, log) = RecordingChannel::new(Ack::Immediately);
    session.attach_channel(Box::new(channel)).await;

    let terminal = coordinator.start_or_join(&session).await;

    assert_eq!(terminal, Progress::finished());
    assert_eq!(session.progress(), Progress::finished());
    assert!(!session.is_running());
    assert_eq!(session.indexed().len(), 3);
    assert_eq!(store.upserts(), 3);

    let hello = store.inner.get("1").unwrap();
    assert_eq!(hello.lyrics, "hello from the other side");
    assert_eq!(hello.lyrics_source.as_deref(), Some("genius"));
    let yellow = store.inner.get("2").unwrap();
    assert_eq!(yellow.lyrics_source.as_deref(), Some("azlyrics"));
    let unknown = store.inner.get("3").unwrap();
    assert!(unknown.lyrics.is_empty());
    assert!(unknown.lyrics_source.is_none());

    assert!(!session.has_channel().await);

    let log = log.lock();
    assert_eq!(log.frames.last(), Some(&Progress::finished()));
    assert_eq!(log.acks_awaited, 1);
    assert!(log.closed);
}

#[tokio::test]
async fn test_rerun_only_indexes_new_tracks() {
    let catalog = FakeCatalog::new(vec![track("a", "A", "X"), track("b", "B", "X")]);
    let store = CountingStore::new();
    let coordinator = coordinator(catalog.clone(), Vec::new(), store.clone());
    let session = SessionRegistry::new().register(Credential::new("token"));

    coordinator.start_or_join(&session).await;
    assert_eq!(store.upserts(), 2);
    let exists_after_first = store.exists_calls.load(std::sync::atomic::Ordering::SeqCst);

    catalog.set_tracks(vec![track("a", "A", "X"), track("b", "B", "X"), track("c", "C", "X")]);
    let terminal = coordinator.start_or_join(&session).await;

    assert_eq!(terminal, Progress::finished());
    assert_eq!(store.upserts(), 3);
    // Only the new track reaches the store
    assert_eq!(
        store.exists_calls.load(std::sync::atomic::Ordering::SeqCst),
        exists_after_first + 1
    );
    assert_eq!(session.indexed().len(), 3);
}

#[tokio::test]
async fn test_concurrent_callers_join_one_run() {
    let catalog = FakeCatalog::slow(library(3), Duration::from_millis(20));
    let store = CountingStore::new();
    let coordinator = coordinator(catalog.clone(), Vec::new(), store.clone());
    let session = SessionRegistry::new().register(Credential::new("token"));

    let (first, second) = tokio::join!(
        coordinator.start_or_join(&session),
        coordinator.start_or_join(&session),
    );

    assert_eq!(first, second);
    assert_eq!(first, Progress::finished());
    // Library of 3 with page size 2 takes two fetches; one run only
    assert_eq!(catalog.calls(), 2);
    assert_eq!(store.upserts(), 3);
}

#[tokio::test]
async fn test_sessions_sharing_tracks_write_each_once() {
    let store = CountingStore::new();
    let coordinator = coordinator(FakeCatalog::new(library(6)), Vec::new(), store.clone());
    let registry = SessionRegistry::new();
    let first = registry.register(Credential::new("one"));
    let second = registry.register(Credential::new("two"));

    let (a, b) = tokio::join!(
        coordinator.start_or_join(&first),
        coordinator.start_or_join(&second),
    );

    assert_eq!(a, Progress::finished());
    assert_eq!(b, Progress::finished());
    assert_eq!(store.upserts(), 6);
    assert_eq!(store.inner.len(), 6);
    assert_eq!(first.indexed().len(), 6);
    assert_eq!(second.indexed().len(), 6);
}

#[tokio::test]
async fn test_store_failure_aborts_run() {
    let store = CountingStore::new();
    *store.fail_upserts.lock() = Some("cluster red".to_string());
    let coordinator = coordinator(FakeCatalog::new(library(4)), Vec::new(), store.clone());
    let session = SessionRegistry::new().register(Credential::new("token"));

    let terminal = coordinator.start_or_join(&session).await;

    assert!(terminal.is_failure());
    assert!(terminal.complete);
    assert_eq!((terminal.n, terminal.total), (0, 0));
    assert!(terminal.text.contains("cluster red"), "{}", terminal.text);
    assert_eq!(store.upserts(), 1);
    assert!(session.indexed().is_empty());
    assert!(!session.is_running());

    // The session can start over once the store recovers
    *store.fail_upserts.lock() = None;
    assert_eq!(coordinator.start_or_join(&session).await, Progress::finished());
    assert_eq!(session.indexed().len(), 4);
}

#[tokio::test]
async fn test_catalog_failure_aborts_run() {
    let coordinator = coordinator(FakeCatalog::failing("rate limited"), Vec::new(), CountingStore::new());
    let session = SessionRegistry::new().register(Credential::new("token"));

    let terminal = coordinator.start_or_join(&session).await;

    assert!(terminal.is_failure());
    assert!(terminal.text.contains("rate limited"));
}

#[tokio::test]
async fn test_lyric_error_skips_track() {
    let genius = ScriptedLyricSource::new("genius")
        .fail("Song 1 Artist", LyricSourceError::Parse("page does not contain lyrics".into()));
    let store = CountingStore::new();
    let coordinator = coordinator(FakeCatalog::new(library(3)), sources(vec![genius]), store.clone());
    let session = SessionRegistry::new().register(Credential::new("token"));

    let terminal = coordinator.start_or_join(&session).await;

    assert_eq!(terminal, Progress::finished());
    assert_eq!(store.upserts(), 2);
    assert!(store.inner.get("t1").is_none());
    assert!(!session.indexed().contains("t1"));
}

#[tokio::test]
async fn test_disconnect_halts_worker() {
    let slow = ScriptedLyricSource::new("slow").with_delay(Duration::from_millis(20));
    let store = CountingStore::new();
    let coordinator = coordinator(FakeCatalog::new(library(40)), sources(vec![slow]), store.clone());
    let session = SessionRegistry::new().register(Credential::new("token"));

    let (channel, log) = RecordingChannel::disconnecting_after(1);
    session.attach_channel(Box::new(channel)).await;

    let terminal = coordinator.start_or_join(&session).await;

    assert_eq!(terminal, Progress::finished());
    assert!(store.upserts() < 40, "worker kept going after disconnect");
    assert_eq!(session.indexed().len(), store.upserts());
    let log = log.lock();
    assert_eq!(log.frames.len(), 1);
    assert_eq!(log.acks_awaited, 0);
    assert!(log.closed);
}

#[tokio::test]
async fn test_explicit_halt_stops_run() {
    let slow = ScriptedLyricSource::new("slow").with_delay(Duration::from_millis(20));
    let store = CountingStore::new();
    let coordinator = coordinator(FakeCatalog::new(library(40)), sources(vec![slow]), store.clone());
    let session = SessionRegistry::new().register(Credential::new("token"));

    let run = {
        let coordinator = coordinator.clone();
        let session = session.clone();
        tokio::spawn(async move { coordinator.start_or_join(&session).await })
    };

    while store.upserts() == 0 {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert!(coordinator.halt(&session));

    let terminal = run.await.unwrap();
    assert_eq!(terminal, Progress::finished());
    assert!(store.upserts() < 40);
    assert!(!coordinator.halt(&session));
}

#[tokio::test]
async fn test_unanswered_handshake_is_bounded() {
    let coordinator = coordinator(FakeCatalog::new(library(2)), Vec::new(), CountingStore::new());
    let session = SessionRegistry::new().register(Credential::new("token"));
    let (channel, log) = RecordingChannel::new(Ack::Never);
    session.attach_channel(Box::new(channel)).await;

    let terminal = tokio::time::timeout(Duration::from_secs(5), coordinator.start_or_join(&session))
        .await
        .expect("handshake wait must be bounded");

    assert_eq!(terminal, Progress::finished());
    let log = log.lock();
    assert_eq!(log.acks_awaited, 1);
    assert!(log.closed);
}

#[tokio::test]
async fn test_progress_frames_count_up_to_total() {
    let slow = ScriptedLyricSource::new("slow").with_delay(Duration::from_millis(10));
    let coordinator = coordinator(FakeCatalog::new(library(5)), sources(vec![slow]), CountingStore::new());
    let session = SessionRegistry::new().register(Credential::new("token"));
    let (channel, log) = RecordingChannel::new(Ack::Immediately);
    session.attach_channel(Box::new(channel)).await;

    coordinator.start_or_join(&session).await;

    let log = log.lock();
    let indexing: Vec<&Progress> = log
        .frames
        .iter()
        .filter(|p| !p.complete && p.text == "Indexing lyrics")
        .collect();
    assert!(!indexing.is_empty());
    assert!(indexing.iter().all(|p| p.total == 5 && p.n <= 5));
    assert!(indexing.windows(2).all(|w| w[0].n <= w[1].n));
}

#[tokio::test]
async fn test_run_without_channel_completes() {
    let store = CountingStore::new();
    let coordinator = coordinator(FakeCatalog::new(library(3)), Vec::new(), store.clone());
    let session = SessionRegistry::new().register(Credential::new("token"));

    assert_eq!(coordinator.start_or_join(&session).await, Progress::finished());
    assert_eq!(store.upserts(), 3);
    assert!(store.ping().await.is_ok());
}

#[tokio::test]
async fn test_stalled_client_cannot_wedge_run() {
    let store = CountingStore::new();
    let coordinator = coordinator(FakeCatalog::new(library(2)), Vec::new(), store.clone());
    let session = SessionRegistry::new().register(Credential::new("token"));
    let (channel, log) = RecordingChannel::stalled();
    session.attach_channel(Box::new(channel)).await;

    let terminal = tokio::time::timeout(Duration::from_secs(3), coordinator.start_or_join(&session))
        .await
        .expect("a client that stops reading must not hold the run open");

    assert_eq!(terminal, Progress::finished());
    assert!(!session.is_running());
    assert!(!session.has_channel().await);
    let log = log.lock();
    assert!(log.frames.is_empty());
    assert_eq!(log.acks_awaited, 0);
    assert!(log.closed);
}

#[tokio::test]
async fn test_rerun_with_unchanged_library_reports_zero_total() {
    let catalog = FakeCatalog::new(library(3));
    let store = CountingStore::new();
    let coordinator = coordinator(catalog, Vec::new(), store.clone());
    let session = SessionRegistry::new().register(Credential::new("token"));

    coordinator.start_or_join(&session).await;
    assert_eq!(store.upserts(), 3);

    let (channel, log) = RecordingChannel::new(Ack::Immediately);
    session.attach_channel(Box::new(channel)).await;
    let terminal = coordinator.start_or_join(&session).await;

    assert_eq!(terminal, Progress::finished());
    assert_eq!(store.upserts(), 3);
    let log = log.lock();
    assert_eq!(log.frames.last(), Some(&Progress::finished()));
    let running: Vec<&Progress> = log.frames.iter().filter(|p| !p.complete).collect();
    assert!(running.iter().all(|p| p.total == 0 && p.n == 0));
}
