//! Sessions: one authenticated user's indexing and search context.

mod channel;
mod registry;

pub use channel::{ChannelError, ProgressChannel};
pub use registry::{cleanup_task, SessionRegistry};

use crate::models::{Credential, Progress};
use chrono::{DateTime, Utc};
use dashmap::DashSet;
use parking_lot::{Mutex, RwLock};
use std::collections::BTreeSet;
use std::time::Duration;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Handle on a session's in-flight run
#[derive(Clone)]
pub struct RunHandle {
    /// Holds `Some(terminal progress)` once the run has fully finished
    pub(crate) done: watch::Receiver<Option<Progress>>,
    /// Cancels the worker and reporter of the run
    pub(crate) halt: CancellationToken,
}

pub struct Session {
    id: String,
    credential: Credential,
    created_at: DateTime<Utc>,
    last_active: Mutex<DateTime<Utc>>,
    progress: RwLock<Progress>,
    indexed: DashSet<String>,
    pub(crate) run: Mutex<Option<RunHandle>>,
    channel: tokio::sync::Mutex<Option<Box<dyn ProgressChannel>>>,
}

impl Session {
    pub fn new(id: impl Into<String>, credential: Credential) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            credential,
            created_at: now,
            last_active: Mutex::new(now),
            progress: RwLock::new(Progress::finished()),
            indexed: DashSet::new(),
            run: Mutex::new(None),
            channel: tokio::sync::Mutex::new(None),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn credential(&self) -> &Credential {
        &self.credential
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Update last activity timestamp
    pub fn touch(&self) {
        *self.last_active.lock() = Utc::now();
    }

    pub fn is_expired(&self, ttl: Duration) -> bool {
        let idle = Utc::now() - *self.last_active.lock();
        idle.to_std().map_or(false, |idle| idle > ttl)
    }

    pub fn progress(&self) -> Progress {
        self.progress.read().clone()
    }

    pub(crate) fn set_progress(&self, progress: Progress) {
        *self.progress.write() = progress;
    }

    pub(crate) fn update_progress(&self, update: impl FnOnce(&mut Progress)) {
        let mut progress = self.progress.write();
        update(&mut progress);
    }

    /// Set of catalog ids indexed for this session
    pub fn indexed(&self) -> &DashSet<String> {
        &self.indexed
    }

    pub fn indexed_snapshot(&self) -> BTreeSet<String> {
        self.indexed.iter().map(|id| id.clone()).collect()
    }

    pub(crate) fn mark_indexed(&self, id: &str) {
        self.indexed.insert(id.to_string());
    }

    pub fn is_running(&self) -> bool {
        self.run.lock().is_some()
    }

    /// Attach a client connection, closing any previous one
    pub async fn attach_channel(&self, channel: Box<dyn ProgressChannel>) {
        let mut slot = self.channel.lock().await;
        if let Some(mut previous) = slot.replace(channel) {
            debug!(session_id = %self.id, "Replacing streaming channel");
            previous.close().await;
        }
    }

    pub async fn has_channel(&self) -> bool {
        self.channel.lock().await.is_some()
    }

    /// Push the current snapshot, failing if the write takes longer than
    /// `send_timeout`. Without an attached channel this is a no-op.
    pub async fn push_progress(&self, send_timeout: Duration) -> Result<(), ChannelError> {
        let mut slot = self.channel.lock().await;
        let Some(channel) = slot.as_mut() else {
            return Ok(());
        };
        let snapshot = self.progress();
        send_bounded(channel.as_mut(), &snapshot, send_timeout).await
    }

    /// Push `terminal`, wait for the client's acknowledgement, then release the channel
    pub(crate) async fn finish_stream(&self, terminal: &Progress, handshake_timeout: Duration) {
        let mut slot = self.channel.lock().await;
        let Some(mut channel) = slot.take() else {
            return;
        };

        match send_bounded(channel.as_mut(), terminal, handshake_timeout).await {
            Ok(()) => match tokio::time::timeout(handshake_timeout, channel.await_ack()).await {
                Ok(Ok(())) => debug!(session_id = %self.id, "Client acknowledged final progress"),
                Ok(Err(e)) => debug!(session_id = %self.id, error = %e, "Client left before acknowledging"),
                Err(_) => warn!(
                    session_id = %self.id,
                    timeout = ?handshake_timeout,
                    "Client did not acknowledge final progress"
                ),
            },
            Err(e) => debug!(session_id = %self.id, error = %e, "Final progress push failed"),
        }

        channel.close().await;
    }
}

async fn send_bounded(
    channel: &mut dyn ProgressChannel,
    progress: &Progress,
    limit: Duration,
) -> Result<(), ChannelError> {
    tokio::time::timeout(limit, channel.send(progress))
        .await
        .map_err(|_| ChannelError::Timeout(limit))?
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("credential", &self.credential)
            .field("created_at", &self.created_at)
            .field("indexed", &self.indexed.len())
            .field("running", &self.is_running())
            .finish()
    }
}
