use super::Session;
use crate::metrics::SESSIONS_ACTIVE;
use crate::models::Credential;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;
use tracing::{debug, info};
use uuid::Uuid;

/// Process-lifetime table of sessions keyed by opaque token
#[derive(Default)]
pub struct SessionRegistry {
    sessions: DashMap<String, Arc<Session>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a session for `credential` and return it
    pub fn register(&self, credential: Credential) -> Arc<Session> {
        let id = Uuid::new_v4().simple().to_string();
        let session = Arc::new(Session::new(id.clone(), credential));
        self.sessions.insert(id.clone(), Arc::clone(&session));
        SESSIONS_ACTIVE.set(self.sessions.len() as i64);

        info!(session_id = %id, "Session registered");
        session
    }

    /// Look up a session and mark it active
    pub fn get(&self, id: &str) -> Option<Arc<Session>> {
        let session = self.sessions.get(id).map(|entry| Arc::clone(entry.value()))?;
        session.touch();
        Some(session)
    }

    pub fn remove(&self, id: &str) -> Option<Arc<Session>> {
        let removed = self.sessions.remove(id).map(|(_, session)| session);
        SESSIONS_ACTIVE.set(self.sessions.len() as i64);
        removed
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Drop idle sessions. Sessions with a run in flight are kept.
    pub fn cleanup_expired(&self, ttl: Duration) -> usize {
        let expired: Vec<String> = self
            .sessions
            .iter()
            .filter(|entry| entry.value().is_expired(ttl) && !entry.value().is_running())
            .map(|entry| entry.key().clone())
            .collect();

        for session_id in &expired {
            info!(session_id = %session_id, "Cleaning up expired session");
            self.remove(session_id);
        }
        expired.len()
    }
}

/// Periodic cleanup task for idle sessions
pub async fn cleanup_task(registry: Arc<SessionRegistry>, ttl: Duration, every: Duration) {
    let mut ticker = interval(every);

    loop {
        ticker.tick().await;

        debug!("Running session cleanup task");
        registry.cleanup_expired(ttl);
    }
}
