pub mod handlers;
pub mod routes;
pub mod websocket;

pub use routes::*;

use crate::indexing::SessionCoordinator;
use crate::search::SearchService;
use crate::session::SessionRegistry;
use crate::store::DocumentStore;
use std::sync::Arc;
use std::time::Instant;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<SessionRegistry>,
    pub coordinator: SessionCoordinator,
    pub search: Arc<SearchService>,
    pub store: Arc<dyn DocumentStore>,
    pub started_at: Instant,
    pub metrics_enabled: bool,
}

impl AppState {
    pub fn new(
        registry: Arc<SessionRegistry>,
        coordinator: SessionCoordinator,
        search: Arc<SearchService>,
        store: Arc<dyn DocumentStore>,
    ) -> Self {
        Self {
            registry,
            coordinator,
            search,
            store,
            started_at: Instant::now(),
            metrics_enabled: false,
        }
    }

    /// Expose `/metrics`
    pub fn with_metrics(mut self, enabled: bool) -> Self {
        self.metrics_enabled = enabled;
        self
    }
}
