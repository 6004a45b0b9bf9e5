use super::{DocumentStore, ElasticStore, InMemoryDocumentStore, StoreResult, TantivyStore};
use crate::config::{StoreBackend, StoreConfig};
use std::sync::Arc;

/// Create a document store based on configuration
pub fn create_store(config: &StoreConfig) -> StoreResult<Arc<dyn DocumentStore>> {
    match config.backend {
        StoreBackend::Elasticsearch => {
            tracing::info!(url = %config.elastic_url, index = %config.index, "Initializing Elasticsearch document store");
            Ok(Arc::new(ElasticStore::new(config)?))
        }

        StoreBackend::Tantivy => {
            tracing::info!(path = ?config.path, "Initializing tantivy document store");
            Ok(Arc::new(TantivyStore::open(&config.path, config.writer_heap_size)?))
        }

        StoreBackend::Memory => {
            tracing::info!("Initializing in-memory document store");
            Ok(Arc::new(InMemoryDocumentStore::new()))
        }
    }
}
