//! Document store: existence check, immediately-visible upsert and
//! ID-scoped full-text search over track documents.

mod elastic;
mod factory;
mod memory;
mod tantivy_store;

pub use elastic::ElasticStore;
pub use factory::create_store;
pub use memory::InMemoryDocumentStore;
pub use tantivy_store::TantivyStore;

use crate::models::Document;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Result type for store operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Errors that can occur talking to a document store
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Store could not be reached
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// Store rejected or failed the operation
    #[error("Store operation failed: {0}")]
    Backend(String),

    /// Operation exceeded its deadline
    #[error("Store operation timed out: {0}")]
    Timeout(String),

    /// Query text could not be parsed
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// Stored document could not be (de)serialized
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}

impl From<reqwest::Error> for StoreError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            StoreError::Timeout(err.to_string())
        } else if err.is_connect() {
            StoreError::Unavailable(err.to_string())
        } else if err.is_decode() {
            StoreError::Serialization(err.to_string())
        } else {
            StoreError::Backend(err.to_string())
        }
    }
}

/// How free-text terms combine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum DefaultOperator {
    #[default]
    And,
    Or,
}

/// Backend-neutral search: documents whose id is in `ids` AND which match `text`
#[derive(Debug, Clone, PartialEq)]
pub struct StoreQuery {
    pub ids: BTreeSet<String>,

    /// Query-string syntax; blank matches every document in `ids`
    pub text: String,

    /// Expand `*` and `?` in query terms
    pub analyze_wildcard: bool,

    pub default_operator: DefaultOperator,

    pub limit: usize,

    pub offset: usize,

    /// Ask the store for per-hit score explanations
    pub explain: bool,
}

impl StoreQuery {
    pub fn has_text(&self) -> bool {
        !self.text.trim().is_empty()
    }
}

/// One scored hit
#[derive(Debug, Clone)]
pub struct StoreHit {
    pub id: String,
    pub document: Document,
    pub score: f32,
    pub explanation: Option<serde_json::Value>,
}

/// A page of hits plus the total match count
#[derive(Debug, Clone, Default)]
pub struct StoreHits {
    pub total: usize,
    pub hits: Vec<StoreHit>,
}

/// Persistence for track documents, shared by every session
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Whether a document with `id` exists
    async fn exists(&self, id: &str) -> StoreResult<bool>;

    /// Insert or replace; the document is searchable once this returns
    async fn upsert(&self, document: &Document) -> StoreResult<()>;

    /// Run an ID-scoped text query
    async fn search(&self, query: &StoreQuery) -> StoreResult<StoreHits>;

    /// Cheap reachability check
    async fn ping(&self) -> StoreResult<()>;
}
