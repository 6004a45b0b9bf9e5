//! Music catalog access: the saved-tracks listing of a user's library.

mod fetcher;
mod spotify;

pub use fetcher::TrackFetcher;
pub use spotify::SpotifyCatalog;

use crate::models::{Credential, TrackPage};
use async_trait::async_trait;

/// Errors raised while reading the catalog. Any of them aborts a run.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// The credential was rejected
    #[error("catalog rejected the credential: {0}")]
    Unauthorized(String),

    /// Catalog answered with an unexpected status
    #[error("catalog returned status {status}: {message}")]
    Status { status: u16, message: String },

    /// Catalog could not be reached
    #[error("catalog unreachable: {0}")]
    Network(String),

    /// Catalog response could not be decoded
    #[error("could not decode catalog response: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            FetchError::Decode(err.to_string())
        } else {
            FetchError::Network(err.to_string())
        }
    }
}

/// Paginated access to a user's saved tracks
#[async_trait]
pub trait TrackCatalog: Send + Sync {
    /// Fetch up to `limit` saved tracks starting at `offset`
    async fn fetch_page(
        &self,
        credential: &Credential,
        offset: usize,
        limit: usize,
    ) -> Result<TrackPage, FetchError>;
}
