//! Lyric lookup against third-party lyric sites.
//!
//! Each site is a [`LyricSource`]; the [`LyricResolver`] tries them in priority
//! order and tells "no site has this song" apart from a broken lookup.

mod azlyrics;
mod genius;
mod html;
mod resolver;

pub use azlyrics::AzLyricsSource;
pub use genius::GeniusSource;
pub use resolver::{LyricResolver, ResolutionError, ResolvedLyrics};

use crate::config::LyricsConfig;
use async_trait::async_trait;
use std::sync::Arc;

/// Transport or parse failure of a single source
#[derive(Debug, Clone, thiserror::Error)]
pub enum LyricSourceError {
    #[error("request failed: {0}")]
    Network(String),

    #[error("{url} returned status {status}")]
    Status { status: u16, url: String },

    #[error("could not parse response: {0}")]
    Parse(String),

    #[error("timed out after {0:?}")]
    Timeout(std::time::Duration),
}

impl From<reqwest::Error> for LyricSourceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            LyricSourceError::Parse(err.to_string())
        } else {
            LyricSourceError::Network(err.to_string())
        }
    }
}

/// A site that can turn a free-text query into lyric text
#[async_trait]
pub trait LyricSource: Send + Sync {
    /// Short stable name, used in logs, metrics and stored documents
    fn name(&self) -> &str;

    /// `Ok(None)` means the site has no match for `query`
    async fn lookup(&self, query: &str) -> Result<Option<String>, LyricSourceError>;
}

/// The production chain: Genius first, AZLyrics as fallback
pub fn default_sources(
    config: &LyricsConfig,
) -> Result<Vec<Arc<dyn LyricSource>>, LyricSourceError> {
    Ok(vec![
        Arc::new(GeniusSource::new(config)?),
        Arc::new(AzLyricsSource::new(config)?),
    ])
}

pub(crate) fn build_client(config: &LyricsConfig) -> Result<reqwest::Client, LyricSourceError> {
    reqwest::Client::builder()
        .timeout(config.timeout())
        .user_agent(config.user_agent.clone())
        .build()
        .map_err(|e| LyricSourceError::Network(format!("Failed to create HTTP client: {}", e)))
}
