use super::{LyricSource, LyricSourceError};
use crate::metrics;
use crate::models::Track;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Lyrics settled for one track
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedLyrics {
    /// Empty when no source knew the song
    pub lyrics: String,

    /// Source that supplied the text
    pub source: Option<String>,
}

impl ResolvedLyrics {
    fn not_found() -> Self {
        Self {
            lyrics: String::new(),
            source: None,
        }
    }
}

/// A source failed outright; the track is skipped
#[derive(Debug, Clone, thiserror::Error)]
#[error("lyric source {source_name} failed: {error}")]
pub struct ResolutionError {
    pub source_name: String,
    pub error: LyricSourceError,
}

/// Tries lyric sources in priority order
pub struct LyricResolver {
    sources: Vec<Arc<dyn LyricSource>>,
    timeout: Duration,
}

impl LyricResolver {
    pub fn new(sources: Vec<Arc<dyn LyricSource>>, timeout: Duration) -> Self {
        Self { sources, timeout }
    }

    /// Resolve lyrics for `track`.
    ///
    /// "Not found" falls through to the next source and finally to empty
    /// lyrics. A transport or parse error stops the chain immediately.
    pub async fn resolve(&self, track: &Track) -> Result<ResolvedLyrics, ResolutionError> {
        let query = track.lyric_query();
        debug!(track_id = %track.id, query = %query, "Resolving lyrics");

        for source in &self.sources {
            let name = source.name();
            let outcome = match tokio::time::timeout(self.timeout, source.lookup(&query)).await {
                Ok(result) => result,
                Err(_) => Err(LyricSourceError::Timeout(self.timeout)),
            };

            match outcome {
                Ok(Some(lyrics)) => {
                    metrics::record_lyric_lookup(name, "found");
                    return Ok(ResolvedLyrics {
                        lyrics,
                        source: Some(name.to_string()),
                    });
                }
                Ok(None) => {
                    metrics::record_lyric_lookup(name, "not_found");
                    debug!(track_id = %track.id, source = name, "No lyrics found, trying next source");
                }
                Err(error) => {
                    let label = if matches!(error, LyricSourceError::Timeout(_)) {
                        "timeout"
                    } else {
                        "error"
                    };
                    metrics::record_lyric_lookup(name, label);
                    return Err(ResolutionError {
                        source_name: name.to_string(),
                        error,
                    });
                }
            }
        }

        debug!(track_id = %track.id, "No source had lyrics, defaulting to empty");
        Ok(ResolvedLyrics::not_found())
    }
}
