use serde::{Deserialize, Serialize};

use super::Track;

/// Persisted, searchable form of a track
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub title: String,
    pub artists: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub album: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview_url: Option<String>,

    /// Lyric text, empty when no source had the song
    #[serde(default)]
    pub lyrics: String,

    /// Name of the source the lyrics came from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lyrics_source: Option<String>,
}

impl Document {
    pub fn from_track(track: &Track, lyrics: String, lyrics_source: Option<String>) -> Self {
        Self {
            id: track.id.clone(),
            title: track.title.clone(),
            artists: track.artists.clone(),
            album: track.album.clone(),
            url: track.url.clone(),
            image_url: track.image_url.clone(),
            preview_url: track.preview_url.clone(),
            lyrics,
            lyrics_source,
        }
    }

    pub fn has_lyrics(&self) -> bool {
        !self.lyrics.is_empty()
    }
}
