use serde::{Deserialize, Serialize};

/// Catalog metadata for one saved track
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    /// Catalog identifier, also the document key
    pub id: String,

    pub title: String,

    /// Artist names in catalog order
    pub artists: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub album: Option<String>,

    /// Track page on the catalog's web player
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Medium-size album cover
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,

    /// Short audio clip, when the catalog offers one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview_url: Option<String>,
}

impl Track {
    pub fn new(id: impl Into<String>, title: impl Into<String>, artists: Vec<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            artists,
            album: None,
            url: None,
            image_url: None,
            preview_url: None,
        }
    }

    pub fn with_album(mut self, album: impl Into<String>) -> Self {
        self.album = Some(album.into());
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_image(mut self, image_url: impl Into<String>) -> Self {
        self.image_url = Some(image_url.into());
        self
    }

    pub fn with_preview(mut self, preview_url: impl Into<String>) -> Self {
        self.preview_url = Some(preview_url.into());
        self
    }

    /// Free-text lyric query: the title followed by every artist, space separated
    pub fn lyric_query(&self) -> String {
        std::iter::once(self.title.as_str())
            .chain(self.artists.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// One page of the catalog's saved-tracks listing
#[derive(Debug, Clone, Default)]
pub struct TrackPage {
    pub tracks: Vec<Track>,

    /// Total library size reported by the catalog
    pub total: usize,

    /// Whether the catalog advertises another page
    pub has_next: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lyric_query_joins_title_and_artists() {
        let track = Track::new("1", "Heroes", vec!["David Bowie".into(), "Brian Eno".into()]);
        assert_eq!(track.lyric_query(), "Heroes David Bowie Brian Eno");
    }

    #[test]
    fn test_lyric_query_without_artists() {
        let track = Track::new("1", "Untitled", vec![]);
        assert_eq!(track.lyric_query(), "Untitled");
    }
}
