use super::{build_client, html, LyricSource, LyricSourceError};
use crate::config::LyricsConfig;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

static LYRICS_CONTAINER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)<div\b[^>]*\bdata-lyrics-container="true"[^>]*>"#)
        .expect("valid container regex")
});

static LEGACY_LYRICS_DIV: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)<div\b[^>]*\bclass="(?:[^"]*\s)?lyrics(?:\s[^"]*)?"[^>]*>"#)
        .expect("valid legacy lyrics regex")
});

// Artist accounts that publish playlists and listicles rather than songs
const NON_SONG_ARTISTS: [&str; 2] = ["Genius", "Spotify"];

/// Genius: multi-search for the song page, then scrape its lyrics
pub struct GeniusSource {
    client: Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct MultiSearchResponse {
    response: MultiSearchBody,
}

#[derive(Debug, Deserialize)]
struct MultiSearchBody {
    #[serde(default)]
    sections: Vec<SearchSection>,
}

#[derive(Debug, Deserialize)]
struct SearchSection {
    #[serde(default)]
    hits: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    #[serde(default)]
    index: String,
    result: HitResult,
}

#[derive(Debug, Deserialize)]
struct HitResult {
    #[serde(default)]
    path: Option<String>,
    #[serde(default)]
    primary_artist: Option<PrimaryArtist>,
}

#[derive(Debug, Deserialize)]
struct PrimaryArtist {
    name: String,
}

impl GeniusSource {
    pub fn new(config: &LyricsConfig) -> Result<Self, LyricSourceError> {
        Ok(Self {
            client: build_client(config)?,
            base_url: config.genius_base.trim_end_matches('/').to_string(),
        })
    }

    async fn find_song_path(&self, query: &str) -> Result<Option<String>, LyricSourceError> {
        let url = format!("{}/api/search/multi", self.base_url);
        let response = self.client.get(&url).query(&[("q", query)]).send().await?;
        if !response.status().is_success() {
            return Err(LyricSourceError::Status {
                status: response.status().as_u16(),
                url,
            });
        }

        let body: MultiSearchResponse = response.json().await?;
        Ok(first_song_path(body))
    }

    async fn scrape(&self, path: &str) -> Result<String, LyricSourceError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(LyricSourceError::Status {
                status: response.status().as_u16(),
                url,
            });
        }
        let page = response.text().await?;
        extract_lyrics(&page)
    }
}

fn first_song_path(body: MultiSearchResponse) -> Option<String> {
    body.response
        .sections
        .into_iter()
        .flat_map(|section| section.hits)
        .filter(|hit| hit.index == "song")
        .filter(|hit| {
            hit.result
                .primary_artist
                .as_ref()
                .map_or(true, |artist| !NON_SONG_ARTISTS.contains(&artist.name.as_str()))
        })
        .find_map(|hit| hit.result.path.filter(|p| !p.is_empty()))
}

fn extract_lyrics(page: &str) -> Result<String, LyricSourceError> {
    let mut blocks = html::div_contents(page, &LYRICS_CONTAINER);
    if blocks.is_empty() {
        blocks = html::div_contents(page, &LEGACY_LYRICS_DIV);
    }

    let lyrics = blocks
        .into_iter()
        .map(html::to_text)
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join("\n");

    if lyrics.is_empty() {
        return Err(LyricSourceError::Parse(
            "page does not contain lyrics".to_string(),
        ));
    }
    Ok(lyrics)
}

#[async_trait]
impl LyricSource for GeniusSource {
    fn name(&self) -> &str {
        "genius"
    }

    async fn lookup(&self, query: &str) -> Result<Option<String>, LyricSourceError> {
        let Some(path) = self.find_song_path(query).await? else {
            debug!(query, "No song hit on Genius");
            return Ok(None);
        };
        debug!(query, path = %path, "Scraping Genius song page");
        self.scrape(&path).await.map(Some)
    }
}
