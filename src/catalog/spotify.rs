use super::{FetchError, TrackCatalog};
use crate::config::CatalogConfig;
use crate::models::{Credential, Track, TrackPage};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

/// Spotify Web API saved-tracks client
#[derive(Clone)]
pub struct SpotifyCatalog {
    client: Client,
    api_base: String,
}

#[derive(Debug, Deserialize)]
struct SavedTracksResponse {
    #[serde(default)]
    items: Vec<SavedTrackItem>,
    #[serde(default)]
    total: usize,
    next: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SavedTrackItem {
    track: Option<FullTrack>,
}

#[derive(Debug, Deserialize)]
struct FullTrack {
    // Local files carry no catalog id
    id: Option<String>,
    name: String,
    #[serde(default)]
    artists: Vec<SimpleArtist>,
    album: Option<SimpleAlbum>,
    external_urls: Option<ExternalUrls>,
    preview_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ExternalUrls {
    spotify: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SimpleArtist {
    name: String,
}

#[derive(Debug, Deserialize)]
struct SimpleAlbum {
    name: String,
    // Largest first
    #[serde(default)]
    images: Vec<Image>,
}

#[derive(Debug, Deserialize)]
struct Image {
    url: String,
}

impl SimpleAlbum {
    /// The medium cover, or the only one when the album has a single size
    fn cover(&self) -> Option<String> {
        self.images
            .get(1)
            .or_else(|| self.images.first())
            .map(|image| image.url.clone())
    }
}

impl SpotifyCatalog {
    pub fn new(config: &CatalogConfig) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| FetchError::Network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl TrackCatalog for SpotifyCatalog {
    async fn fetch_page(
        &self,
        credential: &Credential,
        offset: usize,
        limit: usize,
    ) -> Result<TrackPage, FetchError> {
        let url = format!("{}/me/tracks", self.api_base);
        debug!(offset, limit, "Fetching saved tracks page");

        let response = self
            .client
            .get(&url)
            .bearer_auth(credential.bearer())
            .query(&[("offset", offset), ("limit", limit)])
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            let message = response.text().await.unwrap_or_default();
            return Err(FetchError::Unauthorized(message));
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(FetchError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let body: SavedTracksResponse = response.json().await?;
        let tracks = body
            .items
            .into_iter()
            .filter_map(|item| item.track)
            .filter_map(|track| {
                let id = track.id?;
                let image_url = track.album.as_ref().and_then(SimpleAlbum::cover);
                Some(Track {
                    id,
                    title: track.name,
                    artists: track.artists.into_iter().map(|a| a.name).collect(),
                    album: track.album.map(|a| a.name),
                    url: track.external_urls.and_then(|u| u.spotify),
                    image_url,
                    preview_url: track.preview_url,
                })
            })
            .collect();

        Ok(TrackPage {
            tracks,
            total: body.total,
            has_next: body.next.is_some(),
        })
    }
}
