use super::{build_client, html, LyricSource, LyricSourceError};
use crate::config::LyricsConfig;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use tracing::debug;

static FIRST_RESULT_LINK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)<table\b.*?<a\b[^>]*\bhref="([^"]+)""#).expect("valid result link regex")
});

// Lyric bodies follow the site's usage notice comment
static LYRICS_BODY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<div>\s*<!--\s*Usage of azlyrics\.com content.*?-->(.*?)</div>")
        .expect("valid lyrics body regex")
});

/// AZLyrics: site search, then scrape the first result
pub struct AzLyricsSource {
    client: Client,
    search_base: String,
}

impl AzLyricsSource {
    pub fn new(config: &LyricsConfig) -> Result<Self, LyricSourceError> {
        Ok(Self {
            client: build_client(config)?,
            search_base: config.azlyrics_search_base.trim_end_matches('/').to_string(),
        })
    }

    async fn fetch(&self, url: &str, query: Option<&str>) -> Result<String, LyricSourceError> {
        let mut request = self.client.get(url);
        if let Some(q) = query {
            request = request.query(&[("q", q)]);
        }
        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(LyricSourceError::Status {
                status: response.status().as_u16(),
                url: url.to_string(),
            });
        }
        Ok(response.text().await?)
    }
}

fn first_result_link(page: &str) -> Option<String> {
    FIRST_RESULT_LINK
        .captures(page)
        .map(|caps| html::decode_entities(&caps[1]))
}

fn extract_lyrics(page: &str) -> Result<String, LyricSourceError> {
    let body = LYRICS_BODY
        .captures(page)
        .and_then(|caps| caps.get(1))
        .ok_or_else(|| LyricSourceError::Parse("page does not contain lyrics".to_string()))?;
    Ok(html::to_text(body.as_str()))
}

#[async_trait]
impl LyricSource for AzLyricsSource {
    fn name(&self) -> &str {
        "azlyrics"
    }

    async fn lookup(&self, query: &str) -> Result<Option<String>, LyricSourceError> {
        let search_url = format!("{}/search.php", self.search_base);
        let results = self.fetch(&search_url, Some(query)).await?;

        let Some(link) = first_result_link(&results) else {
            debug!(query, "No AZLyrics search result");
            return Ok(None);
        };

        debug!(query, link = %link, "Scraping AZLyrics page");
        let page = self.fetch(&link, None).await?;
        extract_lyrics(&page).map(Some)
    }
}
