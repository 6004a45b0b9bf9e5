use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration
    pub server: ServerConfig,

    /// Music catalog API configuration
    pub catalog: CatalogConfig,

    /// Lyric source configuration
    pub lyrics: LyricsConfig,

    /// Document store configuration
    pub store: StoreConfig,

    /// Indexing run configuration
    #[serde(default)]
    pub indexing: IndexingConfig,

    /// Search configuration
    #[serde(default)]
    pub search: SearchConfig,

    /// Observability configuration
    pub observability: ObservabilityConfig,
}

impl Config {
    /// Load configuration from the embedded defaults, an optional file and environment
    pub fn load() -> Result<Self, config::ConfigError> {
        let config_path = std::env::var("VERSEFIND_CONFIG")
            .unwrap_or_else(|_| "config/versefind.toml".to_string());
        Self::load_from(&config_path)
    }

    /// Load configuration, overlaying the file at `config_path` if it exists
    pub fn load_from(config_path: &str) -> Result<Self, config::ConfigError> {
        config::Config::builder()
            // Start with default values
            .add_source(config::File::from_str(
                include_str!("../config/default.toml"),
                config::FileFormat::Toml,
            ))
            // Override with config file if it exists
            .add_source(config::File::with_name(config_path).required(false))
            // Override with environment variables (prefix: VERSEFIND__)
            .add_source(
                config::Environment::with_prefix("VERSEFIND")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            catalog: CatalogConfig::default(),
            lyrics: LyricsConfig::default(),
            store: StoreConfig::default(),
            indexing: IndexingConfig::default(),
            search: SearchConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP server host
    #[serde(default = "default_host")]
    pub host: String,

    /// HTTP server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// How long the final progress handshake waits for the client (seconds)
    #[serde(default = "default_handshake_timeout")]
    pub handshake_timeout_secs: u64,

    /// Idle session expiry (seconds, 0 = sessions live until shutdown)
    #[serde(default)]
    pub session_ttl_secs: u64,

    /// Session cleanup interval (seconds)
    #[serde(default = "default_cleanup_interval")]
    pub cleanup_interval_secs: u64,
}

impl ServerConfig {
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_secs(self.handshake_timeout_secs)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            handshake_timeout_secs: default_handshake_timeout(),
            session_ttl_secs: 0,
            cleanup_interval_secs: default_cleanup_interval(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Base URL of the catalog web API
    #[serde(default = "default_catalog_api_base")]
    pub api_base: String,

    /// Tracks requested per library page
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Per-request timeout (seconds)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            api_base: default_catalog_api_base(),
            page_size: default_page_size(),
            timeout_secs: default_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LyricsConfig {
    /// Bound on every lyric source network step (seconds)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Genius site root
    #[serde(default = "default_genius_base")]
    pub genius_base: String,

    /// AZLyrics search root
    #[serde(default = "default_azlyrics_search_base")]
    pub azlyrics_search_base: String,

    /// User-Agent sent to lyric sites
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl LyricsConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for LyricsConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout(),
            genius_base: default_genius_base(),
            azlyrics_search_base: default_azlyrics_search_base(),
            user_agent: default_user_agent(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Document store backend
    #[serde(default)]
    pub backend: StoreBackend,

    /// Elasticsearch base URL
    #[serde(default = "default_elastic_url")]
    pub elastic_url: String,

    /// Index holding track documents
    #[serde(default = "default_index")]
    pub index: String,

    /// Directory for the embedded tantivy index
    #[serde(default = "default_store_path")]
    pub path: PathBuf,

    /// Tantivy writer heap size in bytes
    #[serde(default = "default_writer_heap_size")]
    pub writer_heap_size: usize,

    /// Per-call timeout (seconds)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl StoreConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            elastic_url: default_elastic_url(),
            index: default_index(),
            path: default_store_path(),
            writer_heap_size: default_writer_heap_size(),
            timeout_secs: default_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    #[default]
    Elasticsearch,
    Tantivy,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexingConfig {
    /// Interval between progress pushes (milliseconds)
    #[serde(default = "default_progress_interval")]
    pub progress_interval_ms: u64,

    /// Bound on a single progress frame write (milliseconds)
    #[serde(default = "default_send_timeout")]
    pub send_timeout_ms: u64,
}

impl IndexingConfig {
    pub fn progress_interval(&self) -> Duration {
        Duration::from_millis(self.progress_interval_ms)
    }

    pub fn send_timeout(&self) -> Duration {
        Duration::from_millis(self.send_timeout_ms)
    }
}

impl Default for IndexingConfig {
    fn default() -> Self {
        Self {
            progress_interval_ms: default_progress_interval(),
            send_timeout_ms: default_send_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Search timeout (seconds)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Largest page a client may request
    #[serde(default = "default_max_limit")]
    pub max_limit: usize,
}

impl SearchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout(),
            max_limit: default_max_limit(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default)]
    pub json_logs: bool,

    /// Enable Prometheus metrics
    #[serde(default = "default_true")]
    pub prometheus_enabled: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logs: false,
            prometheus_enabled: true,
        }
    }
}

// Default value functions
fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3001
}

fn default_handshake_timeout() -> u64 {
    30
}

fn default_cleanup_interval() -> u64 {
    60
}

fn default_catalog_api_base() -> String {
    "https://api.spotify.com/v1".to_string()
}

fn default_page_size() -> u32 {
    50
}

fn default_timeout() -> u64 {
    5
}

fn default_genius_base() -> String {
    "https://genius.com".to_string()
}

fn default_azlyrics_search_base() -> String {
    "https://search.azlyrics.com".to_string()
}

fn default_user_agent() -> String {
    concat!("versefind/", env!("CARGO_PKG_VERSION")).to_string()
}

fn default_elastic_url() -> String {
    "http://127.0.0.1:9200".to_string()
}

fn default_index() -> String {
    "tracks".to_string()
}

fn default_store_path() -> PathBuf {
    PathBuf::from("./data/tracks")
}

fn default_writer_heap_size() -> usize {
    50_000_000
}

fn default_send_timeout() -> u64 {
    5000
}

fn default_progress_interval() -> u64 {
    250
}

fn default_max_limit() -> usize {
    100
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}
