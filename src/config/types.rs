use crate::NodeId;
use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for Steamer
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub api: ApiConfig,
    /// Outbound HTTP proxy; absent means direct connections
    #[serde(default)]
    pub proxy: Option<ProxyConfig>,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Node the crawl starts from
    #[serde(rename = "seed-id")]
    pub seed_id: NodeId,

    /// Number of concurrent workers
    #[serde(rename = "max-workers", default = "default_max_workers")]
    pub max_workers: u32,

    /// Seconds after which a held lease is considered abandoned
    #[serde(rename = "lease-timeout-secs", default = "default_lease_timeout_secs")]
    pub lease_timeout_secs: u64,

    /// Total run time; absent or 0 runs until interrupted
    #[serde(rename = "run-duration-minutes", default)]
    pub run_duration_minutes: Option<u64>,

    /// Pause between claim attempts when no work is available (milliseconds)
    #[serde(rename = "idle-backoff-ms", default = "default_idle_backoff_ms")]
    pub idle_backoff_ms: u64,
}

impl CrawlerConfig {
    pub fn lease_timeout(&self) -> Duration {
        Duration::from_secs(self.lease_timeout_secs)
    }

    pub fn run_duration(&self) -> Option<Duration> {
        self.run_duration_minutes
            .filter(|minutes| *minutes > 0)
            .map(|minutes| Duration::from_secs(minutes * 60))
    }

    pub fn idle_backoff(&self) -> Duration {
        Duration::from_millis(self.idle_backoff_ms)
    }
}

/// Remote graph API configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// API key; falls back to the `STEAM_API_KEY` environment variable
    #[serde(default)]
    pub key: Option<String>,

    #[serde(rename = "base-url", default = "default_base_url")]
    pub base_url: String,

    #[serde(rename = "request-timeout-secs", default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    #[serde(rename = "connect-timeout-secs", default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    #[serde(rename = "accept-invalid-certs", default)]
    pub accept_invalid_certs: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            key: None,
            base_url: default_base_url(),
            request_timeout_secs: default_request_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            accept_invalid_certs: false,
        }
    }
}

/// HTTP proxy configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ProxyConfig {
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

impl ProxyConfig {
    /// The proxy URL without credentials
    pub fn url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path", default = "default_database_path")]
    pub database_path: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
        }
    }
}

fn default_max_workers() -> u32 {
    5
}

fn default_lease_timeout_secs() -> u64 {
    300
}

fn default_idle_backoff_ms() -> u64 {
    1000
}

fn default_base_url() -> String {
    "http://api.steampowered.com".to_string()
}

fn default_request_timeout_secs() -> u64 {
    60
}

fn default_connect_timeout_secs() -> u64 {
    30
}

fn default_database_path() -> String {
    "steamer.db".to_string()
}
