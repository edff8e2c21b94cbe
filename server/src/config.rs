use datastore::StoreError;
use ingestion_service::{DEFAULT_LIVES_API_URL, IngestionSettings, LivesClientConfig};
use recommendation_service::{DEFAULT_YOUTUBE_API_URL, VideoSearchConfig};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{name} must be a valid {expected}, got '{value}'")]
    Invalid {
        name: &'static str,
        expected: &'static str,
        value: String,
    },

    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    #[error("failed to open store: {0}")]
    Store(#[from] StoreError),
}

/// Server configuration loaded from environment variables.
///
/// Every field has a default suitable for local development; the upstream
/// credentials are empty unless provided.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub lives: LivesClientConfig,
    pub ingestion: IngestionSettings,
    pub ingest_interval: Duration,
    pub ingest_on_startup: bool,
    /// JSON file backing the store; in-memory when unset
    pub store_path: Option<PathBuf>,
    pub feed_page_size: usize,
    /// Feed sessions untouched for this long are dropped
    pub feed_session_idle: Duration,
    pub search: VideoSearchConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                     | Default                                 |
    /// |-----------------------------|-----------------------------------------|
    /// | `HOST`                      | `0.0.0.0`                               |
    /// | `PORT`                      | `8080`                                  |
    /// | `LIVES_API_URL`             | platform listings endpoint              |
    /// | `LIVES_CLIENT_ID`           | empty                                   |
    /// | `LIVES_CLIENT_SECRET`       | empty                                   |
    /// | `LIVES_PAGE_SIZE`           | `20`                                    |
    /// | `LIVES_MAX_PAGES`           | `100`                                   |
    /// | `LIVES_TIMEOUT_SECS`        | `5`                                     |
    /// | `INGEST_INTERVAL_MINUTES`   | `120`                                   |
    /// | `INGEST_ON_STARTUP`         | `false`                                 |
    /// | `STREAMERS_COLLECTION`      | `streamers`                             |
    /// | `STORE_PATH`                | unset                                   |
    /// | `FEED_PAGE_SIZE`            | `50`                                    |
    /// | `FEED_SESSION_IDLE_MINUTES` | `30`                                    |
    /// | `YOUTUBE_API_URL`           | `https://www.googleapis.com/youtube/v3` |
    /// | `YOUTUBE_API_KEY`           | empty                                   |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build the configuration from an arbitrary variable source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let text = |name: &str, default: &str| lookup(name).unwrap_or_else(|| default.to_string());

        let port = parse(&lookup, "PORT", "u16", 8080u16)?;
        let page_size = positive(&lookup, "LIVES_PAGE_SIZE", 20usize)?;
        let max_pages = positive(&lookup, "LIVES_MAX_PAGES", 100usize)?;
        let timeout_secs = positive(&lookup, "LIVES_TIMEOUT_SECS", 5u64)?;
        let interval_minutes = positive(&lookup, "INGEST_INTERVAL_MINUTES", 120u64)?;
        let ingest_on_startup = parse(&lookup, "INGEST_ON_STARTUP", "bool", false)?;
        let feed_page_size = positive(&lookup, "FEED_PAGE_SIZE", 50usize)?;
        let idle_minutes = positive(&lookup, "FEED_SESSION_IDLE_MINUTES", 30u64)?;
        let idle_secs = minutes_to_secs("FEED_SESSION_IDLE_MINUTES", idle_minutes)?;
        let interval_secs = minutes_to_secs("INGEST_INTERVAL_MINUTES", interval_minutes)?;

        Ok(Self {
            host: text("HOST", "0.0.0.0"),
            port,
            lives: LivesClientConfig {
                base_url: text("LIVES_API_URL", DEFAULT_LIVES_API_URL),
                client_id: text("LIVES_CLIENT_ID", ""),
                client_secret: text("LIVES_CLIENT_SECRET", ""),
                timeout: Duration::from_secs(timeout_secs),
            },
            ingestion: IngestionSettings {
                collection: text("STREAMERS_COLLECTION", "streamers"),
                page_size,
                max_pages,
            },
            ingest_interval: Duration::from_secs(interval_secs),
            ingest_on_startup,
            store_path: lookup("STORE_PATH")
                .filter(|p| !p.trim().is_empty())
                .map(PathBuf::from),
            feed_page_size,
            feed_session_idle: Duration::from_secs(idle_secs),
            search: VideoSearchConfig {
                base_url: text("YOUTUBE_API_URL", DEFAULT_YOUTUBE_API_URL),
                api_key: text("YOUTUBE_API_KEY", ""),
            },
        })
    }
}

fn parse<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    expected: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(name) {
        None => Ok(default),
        Some(value) => value.trim().parse().map_err(|_| ConfigError::Invalid {
            name,
            expected,
            value,
        }),
    }
}

fn minutes_to_secs(name: &'static str, minutes: u64) -> Result<u64, ConfigError> {
    minutes.checked_mul(60).ok_or_else(|| ConfigError::Invalid {
        name,
        expected: "number of minutes",
        value: minutes.to_string(),
    })
}

fn positive<T: FromStr + Default + PartialEq>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    let value = parse(lookup, name, "positive integer", default)?;
    if value == T::default() {
        return Err(ConfigError::Zero(name));
    }
    Ok(value)
}
