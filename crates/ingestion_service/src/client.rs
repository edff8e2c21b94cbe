use crate::IngestionError;
use domain::LiveStreamRecord;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

/// Default listings endpoint of the streaming platform
pub const DEFAULT_LIVES_API_URL: &str = "https://openapi.chzzk.naver.com/open/v1/lives";

/// Connection settings for the listings API
#[derive(Debug, Clone)]
pub struct LivesClientConfig {
    pub base_url: String,
    pub client_id: String,
    pub client_secret: String,
    pub timeout: Duration,
}

impl Default for LivesClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_LIVES_API_URL.to_string(),
            client_id: String::new(),
            client_secret: String::new(),
            timeout: Duration::from_secs(5),
        }
    }
}

/// Result of fetching one listings page
#[derive(Debug, Clone, PartialEq)]
pub enum LivesPage {
    /// The envelope lacked `content.data`; carries the raw body for logging
    Malformed(Value),
    Listing {
        records: Vec<LiveStreamRecord>,
        /// Entries in `content.data` before undecodable ones were dropped
        raw_count: usize,
        /// Token for the following page; `None` when the platform sent none or an empty one
        next: Option<String>,
    },
}

#[derive(Debug, Serialize)]
struct ListParams<'a> {
    size: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    next: Option<&'a str>,
}

/// HTTP client for the paginated live listings endpoint
pub struct LivesClient {
    http: reqwest::Client,
    config: LivesClientConfig,
}

impl LivesClient {
    pub fn new(config: LivesClientConfig) -> Result<Self, IngestionError> {
        let http = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self { http, config })
    }

    /// Fetch one page of up to `size` live broadcasts starting at `next`
    pub async fn fetch_page(
        &self,
        size: usize,
        next: Option<&str>,
    ) -> Result<LivesPage, IngestionError> {
        let body: Value = self
            .http
            .get(&self.config.base_url)
            .query(&ListParams { size, next })
            .header("Client-Id", &self.config.client_id)
            .header("Client-Secret", &self.config.client_secret)
            .header(reqwest::header::ACCEPT, "*/*")
            .header(reqwest::header::CACHE_CONTROL, "no-cache")
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(parse_envelope(body))
    }
}

/// Split a `{ content: { data, page: { next } } }` envelope into records and the next token
pub fn parse_envelope(body: Value) -> LivesPage {
    let Some(content) = body.get("content") else {
        return LivesPage::Malformed(body);
    };
    let Some(data) = content.get("data").and_then(Value::as_array) else {
        return LivesPage::Malformed(body);
    };

    let records = data
        .iter()
        .filter_map(|raw| match serde_json::from_value::<LiveStreamRecord>(raw.clone()) {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::warn!(error = %e, "Skipping undecodable live record");
                None
            }
        })
        .collect();

    let next = content
        .get("page")
        .and_then(|page| page.get("next"))
        .and_then(Value::as_str)
        .filter(|token| !token.is_empty())
        .map(str::to_string);

    LivesPage::Listing {
        records,
        raw_count: data.len(),
        next,
    }
}
