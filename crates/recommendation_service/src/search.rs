use crate::SearchError;
use domain::RecommendedVideo;
use serde::{Deserialize, Serialize};

/// Default base URL of the video search API
pub const DEFAULT_YOUTUBE_API_URL: &str = "https://www.googleapis.com/youtube/v3";

/// Results requested per keyword
pub const RESULTS_PER_KEYWORD: u32 = 3;

#[derive(Debug, Clone)]
pub struct VideoSearchConfig {
    pub base_url: String,
    pub api_key: String,
}

impl Default for VideoSearchConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_YOUTUBE_API_URL.to_string(),
            api_key: String::new(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SearchParams<'a> {
    part: &'a str,
    q: &'a str,
    #[serde(rename = "type")]
    kind: &'a str,
    max_results: u32,
    key: &'a str,
}

#[derive(Debug, Deserialize)]
struct SearchListResponse {
    items: Vec<SearchResult>,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    id: ResourceId,
    snippet: SearchSnippet,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResourceId {
    video_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchSnippet {
    channel_id: String,
    channel_title: String,
    title: String,
    #[serde(default)]
    thumbnails: Option<Thumbnails>,
}

#[derive(Debug, Deserialize)]
struct Thumbnails {
    #[serde(default)]
    default: Option<Thumbnail>,
}

#[derive(Debug, Deserialize)]
struct Thumbnail {
    url: String,
}

impl From<SearchResult> for RecommendedVideo {
    fn from(result: SearchResult) -> Self {
        Self {
            video_id: result.id.video_id,
            channel_id: result.snippet.channel_id,
            channel_title: result.snippet.channel_title,
            video_image_url: result
                .snippet
                .thumbnails
                .and_then(|t| t.default)
                .map(|t| t.url),
            video_title: result.snippet.title,
        }
    }
}

/// HTTP client for the video search endpoint
pub struct VideoSearchClient {
    http: reqwest::Client,
    config: VideoSearchConfig,
}

impl VideoSearchClient {
    pub fn new(config: VideoSearchConfig) -> Result<Self, SearchError> {
        let http = reqwest::Client::builder().build()?;
        Ok(Self { http, config })
    }

    /// Search videos matching `keyword`, returning at most three hits
    pub async fn search_videos(&self, keyword: &str) -> Result<Vec<RecommendedVideo>, SearchError> {
        let url = format!("{}/search", self.config.base_url.trim_end_matches('/'));
        let response: SearchListResponse = self
            .http
            .get(url)
            .query(&SearchParams {
                part: "snippet",
                q: keyword,
                kind: "video",
                max_results: RESULTS_PER_KEYWORD,
                key: &self.config.api_key,
            })
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(response
            .items
            .into_iter()
            .take(RESULTS_PER_KEYWORD as usize)
            .map(RecommendedVideo::from)
            .collect())
    }
}
