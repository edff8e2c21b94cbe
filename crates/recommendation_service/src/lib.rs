//! Video recommendations for a list of keywords.
//!
//! Keywords are looked up one after another. Each lookup is served from the
//! session cache when a result younger than six hours exists, is skipped when
//! the same keyword is already being fetched in that session, and otherwise
//! goes to the search API. A failed search contributes nothing to the result.

mod search;
mod session;

pub use search::{
    DEFAULT_YOUTUBE_API_URL, RESULTS_PER_KEYWORD, VideoSearchClient, VideoSearchConfig,
};
pub use session::{CACHE_TTL, CacheEntry, SessionContext, SessionStorage, cache_key};

use chrono::Utc;
use domain::RecommendedVideo;

/// Errors from the search API; logged and never returned to callers of
/// [`RecommendationClient::recommend`]
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
}

pub struct RecommendationClient {
    search: VideoSearchClient,
}

impl RecommendationClient {
    pub fn new(search: VideoSearchClient) -> Self {
        Self { search }
    }

    /// Look up every keyword in order and concatenate their results
    pub async fn recommend(
        &self,
        ctx: &SessionContext,
        keywords: &[String],
    ) -> Vec<RecommendedVideo> {
        let mut videos = Vec::new();
        for keyword in keywords {
            videos.extend(self.lookup(ctx, keyword).await);
        }
        videos
    }

    /// Results for one keyword; empty on failure or when a lookup for it is already running
    pub async fn lookup(&self, ctx: &SessionContext, keyword: &str) -> Vec<RecommendedVideo> {
        if let Some(videos) = ctx.cached(keyword, Utc::now()) {
            tracing::debug!(keyword, "Serving recommendations from session cache");
            return videos;
        }

        let Some(_in_flight) = ctx.begin(keyword) else {
            tracing::debug!(keyword, "Search already in flight, skipping duplicate");
            return Vec::new();
        };

        match self.search.search_videos(keyword).await {
            Ok(videos) => {
                tracing::debug!(keyword, count = videos.len(), "Fetched recommendations");
                ctx.store(keyword, &videos, Utc::now());
                videos
            }
            Err(e) => {
                tracing::error!(keyword, error = %e, "Video search failed");
                Vec::new()
            }
        }
    }
}
