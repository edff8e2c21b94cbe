use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Category classification of broadcasts that are kept by ingestion
pub const GAME_CATEGORY: &str = "GAME";

/// Represents one channel's current broadcast as reported by the listings API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveStreamRecord {
    pub live_id: u64,
    pub live_title: String,
    #[serde(default)]
    pub live_thumbnail_image_url: Option<String>,
    pub concurrent_user_count: u64,
    pub open_date: String,
    #[serde(default)]
    pub adult: bool,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Enum-like classification such as "GAME", "SPORTS" or "ETC"
    #[serde(default)]
    pub category_type: Option<String>,
    #[serde(default)]
    pub live_category: Option<String>,
    #[serde(default)]
    pub live_category_value: Option<String>,
    pub channel_id: String,
    pub channel_name: String,
    #[serde(default)]
    pub channel_image_url: Option<String>,
    /// Stamped when the record is written to the store
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl LiveStreamRecord {
    pub fn is_game(&self) -> bool {
        self.category_type.as_deref() == Some(GAME_CATEGORY)
    }
}

/// Compact shape of a video search hit served as a recommendation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendedVideo {
    pub video_id: String,
    pub channel_id: String,
    pub channel_title: String,
    #[serde(default)]
    pub video_image_url: Option<String>,
    pub video_title: String,
}
