use chrono::{DateTime, Utc};
use domain::RecommendedVideo;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// How long a cached keyword result may be served
pub const CACHE_TTL: Duration = Duration::from_secs(6 * 60 * 60);

/// Storage key of a keyword's cached results
pub fn cache_key(keyword: &str) -> String {
    format!("youtube_{keyword}")
}

/// JSON shape kept in session storage for each keyword
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub data: Vec<RecommendedVideo>,
    /// Capture time in milliseconds since the Unix epoch
    pub timestamp: i64,
}

impl CacheEntry {
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now.timestamp_millis() - self.timestamp <= CACHE_TTL.as_millis() as i64
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    // The guarded maps stay consistent even if a holder panicked mid-call.
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Ephemeral string key/value area scoped to one session
#[derive(Debug, Default)]
pub struct SessionStorage {
    items: Mutex<HashMap<String, String>>,
}

impl SessionStorage {
    pub fn get_item(&self, key: &str) -> Option<String> {
        lock(&self.items).get(key).cloned()
    }

    pub fn set_item(&self, key: impl Into<String>, value: impl Into<String>) {
        lock(&self.items).insert(key.into(), value.into());
    }

    pub fn remove_item(&self, key: &str) -> Option<String> {
        lock(&self.items).remove(key)
    }

    pub fn len(&self) -> usize {
        lock(&self.items).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Per-session state for recommendation lookups: the result cache and the
/// set of keywords with a request outstanding
#[derive(Debug, Default)]
pub struct SessionContext {
    storage: SessionStorage,
    in_flight: Mutex<HashSet<String>>,
}

impl SessionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn storage(&self) -> &SessionStorage {
        &self.storage
    }

    /// Cached results for `keyword` if captured within [`CACHE_TTL`] of `now`
    pub fn cached(&self, keyword: &str, now: DateTime<Utc>) -> Option<Vec<RecommendedVideo>> {
        let raw = self.storage.get_item(&cache_key(keyword))?;
        match serde_json::from_str::<CacheEntry>(&raw) {
            Ok(entry) if entry.is_fresh(now) => Some(entry.data),
            Ok(_) => None,
            Err(e) => {
                tracing::debug!(keyword, error = %e, "Ignoring unreadable cache entry");
                None
            }
        }
    }

    pub fn store(&self, keyword: &str, videos: &[RecommendedVideo], now: DateTime<Utc>) {
        let entry = CacheEntry {
            data: videos.to_vec(),
            timestamp: now.timestamp_millis(),
        };
        match serde_json::to_string(&entry) {
            Ok(raw) => self.storage.set_item(cache_key(keyword), raw),
            Err(e) => tracing::warn!(keyword, error = %e, "Failed to cache search results"),
        }
    }

    pub fn is_in_flight(&self, keyword: &str) -> bool {
        lock(&self.in_flight).contains(keyword)
    }

    /// Mark `keyword` outstanding; `None` when it already is.
    /// The mark is cleared when the returned guard drops.
    pub(crate) fn begin(&self, keyword: &str) -> Option<InFlight<'_>> {
        lock(&self.in_flight)
            .insert(keyword.to_string())
            .then(|| InFlight {
                context: self,
                keyword: keyword.to_string(),
            })
    }
}

pub(crate) struct InFlight<'a> {
    context: &'a SessionContext,
    keyword: String,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        lock(&self.context.in_flight).remove(&self.keyword);
    }
}
