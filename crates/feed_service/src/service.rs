use crate::FeedError;
use crate::keywords::derive_keywords;
use datastore::{Page, PageCursor, Paginator, Repository, fetch_page};
use domain::{LiveStreamRecord, RecommendedVideo};
use recommendation_service::{RecommendationClient, SessionContext};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockWriteGuard};
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Field the feed is ordered by, highest first
pub const ORDER_FIELD: &str = "concurrentUserCount";

#[derive(Debug, Clone)]
pub struct FeedSettings {
    pub collection: String,
    pub page_size: usize,
    /// Sessions untouched for this long are dropped from the registry
    pub idle_timeout: Duration,
}

impl Default for FeedSettings {
    fn default() -> Self {
        Self {
            collection: "streamers".to_string(),
            page_size: 50,
            idle_timeout: Duration::from_secs(30 * 60),
        }
    }
}

/// What a "load more" request did
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LoadMore {
    /// A previous request on this session was still running; nothing happened
    Busy,
    #[serde(rename_all = "camelCase")]
    Appended {
        items: Vec<LiveStreamRecord>,
        has_more: bool,
    },
}

/// Everything a client needs to render the feed
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedSnapshot {
    pub session_id: Uuid,
    pub items: Vec<LiveStreamRecord>,
    pub has_more: bool,
    pub recommendations: Vec<RecommendedVideo>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// One reader's feed: displayed items, cursor, and recommendation context
pub struct FeedSession {
    id: Uuid,
    collection: String,
    paginator: tokio::sync::Mutex<Paginator>,
    has_more: watch::Receiver<bool>,
    items: Mutex<Vec<LiveStreamRecord>>,
    recommendations: Mutex<Vec<RecommendedVideo>>,
    loading: AtomicBool,
    last_access: Mutex<Instant>,
    context: SessionContext,
}

/// Clears the busy flag however `load_more` exits
struct Loading<'a>(&'a AtomicBool);

impl Drop for Loading<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl FeedSession {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn context(&self) -> &SessionContext {
        &self.context
    }

    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::Acquire)
    }

    fn touch(&self, now: Instant) {
        *lock(&self.last_access) = now;
    }

    /// Idle sessions with a load still running are kept until it finishes
    fn is_idle(&self, now: Instant, timeout: Duration) -> bool {
        !self.is_loading() && now.duration_since(*lock(&self.last_access)) >= timeout
    }

    pub fn snapshot(&self) -> FeedSnapshot {
        FeedSnapshot {
            session_id: self.id,
            items: lock(&self.items).clone(),
            has_more: *self.has_more.borrow(),
            recommendations: lock(&self.recommendations).clone(),
        }
    }

    /// Append the next page to the displayed items; a no-op while another call is running
    pub async fn load_more(&self) -> Result<LoadMore, FeedError> {
        if self
            .loading
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::debug!(session_id = %self.id, "Load more already in progress");
            return Ok(LoadMore::Busy);
        }
        let _loading = Loading(&self.loading);

        let page: Vec<LiveStreamRecord> = self
            .paginator
            .lock()
            .await
            .more_items(&self.collection)
            .await?;

        if page.is_empty() {
            tracing::debug!(session_id = %self.id, "No more items to load");
        } else {
            lock(&self.items).extend(page.iter().cloned());
        }

        Ok(LoadMore::Appended {
            items: page,
            has_more: *self.has_more.borrow(),
        })
    }
}

/// Opens feed sessions and serves stateless pages over the streamer collection
pub struct FeedService {
    repo: Arc<dyn Repository>,
    recommender: Arc<RecommendationClient>,
    settings: FeedSettings,
    sessions: RwLock<HashMap<Uuid, Arc<FeedSession>>>,
}

impl FeedService {
    pub fn new(
        repo: Arc<dyn Repository>,
        recommender: Arc<RecommendationClient>,
        settings: FeedSettings,
    ) -> Self {
        Self {
            repo,
            recommender,
            settings,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    pub fn settings(&self) -> &FeedSettings {
        &self.settings
    }

    /// Load the first page, fetch recommendations for it, and register the session
    pub async fn open_session(&self) -> Result<Arc<FeedSession>, FeedError> {
        let mut paginator = Paginator::new(self.repo.clone(), ORDER_FIELD, self.settings.page_size);
        let has_more = paginator.has_more();
        let items: Vec<LiveStreamRecord> = paginator.initial_items(&self.settings.collection).await?;

        let context = SessionContext::new();
        let keywords = derive_keywords(&items);
        let recommendations = self.recommender.recommend(&context, &keywords).await;

        let session = Arc::new(FeedSession {
            id: Uuid::new_v4(),
            collection: self.settings.collection.clone(),
            paginator: tokio::sync::Mutex::new(paginator),
            has_more,
            items: Mutex::new(items),
            recommendations: Mutex::new(recommendations),
            loading: AtomicBool::new(false),
            last_access: Mutex::new(Instant::now()),
            context,
        });

        tracing::info!(
            session_id = %session.id,
            keywords = keywords.len(),
            "Opened feed session"
        );

        let mut sessions = self.registry()?;
        evict(&mut sessions, Instant::now(), self.settings.idle_timeout);
        sessions.insert(session.id, session.clone());
        Ok(session)
    }

    /// Look up a live session and mark it as used; idle ones count as gone
    pub fn session(&self, id: Uuid) -> Result<Arc<FeedSession>, FeedError> {
        let now = Instant::now();
        let mut sessions = self.registry()?;
        let session = sessions
            .get(&id)
            .cloned()
            .ok_or(FeedError::SessionNotFound(id))?;

        if session.is_idle(now, self.settings.idle_timeout) {
            sessions.remove(&id);
            tracing::info!(session_id = %id, "Feed session expired");
            return Err(FeedError::SessionNotFound(id));
        }
        session.touch(now);
        Ok(session)
    }

    /// Drop every idle session, returning how many were removed
    pub fn evict_idle(&self) -> Result<usize, FeedError> {
        Ok(evict(
            &mut *self.registry()?,
            Instant::now(),
            self.settings.idle_timeout,
        ))
    }

    pub fn session_count(&self) -> Result<usize, FeedError> {
        Ok(self.registry()?.len())
    }

    fn registry(&self) -> Result<RwLockWriteGuard<'_, HashMap<Uuid, Arc<FeedSession>>>, FeedError> {
        self.sessions
            .write()
            .map_err(|_| FeedError::Internal("session registry lock poisoned".to_string()))
    }

    /// Forget a session. Requests already running on it finish but are no longer reachable.
    pub fn close_session(&self, id: Uuid) -> Result<(), FeedError> {
        self.registry()?
            .remove(&id)
            .map(|_| tracing::info!(session_id = %id, "Closed feed session"))
            .ok_or(FeedError::SessionNotFound(id))
    }

    /// One page of the feed starting after `cursor`, with no server-side state
    pub async fn page(
        &self,
        limit: usize,
        cursor: Option<PageCursor>,
    ) -> Result<Page<LiveStreamRecord>, FeedError> {
        Ok(fetch_page(
            self.repo.as_ref(),
            &self.settings.collection,
            ORDER_FIELD,
            limit,
            cursor,
        )
        .await?)
    }
}

/// Periodically drop idle sessions until `cancel` fires
pub async fn sweep_idle_sessions(feed: Arc<FeedService>, period: Duration, cancel: CancellationToken) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = interval.tick() => {
                if let Err(e) = feed.evict_idle() {
                    tracing::error!(error = %e, "Feed session sweep failed");
                }
            }
        }
    }
}

fn evict(sessions: &mut HashMap<Uuid, Arc<FeedSession>>, now: Instant, timeout: Duration) -> usize {
    let before = sessions.len();
    sessions.retain(|_, session| !session.is_idle(now, timeout));
    let evicted = before - sessions.len();
    if evicted > 0 {
        tracing::info!(evicted, remaining = sessions.len(), "Evicted idle feed sessions");
    }
    evicted
}
