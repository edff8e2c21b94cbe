mod keywords;
mod service;

pub use keywords::{KEYWORD_SOURCES, derive_keywords};
pub use service::{
    FeedService, FeedSession, FeedSettings, FeedSnapshot, LoadMore, ORDER_FIELD,
    sweep_idle_sessions,
};

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use datastore::{PageCursor, StoreError};
use domain::LiveStreamRecord;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

/// Largest page the stateless endpoint serves
pub const MAX_PAGE_LIMIT: usize = 100;

/// Feed-level error type; renders as a JSON `{ error, code }` body
#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("feed session {0} not found")]
    SessionNotFound(Uuid),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for FeedError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            FeedError::Store(StoreError::InvalidCursor(msg)) => (
                StatusCode::BAD_REQUEST,
                "INVALID_CURSOR",
                format!("invalid cursor: {msg}"),
            ),
            FeedError::SessionNotFound(_) => {
                (StatusCode::NOT_FOUND, "NOT_FOUND", self.to_string())
            }
            FeedError::Store(_) | FeedError::Internal(_) => {
                tracing::error!(error = %self, "Feed request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal error occurred".to_string(),
                )
            }
        };

        (status, Json(json!({ "error": message, "code": code }))).into_response()
    }
}

#[derive(Debug, Deserialize)]
pub struct PageParams {
    pub limit: Option<usize>,
    pub cursor: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageResponse {
    pub items: Vec<LiveStreamRecord>,
    pub has_more: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
}

/// Handler for opening a feed session
async fn open_session(State(feed): State<Arc<FeedService>>) -> Result<Response, FeedError> {
    let session = feed.open_session().await?;
    Ok((StatusCode::CREATED, Json(session.snapshot())).into_response())
}

async fn get_session(
    State(feed): State<Arc<FeedService>>,
    Path(id): Path<Uuid>,
) -> Result<Json<FeedSnapshot>, FeedError> {
    Ok(Json(feed.session(id)?.snapshot()))
}

async fn load_more(
    State(feed): State<Arc<FeedService>>,
    Path(id): Path<Uuid>,
) -> Result<Json<LoadMore>, FeedError> {
    let session = feed.session(id)?;
    Ok(Json(session.load_more().await?))
}

async fn close_session(
    State(feed): State<Arc<FeedService>>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, FeedError> {
    feed.close_session(id)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Handler for cursor-threaded reads without a session
async fn list_streamers(
    State(feed): State<Arc<FeedService>>,
    Query(params): Query<PageParams>,
) -> Result<Json<PageResponse>, FeedError> {
    let limit = params
        .limit
        .unwrap_or(feed.settings().page_size)
        .clamp(1, MAX_PAGE_LIMIT);
    let cursor = params
        .cursor
        .as_deref()
        .filter(|token| !token.is_empty())
        .map(PageCursor::decode)
        .transpose()?;

    let page = feed.page(limit, cursor).await?;
    let next_cursor = page
        .next_cursor
        .as_ref()
        .filter(|_| page.has_more)
        .map(PageCursor::encode)
        .transpose()?;

    Ok(Json(PageResponse {
        items: page.items,
        has_more: page.has_more,
        next_cursor,
    }))
}

/// Create the router for the feed API
pub fn create_router(feed: Arc<FeedService>) -> Router {
    Router::new()
        .route("/feed/sessions", post(open_session))
        .route("/feed/sessions/{id}", get(get_session).delete(close_session))
        .route("/feed/sessions/{id}/more", post(load_more))
        .route("/streamers", get(list_streamers))
        .with_state(feed)
}
