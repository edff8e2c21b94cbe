//! Cursor-based, descending reads over a collection.
//!
//! [`fetch_page`] is the stateless form: the caller threads the cursor returned
//! with each page into the next call. [`Paginator`] keeps that cursor for a
//! single reader and publishes a "has more" signal.

use crate::{PageCursor, PageQuery, Repository, StoreError, StoredDocument};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tokio::sync::watch;

/// One page of decoded documents
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Position of the last item; `None` when the page came back empty
    pub next_cursor: Option<PageCursor>,
    /// True iff the store returned a full page, counting documents skipped as undecodable
    pub has_more: bool,
}

/// Read up to `limit` documents ordered by `order_by` descending, after `start_after`
pub async fn fetch_page<T: DeserializeOwned>(
    repo: &dyn Repository,
    collection: &str,
    order_by: &str,
    limit: usize,
    start_after: Option<PageCursor>,
) -> Result<Page<T>, StoreError> {
    let query = PageQuery {
        order_by: order_by.to_string(),
        limit,
        start_after,
    };
    let documents = repo.query(collection, &query).await?;

    let next_cursor = documents
        .last()
        .and_then(|doc| PageCursor::after(doc, order_by));
    let has_more = documents.len() == limit;
    let items = documents
        .into_iter()
        .filter_map(|doc| match decode(doc) {
            Ok(item) => Some(item),
            Err(e) => {
                tracing::warn!(collection, error = %e, "Skipping undecodable document");
                None
            }
        })
        .collect();

    Ok(Page {
        items,
        next_cursor,
        has_more,
    })
}

fn decode<T: DeserializeOwned>(doc: StoredDocument) -> Result<T, StoreError> {
    serde_json::from_value(serde_json::Value::Object(doc.data))
        .map_err(|source| StoreError::Decode { id: doc.id, source })
}

/// Stateful reader implementing "initial page" and "load more" over one collection
pub struct Paginator {
    repo: Arc<dyn Repository>,
    order_by: String,
    limit: usize,
    cursor: Option<PageCursor>,
    has_more: watch::Sender<bool>,
}

impl Paginator {
    pub fn new(repo: Arc<dyn Repository>, order_by: impl Into<String>, limit: usize) -> Self {
        let (has_more, _) = watch::channel(true);
        Self {
            repo,
            order_by: order_by.into(),
            limit,
            cursor: None,
            has_more,
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Cursor the next `more_items` call resumes from
    pub fn cursor(&self) -> Option<&PageCursor> {
        self.cursor.as_ref()
    }

    /// Subscribe to the "has more" signal; starts out `true`
    pub fn has_more(&self) -> watch::Receiver<bool> {
        self.has_more.subscribe()
    }

    /// Restart the scan from the top of the collection
    pub async fn initial_items<T: DeserializeOwned>(
        &mut self,
        collection: &str,
    ) -> Result<Vec<T>, StoreError> {
        self.cursor = None;
        self.load(collection).await
    }

    /// Continue the scan; returns an empty page without touching the store when no cursor is held
    pub async fn more_items<T: DeserializeOwned>(
        &mut self,
        collection: &str,
    ) -> Result<Vec<T>, StoreError> {
        if self.cursor.is_none() {
            tracing::debug!(collection, "No cursor held, nothing more to load");
            return Ok(Vec::new());
        }
        self.load(collection).await
    }

    async fn load<T: DeserializeOwned>(&mut self, collection: &str) -> Result<Vec<T>, StoreError> {
        let page = fetch_page(
            self.repo.as_ref(),
            collection,
            &self.order_by,
            self.limit,
            self.cursor.clone(),
        )
        .await?;

        self.cursor = page.next_cursor;
        self.has_more.send_replace(page.has_more);
        Ok(page.items)
    }
}
