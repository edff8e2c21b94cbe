mod file;
mod memory;
mod pagination;

pub use file::JsonFileRepository;
pub use memory::InMemoryRepository;
pub use pagination::{Page, Paginator, fetch_page};

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::cmp::Ordering;

/// A stored document body: a JSON object of top-level fields
pub type Document = Map<String, Value>;

/// Errors raised by a document store
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store lock poisoned")]
    LockPoisoned,

    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("document '{id}' could not be decoded: {source}")]
    Decode {
        id: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid document: {0}")]
    InvalidDocument(String),

    #[error("invalid cursor: {0}")]
    InvalidCursor(String),
}

/// A document together with its key
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    pub id: String,
    pub data: Document,
}

impl StoredDocument {
    /// Numeric value of the ordering field, if the document carries one
    pub fn order_value(&self, field: &str) -> Option<f64> {
        self.data.get(field).and_then(Value::as_f64)
    }
}

/// Opaque position of the last document read in a descending scan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageCursor {
    #[serde(rename = "v")]
    order_value: f64,
    #[serde(rename = "id")]
    id: String,
}

impl PageCursor {
    /// Cursor pointing just past `document` in a scan ordered by `field`
    pub fn after(document: &StoredDocument, field: &str) -> Option<Self> {
        document.order_value(field).map(|order_value| Self {
            order_value,
            id: document.id.clone(),
        })
    }

    /// Encode as a URL-safe token suitable for query strings
    pub fn encode(&self) -> Result<String, StoreError> {
        let json = serde_json::to_vec(self)?;
        Ok(URL_SAFE_NO_PAD.encode(json))
    }

    /// Decode a token produced by [`PageCursor::encode`]
    pub fn decode(token: &str) -> Result<Self, StoreError> {
        let bytes = URL_SAFE_NO_PAD
            .decode(token)
            .map_err(|e| StoreError::InvalidCursor(e.to_string()))?;
        serde_json::from_slice(&bytes).map_err(|e| StoreError::InvalidCursor(e.to_string()))
    }

    /// Whether `document` sorts strictly after this cursor
    fn precedes(&self, document: &StoredDocument, field: &str) -> bool {
        match document.order_value(field) {
            Some(value) => descending(self.order_value, &self.id, value, &document.id).is_lt(),
            None => false,
        }
    }
}

/// Ordered read over one collection
#[derive(Debug, Clone, PartialEq)]
pub struct PageQuery {
    /// Numeric field the scan is ordered by, descending
    pub order_by: String,
    pub limit: usize,
    pub start_after: Option<PageCursor>,
}

/// Descending by value, then ascending by id so equal values have a stable order
fn descending(a_value: f64, a_id: &str, b_value: f64, b_id: &str) -> Ordering {
    b_value
        .total_cmp(&a_value)
        .then_with(|| a_id.cmp(b_id))
}

/// Repository trait for document store access
/// This allows switching between different storage backends (in-memory, filesystem, hosted)
#[async_trait]
pub trait Repository: Send + Sync {
    /// Create the document or merge `fields` into the existing one, field by field
    async fn upsert(&self, collection: &str, id: &str, fields: Document) -> Result<(), StoreError>;

    /// Create or fully replace a document
    async fn set(&self, collection: &str, id: &str, document: Document) -> Result<(), StoreError>;

    /// Delete a document, returning whether it existed
    async fn delete(&self, collection: &str, id: &str) -> Result<bool, StoreError>;

    /// Get a document by ID
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError>;

    /// Run an ordered, limited scan. Documents without a numeric ordering field are skipped.
    async fn query(
        &self,
        collection: &str,
        query: &PageQuery,
    ) -> Result<Vec<StoredDocument>, StoreError>;

    /// Number of documents in a collection
    async fn count(&self, collection: &str) -> Result<usize, StoreError>;
}

/// Convert any serializable value into a document body
pub fn to_document<T: Serialize>(value: &T) -> Result<Document, StoreError> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        other => Err(StoreError::InvalidDocument(format!(
            "expected a JSON object, got {other}"
        ))),
    }
}
