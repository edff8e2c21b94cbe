use crate::memory::{Collections, merge_into, remove_from, replace_in};
use crate::{Document, InMemoryRepository, PageQuery, Repository, StoreError, StoredDocument};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

/// Repository persisted to a single JSON file.
///
/// Reads are served from memory. Every write builds the next snapshot, rewrites
/// the file through a temporary sibling and a rename, and only then becomes
/// visible to readers. A failed write leaves both the file and memory unchanged.
pub struct JsonFileRepository {
    path: PathBuf,
    inner: InMemoryRepository,
    flush: Mutex<()>,
}

impl JsonFileRepository {
    /// Open the store at `path`, loading existing contents when the file is present
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let collections: Collections = match std::fs::read(&path) {
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Collections::new(),
            Err(e) => return Err(e.into()),
        };

        tracing::info!(
            path = %path.display(),
            collections = collections.len(),
            "Opened JSON file store"
        );

        Ok(Self {
            path,
            inner: InMemoryRepository::from_collections(collections),
            flush: Mutex::new(()),
        })
    }

    /// Apply `change` to a copy of the store, persist the copy, then publish it
    async fn commit<R>(&self, change: impl FnOnce(&mut Collections) -> R) -> Result<R, StoreError> {
        let _guard = self.flush.lock().await;
        let mut next = self.inner.snapshot()?;
        let result = change(&mut next);

        let bytes = serde_json::to_vec(&next)?;
        let tmp = self.path.with_extension("tmp");
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, &self.path).await?;

        self.inner.replace(next)?;
        Ok(result)
    }
}

#[async_trait]
impl Repository for JsonFileRepository {
    async fn upsert(&self, collection: &str, id: &str, fields: Document) -> Result<(), StoreError> {
        self.commit(|c| merge_into(c, collection, id, fields)).await
    }

    async fn set(&self, collection: &str, id: &str, document: Document) -> Result<(), StoreError> {
        self.commit(|c| replace_in(c, collection, id, document)).await
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<bool, StoreError> {
        if self.inner.get(collection, id).await?.is_none() {
            return Ok(false);
        }
        self.commit(|c| remove_from(c, collection, id)).await
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        self.inner.get(collection, id).await
    }

    async fn query(
        &self,
        collection: &str,
        query: &PageQuery,
    ) -> Result<Vec<StoredDocument>, StoreError> {
        self.inner.query(collection, query).await
    }

    async fn count(&self, collection: &str) -> Result<usize, StoreError> {
        self.inner.count(collection).await
    }
}
