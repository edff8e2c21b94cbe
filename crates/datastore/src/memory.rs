use crate::{Document, PageQuery, Repository, StoreError, StoredDocument, descending};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};

pub(crate) type Collections = HashMap<String, BTreeMap<String, Document>>;

/// In-memory implementation of the Repository trait
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    collections: Arc<RwLock<Collections>>,
}

impl InMemoryRepository {
    /// Create an empty repository
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_collections(collections: Collections) -> Self {
        Self {
            collections: Arc::new(RwLock::new(collections)),
        }
    }

    pub(crate) fn snapshot(&self) -> Result<Collections, StoreError> {
        Ok(self
            .collections
            .read()
            .map_err(|_| StoreError::LockPoisoned)?
            .clone())
    }

    fn write<R>(&self, f: impl FnOnce(&mut Collections) -> R) -> Result<R, StoreError> {
        let mut guard = self
            .collections
            .write()
            .map_err(|_| StoreError::LockPoisoned)?;
        Ok(f(&mut guard))
    }

    fn read<R>(&self, f: impl FnOnce(&Collections) -> R) -> Result<R, StoreError> {
        let guard = self
            .collections
            .read()
            .map_err(|_| StoreError::LockPoisoned)?;
        Ok(f(&guard))
    }

    /// Swap in a whole new set of collections
    pub(crate) fn replace(&self, collections: Collections) -> Result<(), StoreError> {
        self.write(|current| *current = collections)
    }
}

/// Merge `fields` into the document, creating it when absent
pub(crate) fn merge_into(collections: &mut Collections, collection: &str, id: &str, fields: Document) {
    let existing = collections
        .entry(collection.to_string())
        .or_default()
        .entry(id.to_string())
        .or_default();
    for (key, value) in fields {
        existing.insert(key, value);
    }
}

pub(crate) fn replace_in(collections: &mut Collections, collection: &str, id: &str, document: Document) {
    collections
        .entry(collection.to_string())
        .or_default()
        .insert(id.to_string(), document);
}

pub(crate) fn remove_from(collections: &mut Collections, collection: &str, id: &str) -> bool {
    collections
        .get_mut(collection)
        .and_then(|docs| docs.remove(id))
        .is_some()
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn upsert(&self, collection: &str, id: &str, fields: Document) -> Result<(), StoreError> {
        self.write(|collections| merge_into(collections, collection, id, fields))
    }

    async fn set(&self, collection: &str, id: &str, document: Document) -> Result<(), StoreError> {
        self.write(|collections| replace_in(collections, collection, id, document))
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<bool, StoreError> {
        self.write(|collections| remove_from(collections, collection, id))
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        self.read(|collections| collections.get(collection).and_then(|docs| docs.get(id)).cloned())
    }

    async fn query(
        &self,
        collection: &str,
        query: &PageQuery,
    ) -> Result<Vec<StoredDocument>, StoreError> {
        self.read(|collections| {
            let Some(docs) = collections.get(collection) else {
                return Vec::new();
            };

            let mut ordered: Vec<(f64, StoredDocument)> = docs
                .iter()
                .map(|(id, data)| StoredDocument {
                    id: id.clone(),
                    data: data.clone(),
                })
                .filter_map(|doc| doc.order_value(&query.order_by).map(|v| (v, doc)))
                .filter(|(_, doc)| {
                    query
                        .start_after
                        .as_ref()
                        .is_none_or(|cursor| cursor.precedes(doc, &query.order_by))
                })
                .collect();

            ordered.sort_by(|(a_value, a), (b_value, b)| descending(*a_value, &a.id, *b_value, &b.id));
            ordered
                .into_iter()
                .take(query.limit)
                .map(|(_, doc)| doc)
                .collect()
        })
    }

    async fn count(&self, collection: &str) -> Result<usize, StoreError> {
        self.read(|collections| collections.get(collection).map_or(0, BTreeMap::len))
    }
}
