use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{Document, DocumentStore, Filter, StoreError, UNIQUE_KEYS};

/// In-process store with the same uniqueness rules as the Postgres one.
#[derive(Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<String, Vec<Document>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn check_unique(collection: &str, existing: &[Document], doc: &Document) -> Result<(), StoreError> {
    for (coll, field) in UNIQUE_KEYS {
        if *coll != collection {
            continue;
        }
        let Some(value) = doc.get(*field).filter(|v| !v.is_null()) else {
            continue;
        };
        if existing.iter().any(|d| d.get(*field) == Some(value)) {
            return Err(StoreError::Duplicate {
                collection: collection.to_string(),
                field: field.to_string(),
            });
        }
    }
    Ok(())
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn insert_one(&self, collection: &str, doc: Document) -> Result<(), StoreError> {
        let mut guard = self.collections.write().await;
        let docs = guard.entry(collection.to_string()).or_default();
        check_unique(collection, docs, &doc)?;
        docs.push(doc);
        Ok(())
    }

    async fn insert_many(&self, collection: &str, new_docs: Vec<Document>) -> Result<(), StoreError> {
        let mut guard = self.collections.write().await;
        let docs = guard.entry(collection.to_string()).or_default();
        let mut staged: Vec<Document> = docs.clone();
        for doc in new_docs {
            check_unique(collection, &staged, &doc)?;
            staged.push(doc);
        }
        *docs = staged;
        Ok(())
    }

    async fn find_one(
        &self,
        collection: &str,
        filter: &Filter,
    ) -> Result<Option<Document>, StoreError> {
        let guard = self.collections.read().await;
        Ok(guard
            .get(collection)
            .and_then(|docs| docs.iter().find(|d| filter.matches(d)).cloned()))
    }

    async fn find_many(
        &self,
        collection: &str,
        filter: &Filter,
        limit: usize,
    ) -> Result<Vec<Document>, StoreError> {
        let guard = self.collections.read().await;
        Ok(guard
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .filter(|d| filter.matches(d))
                    .take(limit)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn count(&self, collection: &str, filter: &Filter) -> Result<u64, StoreError> {
        let guard = self.collections.read().await;
        Ok(guard
            .get(collection)
            .map(|docs| docs.iter().filter(|d| filter.matches(d)).count() as u64)
            .unwrap_or(0))
    }

    async fn update_one(
        &self,
        collection: &str,
        filter: &Filter,
        set: Document,
    ) -> Result<u64, StoreError> {
        let mut guard = self.collections.write().await;
        let Some(docs) = guard.get_mut(collection) else {
            return Ok(0);
        };
        let Some(idx) = docs.iter().position(|d| filter.matches(d)) else {
            return Ok(0);
        };

        let mut updated = docs[idx].clone();
        updated.extend(set);
        let others: Vec<Document> = docs
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != idx)
            .map(|(_, d)| d.clone())
            .collect();
        check_unique(collection, &others, &updated)?;
        docs[idx] = updated;
        Ok(1)
    }

    async fn delete_many(&self, collection: &str, filter: &Filter) -> Result<u64, StoreError> {
        let mut guard = self.collections.write().await;
        let Some(docs) = guard.get_mut(collection) else {
            return Ok(0);
        };
        let before = docs.len();
        docs.retain(|d| !filter.matches(d));
        Ok((before - docs.len()) as u64)
    }
}

/// Test double whose first `misses` lookups in one collection see nothing,
/// like a request that checked just before a concurrent insert landed.
#[cfg(test)]
pub(crate) struct StaleReads {
    inner: MemoryStore,
    collection: &'static str,
    misses: std::sync::atomic::AtomicUsize,
}

#[cfg(test)]
impl StaleReads {
    pub(crate) fn new(inner: MemoryStore, collection: &'static str, misses: usize) -> Self {
        Self {
            inner,
            collection,
            misses: misses.into(),
        }
    }
}

#[cfg(test)]
#[async_trait]
impl DocumentStore for StaleReads {
    async fn insert_one(&self, collection: &str, doc: Document) -> Result<(), StoreError> {
        self.inner.insert_one(collection, doc).await
    }

    async fn insert_many(&self, collection: &str, docs: Vec<Document>) -> Result<(), StoreError> {
        self.inner.insert_many(collection, docs).await
    }

    async fn find_one(
        &self,
        collection: &str,
        filter: &Filter,
    ) -> Result<Option<Document>, StoreError> {
        use std::sync::atomic::Ordering;
        if collection == self.collection
            && self
                .misses
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
        {
            return Ok(None);
        }
        self.inner.find_one(collection, filter).await
    }

    async fn find_many(
        &self,
        collection: &str,
        filter: &Filter,
        limit: usize,
    ) -> Result<Vec<Document>, StoreError> {
        self.inner.find_many(collection, filter, limit).await
    }

    async fn count(&self, collection: &str, filter: &Filter) -> Result<u64, StoreError> {
        self.inner.count(collection, filter).await
    }

    async fn update_one(
        &self,
        collection: &str,
        filter: &Filter,
        set: Document,
    ) -> Result<u64, StoreError> {
        self.inner.update_one(collection, filter, set).await
    }

    async fn delete_many(&self, collection: &str, filter: &Filter) -> Result<u64, StoreError> {
        self.inner.delete_many(collection, filter).await
    }
}
