//! Generic document store used by every collection adapter.
//!
//! Documents are JSON objects grouped into named collections. Adapters above
//! this layer convert to and from typed records with [`to_document`] and
//! [`from_document`].

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
#[cfg(test)]
pub(crate) use memory::StaleReads;
pub use postgres::PostgresStore;

pub type Document = Map<String, Value>;

/// `(collection, field)` pairs that must be unique within their collection.
pub const UNIQUE_KEYS: &[(&str, &str)] = &[
    ("users", "user_id"),
    ("users", "email"),
    ("user_sessions", "session_token"),
    ("blog_posts", "slug"),
    ("email_leads", "email"),
];

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("duplicate value for unique field {field} in {collection}")]
    Duplicate { collection: String, field: String },
    #[error("document is not a JSON object")]
    NotAnObject,
    #[error("malformed document: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Conjunction of top-level field equalities. The empty filter matches all.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter(Document);

impl Filter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn eq(field: &str, value: impl Into<Value>) -> Self {
        Self::all().and(field, value)
    }

    pub fn and(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.0.insert(field.to_string(), value.into());
        self
    }

    pub fn matches(&self, doc: &Document) -> bool {
        self.0.iter().all(|(k, v)| doc.get(k) == Some(v))
    }

    pub fn as_document(&self) -> &Document {
        &self.0
    }
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn insert_one(&self, collection: &str, doc: Document) -> Result<(), StoreError>;

    /// Inserts every document or none of them.
    async fn insert_many(&self, collection: &str, docs: Vec<Document>) -> Result<(), StoreError>;

    async fn find_one(&self, collection: &str, filter: &Filter)
        -> Result<Option<Document>, StoreError>;

    /// Matching documents in insertion order, at most `limit` of them.
    async fn find_many(
        &self,
        collection: &str,
        filter: &Filter,
        limit: usize,
    ) -> Result<Vec<Document>, StoreError>;

    async fn count(&self, collection: &str, filter: &Filter) -> Result<u64, StoreError>;

    /// Merges `set` into the first matching document. Returns the number matched.
    async fn update_one(
        &self,
        collection: &str,
        filter: &Filter,
        set: Document,
    ) -> Result<u64, StoreError>;

    async fn delete_many(&self, collection: &str, filter: &Filter) -> Result<u64, StoreError>;

    async fn close(&self) {}
}

pub fn to_document<T: Serialize>(record: &T) -> Result<Document, StoreError> {
    match serde_json::to_value(record)? {
        Value::Object(map) => Ok(map),
        _ => Err(StoreError::NotAnObject),
    }
}

pub fn from_document<T: DeserializeOwned>(doc: Document) -> Result<T, StoreError> {
    Ok(serde_json::from_value(Value::Object(doc))?)
}
