use std::sync::Arc;

use crate::blog::repo_types::BlogPost;
use crate::store::{from_document, to_document, DocumentStore, Filter, StoreError};

const POSTS: &str = "blog_posts";

#[derive(Clone)]
pub struct PostStore {
    store: Arc<dyn DocumentStore>,
}

impl PostStore {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    pub async fn list(&self, limit: usize) -> Result<Vec<BlogPost>, StoreError> {
        self.store
            .find_many(POSTS, &Filter::all(), limit)
            .await?
            .into_iter()
            .map(from_document)
            .collect()
    }

    pub async fn find_by_slug(&self, slug: &str) -> Result<Option<BlogPost>, StoreError> {
        self.store
            .find_one(POSTS, &Filter::eq("slug", slug))
            .await?
            .map(from_document)
            .transpose()
    }

    pub async fn count(&self) -> Result<u64, StoreError> {
        self.store.count(POSTS, &Filter::all()).await
    }

    pub async fn insert_many(&self, posts: &[BlogPost]) -> Result<(), StoreError> {
        let docs = posts.iter().map(to_document).collect::<Result<Vec<_>, _>>()?;
        self.store.insert_many(POSTS, docs).await
    }
}
