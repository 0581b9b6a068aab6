use crate::document::{Document, Item};
use crate::error::Result;
use crate::index::Index;
use crate::stream::SearchResult;
use parking_lot::{RwLock, RwLockReadGuard};
use std::sync::Arc;

/// Cloneable handle for an index used from several threads.
///
/// Adds take the write lock, so they are serialised; queries share the read lock.
pub struct SharedIndex<T = Document> {
    inner: Arc<RwLock<Index<T>>>,
}

impl<T> Clone for SharedIndex<T> {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner) }
    }
}

impl<T: Item> SharedIndex<T> {
    pub fn new(index: Index<T>) -> Self {
        Self { inner: Arc::new(RwLock::new(index)) }
    }

    pub fn add_item(&self, item: T) -> Result<()> {
        self.inner.write().add_item(item)
    }

    pub fn set_min_similarity_score(&self, score: f64) -> Result<()> {
        self.inner.write().set_min_similarity_score(score)
    }

    pub fn len(&self) -> usize { self.inner.read().len() }
    pub fn is_empty(&self) -> bool { self.inner.read().is_empty() }

    /// Read guard for running several queries against one consistent view.
    pub fn read(&self) -> RwLockReadGuard<'_, Index<T>> {
        self.inner.read()
    }

    pub fn rank_similar(&self, query: &str, min_score: f64, limit: usize) -> Vec<SearchResult<T>> {
        self.inner.read().rank_similar(query, min_score, limit)
    }
}

impl SharedIndex<Document> {
    pub fn add_string(&self, content: impl Into<String>) -> Result<()> {
        self.inner.write().add_string(content)
    }
}

impl<T: Item + Send + Sync + 'static> SharedIndex<T> {
    pub fn find_best_match(&self, query: &str) -> Option<Arc<T>> {
        self.inner.read().find_best_match(query)
    }
}
