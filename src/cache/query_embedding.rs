//! In-memory cache of question embeddings.
//!
//! Keyed by the BLAKE3 hash of the question text. Repeated questions skip the encoder.

use moka::sync::Cache;
use std::sync::Arc;

use crate::constants::DEFAULT_QUERY_EMBEDDING_CACHE_CAPACITY;
use crate::hashing::hash_question;

pub struct QueryEmbeddingCache {
    entries: Cache<[u8; 32], Arc<Vec<f32>>>,
}

impl QueryEmbeddingCache {
    #[inline]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_QUERY_EMBEDDING_CACHE_CAPACITY)
    }

    /// Creates a cache holding at most `capacity` vectors.
    #[inline]
    pub fn with_capacity(capacity: u64) -> Self {
        Self {
            entries: Cache::builder().max_capacity(capacity).build(),
        }
    }

    #[inline]
    pub fn get(&self, question: &str) -> Option<Arc<Vec<f32>>> {
        self.entries.get(&hash_question(question))
    }

    #[inline]
    pub fn insert(&self, question: &str, vector: Arc<Vec<f32>>) {
        self.entries.insert(hash_question(question), vector);
    }

    /// Approximate; moka applies evictions lazily.
    #[inline]
    pub fn len(&self) -> u64 {
        self.entries.entry_count()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.entries.invalidate_all();
    }
}

impl Default for QueryEmbeddingCache {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for QueryEmbeddingCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryEmbeddingCache")
            .field("entries", &self.entries.entry_count())
            .finish()
    }
}
