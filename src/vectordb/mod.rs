//! Vector stores for the semantic branch of retrieval.
//!
//! [`MemoryVectorStore`] is the default; [`QdrantStore`] is used when a Qdrant URL is
//! configured. Each built index gets its own store instance, so a rebuild never mutates
//! the store that in-flight queries are reading.

pub mod client;
pub mod error;
pub mod memory;
pub mod model;

#[cfg(test)]
mod tests;

pub use client::QdrantStore;
pub use error::VectorDbError;
pub use memory::MemoryVectorStore;
pub use model::{PartitionFilter, VectorHit, VectorPoint, cosine_similarity};

use std::sync::Arc;

use async_trait::async_trait;

use crate::constants::DEFAULT_COLLECTION_PREFIX;

#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Inserts points; a point with an existing passage id replaces it.
    async fn add(&self, points: Vec<VectorPoint>) -> Result<(), VectorDbError>;

    /// Up to `k` nearest points, most similar first.
    async fn query(
        &self,
        vector: &[f32],
        k: usize,
        filter: Option<&PartitionFilter>,
    ) -> Result<Vec<VectorHit>, VectorDbError>;

    fn backend_name(&self) -> &'static str;
}

/// Which store implementation to open for a new index version.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum VectorBackend {
    #[default]
    Memory,
    Qdrant {
        url: String,
        collection_prefix: String,
    },
}

impl VectorBackend {
    pub fn qdrant(url: impl Into<String>) -> Self {
        VectorBackend::Qdrant {
            url: url.into(),
            collection_prefix: DEFAULT_COLLECTION_PREFIX.to_string(),
        }
    }

    /// Opens an empty store for the index version identified by `fingerprint`.
    ///
    /// Qdrant collections are named after the fingerprint, so versions never share one.
    pub async fn open(
        &self,
        fingerprint: &str,
        dimension: usize,
    ) -> Result<Arc<dyn VectorStore>, VectorDbError> {
        match self {
            VectorBackend::Memory => Ok(Arc::new(MemoryVectorStore::new(dimension))),
            VectorBackend::Qdrant {
                url,
                collection_prefix,
            } => {
                let collection = collection_name(collection_prefix, fingerprint);
                let store = QdrantStore::connect(url, &collection, dimension).await?;
                Ok(Arc::new(store))
            }
        }
    }
}

pub fn collection_name(prefix: &str, fingerprint: &str) -> String {
    let short: String = fingerprint.chars().take(16).collect();
    format!("{prefix}_{short}")
}
