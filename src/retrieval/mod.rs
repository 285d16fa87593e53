//! Dual retrieval (semantic + lexical) and rank fusion.

pub mod error;
pub mod fusion;
pub mod types;


pub use error::RetrievalError;
pub use fusion::{FusionWeights, reciprocal_rank_fusion};
pub use types::{FusedCandidate, RetrievalCandidate, RetrievedLists, SourceStrategy};

use std::sync::Arc;

use tracing::{debug, instrument};

use crate::cache::QueryEmbeddingCache;
use crate::embedding::{EmbedKind, Embedder};
use crate::index::CorpusIndex;

/// Runs the semantic and lexical branches concurrently against one index version.
pub struct DualRetriever {
    embedder: Arc<dyn Embedder>,
    query_cache: QueryEmbeddingCache,
}

impl DualRetriever {
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self {
            embedder,
            query_cache: QueryEmbeddingCache::new(),
        }
    }

    pub fn with_query_cache(mut self, query_cache: QueryEmbeddingCache) -> Self {
        self.query_cache = query_cache;
        self
    }

    pub fn embedder(&self) -> &Arc<dyn Embedder> {
        &self.embedder
    }

    pub fn query_cache(&self) -> &QueryEmbeddingCache {
        &self.query_cache
    }

    async fn embed_question(&self, question: &str) -> Result<Arc<Vec<f32>>, RetrievalError> {
        if let Some(vector) = self.query_cache.get(question) {
            debug!("Query embedding cache hit");
            return Ok(vector);
        }

        let embedder = Arc::clone(&self.embedder);
        let text = question.to_string();
        let vector = tokio::task::spawn_blocking(move || embedder.embed(&text, EmbedKind::Query))
            .await
            .map_err(|e| RetrievalError::TaskFailed {
                reason: e.to_string(),
            })??;

        let vector = Arc::new(vector);
        self.query_cache.insert(question, Arc::clone(&vector));
        Ok(vector)
    }

    /// Up to `limit` passages per branch (per sub-index for a partitioned lexical search).
    /// Empty lists are a valid outcome.
    #[instrument(skip(self, index, question), fields(partition = ?partition, limit))]
    pub async fn retrieve(
        &self,
        index: Arc<CorpusIndex>,
        question: &str,
        partition: Option<&str>,
        limit: usize,
    ) -> Result<RetrievedLists, RetrievalError> {
        let semantic = async {
            let vector = self.embed_question(question).await?;
            let passages = index.semantic_search(&vector, limit, partition).await?;
            Ok::<_, RetrievalError>(passages)
        };

        let lexical = {
            let index = Arc::clone(&index);
            let question = question.to_string();
            let partition = partition.map(str::to_string);
            async move {
                tokio::task::spawn_blocking(move || {
                    index.lexical_search(&question, limit, partition.as_deref())
                })
                .await
                .map_err(|e| RetrievalError::TaskFailed {
                    reason: e.to_string(),
                })
            }
        };

        let (semantic, lexical) = tokio::try_join!(semantic, lexical)?;
        debug!(
            semantic = semantic.len(),
            lexical = lexical.len(),
            "Retrieved candidates"
        );
        Ok(RetrievedLists::new(semantic, lexical))
    }
}

impl std::fmt::Debug for DualRetriever {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DualRetriever")
            .field("embedder_dim", &self.embedder.dimension())
            .field("query_cache", &self.query_cache)
            .finish()
    }
}
