use super::{BertEmbedder, EmbedKind, Embedder, EmbeddingError};

/// Stub embedder that indexes passages normally but fails every question embedding.
pub struct QueryFailingEmbedder {
    inner: BertEmbedder,
    reason: String,
}

impl QueryFailingEmbedder {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            inner: BertEmbedder::stub(),
            reason: reason.into(),
        }
    }
}

impl Default for QueryFailingEmbedder {
    fn default() -> Self {
        Self::new("device lost")
    }
}

impl Embedder for QueryFailingEmbedder {
    fn embed(&self, text: &str, kind: EmbedKind) -> Result<Vec<f32>, EmbeddingError> {
        match kind {
            EmbedKind::Query => Err(EmbeddingError::InferenceFailed {
                reason: self.reason.clone(),
            }),
            EmbedKind::Passage => self.inner.embed(text, kind),
        }
    }

    fn embed_batch(
        &self,
        texts: &[&str],
        kind: EmbedKind,
    ) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        match kind {
            EmbedKind::Query => Err(EmbeddingError::InferenceFailed {
                reason: self.reason.clone(),
            }),
            EmbedKind::Passage => self.inner.embed_batch(texts, kind),
        }
    }

    fn dimension(&self) -> usize {
        self.inner.dimension()
    }

    fn is_stub(&self) -> bool {
        true
    }
}
