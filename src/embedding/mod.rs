//! Embedding and relevance-scoring oracles.
//!
//! - [`embedder`] turns questions and passages into vectors ([`Embedder`]).
//! - [`reranker`] scores `(question, passage)` pairs ([`RelevanceModel`]).
//!
//! Both run a candle BERT model when a model directory is configured and fall back to a
//! deterministic stub otherwise.

/// BERT encoders (mean-pooled and cross-encoder).
pub mod bert;
/// Device selection (CPU / Metal / CUDA).
pub mod device;
/// Question/passage embedder.
pub mod embedder;
mod error;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
/// Cross-encoder reranker.
pub mod reranker;
/// Tokenizer loading helpers.
pub mod utils;

pub use embedder::{BertEmbedder, EmbedderConfig};
pub use error::EmbeddingError;
#[cfg(any(test, feature = "mock"))]
pub use mock::QueryFailingEmbedder;
pub use reranker::{Reranker, RerankerConfig, RerankerError};

/// Which side of the retrieval pair a text is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbedKind {
    Query,
    Passage,
}

/// Deterministic text-to-vector oracle.
pub trait Embedder: Send + Sync {
    fn embed(&self, text: &str, kind: EmbedKind) -> Result<Vec<f32>, EmbeddingError>;

    /// Output is in input order, one vector per text.
    fn embed_batch(&self, texts: &[&str], kind: EmbedKind)
    -> Result<Vec<Vec<f32>>, EmbeddingError>;

    fn dimension(&self) -> usize;

    fn is_stub(&self) -> bool;
}

/// Pairwise relevance oracle.
pub trait RelevanceModel: Send + Sync {
    /// One raw score per candidate, same order and length as `candidates`.
    fn score_batch(&self, query: &str, candidates: &[&str]) -> Result<Vec<f32>, RerankerError>;

    fn is_model_loaded(&self) -> bool;
}
