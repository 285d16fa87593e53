use thiserror::Error;

use crate::embedding::EmbeddingError;
use crate::vectordb::VectorDbError;

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("cannot build an index from an empty corpus")]
    EmptyCorpus,

    #[error("failed to embed passages: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("vector store error: {0}")]
    VectorStore(#[from] VectorDbError),

    #[error("index snapshot error: {reason}")]
    Snapshot { reason: String },

    #[error("index io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("index build task failed: {reason}")]
    TaskFailed { reason: String },
}
