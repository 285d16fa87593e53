use thiserror::Error;

use crate::embedding::EmbeddingError;
use crate::index::IndexError;

#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error("failed to embed question: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("index lookup failed: {0}")]
    Index(#[from] IndexError),

    #[error("retrieval task failed: {reason}")]
    TaskFailed { reason: String },
}
