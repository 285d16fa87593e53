use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("embedder model directory not found: {path}")]
    ModelNotFound { path: PathBuf },

    #[error("failed to load embedder: {reason}")]
    ModelLoadFailed { reason: String },

    #[error("embedding forward pass failed: {reason}")]
    InferenceFailed { reason: String },

    #[error("embedder tokenization failed: {reason}")]
    TokenizationFailed { reason: String },

    #[error("invalid embedder configuration: {reason}")]
    InvalidConfig { reason: String },
}

impl From<candle_core::Error> for EmbeddingError {
    fn from(err: candle_core::Error) -> Self {
        EmbeddingError::InferenceFailed {
            reason: err.to_string(),
        }
    }
}
