use thiserror::Error;

#[derive(Debug, Error)]
pub enum RerankerError {
    #[error("failed to load cross-encoder: {reason}")]
    ModelLoadFailed { reason: String },

    #[error("cross-encoder scoring failed: {reason}")]
    InferenceFailed { reason: String },

    #[error("cross-encoder tokenization failed: {reason}")]
    TokenizationFailed { reason: String },

    #[error("invalid reranker configuration: {reason}")]
    InvalidConfig { reason: String },
}

impl From<candle_core::Error> for RerankerError {
    fn from(err: candle_core::Error) -> Self {
        RerankerError::InferenceFailed {
            reason: err.to_string(),
        }
    }
}

