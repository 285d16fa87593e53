use thiserror::Error;

use crate::embedding::RerankerError;

#[derive(Debug, Error)]
pub enum ScoringError {
    #[error("reranker error: {0}")]
    Reranker(#[from] RerankerError),

    #[error("reranker returned {actual} scores for {expected} candidates")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("scoring task failed: {reason}")]
    TaskFailed { reason: String },
}
