use std::time::Duration;

use thiserror::Error;

use crate::corpus::CorpusError;
use crate::embedding::RerankerError;
use crate::index::IndexError;
use crate::retrieval::RetrievalError;
use crate::scoring::ScoringError;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("index is not ready")]
    NotReady,

    #[error("invalid input: {reason}")]
    InvalidInput { reason: String },

    #[error("invalid pipeline configuration: {reason}")]
    InvalidConfig { reason: String },

    #[error("retrieval failed: {0}")]
    Retrieval(#[from] RetrievalError),

    #[error("reranking failed: {0}")]
    Reranking(#[from] ScoringError),

    #[error("query exceeded its deadline of {after:?}")]
    Timeout { after: Duration },

    #[error("index build failed: {0}")]
    IndexBuild(#[from] IndexError),

    #[error("corpus load failed: {0}")]
    Corpus(#[from] CorpusError),
}

impl From<RerankerError> for PipelineError {
    fn from(err: RerankerError) -> Self {
        PipelineError::Reranking(ScoringError::Reranker(err))
    }
}
