use std::path::PathBuf;

use crate::constants::{DEFAULT_MAX_SEQ_LEN, STUB_EMBEDDING_DIM};
use crate::embedding::error::EmbeddingError;

/// E5 models expect role prefixes on their inputs.
pub const DEFAULT_QUERY_PREFIX: &str = "query: ";
pub const DEFAULT_PASSAGE_PREFIX: &str = "passage: ";

pub const DEFAULT_BATCH_SIZE: usize = 32;

/// Configuration for [`BertEmbedder`](super::BertEmbedder).
#[derive(Debug, Clone)]
pub struct EmbedderConfig {
    /// Model directory (`config.json`, `model.safetensors`, `tokenizer.json`).
    /// `None` selects the deterministic stub.
    pub model_path: Option<PathBuf>,
    pub max_seq_len: usize,
    /// Output dimension in stub mode.
    pub stub_dim: usize,
    pub query_prefix: String,
    pub passage_prefix: String,
    /// Texts per forward pass when embedding passages.
    pub batch_size: usize,
}

impl Default for EmbedderConfig {
    fn default() -> Self {
        Self {
            model_path: None,
            max_seq_len: DEFAULT_MAX_SEQ_LEN,
            stub_dim: STUB_EMBEDDING_DIM,
            query_prefix: DEFAULT_QUERY_PREFIX.to_string(),
            passage_prefix: DEFAULT_PASSAGE_PREFIX.to_string(),
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

impl EmbedderConfig {
    pub fn new<P: Into<PathBuf>>(model_path: P) -> Self {
        Self {
            model_path: Some(model_path.into()),
            ..Default::default()
        }
    }

    pub fn stub() -> Self {
        Self::default()
    }

    pub fn with_stub_dim(mut self, dim: usize) -> Self {
        self.stub_dim = dim;
        self
    }

    pub fn with_prefixes(mut self, query: impl Into<String>, passage: impl Into<String>) -> Self {
        self.query_prefix = query.into();
        self.passage_prefix = passage.into();
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn validate(&self) -> Result<(), EmbeddingError> {
        if self.max_seq_len == 0 {
            return Err(EmbeddingError::InvalidConfig {
                reason: "max_seq_len must be > 0".to_string(),
            });
        }
        if self.stub_dim == 0 {
            return Err(EmbeddingError::InvalidConfig {
                reason: "stub_dim must be > 0".to_string(),
            });
        }
        if self.batch_size == 0 {
            return Err(EmbeddingError::InvalidConfig {
                reason: "batch_size must be > 0".to_string(),
            });
        }
        if let Some(ref path) = self.model_path
            && path.as_os_str().is_empty()
        {
            return Err(EmbeddingError::InvalidConfig {
                reason: "model_path cannot be empty when provided".to_string(),
            });
        }
        Ok(())
    }
}
