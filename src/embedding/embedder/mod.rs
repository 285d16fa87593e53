//! Passage and question embedder.
//!
//! With a model directory it runs a candle BERT encoder (mean pooling, L2-normalized).
//! Without one it runs in stub mode: a hashed bag of lexical tokens, which keeps cosine
//! similarity meaningful for tests and offline runs.

pub mod config;


pub use config::{DEFAULT_PASSAGE_PREFIX, DEFAULT_QUERY_PREFIX, EmbedderConfig};

use candle_core::Device;
use parking_lot::Mutex;
use tokenizers::Tokenizer;
use tracing::{debug, info, warn};

use crate::embedding::bert::{MeanPoolEncoder, stack_rows};
use crate::embedding::device::select_device;
use crate::embedding::error::EmbeddingError;
use crate::embedding::utils::{load_batch_tokenizer, missing_model_file};
use crate::embedding::{EmbedKind, Embedder};
use crate::hashing::hash_to_u64;
use crate::lexical::tokenize;

enum EmbedderBackend {
    Model {
        encoder: Mutex<MeanPoolEncoder>,
        tokenizer: Tokenizer,
        device: Device,
    },
    Stub,
}

pub struct BertEmbedder {
    backend: EmbedderBackend,
    config: EmbedderConfig,
    dimension: usize,
}

impl std::fmt::Debug for BertEmbedder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BertEmbedder")
            .field(
                "backend",
                &match &self.backend {
                    EmbedderBackend::Model { device, .. } => format!("Model({:?})", device),
                    EmbedderBackend::Stub => "Stub".to_string(),
                },
            )
            .field("dimension", &self.dimension)
            .field("max_seq_len", &self.config.max_seq_len)
            .finish()
    }
}

impl BertEmbedder {
    pub fn load(config: EmbedderConfig) -> Result<Self, EmbeddingError> {
        config.validate()?;

        let Some(model_path) = config.model_path.clone() else {
            warn!(dim = config.stub_dim, "No embedder model configured, running in stub mode");
            return Ok(Self::stub_with(config));
        };

        if !model_path.is_dir() {
            return Err(EmbeddingError::ModelNotFound { path: model_path });
        }
        if let Some(file) = missing_model_file(&model_path) {
            return Err(EmbeddingError::ModelLoadFailed {
                reason: format!("missing {file} in {}", model_path.display()),
            });
        }

        let device = select_device();
        debug!(?device, "Selected compute device for embedder");

        let encoder = MeanPoolEncoder::load(&model_path, &device).map_err(|e| {
            EmbeddingError::ModelLoadFailed {
                reason: format!("failed to load encoder: {e}"),
            }
        })?;
        let tokenizer = load_batch_tokenizer(&model_path, config.max_seq_len).map_err(|e| {
            EmbeddingError::TokenizationFailed {
                reason: format!("failed to load tokenizer: {e}"),
            }
        })?;
        let dimension = encoder.hidden_size();

        info!(
            model_path = %model_path.display(),
            dimension,
            max_seq_len = config.max_seq_len,
            "Embedder model loaded"
        );

        Ok(Self {
            backend: EmbedderBackend::Model {
                encoder: Mutex::new(encoder),
                tokenizer,
                device,
            },
            config,
            dimension,
        })
    }

    /// Stub embedder with the default dimension.
    pub fn stub() -> Self {
        Self::stub_with(EmbedderConfig::stub())
    }

    fn stub_with(config: EmbedderConfig) -> Self {
        let dimension = config.stub_dim;
        Self {
            backend: EmbedderBackend::Stub,
            config,
            dimension,
        }
    }

    pub fn config(&self) -> &EmbedderConfig {
        &self.config
    }

    fn prefixed(&self, text: &str, kind: EmbedKind) -> String {
        let prefix = match kind {
            EmbedKind::Query => &self.config.query_prefix,
            EmbedKind::Passage => &self.config.passage_prefix,
        };
        format!("{prefix}{text}")
    }

    fn embed_stub(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimension];
        for token in tokenize(text) {
            let h = hash_to_u64(token.as_bytes());
            let slot = (h % self.dimension as u64) as usize;
            let sign = if h >> 63 == 0 { 1.0 } else { -1.0 };
            vector[slot] += sign;
        }
        l2_normalize(&mut vector);
        vector
    }

    fn embed_with_model(
        &self,
        texts: &[String],
        encoder: &Mutex<MeanPoolEncoder>,
        tokenizer: &Tokenizer,
        device: &Device,
    ) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let encodings = tokenizer.encode_batch(texts.to_vec(), true).map_err(|e| {
            EmbeddingError::TokenizationFailed {
                reason: e.to_string(),
            }
        })?;

        let ids: Vec<&[u32]> = encodings.iter().map(|e| e.get_ids()).collect();
        let type_ids: Vec<&[u32]> = encodings.iter().map(|e| e.get_type_ids()).collect();
        let mask: Vec<&[u32]> = encodings.iter().map(|e| e.get_attention_mask()).collect();

        let input_ids = stack_rows(&ids, device)?;
        let token_type_ids = stack_rows(&type_ids, device)?;
        let attention_mask = stack_rows(&mask, device)?;

        let pooled = encoder
            .lock()
            .forward(&input_ids, &token_type_ids, &attention_mask)?;
        Ok(pooled.to_vec2::<f32>()?)
    }
}

impl Embedder for BertEmbedder {
    fn embed(&self, text: &str, kind: EmbedKind) -> Result<Vec<f32>, EmbeddingError> {
        let mut batch = self.embed_batch(&[text], kind)?;
        batch.pop().ok_or_else(|| EmbeddingError::InferenceFailed {
            reason: "encoder returned no vector".to_string(),
        })
    }

    fn embed_batch(
        &self,
        texts: &[&str],
        kind: EmbedKind,
    ) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        match &self.backend {
            EmbedderBackend::Stub => Ok(texts.iter().map(|t| self.embed_stub(t)).collect()),
            EmbedderBackend::Model {
                encoder,
                tokenizer,
                device,
            } => {
                let mut vectors = Vec::with_capacity(texts.len());
                for chunk in texts.chunks(self.config.batch_size) {
                    let inputs: Vec<String> =
                        chunk.iter().map(|t| self.prefixed(t, kind)).collect();
                    vectors.extend(self.embed_with_model(&inputs, encoder, tokenizer, device)?);
                }
                debug!(count = vectors.len(), ?kind, "Embedded batch");
                Ok(vectors)
            }
        }
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn is_stub(&self) -> bool {
        matches!(self.backend, EmbedderBackend::Stub)
    }
}

fn l2_normalize(vector: &mut [f32]) {
    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        vector.iter_mut().for_each(|v| *v /= norm);
    }
}
