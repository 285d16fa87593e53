//! Cross-encoder relevance model.
//!
//! Scores are raw logits (unbounded). In stub mode a lexical-overlap heuristic produces
//! values on a comparable scale, roughly `-4.0..=4.0`.

pub mod config;
pub mod error;

#[cfg(test)]
mod tests;

pub use config::{DEFAULT_RERANK_BATCH, MAX_SEQ_LEN, RerankerConfig};
pub use error::RerankerError;

use std::collections::HashSet;

use tokenizers::Tokenizer;
use tracing::{debug, info};

use crate::embedding::RelevanceModel;
use crate::embedding::bert::{CrossEncoder, stack_rows};
use crate::embedding::device::select_device;
use crate::embedding::utils::{load_batch_tokenizer, missing_model_file};
use crate::lexical::tokenize;

pub struct Reranker {
    device: candle_core::Device,
    config: RerankerConfig,
    model: Option<(CrossEncoder, Tokenizer)>,
}

impl std::fmt::Debug for Reranker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reranker")
            .field("device", &format!("{:?}", self.device))
            .field("config", &self.config)
            .field("model_loaded", &self.model.is_some())
            .finish()
    }
}

impl Reranker {
    pub fn load(config: RerankerConfig) -> Result<Self, RerankerError> {
        if let Err(msg) = config.validate() {
            return Err(RerankerError::InvalidConfig { reason: msg });
        }

        let Some(model_path) = config.model_path.clone() else {
            info!("No reranker model path configured, operating in stub mode");
            return Ok(Self::stub_with(config));
        };

        if !model_path.is_dir() {
            return Err(RerankerError::ModelLoadFailed {
                reason: format!("Reranker model path not found: {}", model_path.display()),
            });
        }
        if let Some(file) = missing_model_file(&model_path) {
            return Err(RerankerError::ModelLoadFailed {
                reason: format!("Missing {file} in {}", model_path.display()),
            });
        }

        let device = select_device();
        debug!(?device, "Selected compute device for reranker");

        info!(model_path = %model_path.display(), "Loading reranker model");

        let model = CrossEncoder::load(&model_path, &device).map_err(|e| {
            RerankerError::ModelLoadFailed {
                reason: format!("Failed to load cross-encoder: {e}"),
            }
        })?;
        let tokenizer = load_batch_tokenizer(&model_path, config.max_seq_len).map_err(|e| {
            RerankerError::ModelLoadFailed {
                reason: format!("Failed to load tokenizer: {e}"),
            }
        })?;

        info!("Reranker model loaded successfully");

        Ok(Self {
            device,
            config,
            model: Some((model, tokenizer)),
        })
    }

    pub fn stub() -> Self {
        Self::stub_with(RerankerConfig::stub())
    }

    fn stub_with(config: RerankerConfig) -> Self {
        Self {
            device: candle_core::Device::Cpu,
            config,
            model: None,
        }
    }

    pub fn config(&self) -> &RerankerConfig {
        &self.config
    }

    fn score_chunk(
        &self,
        model: &CrossEncoder,
        tokenizer: &Tokenizer,
        query: &str,
        candidates: &[&str],
    ) -> Result<Vec<f32>, RerankerError> {
        let pairs: Vec<(&str, &str)> = candidates.iter().map(|c| (query, *c)).collect();
        let encodings =
            tokenizer
                .encode_batch(pairs, true)
                .map_err(|e| RerankerError::TokenizationFailed {
                    reason: e.to_string(),
                })?;

        let ids: Vec<&[u32]> = encodings.iter().map(|e| e.get_ids()).collect();
        let type_ids: Vec<&[u32]> = encodings.iter().map(|e| e.get_type_ids()).collect();
        let mask: Vec<&[u32]> = encodings.iter().map(|e| e.get_attention_mask()).collect();

        let logits = model.forward(
            &stack_rows(&ids, &self.device)?,
            &stack_rows(&type_ids, &self.device)?,
            &stack_rows(&mask, &self.device)?,
        )?;
        Ok(logits.to_vec1::<f32>()?)
    }

    fn compute_placeholder_score(&self, query: &str, candidate: &str) -> f32 {
        let query_terms: HashSet<String> = tokenize(query).into_iter().collect();
        if query_terms.is_empty() {
            return -4.0;
        }
        let candidate_terms: HashSet<String> = tokenize(candidate).into_iter().collect();

        let matches = query_terms.intersection(&candidate_terms).count();
        let recall = matches as f32 / query_terms.len() as f32;
        let union = query_terms.union(&candidate_terms).count();
        let jaccard = if union > 0 {
            matches as f32 / union as f32
        } else {
            0.0
        };

        let base_score = 0.6 * recall + 0.4 * jaccard;
        8.0 * (base_score - 0.5)
    }
}

impl RelevanceModel for Reranker {
    fn score_batch(&self, query: &str, candidates: &[&str]) -> Result<Vec<f32>, RerankerError> {
        debug!(
            query_len = query.len(),
            num_candidates = candidates.len(),
            model_loaded = self.model.is_some(),
            "Scoring query-candidate pairs"
        );

        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        let Some((model, tokenizer)) = &self.model else {
            return Ok(candidates
                .iter()
                .map(|c| self.compute_placeholder_score(query, c))
                .collect());
        };

        let mut scores = Vec::with_capacity(candidates.len());
        for chunk in candidates.chunks(self.config.batch_size) {
            scores.extend(self.score_chunk(model, tokenizer, query, chunk)?);
        }

        if scores.len() != candidates.len() {
            return Err(RerankerError::InferenceFailed {
                reason: format!(
                    "expected {} scores, model returned {}",
                    candidates.len(),
                    scores.len()
                ),
            });
        }
        Ok(scores)
    }

    fn is_model_loaded(&self) -> bool {
        self.model.is_some()
    }
}
