//! Final score fusion and confidence filtering.

use tracing::debug;

use super::types::{ExtractedCandidate, FinalEntry, FinalResult};
use crate::constants::{
    DEFAULT_CE_WEIGHT, DEFAULT_CONFIDENCE_THRESHOLD, DEFAULT_FINAL_K, DEFAULT_LLM_WEIGHT,
    LLM_SCORE_MAX,
};

#[derive(Debug, Clone, PartialEq)]
pub struct SelectionParams {
    pub top_k: usize,
    pub ce_weight: f32,
    pub llm_weight: f32,
    /// Candidates with a relevance score below this are dropped.
    pub threshold: f32,
}

impl Default for SelectionParams {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_FINAL_K,
            ce_weight: DEFAULT_CE_WEIGHT,
            llm_weight: DEFAULT_LLM_WEIGHT,
            threshold: DEFAULT_CONFIDENCE_THRESHOLD,
        }
    }
}

impl SelectionParams {
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn with_weights(mut self, ce_weight: f32, llm_weight: f32) -> Self {
        self.ce_weight = ce_weight;
        self.llm_weight = llm_weight;
        self
    }

    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.top_k == 0 {
            return Err("top_k must be > 0".to_string());
        }
        for (name, w) in [("ce_weight", self.ce_weight), ("llm_weight", self.llm_weight)] {
            if !w.is_finite() || w < 0.0 {
                return Err(format!("{name} must be finite and non-negative, got {w}"));
            }
        }
        if !self.threshold.is_finite() {
            return Err("threshold must be finite".to_string());
        }
        Ok(())
    }
}

/// Filters by confidence, blends normalized relevance with the LLM score and keeps the
/// best `top_k`.
pub fn select(candidates: Vec<ExtractedCandidate>, params: &SelectionParams) -> FinalResult {
    let total = candidates.len();
    let confident: Vec<ExtractedCandidate> = candidates
        .into_iter()
        .filter(|c| c.relevance_score >= params.threshold)
        .collect();

    if confident.is_empty() {
        debug!(total, threshold = params.threshold, "No candidate cleared the confidence threshold");
        return FinalResult::default();
    }

    let (min, max) = confident
        .iter()
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), c| {
            (lo.min(c.relevance_score), hi.max(c.relevance_score))
        });
    let range = max - min;

    let mut entries: Vec<FinalEntry> = confident
        .into_iter()
        .map(|c| {
            let ce_norm = if range > 0.0 {
                (c.relevance_score - min) / range
            } else {
                1.0
            };
            let llm_norm = c.llm_score / LLM_SCORE_MAX;
            FinalEntry {
                final_score: params.ce_weight * ce_norm + params.llm_weight * llm_norm,
                relevance_score: c.relevance_score,
                llm_score: c.llm_score,
                passage: c.passage,
            }
        })
        .collect();

    entries.sort_by(|a, b| b.final_score.total_cmp(&a.final_score));
    entries.truncate(params.top_k);

    debug!(
        total,
        selected = entries.len(),
        "Selected final passages"
    );
    FinalResult::new(entries)
}
