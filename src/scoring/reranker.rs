use std::sync::Arc;

use tracing::{debug, instrument};

use super::error::ScoringError;
use super::types::RerankedCandidate;
use crate::embedding::{RelevanceModel, Reranker};
use crate::retrieval::FusedCandidate;

/// Reorders fused candidates by pairwise relevance to the question.
pub struct CrossEncoderScorer {
    model: Arc<dyn RelevanceModel>,
}

impl std::fmt::Debug for CrossEncoderScorer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CrossEncoderScorer")
            .field("model_loaded", &self.model.is_model_loaded())
            .finish()
    }
}

impl CrossEncoderScorer {
    pub fn new(model: Arc<dyn RelevanceModel>) -> Self {
        Self { model }
    }

    /// Lexical-overlap scoring with no model loaded.
    pub fn stub() -> Self {
        Self::new(Arc::new(Reranker::stub()))
    }

    pub fn is_model_loaded(&self) -> bool {
        self.model.is_model_loaded()
    }

    /// Scores every candidate in one batch and sorts descending. Equal scores keep input
    /// order.
    #[instrument(skip_all, fields(candidates = candidates.len()))]
    pub async fn rerank(
        &self,
        question: &str,
        candidates: Vec<FusedCandidate>,
    ) -> Result<Vec<RerankedCandidate>, ScoringError> {
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        let model = Arc::clone(&self.model);
        let question = question.to_string();
        let texts: Vec<String> = candidates
            .iter()
            .map(|c| c.passage.content.clone())
            .collect();

        let scores = tokio::task::spawn_blocking(move || {
            let refs: Vec<&str> = texts.iter().map(String::as_str).collect();
            model.score_batch(&question, &refs)
        })
        .await
        .map_err(|e| ScoringError::TaskFailed {
            reason: e.to_string(),
        })??;

        if scores.len() != candidates.len() {
            return Err(ScoringError::LengthMismatch {
                expected: candidates.len(),
                actual: scores.len(),
            });
        }

        let mut reranked: Vec<RerankedCandidate> = candidates
            .into_iter()
            .zip(scores)
            .map(|(candidate, score)| RerankedCandidate {
                passage: candidate.passage,
                relevance_score: score,
                fused_score: candidate.fused_score,
            })
            .collect();
        reranked.sort_by(|a, b| b.relevance_score.total_cmp(&a.relevance_score));

        if let Some(top) = reranked.first() {
            debug!(
                top_score = top.relevance_score,
                top_id = %top.passage.id,
                "Reranked candidates"
            );
        }
        Ok(reranked)
    }
}
