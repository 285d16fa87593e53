use std::sync::Arc;

use serde::Serialize;

use crate::corpus::Passage;

/// A candidate scored by the pairwise relevance model.
#[derive(Debug, Clone)]
pub struct RerankedCandidate {
    pub passage: Arc<Passage>,
    /// Raw model output (logit); higher is more relevant.
    pub relevance_score: f32,
    pub fused_score: f64,
}

/// A reranked candidate with its LLM judgement (`0..=10`, zero when unjudged).
#[derive(Debug, Clone)]
pub struct ExtractedCandidate {
    pub passage: Arc<Passage>,
    pub relevance_score: f32,
    pub llm_score: f32,
}

impl From<RerankedCandidate> for ExtractedCandidate {
    fn from(candidate: RerankedCandidate) -> Self {
        Self {
            passage: candidate.passage,
            relevance_score: candidate.relevance_score,
            llm_score: 0.0,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FinalEntry {
    pub passage: Arc<Passage>,
    pub final_score: f32,
    pub relevance_score: f32,
    pub llm_score: f32,
}

/// Selected passages, best first. Empty means nothing cleared the confidence threshold.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct FinalResult {
    pub entries: Vec<FinalEntry>,
}

impl FinalResult {
    pub fn new(entries: Vec<FinalEntry>) -> Self {
        Self { entries }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FinalEntry> {
        self.entries.iter()
    }

    pub fn passage_ids(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.passage.id.as_str()).collect()
    }
}
