use std::sync::Arc;

use crate::corpus::Passage;

/// Which retrieval branch produced a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceStrategy {
    Semantic,
    Lexical,
}

#[derive(Debug, Clone)]
pub struct RetrievalCandidate {
    pub passage: Arc<Passage>,
    /// Zero-based position in its list.
    pub rank: usize,
    pub source: SourceStrategy,
}

/// Ranked output of both branches.
#[derive(Debug, Clone, Default)]
pub struct RetrievedLists {
    pub semantic: Vec<RetrievalCandidate>,
    pub lexical: Vec<RetrievalCandidate>,
}

impl RetrievedLists {
    pub fn new(semantic: Vec<Arc<Passage>>, lexical: Vec<Arc<Passage>>) -> Self {
        Self {
            semantic: ranked(semantic, SourceStrategy::Semantic),
            lexical: ranked(lexical, SourceStrategy::Lexical),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.semantic.is_empty() && self.lexical.is_empty()
    }
}

fn ranked(passages: Vec<Arc<Passage>>, source: SourceStrategy) -> Vec<RetrievalCandidate> {
    passages
        .into_iter()
        .enumerate()
        .map(|(rank, passage)| RetrievalCandidate {
            passage,
            rank,
            source,
        })
        .collect()
}

/// A passage after rank fusion.
#[derive(Debug, Clone)]
pub struct FusedCandidate {
    pub passage: Arc<Passage>,
    pub fused_score: f64,
    /// Best zero-based rank in the semantic list, if present there.
    pub semantic_rank: Option<usize>,
    pub lexical_rank: Option<usize>,
}
