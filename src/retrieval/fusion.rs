//! Weighted reciprocal rank fusion.
//!
//! A candidate at zero-based rank `r` in a list with weight `w` contributes
//! `w / (r + RRF_K)`. Contributions for the same passage id are summed.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use super::types::{FusedCandidate, RetrievalCandidate, RetrievedLists};
use crate::constants::{DEFAULT_SEMANTIC_WEIGHT, RRF_K};
use crate::corpus::Passage;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FusionWeights {
    pub semantic: f64,
    pub lexical: f64,
}

impl Default for FusionWeights {
    fn default() -> Self {
        Self::from_semantic(DEFAULT_SEMANTIC_WEIGHT)
    }
}

impl FusionWeights {
    pub fn new(semantic: f64, lexical: f64) -> Self {
        Self { semantic, lexical }
    }

    /// Lexical weight is `1 - semantic`.
    pub fn from_semantic(semantic: f64) -> Self {
        Self::new(semantic, 1.0 - semantic)
    }

    pub fn validate(&self) -> Result<(), String> {
        let ok = |w: f64| w.is_finite() && w >= 0.0;
        if !ok(self.semantic) || !ok(self.lexical) {
            return Err(format!(
                "fusion weights must be finite and non-negative (semantic {}, lexical {})",
                self.semantic, self.lexical
            ));
        }
        Ok(())
    }
}

struct Accumulator {
    passage: Arc<Passage>,
    score: f64,
    semantic_rank: Option<usize>,
    lexical_rank: Option<usize>,
}

fn semantic_slot(acc: &mut Accumulator) -> &mut Option<usize> {
    &mut acc.semantic_rank
}

fn lexical_slot(acc: &mut Accumulator) -> &mut Option<usize> {
    &mut acc.lexical_rank
}

fn contribution(weight: f64, rank: usize) -> f64 {
    weight / (rank as f64 + RRF_K)
}

fn accumulate<'a>(
    acc: &mut HashMap<&'a str, Accumulator>,
    list: &'a [RetrievalCandidate],
    weight: f64,
    slot: fn(&mut Accumulator) -> &mut Option<usize>,
) {
    for candidate in list {
        let entry = acc
            .entry(candidate.passage.id.as_str())
            .or_insert_with(|| Accumulator {
                passage: Arc::clone(&candidate.passage),
                score: 0.0,
                semantic_rank: None,
                lexical_rank: None,
            });
        entry.score += contribution(weight, candidate.rank);
        let rank = slot(entry);
        *rank = Some(rank.map_or(candidate.rank, |r| r.min(candidate.rank)));
    }
}

/// Fuses both lists into one deduplicated ranking, best first.
///
/// Ties break on semantic rank, then lexical rank (absent ranks last), then passage id.
pub fn reciprocal_rank_fusion(lists: &RetrievedLists, weights: FusionWeights) -> Vec<FusedCandidate> {
    let mut acc: HashMap<&str, Accumulator> =
        HashMap::with_capacity(lists.semantic.len() + lists.lexical.len());

    accumulate(&mut acc, &lists.semantic, weights.semantic, semantic_slot);
    accumulate(&mut acc, &lists.lexical, weights.lexical, lexical_slot);

    let mut fused: Vec<FusedCandidate> = acc
        .into_values()
        .map(|a| FusedCandidate {
            passage: a.passage,
            fused_score: a.score,
            semantic_rank: a.semantic_rank,
            lexical_rank: a.lexical_rank,
        })
        .collect();

    fused.sort_by(compare_fused);
    fused
}

fn compare_fused(a: &FusedCandidate, b: &FusedCandidate) -> Ordering {
    let rank = |r: Option<usize>| r.unwrap_or(usize::MAX);
    b.fused_score
        .total_cmp(&a.fused_score)
        .then_with(|| rank(a.semantic_rank).cmp(&rank(b.semantic_rank)))
        .then_with(|| rank(a.lexical_rank).cmp(&rank(b.lexical_rank)))
        .then_with(|| a.passage.id.cmp(&b.passage.id))
}
