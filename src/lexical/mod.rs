//! In-process BM25 index over passages.
//!
//! Scores use the Okapi BM25 form with the non-negative IDF
//! `ln((N - df + 0.5) / (df + 0.5) + 1)`. Documents that share no term with the query
//! score zero and are never returned.

pub mod tokenize;


pub use tokenize::{normalize, tokenize};

use std::collections::HashMap;
use std::sync::Arc;

use crate::corpus::Passage;

pub const DEFAULT_K1: f32 = 1.5;
pub const DEFAULT_B: f32 = 0.75;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bm25Params {
    pub k1: f32,
    pub b: f32,
}

impl Default for Bm25Params {
    fn default() -> Self {
        Self {
            k1: DEFAULT_K1,
            b: DEFAULT_B,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Posting {
    doc: u32,
    tf: u32,
}

/// Immutable BM25 index; build once, query from any thread.
#[derive(Debug, Clone)]
pub struct Bm25Index {
    passages: Vec<Arc<Passage>>,
    doc_lengths: Vec<u32>,
    postings: HashMap<String, Vec<Posting>>,
    avgdl: f32,
    params: Bm25Params,
}

impl Bm25Index {
    pub fn build(passages: &[Arc<Passage>]) -> Self {
        Self::build_with_params(passages, Bm25Params::default())
    }

    pub fn build_with_params(passages: &[Arc<Passage>], params: Bm25Params) -> Self {
        let mut postings: HashMap<String, Vec<Posting>> = HashMap::new();
        let mut doc_lengths = Vec::with_capacity(passages.len());

        for (doc, passage) in passages.iter().enumerate() {
            let terms = tokenize(&passage.content);
            doc_lengths.push(terms.len() as u32);

            let mut counts: HashMap<String, u32> = HashMap::new();
            for term in terms {
                *counts.entry(term).or_insert(0) += 1;
            }
            for (term, tf) in counts {
                postings.entry(term).or_default().push(Posting {
                    doc: doc as u32,
                    tf,
                });
            }
        }

        let total: u64 = doc_lengths.iter().map(|&l| l as u64).sum();
        let avgdl = if doc_lengths.is_empty() {
            0.0
        } else {
            total as f32 / doc_lengths.len() as f32
        };

        Self {
            passages: passages.to_vec(),
            doc_lengths,
            postings,
            avgdl,
            params,
        }
    }

    pub fn len(&self) -> usize {
        self.passages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.passages.is_empty()
    }

    fn idf(&self, df: usize) -> f32 {
        let n = self.passages.len() as f32;
        let df = df as f32;
        ((n - df + 0.5) / (df + 0.5) + 1.0).ln()
    }

    /// Top `k` passages with their scores, best first.
    ///
    /// Equal scores keep corpus order.
    pub fn query_scored(&self, text: &str, k: usize) -> Vec<(Arc<Passage>, f32)> {
        if k == 0 || self.passages.is_empty() {
            return Vec::new();
        }

        let mut scores = vec![0.0f32; self.passages.len()];
        let Bm25Params { k1, b } = self.params;
        let avgdl = self.avgdl.max(f32::EPSILON);

        for term in tokenize(text) {
            let Some(postings) = self.postings.get(&term) else {
                continue;
            };
            let idf = self.idf(postings.len());
            for posting in postings {
                let doc = posting.doc as usize;
                let tf = posting.tf as f32;
                let len_norm = 1.0 - b + b * (self.doc_lengths[doc] as f32 / avgdl);
                scores[doc] += idf * (tf * (k1 + 1.0)) / (tf + k1 * len_norm);
            }
        }

        let mut ranked: Vec<(usize, f32)> = scores
            .into_iter()
            .enumerate()
            .filter(|(_, score)| *score > 0.0)
            .collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        ranked.truncate(k);

        ranked
            .into_iter()
            .map(|(doc, score)| (Arc::clone(&self.passages[doc]), score))
            .collect()
    }

    /// Top `k` passages, best first.
    pub fn query(&self, text: &str, k: usize) -> Vec<Arc<Passage>> {
        self.query_scored(text, k)
            .into_iter()
            .map(|(passage, _)| passage)
            .collect()
    }
}
