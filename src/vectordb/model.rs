use std::collections::BTreeSet;

/// A passage vector as stored in a [`VectorStore`](super::VectorStore).
#[derive(Debug, Clone, PartialEq)]
pub struct VectorPoint {
    pub passage_id: String,
    pub partition: String,
    pub vector: Vec<f32>,
}

impl VectorPoint {
    pub fn new(passage_id: impl Into<String>, partition: impl Into<String>, vector: Vec<f32>) -> Self {
        Self {
            passage_id: passage_id.into(),
            partition: partition.into(),
            vector,
        }
    }
}

/// One similarity-search result. Higher `score` is more similar.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorHit {
    pub passage_id: String,
    pub score: f32,
}

/// Restricts a search to points whose partition is in the set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionFilter {
    partitions: BTreeSet<String>,
}

impl PartitionFilter {
    pub fn new<I, S>(partitions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            partitions: partitions.into_iter().map(Into::into).collect(),
        }
    }

    pub fn contains(&self, partition: &str) -> bool {
        self.partitions.contains(partition)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.partitions.iter().map(String::as_str)
    }
}

/// Cosine similarity; zero when either vector has no magnitude.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}
