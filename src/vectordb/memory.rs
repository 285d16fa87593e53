//! In-process brute-force vector store.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::debug;

use super::error::VectorDbError;
use super::model::{PartitionFilter, VectorHit, VectorPoint, cosine_similarity};
use super::VectorStore;

/// Exact cosine search over every stored point.
///
/// Adequate for corpora of a few thousand passages.
pub struct MemoryVectorStore {
    dimension: usize,
    state: RwLock<StoreState>,
}

#[derive(Default)]
struct StoreState {
    points: Vec<VectorPoint>,
    positions: HashMap<String, usize>,
}

impl MemoryVectorStore {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            state: RwLock::new(StoreState::default()),
        }
    }

    pub fn len(&self) -> usize {
        self.state.read().points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.read().points.is_empty()
    }

    fn check_dimension(&self, vector: &[f32]) -> Result<(), VectorDbError> {
        if vector.len() != self.dimension {
            return Err(VectorDbError::InvalidDimension {
                expected: self.dimension,
                actual: vector.len(),
            });
        }
        Ok(())
    }
}

impl std::fmt::Debug for MemoryVectorStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryVectorStore")
            .field("dimension", &self.dimension)
            .field("points", &self.len())
            .finish()
    }
}

#[async_trait]
impl VectorStore for MemoryVectorStore {
    async fn add(&self, points: Vec<VectorPoint>) -> Result<(), VectorDbError> {
        for point in &points {
            self.check_dimension(&point.vector)?;
        }

        let mut state = self.state.write();
        for point in points {
            match state.positions.get(&point.passage_id).copied() {
                Some(pos) => state.points[pos] = point,
                None => {
                    let pos = state.points.len();
                    state.positions.insert(point.passage_id.clone(), pos);
                    state.points.push(point);
                }
            }
        }
        debug!(points = state.points.len(), "Memory vector store updated");
        Ok(())
    }

    async fn query(
        &self,
        vector: &[f32],
        k: usize,
        filter: Option<&PartitionFilter>,
    ) -> Result<Vec<VectorHit>, VectorDbError> {
        self.check_dimension(vector)?;
        if k == 0 {
            return Ok(Vec::new());
        }

        let state = self.state.read();
        let mut hits: Vec<VectorHit> = state
            .points
            .iter()
            .filter(|p| filter.is_none_or(|f| f.contains(&p.partition)))
            .map(|p| VectorHit {
                passage_id: p.passage_id.clone(),
                score: cosine_similarity(vector, &p.vector),
            })
            .collect();

        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        hits.truncate(k);
        Ok(hits)
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
