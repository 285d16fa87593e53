//! The corpus index: passages plus their vector and lexical lookups.
//!
//! A [`CorpusIndex`] is immutable once assembled. The active version lives in an
//! [`IndexHandle`]; a rebuild assembles a new instance and swaps it in, while queries that
//! already hold an `Arc` keep using the old one.

pub mod cache;
pub mod error;
pub mod snapshot;


pub use cache::IndexCache;
pub use error::IndexError;
pub use snapshot::IndexSnapshot;

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use tracing::{debug, warn};

use crate::corpus::Passage;
use crate::hashing::fingerprint_contents;
use crate::lexical::Bm25Index;
use crate::vectordb::{PartitionFilter, VectorPoint, VectorStore};

/// Content fingerprint of a corpus (lowercase hex BLAKE3).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct IndexFingerprint(String);

impl IndexFingerprint {
    pub fn compute(passages: &[Passage]) -> Self {
        Self(fingerprint_contents(passages.iter().map(|p| p.content.as_str())))
    }

    /// Wraps a fingerprint read back from disk. Surrounding whitespace is ignored.
    pub fn from_stored(raw: &str) -> Self {
        Self(raw.trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IndexFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// How the active index came to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexOrigin {
    /// Embedded from scratch.
    Built,
    /// Vectors restored from a persisted snapshot.
    Snapshot,
}

/// BM25 indexes over the whole corpus and over each partition.
#[derive(Debug, Clone)]
pub struct LexicalIndexes {
    all: Bm25Index,
    by_partition: HashMap<String, Bm25Index>,
}

impl LexicalIndexes {
    pub fn build(passages: &[Arc<Passage>]) -> Self {
        let mut grouped: HashMap<String, Vec<Arc<Passage>>> = HashMap::new();
        for passage in passages {
            grouped
                .entry(passage.topic_partition.clone())
                .or_default()
                .push(Arc::clone(passage));
        }

        let by_partition = grouped
            .into_iter()
            .map(|(partition, members)| (partition, Bm25Index::build(&members)))
            .collect();

        Self {
            all: Bm25Index::build(passages),
            by_partition,
        }
    }

    /// With a partition: that partition's hits followed by the general partition's hits.
    /// Without one: hits from the whole corpus.
    pub fn search(
        &self,
        question: &str,
        k: usize,
        partition: Option<&str>,
        general_partition: &str,
    ) -> Vec<Arc<Passage>> {
        let Some(partition) = partition else {
            return self.all.query(question, k);
        };

        let mut results = self
            .by_partition
            .get(partition)
            .map(|index| index.query(question, k))
            .unwrap_or_default();

        if partition != general_partition
            && let Some(general) = self.by_partition.get(general_partition)
        {
            results.extend(general.query(question, k));
        }
        results
    }
}

/// One immutable version of the searchable corpus.
pub struct CorpusIndex {
    passages: Vec<Arc<Passage>>,
    by_id: HashMap<String, Arc<Passage>>,
    vectors: Arc<dyn VectorStore>,
    lexical: LexicalIndexes,
    fingerprint: IndexFingerprint,
    general_partition: String,
    origin: IndexOrigin,
    built_at: DateTime<Utc>,
}

impl fmt::Debug for CorpusIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CorpusIndex")
            .field("passages", &self.passages.len())
            .field("vector_backend", &self.vectors.backend_name())
            .field("fingerprint", &self.fingerprint)
            .field("origin", &self.origin)
            .finish()
    }
}

/// Parts of a [`CorpusIndex`] produced before the vector store is filled.
pub struct IndexParts {
    pub passages: Vec<Arc<Passage>>,
    pub vectors: Vec<Vec<f32>>,
    pub lexical: LexicalIndexes,
    pub fingerprint: IndexFingerprint,
    pub origin: IndexOrigin,
}

impl CorpusIndex {
    /// Loads `parts.vectors` into `store` and wraps everything into an index.
    pub async fn assemble(
        parts: IndexParts,
        store: Arc<dyn VectorStore>,
        general_partition: &str,
    ) -> Result<Self, IndexError> {
        if parts.passages.len() != parts.vectors.len() {
            return Err(IndexError::Snapshot {
                reason: format!(
                    "{} passages but {} vectors",
                    parts.passages.len(),
                    parts.vectors.len()
                ),
            });
        }

        let points: Vec<VectorPoint> = parts
            .passages
            .iter()
            .zip(parts.vectors)
            .map(|(p, v)| VectorPoint::new(p.id.clone(), p.topic_partition.clone(), v))
            .collect();
        store.add(points).await?;

        let by_id = parts
            .passages
            .iter()
            .map(|p| (p.id.clone(), Arc::clone(p)))
            .collect();

        debug!(
            passages = parts.passages.len(),
            backend = store.backend_name(),
            "Corpus index assembled"
        );

        Ok(Self {
            passages: parts.passages,
            by_id,
            vectors: store,
            lexical: parts.lexical,
            fingerprint: parts.fingerprint,
            general_partition: general_partition.to_string(),
            origin: parts.origin,
            built_at: Utc::now(),
        })
    }

    pub fn len(&self) -> usize {
        self.passages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.passages.is_empty()
    }

    pub fn passages(&self) -> &[Arc<Passage>] {
        &self.passages
    }

    pub fn passage(&self, id: &str) -> Option<&Arc<Passage>> {
        self.by_id.get(id)
    }

    pub fn fingerprint(&self) -> &IndexFingerprint {
        &self.fingerprint
    }

    pub fn origin(&self) -> IndexOrigin {
        self.origin
    }

    pub fn general_partition(&self) -> &str {
        &self.general_partition
    }

    /// Distinct partitions, sorted.
    pub fn partitions(&self) -> Vec<String> {
        self.passages
            .iter()
            .map(|p| p.topic_partition.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Nearest passages to `vector`; with a partition, restricted to it and the general
    /// partition.
    pub async fn semantic_search(
        &self,
        vector: &[f32],
        k: usize,
        partition: Option<&str>,
    ) -> Result<Vec<Arc<Passage>>, IndexError> {
        let filter =
            partition.map(|p| PartitionFilter::new([p, self.general_partition.as_str()]));
        let hits = self.vectors.query(vector, k, filter.as_ref()).await?;

        Ok(hits
            .into_iter()
            .filter_map(|hit| match self.by_id.get(&hit.passage_id) {
                Some(passage) => Some(Arc::clone(passage)),
                None => {
                    warn!(passage_id = %hit.passage_id, "Vector hit has no passage, skipping");
                    None
                }
            })
            .collect())
    }

    pub fn lexical_search(
        &self,
        question: &str,
        k: usize,
        partition: Option<&str>,
    ) -> Vec<Arc<Passage>> {
        self.lexical
            .search(question, k, partition, &self.general_partition)
    }

    pub fn summary(&self) -> IndexSummary {
        IndexSummary {
            passages: self.len(),
            partitions: self.partitions(),
            fingerprint: self.fingerprint.clone(),
            origin: self.origin,
            built_at: self.built_at,
        }
    }
}

/// Reportable facts about an index version.
#[derive(Debug, Clone, Serialize)]
pub struct IndexSummary {
    pub passages: usize,
    pub partitions: Vec<String>,
    pub fingerprint: IndexFingerprint,
    pub origin: IndexOrigin,
    pub built_at: DateTime<Utc>,
}

#[derive(Default)]
struct ActiveSlot {
    generation: u64,
    index: Option<Arc<CorpusIndex>>,
}

/// Shared slot holding the active index version.
///
/// Every install bumps a generation counter so work started against one version can be
/// told apart from work started against the next.
#[derive(Clone, Default)]
pub struct IndexHandle {
    inner: Arc<RwLock<ActiveSlot>>,
}

impl IndexHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// The active index, if one has been installed.
    pub fn current(&self) -> Option<Arc<CorpusIndex>> {
        self.inner.read().index.clone()
    }

    /// The active index together with the generation it was installed as.
    pub fn current_versioned(&self) -> Option<(Arc<CorpusIndex>, u64)> {
        let slot = self.inner.read();
        slot.index.clone().map(|index| (index, slot.generation))
    }

    pub fn generation(&self) -> u64 {
        self.inner.read().generation
    }

    /// Makes `index` active and returns the version it replaced.
    pub fn install(&self, index: CorpusIndex) -> Option<Arc<CorpusIndex>> {
        let mut slot = self.inner.write();
        slot.generation += 1;
        slot.index.replace(Arc::new(index))
    }

    pub fn is_ready(&self) -> bool {
        self.inner.read().index.is_some()
    }
}

impl fmt::Debug for IndexHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let slot = self.inner.read();
        f.debug_struct("IndexHandle")
            .field("ready", &slot.index.is_some())
            .field("generation", &slot.generation)
            .finish()
    }
}
