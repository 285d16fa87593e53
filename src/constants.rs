//! Cross-cutting, shared constants.
//!
//! Pipeline defaults live here so that [`crate::config`], [`crate::pipeline`] and the
//! tests agree on them. Runtime overrides go through [`crate::Config`].

/// Smoothing constant `k` of reciprocal-rank fusion.
pub const RRF_K: f64 = 60.0;

pub const DEFAULT_SEMANTIC_WEIGHT: f64 = 0.5;

/// Candidates fetched per retrieval strategy before fusion.
pub const DEFAULT_INITIAL_K: usize = 10;

/// Passages returned to the caller.
pub const DEFAULT_FINAL_K: usize = 3;

/// Cross-encoder logits below this value are discarded.
pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = -3.0;

pub const DEFAULT_CE_WEIGHT: f32 = 0.4;
pub const DEFAULT_LLM_WEIGHT: f32 = 0.6;

/// Upper bound of the LLM relevance scale (scores are `0..=10`).
pub const LLM_SCORE_MAX: f32 = 10.0;

/// Reranked candidates shown to the LLM extractor.
pub const DEFAULT_EXTRACT_TOP_N: usize = 10;

/// Candidates kept by the LLM extractor.
pub const DEFAULT_EXTRACT_KEEP: usize = 5;

/// Characters of passage content included in the extraction prompt.
pub const EXTRACT_PREVIEW_CHARS: usize = 300;

pub const DEFAULT_RESULT_CACHE_CAPACITY: usize = 128;
pub const DEFAULT_RESULT_CACHE_TTL_SECS: u64 = 300;

/// Question embeddings kept in memory.
pub const DEFAULT_QUERY_EMBEDDING_CACHE_CAPACITY: u64 = 1_024;

/// Leading characters of each passage that feed the index fingerprint.
pub const FINGERPRINT_PREFIX_CHARS: usize = 50;

/// Partition searched alongside any resolved topic partition.
pub const DEFAULT_GENERAL_PARTITION: &str = "onsen";

/// Partition assigned to passages whose id carries no usable prefix.
pub const UNKNOWN_PARTITION: &str = "unknown";

pub const DEFAULT_QUERY_TIMEOUT_SECS: u64 = 60;

/// Largest `k` accepted by the search endpoint.
pub const MAX_SEARCH_K: usize = 20;

/// Questions longer than this (in characters) are rejected.
pub const MAX_QUESTION_CHARS: usize = 2_000;

/// Dimension of the hashed bag-of-tokens embedding used in stub mode.
pub const STUB_EMBEDDING_DIM: usize = 384;

pub const DEFAULT_MAX_SEQ_LEN: usize = 512;

pub const DEFAULT_COLLECTION_PREFIX: &str = "onsen_passages";

pub const SNAPSHOT_FILENAME: &str = "index.rkyv";
pub const FINGERPRINT_FILENAME: &str = "index.fingerprint";
