//! Onsen library crate (used by the server binary and integration tests).
//!
//! # Public API Surface
//!
//! ## Query Path
//! - [`RagService`], [`RagServiceBuilder`] - ask/search entry points and corpus loading
//! - [`ContextResolver`], [`PartitionKeywords`] - topic partition carry-over
//! - [`DualRetriever`], [`reciprocal_rank_fusion`] - semantic + BM25 retrieval and fusion
//! - [`CrossEncoderScorer`], [`CandidateExtractor`], [`select`] - reranking and selection
//!
//! ## Corpus & Index
//! - [`Passage`], [`load_chunk_files`] - chunk JSON loading
//! - [`CorpusIndex`], [`IndexCache`], [`IndexHandle`] - fingerprinted, swappable indexes
//!
//! ## Oracles
//! - [`BertEmbedder`], [`Reranker`] - candle models with deterministic stubs
//! - [`LlmService`], [`ProviderChain`], [`GenaiProvider`] - LLM access with fallback
//!
//! ## Test/Mock Support
//! Mock implementations are available behind `#[cfg(any(test, feature = "mock"))]`.

pub mod cache;
pub mod config;
pub mod constants;
pub mod context;
pub mod corpus;
pub mod embedding;
pub mod gateway;
pub mod hashing;
pub mod index;
pub mod lexical;
pub mod llm;
pub mod pipeline;
pub mod retrieval;
pub mod scoring;
pub mod vectordb;

pub use cache::{
    CacheKey, CacheStatus, ONSEN_CACHE_HEADER, ONSEN_STATUS_HEADER, QueryEmbeddingCache,
    ResultCache, ResultCacheConfig,
};
pub use config::{Config, ConfigError, ExtractionMode};
pub use context::{ContextResolver, ConversationState, Detection, PartitionKeywords, Resolution};
pub use corpus::{CorpusError, Passage, discover_chunk_files, load_chunk_files};
pub use embedding::{
    BertEmbedder, EmbedKind, Embedder, EmbedderConfig, EmbeddingError, RelevanceModel, Reranker,
    RerankerConfig, RerankerError,
};
pub use index::{CorpusIndex, IndexCache, IndexError, IndexHandle, IndexSummary};
pub use lexical::Bm25Index;
#[cfg(any(test, feature = "mock"))]
pub use llm::MockLlm;
pub use llm::{GenaiProvider, LlmError, LlmService, ProviderChain, RetryPolicy};
pub use pipeline::{
    AskOutcome, EvalReport, EvalSet, HistoryTurn, PipelineConfig, PipelineError, RagService,
    RagServiceBuilder, SearchOutcome,
};
pub use retrieval::{DualRetriever, FusedCandidate, FusionWeights, reciprocal_rank_fusion};
pub use scoring::{
    CandidateExtractor, CrossEncoderScorer, ExtractorConfig, FinalEntry, FinalResult,
    ScoringError, SelectionParams, select,
};
pub use vectordb::{MemoryVectorStore, QdrantStore, VectorBackend, VectorDbError, VectorStore};
