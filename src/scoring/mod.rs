//! Post-retrieval ranking: cross-encoder rerank, optional LLM extraction, final selection.

pub mod error;
pub mod extractor;
pub mod reranker;
pub mod selection;
pub mod types;


pub use error::ScoringError;
pub use extractor::{CandidateExtractor, ExtractorConfig, build_prompt, parse_scores};
pub use reranker::CrossEncoderScorer;
pub use selection::{SelectionParams, select};
pub use types::{ExtractedCandidate, FinalEntry, FinalResult, RerankedCandidate};
