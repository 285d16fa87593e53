//! End-to-end query pipeline.
//!
//! `question -> context resolution -> result cache -> dual retrieval -> rank fusion ->
//! rerank -> [LLM extraction] -> selection -> result cache`.

pub mod config;
pub mod error;
pub mod evaluation;
pub mod service;
pub mod types;


pub use config::PipelineConfig;
pub use error::PipelineError;
pub use evaluation::{EvalGrade, EvalOutcome, EvalQuestion, EvalReport, EvalSet};
pub use service::{RagService, RagServiceBuilder, sanitize_question};
pub use types::{AskOutcome, HistoryTurn, SearchOutcome, TurnRole};
