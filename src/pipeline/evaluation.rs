//! Offline retrieval evaluation against a labelled question set.
//!
//! A question file is `{"questions": [{"question", "expected_chunk", "expected_answer_keywords"}]}`.
//! Each question is run through the search path from an empty conversation, so grades do
//! not depend on topics carried over from live traffic, and graded by how many expected
//! keywords appear in the retrieved passages.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use super::error::PipelineError;
use super::service::RagService;
use crate::context::ConversationState;
use crate::corpus::CorpusError;

/// Passages retrieved per evaluation question.
pub const EVALUATION_K: usize = 3;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvalQuestion {
    pub question: String,
    #[serde(default)]
    pub expected_chunk: Option<String>,
    #[serde(default)]
    pub expected_answer_keywords: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EvalSet {
    pub questions: Vec<EvalQuestion>,
}

impl EvalSet {
    pub fn from_path(path: &Path) -> Result<Self, CorpusError> {
        let raw = std::fs::read_to_string(path).map_err(|source| CorpusError::ReadFailed {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| CorpusError::ParseFailed {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EvalGrade {
    /// At least half the keywords found.
    Ok,
    /// Some keywords found.
    Warn,
    Bad,
}

impl EvalGrade {
    pub fn from_rate(rate: f32) -> Self {
        if rate >= 0.5 {
            EvalGrade::Ok
        } else if rate > 0.0 {
            EvalGrade::Warn
        } else {
            EvalGrade::Bad
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EvalOutcome {
    pub question: String,
    pub expected_chunk: Option<String>,
    pub retrieved: Vec<String>,
    /// `Some(true)` when the expected chunk was retrieved.
    pub chunk_hit: Option<bool>,
    pub matched_keywords: Vec<String>,
    pub match_rate: f32,
    pub grade: EvalGrade,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct EvalReport {
    pub outcomes: Vec<EvalOutcome>,
    pub ok: usize,
    pub warn: usize,
    pub bad: usize,
}

impl EvalReport {
    pub fn total(&self) -> usize {
        self.outcomes.len()
    }
}

impl RagService {
    /// Runs every question through the search path and grades the retrieved passages.
    pub async fn evaluate(&self, set: &EvalSet) -> Result<EvalReport, PipelineError> {
        let mut report = EvalReport::default();
        let fresh = ConversationState::default();

        for item in &set.questions {
            let outcome = self.search_from(&item.question, EVALUATION_K, &fresh).await?;
            let retrieved: Vec<String> = outcome
                .result
                .passage_ids()
                .into_iter()
                .map(str::to_string)
                .collect();
            let text: String = outcome
                .result
                .iter()
                .map(|e| e.passage.content.as_str())
                .collect::<Vec<_>>()
                .join(" ");

            let matched_keywords: Vec<String> = item
                .expected_answer_keywords
                .iter()
                .filter(|kw| text.contains(kw.as_str()))
                .cloned()
                .collect();
            let match_rate = if item.expected_answer_keywords.is_empty() {
                0.0
            } else {
                matched_keywords.len() as f32 / item.expected_answer_keywords.len() as f32
            };
            let grade = EvalGrade::from_rate(match_rate);
            match grade {
                EvalGrade::Ok => report.ok += 1,
                EvalGrade::Warn => report.warn += 1,
                EvalGrade::Bad => report.bad += 1,
            }

            report.outcomes.push(EvalOutcome {
                question: item.question.clone(),
                chunk_hit: item
                    .expected_chunk
                    .as_ref()
                    .map(|expected| retrieved.iter().any(|id| id == expected)),
                expected_chunk: item.expected_chunk.clone(),
                retrieved,
                matched_keywords,
                match_rate,
                grade,
            });
        }

        info!(
            total = report.total(),
            ok = report.ok,
            warn = report.warn,
            bad = report.bad,
            "Evaluation complete"
        );
        Ok(report)
    }
}
