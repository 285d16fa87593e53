//! Optional LLM pass that judges how useful each top candidate is for the question.
//!
//! The LLM is asked for one `passage_id: score` line per candidate. Extraction never
//! fails: if the LLM is unavailable the candidates come back in reranker order with an
//! LLM score of zero.

use std::collections::{HashMap, HashSet};
use std::fmt::Write as _;
use std::sync::Arc;

use tracing::{debug, instrument, warn};

use super::types::{ExtractedCandidate, RerankedCandidate};
use crate::constants::{
    DEFAULT_EXTRACT_KEEP, DEFAULT_EXTRACT_TOP_N, EXTRACT_PREVIEW_CHARS, LLM_SCORE_MAX,
};
use crate::llm::LlmService;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractorConfig {
    pub enabled: bool,
    /// Reranked candidates shown to the LLM.
    pub top_n: usize,
    /// Candidates returned.
    pub keep: usize,
    /// Characters of content per candidate in the prompt.
    pub preview_chars: usize,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            top_n: DEFAULT_EXTRACT_TOP_N,
            keep: DEFAULT_EXTRACT_KEEP,
            preview_chars: EXTRACT_PREVIEW_CHARS,
        }
    }
}

impl ExtractorConfig {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_top_n(mut self, top_n: usize) -> Self {
        self.top_n = top_n;
        self
    }

    pub fn with_keep(mut self, keep: usize) -> Self {
        self.keep = keep;
        self
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.top_n == 0 {
            return Err("extract top_n must be > 0".to_string());
        }
        if self.keep == 0 {
            return Err("extract keep must be > 0".to_string());
        }
        if self.preview_chars == 0 {
            return Err("extract preview_chars must be > 0".to_string());
        }
        Ok(())
    }
}

pub struct CandidateExtractor {
    llm: Option<Arc<dyn LlmService>>,
    config: ExtractorConfig,
}

impl std::fmt::Debug for CandidateExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CandidateExtractor")
            .field("llm", &self.llm.as_ref().map(|l| l.name().to_string()))
            .field("config", &self.config)
            .finish()
    }
}

impl CandidateExtractor {
    pub fn new(llm: Option<Arc<dyn LlmService>>, config: ExtractorConfig) -> Self {
        Self { llm, config }
    }

    pub fn disabled() -> Self {
        Self::new(None, ExtractorConfig::disabled())
    }

    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    /// True when an LLM will actually be consulted.
    pub fn is_active(&self) -> bool {
        self.config.enabled && self.llm.is_some()
    }

    /// Up to `max(keep, top_k)` candidates, best LLM score first. Equal LLM scores keep
    /// reranker order.
    ///
    /// `top_k` is the caller's final result size; the LLM is shown at least that many
    /// candidates so a large `k` is not capped by the extractor.
    #[instrument(skip_all, fields(candidates = reranked.len(), top_k = top_k, active = self.is_active()))]
    pub async fn extract(
        &self,
        question: &str,
        reranked: &[RerankedCandidate],
        top_k: usize,
    ) -> Vec<ExtractedCandidate> {
        let keep = self.config.keep.max(top_k);
        let llm = match &self.llm {
            Some(llm) if self.config.enabled && !reranked.is_empty() => llm,
            _ => return passthrough(reranked, keep),
        };

        let shown = &reranked[..reranked.len().min(self.config.top_n.max(top_k))];
        let prompt = build_prompt(question, shown, self.config.preview_chars);

        let response = match llm.invoke(&prompt).await {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "LLM extraction failed, keeping reranker order");
                return passthrough(reranked, keep);
            }
        };

        let known: HashSet<&str> = shown.iter().map(|c| c.passage.id.as_str()).collect();
        let scores = parse_scores(&response, &known);
        debug!(scored = scores.len(), shown = shown.len(), "Parsed LLM scores");

        let mut extracted: Vec<ExtractedCandidate> = shown
            .iter()
            .map(|c| ExtractedCandidate {
                passage: Arc::clone(&c.passage),
                relevance_score: c.relevance_score,
                llm_score: scores.get(c.passage.id.as_str()).copied().unwrap_or(0.0),
            })
            .collect();
        extracted.sort_by(|a, b| b.llm_score.total_cmp(&a.llm_score));
        extracted.truncate(keep);
        extracted
    }
}

fn passthrough(reranked: &[RerankedCandidate], keep: usize) -> Vec<ExtractedCandidate> {
    reranked
        .iter()
        .take(keep)
        .cloned()
        .map(ExtractedCandidate::from)
        .collect()
}

/// Renders the scoring prompt for `candidates`, each shown as `[id]` and a content preview.
pub fn build_prompt(question: &str, candidates: &[RerankedCandidate], preview_chars: usize) -> String {
    let mut listing = String::new();
    for candidate in candidates {
        let preview: String = candidate.passage.content.chars().take(preview_chars).collect();
        let _ = write!(listing, "\n[{}]\n{}\n", candidate.passage.id, preview);
    }

    format!(
        "You are judging search results for a question about hot springs.\n\
         Rate how useful each passage is for answering the question, from 0 (useless) \
         to 10 (answers it directly).\n\n\
         Question: {question}\n\n\
         Passages:\n{listing}\n\
         Reply with one line per passage in the form `passage_id: score` and nothing else."
    )
}

/// Reads `id: score` lines, keeping only ids in `known`.
///
/// The separator is the last ASCII or full-width colon on the line. Brackets around the id
/// are ignored, scores are clamped to `0..=10` and a later line for the same id wins.
pub fn parse_scores(response: &str, known: &HashSet<&str>) -> HashMap<String, f32> {
    let mut scores = HashMap::new();

    for line in response.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let Some((split, sep)) = line
            .char_indices()
            .rev()
            .find(|(_, c)| matches!(c, ':' | '：'))
        else {
            continue;
        };

        let id = line[..split]
            .trim()
            .trim_start_matches(['-', '*', ' '])
            .trim_matches(['[', ']', '`'])
            .trim();
        if !known.contains(id) {
            continue;
        }

        let raw = line[split + sep.len_utf8()..].trim();
        let raw = raw.split('/').next().unwrap_or(raw).trim();
        let Ok(score) = raw.parse::<f32>() else {
            continue;
        };
        if score.is_nan() {
            continue;
        }
        scores.insert(id.to_string(), score.clamp(0.0, LLM_SCORE_MAX));
    }

    scores
}
