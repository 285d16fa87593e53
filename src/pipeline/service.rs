//! The query service: owns the active index and every per-query collaborator.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, instrument, warn};

use super::config::PipelineConfig;
use super::error::PipelineError;
use super::types::{AskOutcome, HistoryTurn, SearchOutcome, TurnRole};
use crate::cache::{CacheKey, CacheStatus, ResultCache};
use crate::constants::MAX_QUESTION_CHARS;
use crate::context::{ContextResolver, ConversationHandle, ConversationState, PartitionKeywords};
use crate::corpus::{Passage, discover_chunk_files, load_chunk_files};
use crate::embedding::{BertEmbedder, Embedder, RelevanceModel, Reranker};
use crate::index::{CorpusIndex, IndexCache, IndexHandle, IndexSummary};
use crate::llm::LlmService;
use crate::retrieval::{DualRetriever, reciprocal_rank_fusion};
use crate::scoring::{CandidateExtractor, CrossEncoderScorer, FinalResult, select};
use crate::vectordb::VectorBackend;

pub struct RagService {
    config: PipelineConfig,
    index: IndexHandle,
    index_cache: IndexCache,
    retriever: DualRetriever,
    scorer: CrossEncoderScorer,
    extractor: CandidateExtractor,
    resolver: ContextResolver,
    conversation: ConversationHandle,
    results: ResultCache<Arc<FinalResult>>,
    rebuild: tokio::sync::Mutex<()>,
}

impl std::fmt::Debug for RagService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RagService")
            .field("index", &self.index)
            .field("extractor_active", &self.extractor.is_active())
            .field("results", &self.results)
            .finish()
    }
}

pub struct RagServiceBuilder {
    config: PipelineConfig,
    embedder: Option<Arc<dyn Embedder>>,
    relevance: Option<Arc<dyn RelevanceModel>>,
    llm: Option<Arc<dyn LlmService>>,
    keywords: PartitionKeywords,
    index_dir: PathBuf,
    backend: VectorBackend,
}

impl Default for RagServiceBuilder {
    fn default() -> Self {
        Self {
            config: PipelineConfig::default(),
            embedder: None,
            relevance: None,
            llm: None,
            keywords: PartitionKeywords::default(),
            index_dir: PathBuf::from("./.index"),
            backend: VectorBackend::Memory,
        }
    }
}

impl RagServiceBuilder {
    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn embedder(mut self, embedder: Arc<dyn Embedder>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    pub fn relevance_model(mut self, model: Arc<dyn RelevanceModel>) -> Self {
        self.relevance = Some(model);
        self
    }

    pub fn llm(mut self, llm: Arc<dyn LlmService>) -> Self {
        self.llm = Some(llm);
        self
    }

    pub fn keywords(mut self, keywords: PartitionKeywords) -> Self {
        self.keywords = keywords;
        self
    }

    pub fn index_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.index_dir = dir.into();
        self
    }

    pub fn vector_backend(mut self, backend: VectorBackend) -> Self {
        self.backend = backend;
        self
    }

    /// Missing oracles fall back to their stub implementations.
    pub fn build(self) -> Result<RagService, PipelineError> {
        self.config
            .validate()
            .map_err(|reason| PipelineError::InvalidConfig { reason })?;

        let embedder = self
            .embedder
            .unwrap_or_else(|| Arc::new(BertEmbedder::stub()));
        let relevance = self
            .relevance
            .unwrap_or_else(|| Arc::new(Reranker::stub()));

        let extractor = CandidateExtractor::new(self.llm, self.config.extractor.clone());
        info!(
            embedder_stub = embedder.is_stub(),
            reranker_loaded = relevance.is_model_loaded(),
            extractor_active = extractor.is_active(),
            "Query service configured"
        );

        Ok(RagService {
            index: IndexHandle::new(),
            index_cache: IndexCache::new(
                self.index_dir,
                self.backend,
                self.config.general_partition.clone(),
            ),
            retriever: DualRetriever::new(embedder),
            scorer: CrossEncoderScorer::new(relevance),
            extractor,
            resolver: ContextResolver::new(self.keywords),
            conversation: ConversationHandle::new(),
            results: ResultCache::new(self.config.result_cache.clone()),
            rebuild: tokio::sync::Mutex::new(()),
            config: self.config,
        })
    }
}

/// Strips control characters and surrounding whitespace, rejecting empty or oversized
/// questions.
pub fn sanitize_question(raw: &str) -> Result<String, PipelineError> {
    let cleaned: String = raw
        .chars()
        .map(|c| if matches!(c, '\n' | '\r' | '\t') { ' ' } else { c })
        .filter(|c| !c.is_control())
        .collect();
    let cleaned = cleaned.trim();

    if cleaned.is_empty() {
        return Err(PipelineError::InvalidInput {
            reason: "question is empty".to_string(),
        });
    }
    let chars = cleaned.chars().count();
    if chars > MAX_QUESTION_CHARS {
        return Err(PipelineError::InvalidInput {
            reason: format!("question is {chars} characters, limit is {MAX_QUESTION_CHARS}"),
        });
    }
    Ok(cleaned.to_string())
}

impl RagService {
    pub fn builder() -> RagServiceBuilder {
        RagServiceBuilder::default()
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn is_ready(&self) -> bool {
        self.index.is_ready()
    }

    pub fn summary(&self) -> Option<IndexSummary> {
        self.index.current().map(|index| index.summary())
    }

    pub fn conversation(&self) -> &ConversationHandle {
        &self.conversation
    }

    pub fn result_cache(&self) -> &ResultCache<Arc<FinalResult>> {
        &self.results
    }

    pub fn extractor_active(&self) -> bool {
        self.extractor.is_active()
    }

    /// Builds (or restores) the index for `passages` and makes it active.
    ///
    /// On failure the previously active index, if any, keeps serving.
    #[instrument(skip_all, fields(passages = passages.len()))]
    pub async fn load_corpus(&self, passages: Vec<Passage>) -> Result<IndexSummary, PipelineError> {
        let _guard = self.rebuild.lock().await;

        let index = match self
            .index_cache
            .load_or_build(passages, Arc::clone(self.retriever.embedder()))
            .await
        {
            Ok(index) => index,
            Err(e) => {
                warn!(error = %e, still_serving = self.is_ready(), "Index build failed");
                return Err(e.into());
            }
        };

        let summary = index.summary();
        if let Some(previous) = self.index.install(index) {
            debug!(previous = %previous.fingerprint(), "Replaced active index");
        }
        self.results.clear();
        info!(
            passages = summary.passages,
            partitions = ?summary.partitions,
            "Index active"
        );
        Ok(summary)
    }

    /// Loads every `*.json` chunk file under `dir` and activates the resulting index.
    pub async fn load_corpus_dir(&self, dir: &Path) -> Result<IndexSummary, PipelineError> {
        let dir = dir.to_path_buf();
        let passages = tokio::task::spawn_blocking(move || {
            let files = discover_chunk_files(&dir)?;
            load_chunk_files(&files)
        })
        .await
        .map_err(|e| crate::index::IndexError::TaskFailed {
            reason: e.to_string(),
        })??;

        self.load_corpus(passages).await
    }

    fn active_index(&self) -> Result<Arc<CorpusIndex>, PipelineError> {
        self.index.current().ok_or(PipelineError::NotReady)
    }

    /// Conversational query: resolves the topic partition (carrying it across turns),
    /// then answers from the result cache or the full pipeline.
    ///
    /// With `history`, the prior topic is replayed from its user turns and the shared
    /// conversation state is left alone. Otherwise the resolved topic is stored only once
    /// the turn has produced a result; a failed turn leaves the state as it was.
    #[instrument(skip_all)]
    pub async fn ask(
        &self,
        question: &str,
        history: Option<&[HistoryTurn]>,
    ) -> Result<AskOutcome, PipelineError> {
        let started = Instant::now();
        let question = sanitize_question(question)?;
        let (index, generation) = self
            .index
            .current_versioned()
            .ok_or(PipelineError::NotReady)?;

        let (prior, shared) = match history {
            Some(turns) if !turns.is_empty() => {
                let user_turns = turns
                    .iter()
                    .filter(|t| t.role == TurnRole::User)
                    .map(|t| t.content.as_str());
                (self.resolver.replay(user_turns), false)
            }
            _ => (self.conversation.snapshot(), true),
        };

        let resolution = self.resolver.resolve(&question, &prior);
        let k = self.config.selection.top_k;
        // Results computed against a replaced index can still be in flight after the swap
        // clears the cache; scoping the key keeps them from answering later lookups.
        let key = CacheKey::new(&question, resolution.partition.as_deref(), k)
            .with_generation(generation);

        let (result, cache) = match self.results.get(&key) {
            Some(result) => {
                debug!(partition = ?resolution.partition, "Result cache hit");
                (result, CacheStatus::Hit)
            }
            None => {
                let result = Arc::new(
                    self.run_with_deadline(index, &question, resolution.partition.as_deref(), k)
                        .await?,
                );
                self.results.put(key, Arc::clone(&result));
                (result, CacheStatus::Miss)
            }
        };

        if shared && resolution.state != prior {
            self.conversation.store(resolution.state.clone());
        }

        Ok(AskOutcome {
            result,
            partition: resolution.partition,
            carried_forward: resolution.carried_forward,
            cache,
            elapsed: started.elapsed(),
        })
    }

    /// Search-only query for inspection and evaluation. Reads the conversation state but
    /// never updates it, and bypasses the result cache.
    #[instrument(skip_all, fields(k = k))]
    pub async fn search(&self, question: &str, k: usize) -> Result<SearchOutcome, PipelineError> {
        let prior = self.conversation.snapshot();
        self.search_from(question, k, &prior).await
    }

    /// [`RagService::search`] resolving the topic against `prior` instead of the shared
    /// conversation.
    pub(crate) async fn search_from(
        &self,
        question: &str,
        k: usize,
        prior: &ConversationState,
    ) -> Result<SearchOutcome, PipelineError> {
        let started = Instant::now();
        let question = sanitize_question(question)?;
        if k == 0 {
            return Err(PipelineError::InvalidInput {
                reason: "k must be > 0".to_string(),
            });
        }
        let index = self.active_index()?;

        let resolution = self.resolver.resolve(&question, prior);
        let result = self
            .run_with_deadline(index, &question, resolution.partition.as_deref(), k)
            .await?;

        Ok(SearchOutcome {
            result: Arc::new(result),
            partition: resolution.partition,
            elapsed: started.elapsed(),
        })
    }

    /// Forgets the carried-over topic.
    pub fn reset_conversation(&self) {
        self.conversation.store(ConversationState::default());
    }

    async fn run_with_deadline(
        &self,
        index: Arc<CorpusIndex>,
        question: &str,
        partition: Option<&str>,
        k: usize,
    ) -> Result<FinalResult, PipelineError> {
        let deadline = self.config.query_timeout;
        tokio::time::timeout(deadline, self.run(index, question, partition, k))
            .await
            .map_err(|_| {
                warn!(?deadline, "Query deadline exceeded");
                PipelineError::Timeout { after: deadline }
            })?
    }

    async fn run(
        &self,
        index: Arc<CorpusIndex>,
        question: &str,
        partition: Option<&str>,
        k: usize,
    ) -> Result<FinalResult, PipelineError> {
        let lists = self
            .retriever
            .retrieve(index, question, partition, self.config.initial_k)
            .await?;
        let fused = reciprocal_rank_fusion(&lists, self.config.fusion);

        let reranked = self.scorer.rerank(question, fused).await?;
        let extracted = self.extractor.extract(question, &reranked, k).await;

        let params = self.config.selection.clone().with_top_k(k);
        let result = select(extracted, &params);
        debug!(
            partition = ?partition,
            semantic = lists.semantic.len(),
            lexical = lists.lexical.len(),
            reranked = reranked.len(),
            selected = result.len(),
            "Pipeline complete"
        );
        Ok(result)
    }
}
