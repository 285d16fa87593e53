use std::time::Duration;

use crate::cache::ResultCacheConfig;
use crate::constants::{DEFAULT_GENERAL_PARTITION, DEFAULT_INITIAL_K, DEFAULT_QUERY_TIMEOUT_SECS};
use crate::retrieval::FusionWeights;
use crate::scoring::{ExtractorConfig, SelectionParams};

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Candidates fetched per retrieval branch.
    pub initial_k: usize,
    pub fusion: FusionWeights,
    pub selection: SelectionParams,
    pub extractor: ExtractorConfig,
    pub result_cache: ResultCacheConfig,
    pub query_timeout: Duration,
    /// Partition searched alongside any resolved one.
    pub general_partition: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            initial_k: DEFAULT_INITIAL_K,
            fusion: FusionWeights::default(),
            selection: SelectionParams::default(),
            extractor: ExtractorConfig::default(),
            result_cache: ResultCacheConfig::default(),
            query_timeout: Duration::from_secs(DEFAULT_QUERY_TIMEOUT_SECS),
            general_partition: DEFAULT_GENERAL_PARTITION.to_string(),
        }
    }
}

impl PipelineConfig {
    pub fn with_initial_k(mut self, initial_k: usize) -> Self {
        self.initial_k = initial_k;
        self
    }

    pub fn with_fusion(mut self, fusion: FusionWeights) -> Self {
        self.fusion = fusion;
        self
    }

    pub fn with_selection(mut self, selection: SelectionParams) -> Self {
        self.selection = selection;
        self
    }

    pub fn with_extractor(mut self, extractor: ExtractorConfig) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn with_result_cache(mut self, result_cache: ResultCacheConfig) -> Self {
        self.result_cache = result_cache;
        self
    }

    pub fn with_query_timeout(mut self, query_timeout: Duration) -> Self {
        self.query_timeout = query_timeout;
        self
    }

    pub fn with_general_partition(mut self, general_partition: impl Into<String>) -> Self {
        self.general_partition = general_partition.into();
        self
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.initial_k == 0 {
            return Err("initial_k must be > 0".to_string());
        }
        if self.query_timeout.is_zero() {
            return Err("query_timeout must be > 0".to_string());
        }
        if self.general_partition.trim().is_empty() {
            return Err("general_partition cannot be empty".to_string());
        }
        self.fusion.validate()?;
        self.selection.validate()?;
        self.extractor.validate()?;
        self.result_cache.validate()
    }
}
