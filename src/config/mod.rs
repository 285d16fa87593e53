//! Environment-backed configuration.
//!
//! Every setting has a default. Override with `ONSEN_*` environment variables.

pub mod error;

#[cfg(test)]
mod tests;

pub use error::ConfigError;

use std::env;
use std::fmt::Display;
use std::net::IpAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::cache::ResultCacheConfig;
use crate::constants::{
    DEFAULT_CE_WEIGHT, DEFAULT_CONFIDENCE_THRESHOLD, DEFAULT_FINAL_K, DEFAULT_GENERAL_PARTITION,
    DEFAULT_INITIAL_K, DEFAULT_LLM_WEIGHT, DEFAULT_QUERY_TIMEOUT_SECS,
    DEFAULT_RESULT_CACHE_CAPACITY, DEFAULT_RESULT_CACHE_TTL_SECS, DEFAULT_SEMANTIC_WEIGHT,
};
use crate::context::PartitionKeywords;
use crate::embedding::{EmbedderConfig, RerankerConfig};
use crate::llm::RetryPolicy;
use crate::pipeline::PipelineConfig;
use crate::retrieval::FusionWeights;
use crate::scoring::{ExtractorConfig, SelectionParams};
use crate::vectordb::VectorBackend;

/// Whether the LLM extraction stage runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExtractionMode {
    /// On exactly when at least one LLM model is configured.
    #[default]
    Auto,
    On,
    Off,
}

impl FromStr for ExtractionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" | "" => Ok(ExtractionMode::Auto),
            "on" | "true" | "1" => Ok(ExtractionMode::On),
            "off" | "false" | "0" => Ok(ExtractionMode::Off),
            other => Err(format!("expected auto, on or off, got '{other}'")),
        }
    }
}

/// Server configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port. Default: `8000`.
    pub port: u16,

    /// IP address to bind to. Default: `127.0.0.1`.
    pub bind_addr: IpAddr,

    /// Directory holding chunk JSON files. Default: `./data`.
    pub data_dir: PathBuf,

    /// Directory for the persisted index snapshot. Default: `./.index`.
    pub index_dir: PathBuf,

    /// Embedding model directory. `None` runs the stub embedder.
    pub embedder_path: Option<PathBuf>,

    /// Cross-encoder model directory. `None` runs the stub reranker.
    pub reranker_path: Option<PathBuf>,

    /// Qdrant endpoint. `None` keeps vectors in memory.
    pub qdrant_url: Option<String>,

    pub cache_capacity: usize,
    pub cache_ttl_secs: u64,

    pub semantic_weight: f64,
    pub initial_k: usize,
    pub final_k: usize,
    pub confidence_threshold: f32,
    pub ce_weight: f32,
    pub llm_weight: f32,

    pub extraction: ExtractionMode,

    /// `genai` model names, tried in order.
    pub llm_models: Vec<String>,

    pub query_timeout_secs: u64,
    pub general_partition: String,
    pub partition_keywords: PartitionKeywords,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8000,
            bind_addr: IpAddr::V4(std::net::Ipv4Addr::new(127, 0, 0, 1)),
            data_dir: PathBuf::from("./data"),
            index_dir: PathBuf::from("./.index"),
            embedder_path: None,
            reranker_path: None,
            qdrant_url: None,
            cache_capacity: DEFAULT_RESULT_CACHE_CAPACITY,
            cache_ttl_secs: DEFAULT_RESULT_CACHE_TTL_SECS,
            semantic_weight: DEFAULT_SEMANTIC_WEIGHT,
            initial_k: DEFAULT_INITIAL_K,
            final_k: DEFAULT_FINAL_K,
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            ce_weight: DEFAULT_CE_WEIGHT,
            llm_weight: DEFAULT_LLM_WEIGHT,
            extraction: ExtractionMode::Auto,
            llm_models: Vec::new(),
            query_timeout_secs: DEFAULT_QUERY_TIMEOUT_SECS,
            general_partition: DEFAULT_GENERAL_PARTITION.to_string(),
            partition_keywords: PartitionKeywords::default(),
        }
    }
}

impl Config {
    const ENV_PORT: &'static str = "ONSEN_PORT";
    const ENV_BIND_ADDR: &'static str = "ONSEN_BIND_ADDR";
    const ENV_DATA_DIR: &'static str = "ONSEN_DATA_DIR";
    const ENV_INDEX_DIR: &'static str = "ONSEN_INDEX_DIR";
    const ENV_EMBEDDER_PATH: &'static str = "ONSEN_EMBEDDER_PATH";
    const ENV_RERANKER_PATH: &'static str = "ONSEN_RERANKER_PATH";
    const ENV_QDRANT_URL: &'static str = "ONSEN_QDRANT_URL";
    const ENV_CACHE_CAPACITY: &'static str = "ONSEN_CACHE_CAPACITY";
    const ENV_CACHE_TTL_SECS: &'static str = "ONSEN_CACHE_TTL_SECS";
    const ENV_SEMANTIC_WEIGHT: &'static str = "ONSEN_SEMANTIC_WEIGHT";
    const ENV_INITIAL_K: &'static str = "ONSEN_INITIAL_K";
    const ENV_FINAL_K: &'static str = "ONSEN_FINAL_K";
    const ENV_CONFIDENCE_THRESHOLD: &'static str = "ONSEN_CONFIDENCE_THRESHOLD";
    const ENV_CE_WEIGHT: &'static str = "ONSEN_CE_WEIGHT";
    const ENV_LLM_WEIGHT: &'static str = "ONSEN_LLM_WEIGHT";
    const ENV_EXTRACTION: &'static str = "ONSEN_EXTRACTION";
    const ENV_LLM_MODELS: &'static str = "ONSEN_LLM_MODELS";
    const ENV_QUERY_TIMEOUT_SECS: &'static str = "ONSEN_QUERY_TIMEOUT_SECS";
    const ENV_GENERAL_PARTITION: &'static str = "ONSEN_GENERAL_PARTITION";
    const ENV_PARTITION_KEYWORDS: &'static str = "ONSEN_PARTITION_KEYWORDS";

    /// Loads configuration from environment variables (falling back to defaults).
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let partition_keywords = match Self::env_value(Self::ENV_PARTITION_KEYWORDS) {
            Some(table) => {
                PartitionKeywords::parse(&table).map_err(|e| ConfigError::InvalidValue {
                    name: Self::ENV_PARTITION_KEYWORDS,
                    value: table.clone(),
                    reason: e.to_string(),
                })?
            }
            None => defaults.partition_keywords,
        };

        Ok(Self {
            port: Self::parse_port_from_env(defaults.port)?,
            bind_addr: Self::parse_bind_addr_from_env(defaults.bind_addr)?,
            data_dir: Self::parse_path_from_env(Self::ENV_DATA_DIR, defaults.data_dir),
            index_dir: Self::parse_path_from_env(Self::ENV_INDEX_DIR, defaults.index_dir),
            embedder_path: Self::env_value(Self::ENV_EMBEDDER_PATH).map(PathBuf::from),
            reranker_path: Self::env_value(Self::ENV_RERANKER_PATH).map(PathBuf::from),
            qdrant_url: Self::env_value(Self::ENV_QDRANT_URL),
            cache_capacity: Self::parse_from_env(Self::ENV_CACHE_CAPACITY, defaults.cache_capacity)?,
            cache_ttl_secs: Self::parse_from_env(Self::ENV_CACHE_TTL_SECS, defaults.cache_ttl_secs)?,
            semantic_weight: Self::parse_from_env(
                Self::ENV_SEMANTIC_WEIGHT,
                defaults.semantic_weight,
            )?,
            initial_k: Self::parse_from_env(Self::ENV_INITIAL_K, defaults.initial_k)?,
            final_k: Self::parse_from_env(Self::ENV_FINAL_K, defaults.final_k)?,
            confidence_threshold: Self::parse_from_env(
                Self::ENV_CONFIDENCE_THRESHOLD,
                defaults.confidence_threshold,
            )?,
            ce_weight: Self::parse_from_env(Self::ENV_CE_WEIGHT, defaults.ce_weight)?,
            llm_weight: Self::parse_from_env(Self::ENV_LLM_WEIGHT, defaults.llm_weight)?,
            extraction: Self::parse_from_env(Self::ENV_EXTRACTION, defaults.extraction)?,
            llm_models: Self::env_value(Self::ENV_LLM_MODELS)
                .map(|v| {
                    v.split(',')
                        .map(str::trim)
                        .filter(|m| !m.is_empty())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or(defaults.llm_models),
            query_timeout_secs: Self::parse_from_env(
                Self::ENV_QUERY_TIMEOUT_SECS,
                defaults.query_timeout_secs,
            )?,
            general_partition: Self::env_value(Self::ENV_GENERAL_PARTITION)
                .unwrap_or(defaults.general_partition),
            partition_keywords,
        })
    }

    /// Validates paths and pipeline settings (does not create directories).
    pub fn validate(&self) -> Result<(), ConfigError> {
        for dir in [&self.data_dir, &self.index_dir] {
            if dir.exists() && !dir.is_dir() {
                return Err(ConfigError::NotADirectory { path: dir.clone() });
            }
        }

        for path in [&self.embedder_path, &self.reranker_path].into_iter().flatten() {
            if !path.exists() {
                return Err(ConfigError::PathNotFound { path: path.clone() });
            }
            if !path.is_dir() {
                return Err(ConfigError::NotADirectory { path: path.clone() });
            }
        }

        if self.extraction == ExtractionMode::On && self.llm_models.is_empty() {
            return Err(ConfigError::InvalidSetting {
                reason: format!("{} is on but {} is empty", Self::ENV_EXTRACTION, Self::ENV_LLM_MODELS),
            });
        }

        self.pipeline_config()
            .validate()
            .map_err(|reason| ConfigError::InvalidSetting { reason })
    }

    /// Returns `"{bind_addr}:{port}"` (useful for logging/binding).
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }

    pub fn extraction_enabled(&self) -> bool {
        match self.extraction {
            ExtractionMode::Auto => !self.llm_models.is_empty(),
            ExtractionMode::On => true,
            ExtractionMode::Off => false,
        }
    }

    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig::default()
            .with_initial_k(self.initial_k)
            .with_fusion(FusionWeights::from_semantic(self.semantic_weight))
            .with_selection(
                SelectionParams::default()
                    .with_top_k(self.final_k)
                    .with_weights(self.ce_weight, self.llm_weight)
                    .with_threshold(self.confidence_threshold),
            )
            .with_extractor(ExtractorConfig::default().with_enabled(self.extraction_enabled()))
            .with_result_cache(
                ResultCacheConfig::default()
                    .with_capacity(self.cache_capacity)
                    .with_ttl(Duration::from_secs(self.cache_ttl_secs)),
            )
            .with_query_timeout(Duration::from_secs(self.query_timeout_secs))
            .with_general_partition(self.general_partition.clone())
    }

    /// Stub config when no embedder path is set.
    pub fn embedder_config(&self) -> EmbedderConfig {
        match &self.embedder_path {
            Some(path) => EmbedderConfig::new(path),
            None => EmbedderConfig::stub(),
        }
    }

    pub fn reranker_config(&self) -> RerankerConfig {
        match &self.reranker_path {
            Some(path) => RerankerConfig::new(path),
            None => RerankerConfig::stub(),
        }
    }

    pub fn vector_backend(&self) -> VectorBackend {
        match &self.qdrant_url {
            Some(url) => VectorBackend::qdrant(url.clone()),
            None => VectorBackend::Memory,
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::default()
    }

    fn env_value(var_name: &str) -> Option<String> {
        env::var(var_name)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn parse_port_from_env(default: u16) -> Result<u16, ConfigError> {
        match env::var(Self::ENV_PORT) {
            Ok(value) => {
                let port: u16 = value.parse().map_err(|e| ConfigError::PortParseError {
                    value: value.clone(),
                    source: e,
                })?;

                if port == 0 {
                    return Err(ConfigError::InvalidPort { value });
                }

                Ok(port)
            }
            Err(_) => Ok(default),
        }
    }

    fn parse_bind_addr_from_env(default: IpAddr) -> Result<IpAddr, ConfigError> {
        match env::var(Self::ENV_BIND_ADDR) {
            Ok(value) => value
                .parse()
                .map_err(|e| ConfigError::InvalidBindAddr { value, source: e }),
            Err(_) => Ok(default),
        }
    }

    fn parse_path_from_env(var_name: &str, default: PathBuf) -> PathBuf {
        Self::env_value(var_name).map(PathBuf::from).unwrap_or(default)
    }

    fn parse_from_env<T>(var_name: &'static str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: Display,
    {
        match Self::env_value(var_name) {
            Some(value) => value.parse().map_err(|e: T::Err| ConfigError::InvalidValue {
                name: var_name,
                reason: e.to_string(),
                value,
            }),
            None => Ok(default),
        }
    }
}
