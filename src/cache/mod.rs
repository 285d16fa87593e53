//! Query-level caches and cache status reporting.

pub mod query_embedding;
pub mod result;
pub mod types;

#[cfg(test)]
mod tests;

pub use query_embedding::QueryEmbeddingCache;
pub use result::{CacheKey, Clock, ManualClock, ResultCache, ResultCacheConfig, SystemClock};
pub use types::{
    CacheStatus, ONSEN_CACHE_HEADER, ONSEN_STATUS_ERROR, ONSEN_STATUS_HEADER,
    ONSEN_STATUS_HEALTHY, ONSEN_STATUS_NOT_READY, ONSEN_STATUS_READY,
};
