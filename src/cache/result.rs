//! Bounded, time-limited cache of final query results.
//!
//! Eviction is by insertion order: once full, the oldest inserted entry goes first.
//! Expiry is checked lazily on read; an expired entry is removed and reported as a miss.

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::debug;

use crate::constants::{DEFAULT_RESULT_CACHE_CAPACITY, DEFAULT_RESULT_CACHE_TTL_SECS};
use crate::hashing::{hash_query_key, scope_key};

/// Source of "now" for TTL checks.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    base: Instant,
    offset: Mutex<Duration>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            base: Instant::now(),
            offset: Mutex::new(Duration::ZERO),
        }
    }

    pub fn advance(&self, by: Duration) {
        *self.offset.lock() += by;
    }

    pub fn set_elapsed(&self, elapsed: Duration) {
        *self.offset.lock() = elapsed;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.base + *self.offset.lock()
    }
}

impl<C: Clock + ?Sized> Clock for std::sync::Arc<C> {
    fn now(&self) -> Instant {
        (**self).now()
    }
}

/// BLAKE3 key over (question, partition, k).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey([u8; 32]);

impl CacheKey {
    pub fn new(question: &str, partition: Option<&str>, k: usize) -> Self {
        Self(hash_query_key(question, partition, k))
    }

    /// Ties the key to one index generation.
    pub fn with_generation(self, generation: u64) -> Self {
        Self(scope_key(&self.0, generation))
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultCacheConfig {
    /// Maximum live entries. Zero disables caching.
    pub capacity: usize,
    pub ttl: Duration,
}

impl Default for ResultCacheConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_RESULT_CACHE_CAPACITY,
            ttl: Duration::from_secs(DEFAULT_RESULT_CACHE_TTL_SECS),
        }
    }
}

impl ResultCacheConfig {
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.capacity > 0 && self.ttl.is_zero() {
            return Err("ttl must be > 0 when the cache is enabled".to_string());
        }
        Ok(())
    }
}

struct CachedEntry<V> {
    value: V,
    inserted_at: Instant,
    seq: u64,
}

struct CacheState<V> {
    entries: HashMap<CacheKey, CachedEntry<V>>,
    /// Insertion order; entries whose `seq` no longer matches are stale and skipped.
    order: VecDeque<(CacheKey, u64)>,
    next_seq: u64,
}

impl<V> CacheState<V> {
    fn is_live(&self, key: &CacheKey, seq: u64) -> bool {
        self.entries.get(key).is_some_and(|e| e.seq == seq)
    }
}

pub struct ResultCache<V, C = SystemClock> {
    config: ResultCacheConfig,
    clock: C,
    state: Mutex<CacheState<V>>,
}

impl<V: Clone> ResultCache<V, SystemClock> {
    pub fn new(config: ResultCacheConfig) -> Self {
        Self::with_clock(config, SystemClock)
    }
}

impl<V: Clone, C: Clock> ResultCache<V, C> {
    pub fn with_clock(config: ResultCacheConfig, clock: C) -> Self {
        Self {
            state: Mutex::new(CacheState {
                entries: HashMap::with_capacity(config.capacity),
                order: VecDeque::with_capacity(config.capacity),
                next_seq: 0,
            }),
            config,
            clock,
        }
    }

    pub fn config(&self) -> &ResultCacheConfig {
        &self.config
    }

    pub fn get(&self, key: &CacheKey) -> Option<V> {
        let now = self.clock.now();
        let mut state = self.state.lock();

        let expired = match state.entries.get(key) {
            None => return None,
            Some(entry) => now.saturating_duration_since(entry.inserted_at) > self.config.ttl,
        };

        if expired {
            state.entries.remove(key);
            debug!("Result cache entry expired");
            return None;
        }
        state.entries.get(key).map(|e| e.value.clone())
    }

    /// Inserts or replaces; a replaced entry counts as newly inserted.
    pub fn put(&self, key: CacheKey, value: V) {
        if self.config.capacity == 0 {
            return;
        }
        let now = self.clock.now();
        let mut state = self.state.lock();

        let seq = state.next_seq;
        state.next_seq += 1;
        state.entries.insert(
            key,
            CachedEntry {
                value,
                inserted_at: now,
                seq,
            },
        );
        state.order.push_back((key, seq));

        while state.entries.len() > self.config.capacity {
            let Some((oldest, oldest_seq)) = state.order.pop_front() else {
                break;
            };
            if state.is_live(&oldest, oldest_seq) {
                state.entries.remove(&oldest);
            }
        }

        if state.order.len() > self.config.capacity * 2 {
            let CacheState { entries, order, .. } = &mut *state;
            order.retain(|(k, s)| entries.get(k).is_some_and(|e| e.seq == *s));
        }
    }

    pub fn remove(&self, key: &CacheKey) -> Option<V> {
        self.state.lock().entries.remove(key).map(|e| e.value)
    }

    /// Live entries, including expired ones not yet read.
    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.entries.clear();
        state.order.clear();
    }
}

impl<V, C> fmt::Debug for ResultCache<V, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResultCache")
            .field("capacity", &self.config.capacity)
            .field("ttl", &self.config.ttl)
            .field("len", &self.state.lock().entries.len())
            .finish()
    }
}
