use super::*;
use std::sync::Arc;
use std::time::Duration;

fn key(q: &str) -> CacheKey {
    CacheKey::new(q, None, 3)
}

fn manual_cache(capacity: usize) -> (ResultCache<String, Arc<ManualClock>>, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new());
    let cache = ResultCache::with_clock(
        ResultCacheConfig::default().with_capacity(capacity),
        Arc::clone(&clock),
    );
    (cache, clock)
}

#[test]
fn test_get_after_put() {
    let cache = ResultCache::new(ResultCacheConfig::default());
    assert!(cache.get(&key("q")).is_none());

    cache.put(key("q"), "result".to_string());
    assert_eq!(cache.get(&key("q")).as_deref(), Some("result"));
    assert_eq!(cache.len(), 1);
}

#[test]
fn test_ttl_boundary() {
    let (cache, clock) = manual_cache(8);
    cache.put(key("q"), "r".to_string());

    clock.set_elapsed(Duration::from_secs(299));
    assert!(cache.get(&key("q")).is_some());

    clock.set_elapsed(Duration::from_secs(301));
    assert!(cache.get(&key("q")).is_none());
    assert!(cache.is_empty());
}

#[test]
fn test_oldest_inserted_evicted_first() {
    let (cache, _clock) = manual_cache(2);
    cache.put(key("a"), "a".to_string());
    cache.put(key("b"), "b".to_string());
    // Reads do not refresh position.
    assert!(cache.get(&key("a")).is_some());
    cache.put(key("c"), "c".to_string());

    assert!(cache.get(&key("a")).is_none());
    assert!(cache.get(&key("b")).is_some());
    assert!(cache.get(&key("c")).is_some());
}

#[test]
fn test_replacing_moves_entry_to_newest() {
    let (cache, _clock) = manual_cache(2);
    cache.put(key("a"), "a1".to_string());
    cache.put(key("b"), "b".to_string());
    cache.put(key("a"), "a2".to_string());
    cache.put(key("c"), "c".to_string());

    assert!(cache.get(&key("b")).is_none());
    assert_eq!(cache.get(&key("a")).as_deref(), Some("a2"));
    assert_eq!(cache.len(), 2);
}

#[test]
fn test_repeated_overwrites_stay_bounded() {
    let (cache, _clock) = manual_cache(3);
    for i in 0..100 {
        cache.put(key("hot"), i.to_string());
    }
    cache.put(key("x"), "x".to_string());
    cache.put(key("y"), "y".to_string());

    assert_eq!(cache.len(), 3);
    assert_eq!(cache.get(&key("hot")).as_deref(), Some("99"));
}

#[test]
fn test_zero_capacity_disables() {
    let cache = ResultCache::new(ResultCacheConfig::default().with_capacity(0));
    cache.put(key("q"), 1u32);
    assert!(cache.get(&key("q")).is_none());
}

#[test]
fn test_key_covers_partition_and_k() {
    assert_eq!(
        CacheKey::new("q", Some("kusatsu"), 3),
        CacheKey::new("q", Some("kusatsu"), 3)
    );
    assert_ne!(CacheKey::new("q", Some("kusatsu"), 3), CacheKey::new("q", None, 3));
    assert_ne!(
        CacheKey::new("q", Some("kusatsu"), 3),
        CacheKey::new("q", Some("hakone"), 3)
    );
    assert_ne!(CacheKey::new("q", None, 3), CacheKey::new("q", None, 5));
}

#[test]
fn test_key_scoped_by_index_generation() {
    let base = CacheKey::new("q", Some("kusatsu"), 3);
    assert_eq!(base.with_generation(1), base.with_generation(1));
    assert_ne!(base.with_generation(1), base.with_generation(2));
    assert_ne!(base.with_generation(1), base);

    let (cache, _clock) = manual_cache(8);
    cache.put(base.with_generation(1), "old".to_string());
    assert!(cache.get(&base.with_generation(2)).is_none());
    assert_eq!(cache.get(&base.with_generation(1)).as_deref(), Some("old"));
}

#[test]
fn test_config_validate() {
    assert!(ResultCacheConfig::default().validate().is_ok());
    assert!(
        ResultCacheConfig::default()
            .with_ttl(Duration::ZERO)
            .validate()
            .is_err()
    );
    assert!(
        ResultCacheConfig::default()
            .with_capacity(0)
            .with_ttl(Duration::ZERO)
            .validate()
            .is_ok()
    );
}

#[test]
fn test_query_embedding_cache() {
    let cache = QueryEmbeddingCache::with_capacity(16);
    assert!(cache.get("草津").is_none());

    cache.insert("草津", Arc::new(vec![1.0, 0.0]));
    assert_eq!(cache.get("草津").as_deref(), Some(&vec![1.0, 0.0]));
    assert!(cache.get("箱根").is_none());

    cache.clear();
    assert!(cache.get("草津").is_none());
}

#[test]
fn test_cache_status_header_values() {
    assert_eq!(CacheStatus::Hit.as_header_value(), "HIT");
    assert_eq!(CacheStatus::Miss.to_string(), "MISS");
    assert!(CacheStatus::Hit.is_hit());
    assert!(!CacheStatus::Bypass.is_hit());
}

#[test]
fn test_put_restarts_ttl() {
    let (cache, clock) = manual_cache(8);
    cache.put(key("q"), "old".to_string());
    clock.advance(Duration::from_secs(200));
    cache.put(key("q"), "new".to_string());
    clock.advance(Duration::from_secs(200));

    assert_eq!(cache.get(&key("q")).as_deref(), Some("new"));
}
