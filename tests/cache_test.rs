//! Response cache tests
//!
//! TTL expiry and LRU eviction of the in-memory response cache.

use resilient_request::{ApiRequest, CacheKey, ResponseCache};
use serde_json::json;
use std::time::Duration;

fn key(raw: &str) -> CacheKey {
    CacheKey::from(raw)
}

#[tokio::test]
async fn test_store_and_retrieve() {
    let cache = ResponseCache::new(Duration::from_secs(300), 1000);
    cache.set(key("GET:/users/1"), json!({"id": 1})).await;

    assert_eq!(cache.get(&key("GET:/users/1")).await, Some(json!({"id": 1})));
    assert_eq!(cache.get(&key("GET:/users/2")).await, None);

    let stats = cache.stats().await;
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.hit_rate(), 0.5);
}

#[tokio::test(start_paused = true)]
async fn test_entry_expires_strictly_after_ttl() {
    let cache = ResponseCache::new(Duration::from_secs(5), 10);
    cache.set(key("a"), 1u32).await;

    // Still live at exactly the TTL
    tokio::time::advance(Duration::from_secs(5)).await;
    assert_eq!(cache.get(&key("a")).await, Some(1));

    tokio::time::advance(Duration::from_millis(1)).await;
    assert_eq!(cache.get(&key("a")).await, None);
    assert_eq!(cache.stats().await.expired, 1);
}

#[tokio::test]
async fn test_least_recently_used_is_evicted() {
    let cache = ResponseCache::new(Duration::from_secs(300), 3);
    cache.set(key("a"), 1u32).await;
    cache.set(key("b"), 2).await;
    cache.set(key("c"), 3).await;

    cache.set(key("d"), 4).await;

    assert_eq!(cache.len().await, 3);
    assert_eq!(cache.get(&key("a")).await, None);
    assert_eq!(cache.get(&key("b")).await, Some(2));
    assert_eq!(cache.get(&key("d")).await, Some(4));
    assert_eq!(cache.stats().await.evictions, 1);
}

#[tokio::test]
async fn test_read_protects_entry_from_eviction() {
    let cache = ResponseCache::new(Duration::from_secs(300), 3);
    cache.set(key("a"), 1u32).await;
    cache.set(key("b"), 2).await;
    cache.set(key("c"), 3).await;

    // Touching "a" makes "b" the eviction candidate
    assert_eq!(cache.get(&key("a")).await, Some(1));
    cache.set(key("d"), 4).await;

    assert_eq!(cache.get(&key("a")).await, Some(1));
    assert_eq!(cache.get(&key("b")).await, None);
    assert_eq!(cache.get(&key("c")).await, Some(3));
}

#[tokio::test]
async fn test_rewrite_refreshes_recency() {
    let cache = ResponseCache::new(Duration::from_secs(300), 2);
    cache.set(key("a"), 1u32).await;
    cache.set(key("b"), 2).await;
    cache.set(key("a"), 10).await;
    cache.set(key("c"), 3).await;

    assert_eq!(cache.get(&key("a")).await, Some(10));
    assert_eq!(cache.get(&key("b")).await, None);
}

#[tokio::test]
async fn test_request_keys_ignore_param_order() {
    let cache = ResponseCache::new(Duration::from_secs(300), 10);
    let first = ApiRequest::get("https://users.example.com/v1/search")
        .param("q", "rust")
        .param("page", 2);
    let second = ApiRequest::get("https://users.example.com/v1/search")
        .param("page", 2)
        .param("q", "rust");

    cache
        .set(CacheKey::for_request(&first), json!(["rust-lang"]))
        .await;

    assert_eq!(
        cache.get(&CacheKey::for_request(&second)).await,
        Some(json!(["rust-lang"]))
    );
}

#[tokio::test]
async fn test_invalidate_single_entry() {
    let cache = ResponseCache::new(Duration::from_secs(300), 10);
    cache.set(key("a"), 1u32).await;
    cache.set(key("b"), 2).await;

    assert!(cache.invalidate(&key("a")).await);
    assert!(!cache.invalidate(&key("a")).await);
    assert_eq!(cache.len().await, 1);
}
