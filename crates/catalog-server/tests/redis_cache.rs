//! Integration tests for the Redis cache store.
//!
//! Tests use testcontainers to spin up a real Redis instance.

use std::time::Duration;

use catalog_core::CatalogQuery;
use catalog_server::{CacheStore, RedisCacheStore, RedisConfig, create_cache_store};
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::redis::Redis;
use tokio::sync::OnceCell;

// Shared Redis container for all tests
static SHARED_REDIS: OnceCell<(ContainerAsync<Redis>, u16)> = OnceCell::const_new();

/// Get or create the shared Redis container
async fn redis_config() -> RedisConfig {
    let (_, port) = SHARED_REDIS
        .get_or_init(|| async {
            let container = Redis::default()
                .start()
                .await
                .expect("start redis container");

            let host_port = container.get_host_port_ipv4(6379).await.expect("get port");

            (container, host_port)
        })
        .await;

    RedisConfig {
        enabled: true,
        host: "127.0.0.1".to_string(),
        port: *port,
        pool_size: 5,
        timeout_ms: 5000,
    }
}

#[tokio::test]
async fn test_redis_connect() {
    let config = redis_config().await;

    let store = RedisCacheStore::from_config(&config).expect("pool");
    store.connect().await.expect("connect");
    assert!(store.is_available().await);

    let cache = create_cache_store(&config).await;
    assert_eq!(cache.mode(), "redis");
}

#[tokio::test]
async fn test_redis_get_set() {
    let store = RedisCacheStore::from_config(&redis_config().await).expect("pool");
    let key = CatalogQuery::by_genre(28u32).cache_key();

    store
        .set(&key, br#"{"page":1}"#.to_vec(), Duration::from_secs(60))
        .await
        .expect("set");

    assert_eq!(store.get(&key).await, Some(br#"{"page":1}"#.to_vec()));
    assert!(
        store
            .get(&CatalogQuery::by_genre(12u32).cache_key())
            .await
            .is_none()
    );
}

#[tokio::test]
async fn test_redis_entry_expires() {
    let store = RedisCacheStore::from_config(&redis_config().await).expect("pool");
    let key = CatalogQuery::by_genre(35u32).cache_key();

    store
        .set(&key, b"[]".to_vec(), Duration::from_secs(1))
        .await
        .expect("set");
    assert!(store.get(&key).await.is_some());

    tokio::time::sleep(Duration::from_millis(2100)).await;

    assert!(store.get(&key).await.is_none());
}

#[tokio::test]
async fn test_graceful_degradation_unreachable_host() {
    let config = RedisConfig {
        enabled: true,
        host: "nonexistent".to_string(),
        port: 9999,
        pool_size: 5,
        timeout_ms: 1000,
    };

    // Startup does not fail and keeps the Redis store for later retries
    let cache = create_cache_store(&config).await;
    assert_eq!(cache.mode(), "redis");
    assert!(!cache.is_available().await);

    let key = CatalogQuery::Top.cache_key();
    assert!(cache.get(&key).await.is_none());
    assert!(
        cache
            .set(&key, b"{}".to_vec(), Duration::from_secs(60))
            .await
            .is_err()
    );
}

#[tokio::test]
async fn test_disabled_redis() {
    let config = RedisConfig {
        enabled: false,
        ..RedisConfig::default()
    };

    let cache = create_cache_store(&config).await;

    assert_eq!(cache.mode(), "local");
    assert!(cache.is_available().await);
}
