pub mod cache;
pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod observability;
pub mod payload;
pub mod proxy;
pub mod server;
pub mod upstream;

use std::sync::Arc;

pub use cache::{CacheError, CacheStore, LocalCacheStore, RedisCacheStore};
pub use config::{AppConfig, CacheConfig, RedisConfig, ServerConfig, UpstreamConfig};
pub use error::ApiError;
pub use observability::init_tracing;
pub use payload::Payload;
pub use proxy::{CacheSource, CatalogFetchProxy, DEFAULT_CACHE_TTL, Fetched};
pub use server::{AppState, CatalogServer, ServerBuilder, build_app};
pub use upstream::{TmdbClient, UpstreamClient, UpstreamError};

/// Create the cache store described by the configuration.
///
/// ## Cache Modes
///
/// - **Redis disabled**: in-process cache (DashMap)
/// - **Redis enabled**: Redis store, whether or not the startup handshake succeeds
///
/// ## Graceful Degradation
///
/// A failed handshake is logged and the Redis store is kept: each request
/// retries the connection, reads miss and writes are skipped until Redis is
/// reachable. Only a pool that cannot be built at all (malformed URL) falls
/// back to the in-process cache.
pub async fn create_cache_store(config: &RedisConfig) -> Arc<dyn CacheStore> {
    if !config.enabled {
        tracing::info!("Redis disabled, using local cache only");
        return Arc::new(LocalCacheStore::new());
    }

    let store = match RedisCacheStore::from_config(config) {
        Ok(store) => store,
        Err(e) => {
            tracing::warn!(
                error = %e,
                "Failed to create Redis pool. Falling back to local cache."
            );
            return Arc::new(LocalCacheStore::new());
        }
    };

    tracing::info!(url = %store.url(), "Connecting to Redis");
    match store.connect().await {
        Ok(()) => tracing::info!(url = %store.url(), "Connected to Redis"),
        Err(e) => tracing::warn!(
            url = %store.url(),
            error = %e,
            "Could not connect to Redis, continuing without cache"
        ),
    }

    Arc::new(store)
}
