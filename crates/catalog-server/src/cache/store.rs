use std::time::Duration;

use async_trait::async_trait;
use catalog_core::CacheKey;
use thiserror::Error;

/// Errors reported by a cache store.
///
/// None of these reach a client: reads turn them into misses and writes only
/// log them.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("redis pool error: {0}")]
    Pool(#[from] deadpool_redis::PoolError),

    #[error("redis command error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("cache store unavailable: {0}")]
    Unavailable(String),
}

/// Key-value store with per-entry expiration.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Startup handshake. Failure is not fatal; later calls retry on their own.
    async fn connect(&self) -> Result<(), CacheError>;

    /// Read a value. Absent, expired and unreachable all return `None`.
    async fn get(&self, key: &CacheKey) -> Option<Vec<u8>>;

    /// Write a value that expires after `ttl`.
    async fn set(&self, key: &CacheKey, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError>;

    /// Liveness probe for readiness reporting.
    async fn is_available(&self) -> bool;

    /// Short name of the backing store (`redis` or `local`).
    fn mode(&self) -> &'static str;
}
