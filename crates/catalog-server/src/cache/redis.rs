//! Redis cache store on a deadpool connection pool.

use std::time::Duration;

use ::redis::AsyncCommands;
use async_trait::async_trait;
use catalog_core::CacheKey;
use deadpool_redis::{Pool, PoolConfig, Runtime};

use super::store::{CacheError, CacheStore};
use crate::config::RedisConfig;

/// Cache store backed by a shared Redis pool.
///
/// The pool is cloned cheaply and safe to share between concurrent requests.
/// Each operation checks out a connection on demand; there is no sticky
/// "disconnected" state.
#[derive(Clone)]
pub struct RedisCacheStore {
    pool: Pool,
    url: String,
}

impl RedisCacheStore {
    /// Build the pool without connecting.
    pub fn from_config(config: &RedisConfig) -> Result<Self, CacheError> {
        let url = config.url();
        let timeout = config.timeout();

        let mut pool_config = PoolConfig::new(config.pool_size);
        pool_config.timeouts.wait = Some(timeout);
        pool_config.timeouts.create = Some(timeout);
        pool_config.timeouts.recycle = Some(timeout);

        let mut redis_config = deadpool_redis::Config::from_url(&url);
        redis_config.pool = Some(pool_config);

        let pool = redis_config
            .create_pool(Some(Runtime::Tokio1))
            .map_err(|e| CacheError::Unavailable(format!("failed to create Redis pool: {e}")))?;

        Ok(Self { pool, url })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl CacheStore for RedisCacheStore {
    async fn connect(&self) -> Result<(), CacheError> {
        let mut conn = self.pool.get().await?;
        let _pong: String = ::redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }

    async fn get(&self, key: &CacheKey) -> Option<Vec<u8>> {
        match self.pool.get().await {
            Ok(mut conn) => match conn.get::<_, Option<Vec<u8>>>(key.as_str()).await {
                Ok(Some(data)) => {
                    tracing::debug!(key = %key, "cache hit (redis)");
                    Some(data)
                }
                Ok(None) => {
                    tracing::debug!(key = %key, "cache miss (redis)");
                    None
                }
                Err(e) => {
                    tracing::warn!(key = %key, error = %e, "Redis GET error, treating as miss");
                    None
                }
            },
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Failed to get Redis connection, treating as miss");
                None
            }
        }
    }

    async fn set(&self, key: &CacheKey, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError> {
        let mut conn = self.pool.get().await?;
        let ttl_secs = ttl.as_secs().max(1);
        conn.set_ex::<_, _, ()>(key.as_str(), value, ttl_secs)
            .await?;
        tracing::debug!(key = %key, ttl_secs = %ttl_secs, "cache set (redis)");
        Ok(())
    }

    async fn is_available(&self) -> bool {
        self.connect().await.is_ok()
    }

    fn mode(&self) -> &'static str {
        "redis"
    }
}
