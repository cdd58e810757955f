//! In-process cache store backed by DashMap.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use catalog_core::CacheKey;
use dashmap::DashMap;

use super::store::{CacheError, CacheStore};

/// A cached entry with TTL support.
#[derive(Clone, Debug)]
pub struct CachedEntry {
    pub data: Vec<u8>,
    pub cached_at: Instant,
    pub ttl: Duration,
}

impl CachedEntry {
    /// Create a new cached entry.
    pub fn new(data: Vec<u8>, ttl: Duration) -> Self {
        Self {
            data,
            cached_at: Instant::now(),
            ttl,
        }
    }

    /// Check if this entry has expired.
    pub fn is_expired(&self) -> bool {
        self.cached_at.elapsed() > self.ttl
    }
}

/// Single-instance cache used when Redis is disabled.
///
/// Expired entries are treated as absent. Every write sweeps out the entries
/// that have expired since, so keys that are never read again do not linger.
#[derive(Clone, Default)]
pub struct LocalCacheStore {
    entries: Arc<DashMap<String, CachedEntry>>,
}

impl LocalCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries, expired ones included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Remove `key` only if the stored entry is still expired under the shard
    /// lock, so a fresh write racing with the read survives.
    fn evict_if_expired(&self, key: &CacheKey) {
        self.entries.remove_if(key.as_str(), |_, entry| entry.is_expired());
    }

    fn sweep_expired(&self) {
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired());
        let swept = before.saturating_sub(self.entries.len());
        if swept > 0 {
            tracing::debug!(swept, "expired local cache entries reclaimed");
        }
    }
}

#[async_trait]
impl CacheStore for LocalCacheStore {
    async fn connect(&self) -> Result<(), CacheError> {
        Ok(())
    }

    async fn get(&self, key: &CacheKey) -> Option<Vec<u8>> {
        if let Some(entry) = self.entries.get(key.as_str()) {
            if !entry.is_expired() {
                tracing::debug!(key = %key, "cache hit (local)");
                return Some(entry.data.clone());
            }
        }
        self.evict_if_expired(key);
        tracing::debug!(key = %key, "cache miss (local)");
        None
    }

    async fn set(&self, key: &CacheKey, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError> {
        self.sweep_expired();
        self.entries
            .insert(key.to_string(), CachedEntry::new(value, ttl));
        tracing::debug!(key = %key, ttl_secs = ttl.as_secs(), "cache set (local)");
        Ok(())
    }

    async fn is_available(&self) -> bool {
        true
    }

    fn mode(&self) -> &'static str {
        "local"
    }
}
