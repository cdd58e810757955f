//! Cache-aside read-through over the upstream catalog.
//!
//! ```text
//! START → CACHE_LOOKUP ─ hit ──────────────────────────────→ RESPOND
//!               │
//!               └ miss / store error / corrupt → UPSTREAM_FETCH ─ ok → REPOPULATE → RESPOND
//!                                                       │
//!                                                       └ error → FAIL
//! ```
//!
//! Store failures never fail a request: an unreachable store reads as a miss
//! and a failed repopulation is logged and dropped. Concurrent misses for the
//! same query each go upstream and each write the key; the last write wins.

use std::sync::Arc;
use std::time::{Duration, Instant};

use catalog_core::{CacheKey, CatalogQuery};
use tracing::{debug, instrument, warn};

use crate::cache::CacheStore;
use crate::metrics;
use crate::payload::Payload;
use crate::upstream::{UpstreamClient, UpstreamError};

/// Expiration applied to repopulated entries unless configured otherwise.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(600);

/// Where a successful response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheSource {
    /// Served from the cache.
    Hit,
    /// Fetched upstream after a miss, then written back.
    Miss,
    /// Fetched upstream without consulting the cache.
    Bypass,
}

impl CacheSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hit => "HIT",
            Self::Miss => "MISS",
            Self::Bypass => "BYPASS",
        }
    }
}

/// Successful fetch result.
#[derive(Debug, Clone, PartialEq)]
pub struct Fetched {
    pub payload: Payload,
    pub source: CacheSource,
}

/// Outcome of the cache lookup step.
#[derive(Debug)]
enum CacheLookup {
    Hit(Payload),
    /// Absent, expired or store unreachable.
    Miss,
    /// Present but not valid JSON.
    Corrupt,
}

/// Orchestrates cache-aside reads for catalog queries.
pub struct CatalogFetchProxy {
    cache: Arc<dyn CacheStore>,
    upstream: Arc<dyn UpstreamClient>,
    ttl: Duration,
}

impl CatalogFetchProxy {
    pub fn new(cache: Arc<dyn CacheStore>, upstream: Arc<dyn UpstreamClient>) -> Self {
        Self {
            cache,
            upstream,
            ttl: DEFAULT_CACHE_TTL,
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn cache(&self) -> &Arc<dyn CacheStore> {
        &self.cache
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Serve `query` from the cache, falling back to upstream and writing
    /// the result back.
    #[instrument(skip_all, fields(query = %query))]
    pub async fn fetch(&self, query: &CatalogQuery) -> Result<Fetched, UpstreamError> {
        let key = query.cache_key();

        match self.lookup(&key).await {
            CacheLookup::Hit(payload) => {
                debug!(key = %key, "responding from cache");
                metrics::record_cache_hit(query.label());
                return Ok(Fetched {
                    payload,
                    source: CacheSource::Hit,
                });
            }
            CacheLookup::Miss => metrics::record_cache_miss(query.label(), "absent"),
            CacheLookup::Corrupt => metrics::record_cache_miss(query.label(), "corrupt"),
        }

        let payload = self.fetch_upstream(query).await?;
        self.repopulate(&key, &payload).await;

        Ok(Fetched {
            payload,
            source: CacheSource::Miss,
        })
    }

    /// Serve `query` straight from upstream. The cache is neither read nor written.
    #[instrument(skip_all, fields(query = %query))]
    pub async fn fetch_live(&self, query: &CatalogQuery) -> Result<Fetched, UpstreamError> {
        let payload = self.fetch_upstream(query).await?;
        Ok(Fetched {
            payload,
            source: CacheSource::Bypass,
        })
    }

    async fn lookup(&self, key: &CacheKey) -> CacheLookup {
        let Some(bytes) = self.cache.get(key).await else {
            return CacheLookup::Miss;
        };
        match Payload::from_slice(&bytes) {
            Ok(payload) => CacheLookup::Hit(payload),
            Err(e) => {
                warn!(key = %key, error = %e, "cached entry is not valid JSON, treating as miss");
                CacheLookup::Corrupt
            }
        }
    }

    async fn fetch_upstream(&self, query: &CatalogQuery) -> Result<Payload, UpstreamError> {
        let request = query.upstream_request();
        debug!(endpoint = request.endpoint, "querying upstream catalog");

        let started = Instant::now();
        let result = self.upstream.fetch(&request).await;
        let outcome = match &result {
            Ok(_) => "ok",
            Err(e) => e.kind(),
        };
        metrics::record_upstream_request(query.label(), outcome, started.elapsed());

        if let Err(e) = &result {
            warn!(endpoint = request.endpoint, error = %e, "upstream fetch failed");
        }
        result
    }

    /// Best-effort write; the outcome never changes the response.
    async fn repopulate(&self, key: &CacheKey, payload: &Payload) {
        match self.cache.set(key, payload.to_bytes(), self.ttl).await {
            Ok(()) => debug!(key = %key, ttl_secs = self.ttl.as_secs(), "cache repopulated"),
            Err(e) => {
                warn!(key = %key, error = %e, "failed to write cache entry");
                metrics::record_cache_write_failure();
            }
        }
    }
}
