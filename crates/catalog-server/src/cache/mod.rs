//! Cache store adapters for the cache-aside protocol.
//!
//! ## Stores
//!
//! - **Redis** ([`RedisCacheStore`]): shared across instances, `GET` / `SET .. EX`
//! - **Local** ([`LocalCacheStore`]): in-process DashMap with TTL, used when
//!   Redis is disabled
//!
//! ## Graceful Degradation
//!
//! A store never fails a request. Read errors are reported as misses and
//! write errors are returned to the caller only to be logged. The Redis store
//! checks out a pooled connection on every call, so a server that starts
//! without Redis begins caching as soon as Redis becomes reachable.

pub mod local;
pub mod redis;
pub mod store;

pub use local::LocalCacheStore;
pub use redis::RedisCacheStore;
pub use store::{CacheError, CacheStore};
