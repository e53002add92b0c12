//! Caching layer for provider responses.
//!
//! [`Cache`] is the seam between the proxy and its key-value backend:
//!
//! - [`RedisCache`]: the shared production backend.
//! - [`MemoryCache`]: an in-process map with per-entry expiry, used in tests
//!   and for running without Redis.
//!
//! [`CacheAside`] implements the lookup pattern every endpoint shares.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

mod aside;
mod memory_cache;
mod redis_cache;

pub use aside::{CacheAside, CacheWrite, ENTRY_TTL};
pub use memory_cache::MemoryCache;
pub use redis_cache::RedisCache;

/// Cache backend errors. None of them ever reach a client.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("cache unavailable: {0}")]
    Unavailable(String),
}

/// A string key-value store with per-entry time-to-live.
#[async_trait]
pub trait Cache: Send + Sync {
    /// Returns the value stored under `key`, or `None` if absent or expired.
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// Stores `value` under `key`, replacing any previous value, for `ttl`.
    async fn set_ex(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError>;
}
