//! The cache-aside lookup shared by every endpoint.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use super::{Cache, CacheError};
use crate::upstream::ResultArray;

/// How long a fetched result stays cached.
pub const ENTRY_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Outcome of persisting a freshly fetched result.
///
/// A failed write is reported, never propagated: the caller already holds
/// the data it needs.
#[derive(Debug)]
pub enum CacheWrite {
    Stored,
    Failed(CacheError),
}

/// Check the cache, fetch on a miss, store what was fetched.
///
/// Reads that fail or return something that does not decode as a result
/// array count as misses. A cached empty array is also a miss.
pub struct CacheAside {
    cache: Arc<dyn Cache>,
    ttl: Duration,
}

impl CacheAside {
    pub fn new(cache: Arc<dyn Cache>) -> Self {
        Self {
            cache,
            ttl: ENTRY_TTL,
        }
    }

    #[must_use]
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Returns the cached value for `key`, or runs `fetch` and caches its result.
    ///
    /// # Errors
    ///
    /// Returns whatever `fetch` fails with. Cache failures never surface here.
    pub async fn resolve<F, Fut, E>(&self, key: &str, fetch: F) -> Result<ResultArray, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<ResultArray, E>>,
    {
        if let Some(cached) = self.lookup(key).await {
            info!(key, "serving cached result");
            return Ok(cached);
        }

        let fresh = fetch().await?;

        if let CacheWrite::Failed(e) = self.store(key, &fresh).await {
            warn!(key, error = %e, "failed to cache fetched result");
        }

        info!(key, "serving fetched result");
        Ok(fresh)
    }

    async fn lookup(&self, key: &str) -> Option<ResultArray> {
        let raw = match self.cache.get(key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!(key, error = %e, "cache read failed, treating as miss");
                return None;
            }
        };

        match serde_json::from_str::<ResultArray>(&raw) {
            Ok(cached) if !cached.is_empty() => Some(cached),
            Ok(_) => None,
            Err(e) => {
                warn!(key, error = %e, "cached value is not a result array, treating as miss");
                None
            }
        }
    }

    /// Writes `data` under `key` with the configured TTL.
    pub async fn store(&self, key: &str, data: &ResultArray) -> CacheWrite {
        let raw = match serde_json::to_string(data) {
            Ok(raw) => raw,
            Err(e) => return CacheWrite::Failed(e.into()),
        };
        match self.cache.set_ex(key, raw, self.ttl).await {
            Ok(()) => CacheWrite::Stored,
            Err(e) => CacheWrite::Failed(e),
        }
    }
}
