use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use redis::{AsyncCommands, aio::ConnectionManager};
use tracing::{debug, info};
use url::Url;

use super::{Cache, CacheError};

/// Redis-backed [`Cache`].
///
/// Holds a [`ConnectionManager`], which reconnects on its own after a dropped
/// connection; cloning it is cheap and every call works on its own clone.
#[derive(Clone)]
pub struct RedisCache {
    conn: ConnectionManager,
    /// Connection URL with any password masked; safe to log.
    display_url: String,
}

impl fmt::Debug for RedisCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisCache")
            .field("url", &self.display_url)
            .finish_non_exhaustive()
    }
}

impl RedisCache {
    /// Opens a managed connection to `url` (`redis://host:port/`).
    ///
    /// # Errors
    ///
    /// Fails if the URL is invalid or the first connection attempt fails.
    pub async fn connect(url: &str) -> Result<Self, CacheError> {
        let display_url = redact_password(url);
        info!(url = %display_url, "connecting to redis");
        let client = redis::Client::open(url)?;
        let conn = ConnectionManager::new(client).await?;
        info!(url = %display_url, "redis connection established");
        Ok(Self { conn, display_url })
    }
}

/// `url` with its password, if any, replaced by `<redacted>`.
fn redact_password(url: &str) -> String {
    match Url::parse(url) {
        Ok(mut parsed) if parsed.password().is_some() => {
            // Only fails for URLs that cannot carry credentials.
            let _ = parsed.set_password(Some("<redacted>"));
            parsed.to_string()
        }
        Ok(_) => url.to_owned(),
        Err(_) => "<unparseable redis url>".to_owned(),
    }
}

#[async_trait]
impl Cache for RedisCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut conn = self.conn.clone();
        let value = conn.get::<_, Option<String>>(key).await?;
        debug!(key, hit = value.is_some(), "redis GET");
        Ok(value)
    }

    async fn set_ex(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        // SETEX rejects a zero expiry.
        let seconds = ttl.as_secs().max(1);
        conn.set_ex::<_, _, ()>(key, value, seconds).await?;
        debug!(key, seconds, "redis SETEX");
        Ok(())
    }
}
