//! Cache store backed by Redis.
//!
//! ```text
//! ┌────────────────────┐  get / set_with_ttl   ┌────────────────────────┐
//! │ GET /orders        │ ────────────────────► │                        │
//! │ GET /cart          │                       │  RedisCache            │
//! └────────────────────┘                       │  (ConnectionManager)   │
//! ┌────────────────────┐  invalidate / delete  │                        │
//! │ OrderTransaction   │ ────────────────────► │  SCAN MATCH + DEL      │
//! │ CartService        │                       └────────────────────────┘
//! └────────────────────┘
//! ```
//!
//! Without `REDIS_URL` the server runs on [`NoopCache`]: every read misses and
//! every eviction succeeds.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use tracing::debug;

use stitch_checkout::{CacheError, CacheInvalidator, NoopCache};

/// Keys deleted per `DEL` while walking a pattern.
const SCAN_BATCH: usize = 100;

/// Read/write side of the cache, used by the HTTP layer.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError>;
}

/// A cache backend seen through both of its roles.
#[derive(Clone)]
pub struct CacheHandles {
    pub store: Arc<dyn CacheStore>,
    pub invalidator: Arc<dyn CacheInvalidator>,
}

impl CacheHandles {
    pub fn new<C>(cache: C) -> Self
    where
        C: CacheStore + CacheInvalidator + 'static,
    {
        let cache = Arc::new(cache);
        CacheHandles {
            store: cache.clone(),
            invalidator: cache,
        }
    }

    pub fn noop() -> Self {
        Self::new(NoopCache)
    }
}

#[async_trait]
impl CacheStore for NoopCache {
    async fn get(&self, _key: &str) -> Result<Option<String>, CacheError> {
        Ok(None)
    }

    async fn set_with_ttl(&self, _key: &str, _value: &str, _ttl: Duration) -> Result<(), CacheError> {
        Ok(())
    }
}

// =============================================================================
// Redis
// =============================================================================

#[derive(Clone)]
pub struct RedisCache {
    conn: ConnectionManager,
}

impl RedisCache {
    /// Connects to Redis. The manager reconnects on its own afterwards.
    pub async fn connect(url: &str) -> Result<Self, CacheError> {
        let client = redis::Client::open(url).map_err(unavailable)?;
        let conn = ConnectionManager::new(client).await.map_err(unavailable)?;
        Ok(RedisCache { conn })
    }
}

fn unavailable(err: redis::RedisError) -> CacheError {
    CacheError::Unavailable(err.to_string())
}

#[async_trait]
impl CacheStore for RedisCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut conn = self.conn.clone();
        let value: Option<String> = redis::cmd("GET")
            .arg(key)
            .query_async(&mut conn)
            .await
            .map_err(unavailable)?;
        Ok(value)
    }

    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        let _: () = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("EX")
            .arg(ttl.as_secs().max(1))
            .query_async(&mut conn)
            .await
            .map_err(unavailable)?;
        Ok(())
    }
}

#[async_trait]
impl CacheInvalidator for RedisCache {
    async fn invalidate(&self, pattern: &str) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        let mut cursor: u64 = 0;
        let mut removed = 0usize;

        loop {
            let (next, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(pattern)
                .arg("COUNT")
                .arg(SCAN_BATCH)
                .query_async(&mut conn)
                .await
                .map_err(unavailable)?;

            if !keys.is_empty() {
                let _: () = redis::cmd("DEL")
                    .arg(&keys)
                    .query_async(&mut conn)
                    .await
                    .map_err(unavailable)?;
                removed += keys.len();
            }

            if next == 0 {
                break;
            }
            cursor = next;
        }

        debug!(pattern = %pattern, removed, "Cache pattern invalidated");
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        let _: () = redis::cmd("DEL")
            .arg(key)
            .query_async(&mut conn)
            .await
            .map_err(unavailable)?;
        Ok(())
    }
}
