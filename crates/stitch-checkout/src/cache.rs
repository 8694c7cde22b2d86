//! # Cache Invalidation Seam
//!
//! The engine only needs to evict keys; the backend (Redis, or nothing at
//! all) is injected by the application.
//!
//! ## Key Layout
//! ```text
//! orders:user:{user_id}:list     cached GET /orders response
//! orders:user:{user_id}:*        pattern checkout invalidates
//! cart:user:{user_id}            cached cart snapshot
//! ```

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Cache unavailable: {0}")]
    Unavailable(String),

    #[error("Cache value could not be (de)serialized: {0}")]
    Serialization(String),
}

/// Best-effort eviction. Callers log failures and move on.
#[async_trait]
pub trait CacheInvalidator: Send + Sync {
    /// Deletes every key matching a glob-style pattern.
    async fn invalidate(&self, pattern: &str) -> Result<(), CacheError>;

    /// Deletes a single key.
    async fn delete(&self, key: &str) -> Result<(), CacheError>;
}

/// Invalidator used when no cache backend is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopCache;

#[async_trait]
impl CacheInvalidator for NoopCache {
    async fn invalidate(&self, _pattern: &str) -> Result<(), CacheError> {
        Ok(())
    }

    async fn delete(&self, _key: &str) -> Result<(), CacheError> {
        Ok(())
    }
}

/// Cache key builders shared by the engine and the HTTP layer.
pub mod keys {
    pub fn order_list(user_id: &str) -> String {
        format!("orders:user:{user_id}:list")
    }

    pub fn orders_pattern(user_id: &str) -> String {
        format!("orders:user:{user_id}:*")
    }

    pub fn cart(user_id: &str) -> String {
        format!("cart:user:{user_id}")
    }
}
