//! # Settings Provider
//!
//! Store settings reach the engine through an injected [`SettingsProvider`]
//! instead of a global. The engine calls [`SettingsProvider::get_settings`]
//! once per checkout and drops the value when the checkout ends.
//!
//! ```text
//! ┌──────────────────────────┐     ┌──────────────────────┐     ┌──────────┐
//! │ CachedSettingsProvider   │ ──► │ DbSettingsProvider   │ ──► │ settings │
//! │ moka, short TTL          │     │ singleton row        │     │ (id = 1) │
//! └──────────────────────────┘     └──────────────────────┘     └──────────┘
//! ```

use std::time::Duration;

use async_trait::async_trait;
use moka::future::Cache;
use tracing::debug;

use stitch_core::Settings;
use stitch_db::{Database, DbError};

use crate::error::{CheckoutError, CheckoutResult};

/// Supplies current store settings.
#[async_trait]
pub trait SettingsProvider: Send + Sync {
    async fn get_settings(&self) -> CheckoutResult<Settings>;
}

// =============================================================================
// Database-backed provider
// =============================================================================

/// Reads the settings singleton on every call.
#[derive(Debug, Clone)]
pub struct DbSettingsProvider {
    db: Database,
}

impl DbSettingsProvider {
    pub fn new(db: Database) -> Self {
        DbSettingsProvider { db }
    }
}

#[async_trait]
impl SettingsProvider for DbSettingsProvider {
    async fn get_settings(&self) -> CheckoutResult<Settings> {
        match self.db.settings().get().await {
            Ok(settings) => Ok(settings),
            Err(DbError::NotFound { .. }) => Err(CheckoutError::Settings(
                "store settings have not been configured".to_string(),
            )),
            Err(err) => Err(CheckoutError::Settings(err.to_string())),
        }
    }
}

// =============================================================================
// Cached provider
// =============================================================================

/// Wraps a provider with a short-lived in-process cache.
///
/// An admin change becomes visible after at most `ttl`.
pub struct CachedSettingsProvider<P> {
    inner: P,
    cache: Cache<(), Settings>,
}

impl<P: SettingsProvider> CachedSettingsProvider<P> {
    pub fn new(inner: P, ttl: Duration) -> Self {
        let cache = Cache::builder().max_capacity(1).time_to_live(ttl).build();
        CachedSettingsProvider { inner, cache }
    }

    /// Drops the cached value so the next call reads through.
    pub async fn invalidate(&self) {
        self.cache.invalidate(&()).await;
    }
}

#[async_trait]
impl<P: SettingsProvider> SettingsProvider for CachedSettingsProvider<P> {
    async fn get_settings(&self) -> CheckoutResult<Settings> {
        if let Some(settings) = self.cache.get(&()).await {
            return Ok(settings);
        }

        debug!("Settings cache miss");
        let settings = self.inner.get_settings().await?;
        self.cache.insert((), settings.clone()).await;
        Ok(settings)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
