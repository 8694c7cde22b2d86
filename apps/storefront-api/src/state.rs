//! Application state shared across handlers.

use std::sync::Arc;

use stitch_checkout::{CachedSettingsProvider, CartService, DbSettingsProvider, OrderTransaction};
use stitch_db::Database;

use crate::auth::JwtManager;
use crate::cache::{CacheHandles, CacheStore};
use crate::config::ApiConfig;

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ApiConfig,
    db: Database,
    checkout: OrderTransaction,
    carts: CartService,
    cache: Arc<dyn CacheStore>,
    jwt: JwtManager,
}

impl AppState {
    pub fn new(config: ApiConfig, db: Database, cache: CacheHandles) -> Self {
        let settings = Arc::new(CachedSettingsProvider::new(
            DbSettingsProvider::new(db.clone()),
            config.settings_cache_ttl(),
        ));
        let checkout = OrderTransaction::new(db.clone(), settings, cache.invalidator.clone());
        let carts = CartService::new(db.clone(), cache.invalidator);
        let jwt = JwtManager::new(config.jwt_secret.clone(), config.jwt_lifetime_secs);

        AppState {
            inner: Arc::new(AppStateInner {
                config,
                db,
                checkout,
                carts,
                cache: cache.store,
                jwt,
            }),
        }
    }

    pub fn config(&self) -> &ApiConfig {
        &self.inner.config
    }

    pub fn db(&self) -> &Database {
        &self.inner.db
    }

    pub fn checkout(&self) -> &OrderTransaction {
        &self.inner.checkout
    }

    pub fn carts(&self) -> &CartService {
        &self.inner.carts
    }

    pub fn cache(&self) -> &dyn CacheStore {
        self.inner.cache.as_ref()
    }

    pub fn jwt(&self) -> &JwtManager {
        &self.inner.jwt
    }
}
