//! # Stitch Storefront API
//!
//! HTTP server in front of the order-fulfillment engine.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Storefront API                                  │
//! │                                                                         │
//! │  Client ──► axum (8080) ──► AuthUser (JWT) ──► routes                   │
//! │                                                   │                     │
//! │                     ┌─────────────────────────────┼──────────────┐      │
//! │                     ▼                             ▼              ▼      │
//! │             OrderTransaction                CartService     CacheStore  │
//! │                     │                             │              │      │
//! │                     └──────────────┬──────────────┘              │      │
//! │                                    ▼                             ▼      │
//! │                              SQLite (WAL)                 Redis / no-op │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration
//! Environment variables:
//! - `HTTP_PORT` - HTTP port (default: 8080)
//! - `DATABASE_PATH` - SQLite file (default: ./stitch.db)
//! - `DATABASE_MAX_CONNECTIONS` - pool size (default: 5)
//! - `REDIS_URL` - Redis connection string (optional)
//! - `JWT_SECRET` - Secret for validating bearer tokens
//! - `SETTINGS_CACHE_TTL_SECS` - store settings cache (default: 30)
//! - `ORDER_LIST_CACHE_TTL_SECS` - order list cache (default: 60)
//! - `CART_CACHE_TTL_SECS` - cart cache (default: 60)
//! - `CHECKOUT_TIMEOUT_SECS` - checkout time budget (default: 15)

pub mod auth;
pub mod cache;
pub mod config;
pub mod error;
pub mod routes;
pub mod state;

// Re-exports
pub use cache::{CacheHandles, CacheStore, RedisCache};
pub use config::{ApiConfig, ConfigError};
pub use error::{ApiError, ApiResult};
pub use routes::router;
pub use state::AppState;
