//! Storefront API configuration module.
//!
//! Configuration is loaded from environment variables with fallback to defaults.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Storefront API configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// HTTP server port
    pub http_port: u16,

    /// SQLite database file
    pub database_path: String,

    /// Connection pool size
    pub database_max_connections: u32,

    /// Redis connection string (optional)
    pub redis_url: Option<String>,

    /// JWT secret key for validating bearer tokens
    pub jwt_secret: String,

    /// Lifetime of tokens issued by [`crate::auth::JwtManager::issue`]
    pub jwt_lifetime_secs: i64,

    /// How long store settings are cached in-process
    pub settings_cache_ttl_secs: u64,

    /// How long a user's order list is cached
    pub order_list_cache_ttl_secs: u64,

    /// How long a user's cart snapshot is cached
    pub cart_cache_ttl_secs: u64,

    /// Upper bound on one checkout, after which the outcome is unknown
    pub checkout_timeout_secs: u64,
}

impl ApiConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let config = ApiConfig {
            http_port: parse_var(&lookup, "HTTP_PORT", 8080)?,

            database_path: lookup("DATABASE_PATH").unwrap_or_else(|| "./stitch.db".to_string()),

            database_max_connections: parse_var(&lookup, "DATABASE_MAX_CONNECTIONS", 5)?,

            redis_url: lookup("REDIS_URL").filter(|url| !url.trim().is_empty()),

            jwt_secret: lookup("JWT_SECRET")
                // In production, this MUST be set via environment variable
                .unwrap_or_else(|| "stitch-dev-secret-change-in-production".to_string()),

            jwt_lifetime_secs: parse_var(&lookup, "JWT_LIFETIME_SECS", 3600)?,

            settings_cache_ttl_secs: parse_var(&lookup, "SETTINGS_CACHE_TTL_SECS", 30)?,

            order_list_cache_ttl_secs: parse_var(&lookup, "ORDER_LIST_CACHE_TTL_SECS", 60)?,

            cart_cache_ttl_secs: parse_var(&lookup, "CART_CACHE_TTL_SECS", 60)?,

            checkout_timeout_secs: parse_var(&lookup, "CHECKOUT_TIMEOUT_SECS", 15)?,
        };

        if config.database_max_connections == 0 {
            return Err(ConfigError::InvalidValue("DATABASE_MAX_CONNECTIONS".to_string()));
        }
        if config.checkout_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue("CHECKOUT_TIMEOUT_SECS".to_string()));
        }

        Ok(config)
    }

    pub fn settings_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.settings_cache_ttl_secs)
    }

    pub fn order_list_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.order_list_cache_ttl_secs)
    }

    pub fn cart_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cart_cache_ttl_secs)
    }

    pub fn checkout_timeout(&self) -> Duration {
        Duration::from_secs(self.checkout_timeout_secs)
    }
}

fn parse_var<F, T>(lookup: &F, name: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(name.to_string())),
        None => Ok(default),
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),
}
