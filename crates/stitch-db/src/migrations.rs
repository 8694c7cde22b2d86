//! # Schema Migrations
//!
//! The storefront schema ships inside the binary (`migrations/sqlite/`,
//! embedded at compile time) and is applied when the pool opens.
//!
//! ```text
//! 001_initial_schema.sql   users, addresses, products, product_variants,
//!                          coupons, carts, cart_items, orders, order_items,
//!                          settings
//! ```
//!
//! Applied files are checksummed in `_sqlx_migrations`; editing one that has
//! shipped makes startup fail. Schema changes go in a new `NNN_*.sql` file.

use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::DbResult;

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations/sqlite");

/// Applies every embedded migration not yet recorded. Safe to call repeatedly.
pub async fn run_migrations(pool: &SqlitePool) -> DbResult<()> {
    for migration in MIGRATOR.iter() {
        debug!(version = migration.version, description = %migration.description, "Embedded migration");
    }

    MIGRATOR.run(pool).await?;

    let (total, applied) = migration_status(pool).await?;
    info!(total, applied, "Store schema up to date");
    Ok(())
}

/// `(embedded, applied)` migration counts. Zero applied before the first run.
pub async fn migration_status(pool: &SqlitePool) -> DbResult<(usize, usize)> {
    let applied: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM _sqlx_migrations WHERE success = 1")
        .fetch_one(pool)
        .await
        .unwrap_or(0);

    Ok((MIGRATOR.iter().count(), applied.max(0) as usize))
}
