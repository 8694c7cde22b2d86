//! # stitch-db: Database Layer for the Stitch Storefront
//!
//! This crate provides database access for the storefront. It uses SQLite
//! with sqlx for async operations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Stitch Data Flow                                 │
//! │                                                                         │
//! │  POST /orders → OrderTransaction (stitch-checkout)                     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     stitch-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │               │    │  (embedded)  │  │   │
//! │  │   │               │    │ ProductRepo   │    │ 001_init.sql │  │   │
//! │  │   │ SqlitePool    │◄───│ CouponRepo    │    │              │  │   │
//! │  │   │               │    │ CartRepo ...  │    │              │  │   │
//! │  │   └───────┬───────┘    └───────────────┘    └──────────────┘  │   │
//! │  │           │                                                     │   │
//! │  │           ▼                                                     │   │
//! │  │   ┌───────────────────────────────────────┐                    │   │
//! │  │   │ UnitOfWork (unit_of_work.rs)          │                    │   │
//! │  │   │ consume_coupon / insert_order /       │                    │   │
//! │  │   │ decrement_*_stock / clear_cart        │                    │   │
//! │  │   └───────────────────────────────────────┘                    │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite database file (DATABASE_PATH)                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations
//! - [`unit_of_work`] - Transaction handle for the checkout's atomic phase
//!
//! ## Usage
//!
//! ```rust,ignore
//! use stitch_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("./stitch.db")).await?;
//! let orders = db.orders().list_for_user(&user_id).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

mod convert;
pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;
pub mod unit_of_work;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};
pub use unit_of_work::{Decrement, UnitOfWork};

pub use repository::address::{AddressRepository, NewAddress};
pub use repository::cart::CartRepository;
pub use repository::coupon::CouponRepository;
pub use repository::order::OrderRepository;
pub use repository::product::ProductRepository;
pub use repository::settings::SettingsRepository;
pub use repository::user::{User, UserRepository};
