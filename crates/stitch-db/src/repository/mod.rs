//! # Repository Module
//!
//! Database repository implementations for the storefront.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern                                   │
//! │                                                                         │
//! │  HTTP handler / checkout engine                                        │
//! │       │                                                                 │
//! │       │  db.orders().list_for_user(user_id)                            │
//! │       ▼                                                                 │
//! │  OrderRepository                                                       │
//! │  ├── list_for_user / get_for_user                                      │
//! │  └── find_by_idempotency_key                                           │
//! │       │                                                                 │
//! │       │  SQL (runtime-checked) → Row struct → TryFrom → domain type    │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! │                                                                         │
//! │  Repositories run on the pool and never mutate checkout counters.      │
//! │  Stock / coupon / cart mutations that must be atomic with the order    │
//! │  insert go through `UnitOfWork`.                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`user::UserRepository`] - Customer records
//! - [`address::AddressRepository`] - Owner-scoped saved addresses
//! - [`product::ProductRepository`] - Products and size/color variants
//! - [`coupon::CouponRepository`] - Coupon lookups
//! - [`cart::CartRepository`] - Carts and cart lines
//! - [`order::OrderRepository`] - Order reads
//! - [`settings::SettingsRepository`] - Store settings singleton

pub mod address;
pub mod cart;
pub mod coupon;
pub mod order;
pub mod product;
pub mod settings;
pub mod user;
