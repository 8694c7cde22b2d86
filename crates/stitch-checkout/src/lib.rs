//! # stitch-checkout: Order-Fulfillment Engine
//!
//! Orchestrates checkout on top of the pure rules in `stitch-core` and the
//! persistence layer in `stitch-db`.
//!
//! ## Modules
//!
//! - [`engine`] - [`OrderTransaction`], the cart-to-order transaction
//! - [`cart`] - [`CartService`], cart mutations with price capture
//! - [`settings`] - [`SettingsProvider`] seam and its implementations
//! - [`cache`] - [`CacheInvalidator`] seam and key layout
//! - [`order_number`] - human-readable order numbers
//! - [`error`] - [`CheckoutError`]
//!
//! ## Example Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use stitch_checkout::{CheckoutRequest, DbSettingsProvider, NoopCache, OrderTransaction};
//!
//! let engine = OrderTransaction::new(
//!     db.clone(),
//!     Arc::new(DbSettingsProvider::new(db.clone())),
//!     Arc::new(NoopCache),
//! );
//!
//! let outcome = engine.create(request).await?;
//! println!("{} {}", outcome.order.order_number, outcome.order.total);
//! ```

pub mod cache;
pub mod cart;
pub mod engine;
pub mod error;
pub mod order_number;
pub mod settings;

pub use cache::{CacheError, CacheInvalidator, NoopCache};
pub use cart::{AddCartItem, CartService};
pub use engine::{CheckoutOutcome, CheckoutRequest, OrderTransaction};
pub use error::{CheckoutError, CheckoutResult};
pub use settings::{CachedSettingsProvider, DbSettingsProvider, SettingsProvider};
