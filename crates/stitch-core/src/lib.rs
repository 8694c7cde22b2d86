//! # stitch-core: Pure Checkout Logic for the Stitch Storefront
//!
//! This crate holds the business rules of the order-fulfillment engine as
//! pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Stitch Storefront Architecture                      │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 storefront-api (axum HTTP)                      │   │
//! │  │    POST /orders, GET /orders, /cart                             │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               stitch-checkout (OrderTransaction)                │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ stitch-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   money   │  │   stock   │  │  coupon   │  │  pricing  │  │   │
//! │  │   │   Money   │  │ Validator │  │ Resolver  │  │Calculator │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    stitch-db (Database Layer)                   │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, Coupon, Cart, Order, Settings, ...)
//! - [`money`] - Decimal money type used end-to-end
//! - [`error`] - Business-rule and validation errors
//! - [`validation`] - Request input validation
//! - [`stock`] - Read-only stock pre-check
//! - [`coupon`] - Coupon eligibility and discount computation
//! - [`pricing`] - Subtotal/discount/shipping/tax/total breakdown
//!
//! ## Example Usage
//!
//! ```rust
//! use rust_decimal::Decimal;
//! use stitch_core::money::Money;
//! use stitch_core::pricing::PricingCalculator;
//! use stitch_core::types::{Settings, TaxRate};
//!
//! let settings = Settings {
//!     shipping_fee: Money::from_units(30_000),
//!     free_shipping_threshold: Some(Money::from_units(1_000_000)),
//!     tax_rate: TaxRate::from_percent(Decimal::from(10)),
//!     payment_cod_enabled: true,
//!     payment_bank_transfer_enabled: true,
//!     payment_credit_card_enabled: false,
//! };
//!
//! let breakdown = PricingCalculator::compute(
//!     Money::from_units(500_000),
//!     Money::from_units(40_000),
//!     &settings,
//! );
//! assert_eq!(breakdown.total, Money::from_units(536_000));
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod coupon;
pub mod error;
pub mod money;
pub mod pricing;
pub mod stock;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use coupon::{CouponResolution, CouponResolver};
pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use pricing::{PriceBreakdown, PricingCalculator};
pub use stock::{StockRequest, StockValidator};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum distinct lines allowed in a single cart.
pub const MAX_CART_ITEMS: usize = 100;

/// Maximum quantity of a single cart line.
///
/// ## Business Reason
/// Prevents accidental over-ordering (e.g., typing 1000 instead of 10).
pub const MAX_ITEM_QUANTITY: i64 = 999;

/// Maximum length of free-text order notes.
pub const MAX_NOTES_LENGTH: usize = 1000;

/// Maximum length of a client-supplied idempotency key.
pub const MAX_IDEMPOTENCY_KEY_LENGTH: usize = 100;
