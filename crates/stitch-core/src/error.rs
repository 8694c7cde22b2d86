//! # Error Types
//!
//! Domain-specific error types for stitch-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  stitch-core errors (this file)                                        │
//! │  ├── CoreError        - Business-rule failures (HTTP 400)              │
//! │  └── ValidationError  - Malformed request input                        │
//! │                                                                         │
//! │  stitch-db errors (separate crate)                                     │
//! │  └── DbError          - Persistence failures                           │
//! │                                                                         │
//! │  stitch-checkout                                                       │
//! │  └── CheckoutError    - Rejected(CoreError) | Transaction(DbError)     │
//! │                                                                         │
//! │  storefront-api                                                        │
//! │  └── ApiError         - What the HTTP client sees                      │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → CheckoutError → ApiError          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Messages carry the product, variant or amount involved, and every coupon
//! rejection has its own variant. [`CoreError::code`] is the stable string
//! clients branch on.

use thiserror::Error;

use crate::money::Money;

// =============================================================================
// Core Error
// =============================================================================

/// Business-rule failures.
///
/// None of these are retryable without caller action, and none of them
/// leave persisted state behind.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoreError {
    /// The user's cart is missing or has no lines.
    #[error("Cart is empty")]
    EmptyCart,

    /// An address id does not belong to the requesting user.
    #[error("Address not found: {0}")]
    AddressNotFound(String),

    /// Requested payment method is not enabled by store settings.
    #[error("Payment method {0} is not currently enabled")]
    PaymentMethodDisabled(String),

    #[error("Coupon not found: {0}")]
    CouponNotFound(String),

    #[error("Coupon {0} is disabled")]
    CouponDisabled(String),

    /// Current time is outside the coupon's validity window.
    #[error("Coupon {0} is expired or not yet valid")]
    CouponExpired(String),

    /// Coupon reached its usage limit.
    ///
    /// ## When This Occurs
    /// - At pre-check, when `used_count >= usage_limit`
    /// - At commit, when a concurrent checkout took the last use
    #[error("Coupon {0} has reached its usage limit")]
    CouponExhausted(String),

    #[error("Order subtotal must be at least {required} to use this coupon")]
    CouponMinimumNotMet { required: Money },

    /// Insufficient stock to complete checkout.
    ///
    /// ## User Workflow
    /// ```text
    /// Checkout (qty: 2 of "Linen Shirt", M/White)
    ///      │
    ///      ▼
    /// Variant stock: available=1
    ///      │
    ///      ▼
    /// InsufficientStock { product: "Linen Shirt", variant: Some("M/White"), .. }
    ///      │
    ///      ▼
    /// Client shows: "Only 1 Linen Shirt (M/White) in stock"
    /// ```
    #[error("Insufficient stock for {product}{}: available {available}, requested {requested}", variant_suffix(.variant))]
    InsufficientStock {
        product: String,
        variant: Option<String>,
        available: i64,
        requested: i64,
    },

    #[error("Product not found: {0}")]
    ProductNotFound(String),

    #[error("Cart item not found: {0}")]
    CartItemNotFound(String),

    #[error("Order not found: {0}")]
    OrderNotFound(String),

    /// Malformed input caught before any lookup.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

fn variant_suffix(variant: &Option<String>) -> String {
    match variant {
        Some(v) => format!(" ({v})"),
        None => String::new(),
    }
}

impl CoreError {
    /// Machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            CoreError::EmptyCart => "EMPTY_CART",
            CoreError::AddressNotFound(_) => "ADDRESS_NOT_FOUND",
            CoreError::PaymentMethodDisabled(_) => "PAYMENT_METHOD_DISABLED",
            CoreError::CouponNotFound(_) => "COUPON_NOT_FOUND",
            CoreError::CouponDisabled(_) => "COUPON_DISABLED",
            CoreError::CouponExpired(_) => "COUPON_EXPIRED",
            CoreError::CouponExhausted(_) => "COUPON_EXHAUSTED",
            CoreError::CouponMinimumNotMet { .. } => "COUPON_MINIMUM_NOT_MET",
            CoreError::InsufficientStock { .. } => "INSUFFICIENT_STOCK",
            CoreError::ProductNotFound(_) => "PRODUCT_NOT_FOUND",
            CoreError::CartItemNotFound(_) => "CART_ITEM_NOT_FOUND",
            CoreError::OrderNotFound(_) => "ORDER_NOT_FOUND",
            CoreError::Validation(_) => "VALIDATION_ERROR",
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Shape problems in request input.
/// Raised by [`crate::validation`] before anything touches storage.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} is required")]
    Required { field: String },

    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Outside `[min, max]`.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Not a UUID, or otherwise unparseable.
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },
}

pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insufficient_stock_message() {
        let err = CoreError::InsufficientStock {
            product: "Linen Shirt".to_string(),
            variant: Some("M/White".to_string()),
            available: 1,
            requested: 2,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock for Linen Shirt (M/White): available 1, requested 2"
        );

        let err = CoreError::InsufficientStock {
            product: "Canvas Tote".to_string(),
            variant: None,
            available: 0,
            requested: 1,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock for Canvas Tote: available 0, requested 1"
        );
    }

    #[test]
    fn test_minimum_not_met_message() {
        let err = CoreError::CouponMinimumNotMet {
            required: Money::from_units(200_000),
        };
        assert_eq!(
            err.to_string(),
            "Order subtotal must be at least 200000.00 to use this coupon"
        );
        assert_eq!(err.code(), "COUPON_MINIMUM_NOT_MET");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "shippingAddressId".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
        assert_eq!(core_err.code(), "VALIDATION_ERROR");
    }
}
