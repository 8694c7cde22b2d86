//! # Domain Types
//!
//! Core domain types used throughout the storefront checkout.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │      Cart       │   │     Order       │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  quantity       │   │  user_id (1:1)  │   │  order_number   │       │
//! │  │  price          │   │  CartItem[]     │   │  breakdown      │       │
//! │  │  Variant[]      │   │   unit_price    │   │  OrderItem[]    │       │
//! │  └─────────────────┘   └─────────────────┘   │  AddressSnapshot│       │
//! │                                              └─────────────────┘       │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Coupon       │   │    Settings     │   │  OrderStatus    │       │
//! │  │  PERCENTAGE     │   │  shipping_fee   │   │  PENDING ...    │       │
//! │  │  FIXED          │   │  tax_rate       │   │  PaymentStatus  │       │
//! │  │  used_count     │   │  payment toggles│   │  PaymentMethod  │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Snapshot Pattern
//! Orders own frozen copies of everything that may change later: the unit
//! price on each [`OrderItem`] and both [`AddressSnapshot`]s. Editing or
//! deleting an [`Address`] never touches historical orders.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::money::Money;

// =============================================================================
// Tax Rate
// =============================================================================

/// Tax rate expressed as a percentage (`10` = 10%).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaxRate(Decimal);

impl TaxRate {
    /// Creates a tax rate from a percentage.
    #[inline]
    pub const fn from_percent(percent: Decimal) -> Self {
        TaxRate(percent)
    }

    /// Returns the rate as a percentage.
    #[inline]
    pub const fn percent(&self) -> Decimal {
        self.0
    }

    /// Zero tax rate.
    #[inline]
    pub const fn zero() -> Self {
        TaxRate(Decimal::ZERO)
    }
}

impl Default for TaxRate {
    fn default() -> Self {
        TaxRate::zero()
    }
}

// =============================================================================
// Product
// =============================================================================

/// A product in the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: String,
    pub sku: String,
    pub name: String,
    /// Base price, used when no variant is selected.
    pub price: Money,
    /// Aggregate stock across all variants.
    pub quantity: i64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A size/color combination of a product with its own stock and price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductVariant {
    pub id: String,
    pub product_id: String,
    pub size: String,
    pub color: String,
    pub price: Money,
    pub quantity: i64,
}

// =============================================================================
// Coupon
// =============================================================================

/// How a coupon's `value` is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiscountType {
    /// `value` is a percentage of the subtotal.
    Percentage,
    /// `value` is an absolute amount.
    Fixed,
}

/// A discount code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Coupon {
    pub id: String,
    pub code: String,
    pub discount_type: DiscountType,
    /// Percent for [`DiscountType::Percentage`], amount for [`DiscountType::Fixed`].
    pub value: Decimal,
    pub min_order_amount: Option<Money>,
    /// Cap for percentage coupons; ignored for fixed coupons.
    pub max_discount_amount: Option<Money>,
    pub is_active: bool,
    pub valid_from: DateTime<Utc>,
    pub valid_until: DateTime<Utc>,
    pub usage_limit: Option<i64>,
    pub used_count: i64,
}

// =============================================================================
// Address
// =============================================================================

/// A saved address belonging to a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    pub id: String,
    pub user_id: String,
    pub full_name: String,
    pub phone: String,
    pub street: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
}

impl Address {
    /// Freezes this address for embedding into an order.
    pub fn snapshot(&self) -> AddressSnapshot {
        AddressSnapshot {
            full_name: self.full_name.clone(),
            phone: self.phone.clone(),
            street: self.street.clone(),
            city: self.city.clone(),
            state: self.state.clone(),
            postal_code: self.postal_code.clone(),
            country: self.country.clone(),
        }
    }
}

/// Frozen copy of an address, owned by value by an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressSnapshot {
    pub full_name: String,
    pub phone: String,
    pub street: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
}

// =============================================================================
// Cart
// =============================================================================

/// A line in a user's cart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub id: String,
    pub cart_id: String,
    pub product_id: String,
    pub size: Option<String>,
    pub color: Option<String>,
    pub quantity: i64,
    /// Price captured when the line was added (variant price if selected).
    pub unit_price: Money,
    pub created_at: DateTime<Utc>,
}

impl CartItem {
    /// Unit price × quantity.
    pub fn line_total(&self) -> Money {
        self.unit_price.multiply_quantity(self.quantity)
    }

    /// The (size, color) pair, only when both are present.
    pub fn variant_selector(&self) -> Option<(&str, &str)> {
        match (self.size.as_deref(), self.color.as_deref()) {
            (Some(size), Some(color)) => Some((size, color)),
            _ => None,
        }
    }
}

/// The mutable pre-checkout collection of a single user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    pub id: String,
    pub user_id: String,
    pub items: Vec<CartItem>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Cart {
    /// Sum of all line totals.
    pub fn subtotal(&self) -> Money {
        self.items.iter().map(CartItem::line_total).sum()
    }

    /// Total quantity across lines.
    pub fn total_quantity(&self) -> i64 {
        self.items.iter().map(|i| i.quantity).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

// =============================================================================
// Order Status / Payment
// =============================================================================

/// Lifecycle state of an order. Checkout only ever creates `Pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Pending,
    Processing,
    Shipped,
    Delivered,
    Received,
    ReturnRequested,
    Cancelled,
}

impl Default for OrderStatus {
    fn default() -> Self {
        OrderStatus::Pending
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Failed,
    Refunded,
}

impl Default for PaymentStatus {
    fn default() -> Self {
        PaymentStatus::Pending
    }
}

/// Payment methods a customer may choose at checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    /// Cash on delivery.
    Cod,
    BankTransfer,
    CreditCard,
}

impl PaymentMethod {
    pub const ALL: [PaymentMethod; 3] = [
        PaymentMethod::Cod,
        PaymentMethod::BankTransfer,
        PaymentMethod::CreditCard,
    ];

    /// Wire name, as accepted in checkout requests.
    pub const fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cod => "COD",
            PaymentMethod::BankTransfer => "BANK_TRANSFER",
            PaymentMethod::CreditCard => "CREDIT_CARD",
        }
    }
}

// =============================================================================
// Order
// =============================================================================

/// The immutable, priced record of a completed checkout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: String,
    pub order_number: String,
    pub user_id: String,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub payment_method: PaymentMethod,
    pub subtotal: Money,
    pub discount: Money,
    pub tax: Money,
    pub shipping: Money,
    pub total: Money,
    pub shipping_address: AddressSnapshot,
    pub billing_address: AddressSnapshot,
    pub coupon_id: Option<String>,
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub idempotency_key: Option<String>,
    pub items: Vec<OrderItem>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A line of an order. Price and quantity are frozen at order time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub id: String,
    pub order_id: String,
    pub product_id: String,
    /// Product name at time of order (frozen).
    pub product_name: String,
    pub size: Option<String>,
    pub color: Option<String>,
    pub price: Money,
    pub quantity: i64,
    /// `price * quantity`.
    pub total: Money,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Settings
// =============================================================================

/// Store-wide configuration read at checkout time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub shipping_fee: Money,
    pub free_shipping_threshold: Option<Money>,
    pub tax_rate: TaxRate,
    pub payment_cod_enabled: bool,
    pub payment_bank_transfer_enabled: bool,
    pub payment_credit_card_enabled: bool,
}

impl Settings {
    /// Checks whether a payment method is currently accepted.
    pub fn is_enabled(&self, method: PaymentMethod) -> bool {
        match method {
            PaymentMethod::Cod => self.payment_cod_enabled,
            PaymentMethod::BankTransfer => self.payment_bank_transfer_enabled,
            PaymentMethod::CreditCard => self.payment_credit_card_enabled,
        }
    }

    pub fn enabled_payment_methods(&self) -> Vec<PaymentMethod> {
        PaymentMethod::ALL
            .into_iter()
            .filter(|m| self.is_enabled(*m))
            .collect()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn cart_item(size: Option<&str>, color: Option<&str>, qty: i64, price: i64) -> CartItem {
        CartItem {
            id: "ci-1".to_string(),
            cart_id: "cart-1".to_string(),
            product_id: "p-1".to_string(),
            size: size.map(str::to_string),
            color: color.map(str::to_string),
            quantity: qty,
            unit_price: Money::from_units(price),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_variant_selector_needs_both_attributes() {
        assert_eq!(
            cart_item(Some("M"), Some("Black"), 1, 10).variant_selector(),
            Some(("M", "Black"))
        );
        assert_eq!(cart_item(Some("M"), None, 1, 10).variant_selector(), None);
        assert_eq!(cart_item(None, Some("Black"), 1, 10).variant_selector(), None);
    }

    #[test]
    fn test_cart_subtotal() {
        let cart = Cart {
            id: "cart-1".to_string(),
            user_id: "u-1".to_string(),
            items: vec![cart_item(None, None, 2, 150_000), cart_item(None, None, 1, 200_000)],
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert_eq!(cart.subtotal(), Money::from_units(500_000));
        assert_eq!(cart.total_quantity(), 3);
    }

    #[test]
    fn test_enabled_payment_methods() {
        let settings = Settings {
            shipping_fee: Money::zero(),
            free_shipping_threshold: None,
            tax_rate: TaxRate::from_percent(dec!(10)),
            payment_cod_enabled: true,
            payment_bank_transfer_enabled: false,
            payment_credit_card_enabled: true,
        };
        assert_eq!(
            settings.enabled_payment_methods(),
            vec![PaymentMethod::Cod, PaymentMethod::CreditCard]
        );
        assert!(!settings.is_enabled(PaymentMethod::BankTransfer));
    }

    #[test]
    fn test_payment_method_wire_names() {
        let parsed: PaymentMethod = serde_json::from_str("\"BANK_TRANSFER\"").unwrap();
        assert_eq!(parsed, PaymentMethod::BankTransfer);
        assert_eq!(serde_json::to_string(&PaymentMethod::Cod).unwrap(), "\"COD\"");
    }

    #[test]
    fn test_order_status_default() {
        assert_eq!(OrderStatus::default(), OrderStatus::Pending);
        assert_eq!(PaymentStatus::default(), PaymentStatus::Pending);
    }
}
