//! # Stock Validation
//!
//! Read-only pre-check that every cart line can be satisfied by current
//! stock, at both the aggregate product level and (when a size/color variant
//! is selected and exists) the variant level.
//!
//! ## Where This Fits
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Checkout                                                               │
//! │                                                                         │
//! │  1. StockValidator::validate   ◄── THIS MODULE (read-only, may be stale)│
//! │  2. CouponResolver::resolve                                             │
//! │  3. PricingCalculator::compute                                          │
//! │  4. Atomic phase                                                        │
//! │       UPDATE ... SET quantity = quantity - n                            │
//! │       WHERE id = ? AND quantity >= n   ◄── the authoritative check      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Stock can change between this check and the commit, so a pass here is
//! only a fast rejection path, never a reservation.

use std::collections::HashMap;

use crate::error::{CoreError, CoreResult};
use crate::types::{Product, ProductVariant};

/// One requested line: the product, the matching variant if any, and the
/// requested quantity.
///
/// `variant` is `None` both when no size/color was selected and when the
/// selection matches no variant row; neither case is an error.
#[derive(Debug, Clone, Copy)]
pub struct StockRequest<'a> {
    pub product: &'a Product,
    pub variant: Option<&'a ProductVariant>,
    pub requested: i64,
}

/// Stateless stock checker.
pub struct StockValidator;

impl StockValidator {
    /// Validates all lines.
    ///
    /// Lines that hit the same product (or the same variant) are summed
    /// before comparing, since the commit-time decrements are cumulative.
    /// The first shortfall in line order is reported.
    pub fn validate(items: &[StockRequest<'_>]) -> CoreResult<()> {
        let mut product_demand: HashMap<&str, i64> = HashMap::new();
        let mut variant_demand: HashMap<&str, i64> = HashMap::new();

        for item in items {
            let product = item.product;

            let demand = product_demand.entry(product.id.as_str()).or_insert(0);
            *demand += item.requested;
            if product.quantity < *demand {
                return Err(CoreError::InsufficientStock {
                    product: product.name.clone(),
                    variant: None,
                    available: product.quantity,
                    requested: *demand,
                });
            }

            if let Some(variant) = item.variant {
                let demand = variant_demand.entry(variant.id.as_str()).or_insert(0);
                *demand += item.requested;
                if variant.quantity < *demand {
                    return Err(CoreError::InsufficientStock {
                        product: product.name.clone(),
                        variant: Some(variant_label(variant)),
                        available: variant.quantity,
                        requested: *demand,
                    });
                }
            }
        }

        Ok(())
    }
}

/// Human-readable variant label, e.g. `M/Black`.
pub fn variant_label(variant: &ProductVariant) -> String {
    format!("{}/{}", variant.size, variant.color)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::Money;
    use chrono::Utc;

    fn product(id: &str, quantity: i64) -> Product {
        Product {
            id: id.to_string(),
            sku: format!("SKU-{id}"),
            name: format!("Product {id}"),
            price: Money::from_units(100_000),
            quantity,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn variant(id: &str, product_id: &str, quantity: i64) -> ProductVariant {
        ProductVariant {
            id: id.to_string(),
            product_id: product_id.to_string(),
            size: "M".to_string(),
            color: "Black".to_string(),
            price: Money::from_units(120_000),
            quantity,
        }
    }

    #[test]
    fn test_enough_stock_passes() {
        let p = product("p1", 5);
        let v = variant("v1", "p1", 2);
        let items = [StockRequest { product: &p, variant: Some(&v), requested: 2 }];
        assert!(StockValidator::validate(&items).is_ok());
    }

    #[test]
    fn test_aggregate_shortfall() {
        let p = product("p1", 1);
        let items = [StockRequest { product: &p, variant: None, requested: 2 }];
        let err = StockValidator::validate(&items).unwrap_err();
        assert_eq!(
            err,
            CoreError::InsufficientStock {
                product: "Product p1".to_string(),
                variant: None,
                available: 1,
                requested: 2,
            }
        );
    }

    #[test]
    fn test_variant_shortfall_is_scoped_to_variant() {
        let p = product("p1", 10);
        let v = variant("v1", "p1", 1);
        let items = [StockRequest { product: &p, variant: Some(&v), requested: 3 }];
        match StockValidator::validate(&items) {
            Err(CoreError::InsufficientStock { variant, available, .. }) => {
                assert_eq!(variant.as_deref(), Some("M/Black"));
                assert_eq!(available, 1);
            }
            other => panic!("expected InsufficientStock, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_variant_is_not_an_error() {
        let p = product("p1", 3);
        let items = [StockRequest { product: &p, variant: None, requested: 3 }];
        assert!(StockValidator::validate(&items).is_ok());
    }

    #[test]
    fn test_lines_for_same_product_are_summed() {
        let p = product("p1", 3);
        let items = [
            StockRequest { product: &p, variant: None, requested: 2 },
            StockRequest { product: &p, variant: None, requested: 2 },
        ];
        assert!(matches!(
            StockValidator::validate(&items),
            Err(CoreError::InsufficientStock { requested: 4, .. })
        ));
    }

    #[test]
    fn test_validation_is_repeatable() {
        let p = product("p1", 1);
        let items = [StockRequest { product: &p, variant: None, requested: 2 }];
        assert_eq!(StockValidator::validate(&items), StockValidator::validate(&items));
    }
}
