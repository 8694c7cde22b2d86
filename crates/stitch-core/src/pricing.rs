//! # Pricing
//!
//! Combines subtotal, discount, shipping rule and tax rate into the final
//! order breakdown.
//!
//! ## Fixed Step Order
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  1. after_discount = max(0, subtotal - discount)                        │
//! │  2. shipping = 0        if threshold set and after_discount >= threshold│
//! │              = fee      otherwise                                       │
//! │  3. tax      = after_discount × tax_rate / 100   (full precision)       │
//! │  4. total    = after_discount + shipping + tax                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The discount arrives already rounded from the coupon resolver; nothing
//! here rounds, so the stored breakdown satisfies step 4 exactly.

use serde::{Deserialize, Serialize};

use crate::money::Money;
use crate::types::Settings;

/// Monetary breakdown persisted on an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceBreakdown {
    pub subtotal: Money,
    pub discount: Money,
    pub shipping: Money,
    pub tax: Money,
    pub total: Money,
}

impl PriceBreakdown {
    /// `max(0, subtotal - discount)`.
    pub fn subtotal_after_discount(&self) -> Money {
        self.subtotal.saturating_sub(self.discount)
    }

    /// Checks `total == max(0, subtotal - discount) + shipping + tax`.
    pub fn is_consistent(&self) -> bool {
        self.total == self.subtotal_after_discount() + self.shipping + self.tax
    }
}

/// Stateless pricing calculator.
pub struct PricingCalculator;

impl PricingCalculator {
    pub fn compute(subtotal: Money, discount: Money, settings: &Settings) -> PriceBreakdown {
        let after_discount = subtotal.saturating_sub(discount);

        let shipping = match settings.free_shipping_threshold {
            Some(threshold) if after_discount >= threshold => Money::zero(),
            _ => settings.shipping_fee,
        };

        let tax = after_discount.percent(settings.tax_rate.percent());

        PriceBreakdown {
            subtotal,
            discount,
            shipping,
            tax,
            total: after_discount + shipping + tax,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
