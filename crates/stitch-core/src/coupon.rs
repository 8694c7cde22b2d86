//! # Coupon Resolution
//!
//! Eligibility checks and discount computation for an optional coupon.
//!
//! ## Check Order
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  couponId supplied?  ── no ──► discount 0, no coupon                    │
//! │        │ yes                                                            │
//! │        ▼                                                                │
//! │  1. exists?                     ── no ──► CouponNotFound                │
//! │  2. is_active?                  ── no ──► CouponDisabled                │
//! │  3. valid_from <= now <= until? ── no ──► CouponExpired                 │
//! │  4. used_count < usage_limit?   ── no ──► CouponExhausted               │
//! │  5. subtotal >= min_order?      ── no ──► CouponMinimumNotMet           │
//! │        │                                                                │
//! │        ▼                                                                │
//! │  PERCENTAGE: subtotal × value / 100, capped at max_discount_amount      │
//! │  FIXED:      value                                                      │
//! │        │                                                                │
//! │        ▼                                                                │
//! │  round to whole unit (once) ─► clamp to [0, subtotal]                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The resolver only reads. Usage is consumed inside the atomic phase with a
//! conditional increment, which is where the last-use race is decided.

use chrono::{DateTime, Utc};

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::{Coupon, DiscountType};

/// Outcome of a successful resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct CouponResolution {
    /// Rounded discount, always within `[0, subtotal]`.
    pub discount: Money,
    /// The applied coupon, if one was requested.
    pub coupon: Option<Coupon>,
}

impl CouponResolution {
    /// No coupon requested.
    pub fn none() -> Self {
        CouponResolution {
            discount: Money::zero(),
            coupon: None,
        }
    }

    pub fn coupon_id(&self) -> Option<&str> {
        self.coupon.as_ref().map(|c| c.id.as_str())
    }
}

/// Stateless coupon resolver.
pub struct CouponResolver;

impl CouponResolver {
    /// Resolves a requested coupon against the loaded row.
    ///
    /// `found` is the result of looking `requested` up; `now` is passed in so
    /// the resolver stays clock-free.
    pub fn resolve(
        requested: Option<&str>,
        found: Option<&Coupon>,
        subtotal: Money,
        now: DateTime<Utc>,
    ) -> CoreResult<CouponResolution> {
        let Some(requested) = requested else {
            return Ok(CouponResolution::none());
        };

        let coupon = found.ok_or_else(|| CoreError::CouponNotFound(requested.to_string()))?;

        Self::check_eligibility(coupon, subtotal, now)?;

        Ok(CouponResolution {
            discount: Self::discount_for(coupon, subtotal),
            coupon: Some(coupon.clone()),
        })
    }

    /// Runs checks 2 to 5 in order.
    pub fn check_eligibility(coupon: &Coupon, subtotal: Money, now: DateTime<Utc>) -> CoreResult<()> {
        if !coupon.is_active {
            return Err(CoreError::CouponDisabled(coupon.code.clone()));
        }

        if now < coupon.valid_from || now > coupon.valid_until {
            return Err(CoreError::CouponExpired(coupon.code.clone()));
        }

        if let Some(limit) = coupon.usage_limit {
            if coupon.used_count >= limit {
                return Err(CoreError::CouponExhausted(coupon.code.clone()));
            }
        }

        if let Some(required) = coupon.min_order_amount {
            if subtotal < required {
                return Err(CoreError::CouponMinimumNotMet { required });
            }
        }

        Ok(())
    }

    /// Computes the discount for an eligible coupon.
    ///
    /// The result is rounded to a whole currency unit here and nowhere else,
    /// then clamped so it never exceeds the subtotal.
    pub fn discount_for(coupon: &Coupon, subtotal: Money) -> Money {
        let raw = match coupon.discount_type {
            DiscountType::Percentage => {
                let pct = subtotal.percent(coupon.value);
                match coupon.max_discount_amount {
                    Some(cap) => pct.min(cap),
                    None => pct,
                }
            }
            DiscountType::Fixed => Money::from_decimal(coupon.value),
        };

        raw.round_to_unit()
            .min(subtotal)
            .clamp_non_negative()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
