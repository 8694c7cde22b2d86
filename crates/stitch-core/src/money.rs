//! # Money Module
//!
//! Provides the `Money` type for handling monetary values exactly.
//!
//! ## Why a Decimal Newtype?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In floating point:                                                     │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                           │
//! │                                                                         │
//! │  OUR SOLUTION: one decimal type everywhere                              │
//! │    cart unit price ─► coupon value ─► pricing ─► order totals          │
//! │    Converted to/from TEXT only inside stitch-db row mappers             │
//! │                                                                         │
//! │  Tax keeps its full computed precision; only the coupon discount is    │
//! │  rounded (to a whole currency unit) and only once.                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use stitch_core::money::Money;
//!
//! let price = Money::from_units(250_000);
//! let line_total = price.multiply_quantity(2);
//! assert_eq!(line_total, Money::from_units(500_000));
//! ```

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Sub};
use std::str::FromStr;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary amount in the store currency.
///
/// ## Design Decisions
/// - **Decimal (exact)**: no binary floating point anywhere in pricing
/// - **Single field tuple struct**: zero-cost abstraction over `Decimal`
/// - **Transparent serde**: serialized as a decimal string in JSON
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(Decimal);

impl Money {
    /// Creates a Money value from whole currency units.
    #[inline]
    pub fn from_units(units: i64) -> Self {
        Money(Decimal::from(units))
    }

    /// Wraps an exact decimal amount.
    #[inline]
    pub const fn from_decimal(amount: Decimal) -> Self {
        Money(amount)
    }

    /// Returns the underlying decimal amount.
    #[inline]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(Decimal::ZERO)
    }

    /// Checks if the value is zero.
    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Checks if the value is strictly greater than zero.
    #[inline]
    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }

    /// Checks if the value is strictly less than zero.
    #[inline]
    pub fn is_negative(&self) -> bool {
        self.0 < Decimal::ZERO
    }

    /// Multiplies money by a quantity.
    ///
    /// ## Example
    /// ```rust
    /// use stitch_core::money::Money;
    ///
    /// let unit_price = Money::from_units(199);
    /// assert_eq!(unit_price.multiply_quantity(3), Money::from_units(597));
    /// ```
    #[inline]
    pub fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0 * Decimal::from(qty))
    }

    /// Returns `percent`% of this amount, at full precision.
    ///
    /// ## Example
    /// ```rust
    /// use rust_decimal::Decimal;
    /// use stitch_core::money::Money;
    ///
    /// let subtotal = Money::from_units(460_000);
    /// assert_eq!(subtotal.percent(Decimal::from(10)), Money::from_units(46_000));
    /// ```
    pub fn percent(&self, percent: Decimal) -> Money {
        Money(self.0 * percent / Decimal::ONE_HUNDRED)
    }

    /// Clamps negative amounts to zero.
    #[inline]
    pub fn clamp_non_negative(self) -> Money {
        if self.is_negative() {
            Money::zero()
        } else {
            self
        }
    }

    /// Subtracts, clamping the result at zero.
    #[inline]
    pub fn saturating_sub(self, other: Money) -> Money {
        (self - other).clamp_non_negative()
    }

    /// Rounds to a whole currency unit, half away from zero.
    ///
    /// ## When This Is Used
    /// Exactly once per checkout: on the coupon discount that gets persisted.
    ///
    /// ```rust
    /// use rust_decimal::Decimal;
    /// use stitch_core::money::Money;
    ///
    /// let d = Money::from_decimal(Decimal::new(12345, 1)); // 1234.5
    /// assert_eq!(d.round_to_unit(), Money::from_units(1235));
    /// ```
    pub fn round_to_unit(&self) -> Money {
        Money(
            self.0
                .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero),
        )
    }

    /// Canonical string used at the persistence boundary.
    pub fn to_storage_string(&self) -> String {
        self.0.normalize().to_string()
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Display rounds to two decimal places. Display only; stored values keep
/// their full precision.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let shown = self
            .0
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
        write!(f, "{:.2}", shown)
    }
}

impl FromStr for Money {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Decimal::from_str(s.trim()).map(Money)
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
