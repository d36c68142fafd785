//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Exact Decimals?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In binary floating point:                                              │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                           │
//! │                                                                         │
//! │  Pharmacy sales multiply prices by box fractions:                       │
//! │    5000 × 0.3 boxes = 1500, and a kit adds up many such products.      │
//! │    Float error compounds across components and sale lines.              │
//! │                                                                         │
//! │  OUR SOLUTION: rust_decimal::Decimal                                    │
//! │    Base-10 arithmetic, 28 significant digits, no silent drift.         │
//! │    Rounding happens ONLY when a value is presented.                    │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use farma_core::{Money, Quantity};
//!
//! let price = Money::from_units(5000);
//! let line = price * Quantity::from_units(10);
//! assert_eq!(line, Money::from_units(50_000));
//! ```

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};

use crate::quantity::Quantity;
use crate::DISPLAY_DECIMALS;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary amount in the store's currency.
///
/// ## Design Decisions
/// - **Decimal (signed)**: allows negative values for losses in reports
/// - **Single field tuple struct**: zero-cost wrapper over `Decimal`
/// - **Transparent serde**: serialized exactly as the inner decimal
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(Decimal);

impl Money {
    /// Wraps a decimal amount.
    #[inline]
    pub const fn new(amount: Decimal) -> Self {
        Money(amount)
    }

    /// Creates money from a whole number of currency units.
    ///
    /// ## Example
    /// ```rust
    /// use farma_core::Money;
    ///
    /// let price = Money::from_units(5000);
    /// assert_eq!(price.to_string(), "$5000.00");
    /// ```
    #[inline]
    pub fn from_units(units: i64) -> Self {
        Money(Decimal::from(units))
    }

    /// Parses a plain decimal string (`"1234.56"`) without any locale handling.
    ///
    /// Locale-tolerant parsing of user text lives in [`crate::parse`].
    pub fn from_str_exact(s: &str) -> Result<Self, rust_decimal::Error> {
        Decimal::from_str_exact(s).map(Money)
    }

    /// Returns the underlying decimal.
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

    /// Checks if the value is negative (less than zero).
    #[inline]
    pub fn is_negative(&self) -> bool {
        self.0.is_sign_negative() && !self.0.is_zero()
    }

    /// Checks if the value is positive (greater than zero).
    #[inline]
    pub fn is_positive(&self) -> bool {
        !self.is_negative() && !self.is_zero()
    }

    /// Splits the amount into `parts` equal shares.
    ///
    /// Every share is `self / parts` except the last one, which absorbs the
    /// indivisible remainder so the shares always sum back to `self` exactly.
    /// Returns an empty vector when `parts` is zero.
    ///
    /// ## Example
    /// ```rust
    /// use farma_core::Money;
    ///
    /// let shares = Money::from_units(100).split_evenly(3);
    /// let total: Money = shares.iter().copied().sum();
    /// assert_eq!(total, Money::from_units(100));
    /// ```
    pub fn split_evenly(&self, parts: usize) -> Vec<Money> {
        if parts == 0 {
            return Vec::new();
        }

        let share = Money(self.0 / Decimal::from(parts as u64));
        let mut shares = vec![share; parts - 1];
        let allocated: Money = shares.iter().copied().sum();
        shares.push(*self - allocated);
        shares
    }

    /// Addition that returns `None` instead of overflowing.
    pub fn checked_add(self, other: Money) -> Option<Money> {
        self.0.checked_add(other.0).map(Money)
    }

    /// `self × quantity`, or `None` if the product leaves the decimal range.
    pub fn checked_mul(self, quantity: Quantity) -> Option<Money> {
        self.0.checked_mul(quantity.value()).map(Money)
    }

    /// Applies a percentage change and rounds the result to cents.
    ///
    /// Used for bulk price updates, where the result is a new stored price.
    /// `percent` of `10` raises by 10%, `-5` lowers by 5%.
    pub fn adjust_by_percent(&self, percent: Decimal) -> Money {
        let factor = Decimal::ONE_HUNDRED + percent;
        Money((self.0 * factor / Decimal::ONE_HUNDRED).round_dp_with_strategy(
            DISPLAY_DECIMALS,
            RoundingStrategy::MidpointAwayFromZero,
        ))
    }

    /// Rounds to the display precision using Bankers Rounding.
    ///
    /// Only call this when presenting a value; never feed the result back
    /// into further arithmetic.
    pub fn rounded_for_display(&self) -> Money {
        Money(self.0.round_dp(DISPLAY_DECIMALS))
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Display shows money rounded to two decimals (presentation only).
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rounded = self.rounded_for_display().0;
        let sign = if rounded.is_sign_negative() && !rounded.is_zero() {
            "-"
        } else {
            ""
        };
        write!(
            f,
            "{}${:.prec$}",
            sign,
            rounded.abs(),
            prec = DISPLAY_DECIMALS as usize
        )
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl From<Decimal> for Money {
    fn from(amount: Decimal) -> Self {
        Money(amount)
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

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

/// Price × box fraction (for line subtotals and component costs).
impl Mul<Quantity> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: Quantity) -> Self {
        Money(self.0 * qty.value())
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

#[cfg(test)]
mod tests {
    use super::*;

    fn money(s: &str) -> Money {
        Money::from_str_exact(s).unwrap()
    }

    #[test]
    fn test_display() {
        assert_eq!(Money::from_units(5000).to_string(), "$5000.00");
        assert_eq!(money("10.999").to_string(), "$11.00");
        assert_eq!(money("-5.5").to_string(), "-$5.50");
        assert_eq!(Money::zero().to_string(), "$0.00");
    }

    #[test]
    fn test_checked_arithmetic() {
        let price = Money::from_units(5000);
        assert_eq!(price.checked_mul(Quantity::from_units(10)), Some(Money::from_units(50_000)));
        assert_eq!(price.checked_add(price), Some(Money::from_units(10_000)));

        let huge = Money::new(Decimal::MAX);
        assert!(huge.checked_mul(Quantity::from_units(2)).is_none());
        assert!(huge.checked_add(Money::from_units(1)).is_none());
    }

    #[test]
    fn test_arithmetic() {
        let a = Money::from_units(1000);
        let b = Money::from_units(500);

        assert_eq!(a + b, Money::from_units(1500));
        assert_eq!(a - b, Money::from_units(500));
        assert_eq!(a * Quantity::from_units(3), Money::from_units(3000));
    }

    #[test]
    fn test_fractional_quantity_is_exact() {
        // The classic float trap: 0.1 + 0.2
        assert_eq!(money("0.1") + money("0.2"), money("0.3"));

        let price = Money::from_units(5000);
        let three_tenths = Quantity::from_str_exact("0.3").unwrap();
        assert_eq!(price * three_tenths, Money::from_units(1500));
    }

    #[test]
    fn test_split_evenly_conserves_total() {
        let total = Money::from_units(1000);
        let shares = total.split_evenly(3);

        assert_eq!(shares.len(), 3);
        assert_eq!(shares[0], shares[1]);
        assert_eq!(shares.iter().copied().sum::<Money>(), total);
        // The remainder is tiny and sits on the last share
        assert!((shares[2] - shares[0]).amount().abs() < Decimal::new(1, 20));
    }

    #[test]
    fn test_split_evenly_zero_parts() {
        assert!(Money::from_units(10).split_evenly(0).is_empty());
    }

    #[test]
    fn test_adjust_by_percent() {
        assert_eq!(
            Money::from_units(1000).adjust_by_percent(Decimal::from(10)),
            Money::from_units(1100)
        );
        assert_eq!(
            money("999.99").adjust_by_percent(Decimal::from(-50)),
            money("500.00")
        );
    }

    #[test]
    fn test_sign_checks() {
        assert!(Money::zero().is_zero());
        assert!(!Money::zero().is_negative());
        assert!(Money::from_units(1).is_positive());
        assert!(Money::from_units(-1).is_negative());
    }
}
