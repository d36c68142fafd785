//! # Quantity Module
//!
//! Stock quantities measured in boxes (stock-keeping containers).
//!
//! A pharmacy sells part of a box: using 3 loose tablets from a box of 10
//! deducts 0.3 boxes. `Quantity` keeps that fraction exact in memory and
//! converts to a fixed-point integer ("micro-boxes") only at the storage
//! boundary.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  In memory            Storage (SQLite)                                  │
//! │  ─────────            ────────────────                                  │
//! │  Quantity(0.3)   ──►  stock_micros = 300000                             │
//! │  Quantity(1/3)   ──►  stock_micros = 333333   (rounded, 6 places)       │
//! │                                                                         │
//! │  Integer columns make `stock_micros >= ?` an exact comparison.          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Sub};

/// Decimal places kept when a quantity is written to the database.
pub const STORAGE_SCALE: u32 = 6;

const MICROS_PER_BOX: i64 = 1_000_000;

/// A (possibly fractional) number of boxes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Quantity(Decimal);

impl Quantity {
    /// Wraps a decimal quantity.
    #[inline]
    pub const fn new(value: Decimal) -> Self {
        Quantity(value)
    }

    /// Creates a whole number of boxes.
    #[inline]
    pub fn from_units(units: i64) -> Self {
        Quantity(Decimal::from(units))
    }

    /// Parses a plain decimal string without locale handling.
    pub fn from_str_exact(s: &str) -> Result<Self, rust_decimal::Error> {
        Decimal::from_str_exact(s).map(Quantity)
    }

    /// `numerator / denominator` boxes, exact to decimal precision.
    ///
    /// Returns `None` when the denominator is zero.
    ///
    /// ## Example
    /// ```rust
    /// use farma_core::Quantity;
    /// use rust_decimal::Decimal;
    ///
    /// // 3 tablets from a box of 10
    /// let boxes = Quantity::ratio(Decimal::from(3), Decimal::from(10)).unwrap();
    /// assert_eq!(boxes, Quantity::from_str_exact("0.3").unwrap());
    /// ```
    pub fn ratio(numerator: Decimal, denominator: Decimal) -> Option<Self> {
        numerator.checked_div(denominator).map(Quantity)
    }

    /// Returns the underlying decimal.
    #[inline]
    pub const fn value(&self) -> Decimal {
        self.0
    }

    #[inline]
    pub const fn zero() -> Self {
        Quantity(Decimal::ZERO)
    }

    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Strictly greater than zero.
    #[inline]
    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }

    #[inline]
    pub fn is_negative(&self) -> bool {
        self.0 < Decimal::ZERO
    }

    /// Rounds to the storage scale.
    ///
    /// Stock checks compare requested amounts at this precision, so the
    /// pre-check and the stored guard agree on what "enough" means.
    pub fn at_storage_scale(&self) -> Quantity {
        Quantity(
            self.0
                .round_dp_with_strategy(STORAGE_SCALE, RoundingStrategy::MidpointAwayFromZero)
                .normalize(),
        )
    }

    /// Converts to integer millionths of a box for storage.
    ///
    /// Returns `None` if the value does not fit an `i64`.
    pub fn to_micros(&self) -> Option<i64> {
        self.0
            .checked_mul(Decimal::from(MICROS_PER_BOX))?
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
            .to_i64()
    }

    /// Reads a stored micro-box count back into a quantity.
    pub fn from_micros(micros: i64) -> Self {
        Quantity(Decimal::new(micros, STORAGE_SCALE).normalize())
    }

    /// Largest quantity a stock column can hold.
    pub fn max_storable() -> Self {
        Quantity::from_micros(i64::MAX)
    }

    /// Addition that returns `None` instead of overflowing.
    pub fn checked_add(self, other: Quantity) -> Option<Quantity> {
        self.0.checked_add(other.0).map(Quantity)
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.normalize())
    }
}

impl Default for Quantity {
    fn default() -> Self {
        Quantity::zero()
    }
}

impl From<Decimal> for Quantity {
    fn from(value: Decimal) -> Self {
        Quantity(value)
    }
}

impl Add for Quantity {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Quantity(self.0 + other.0)
    }
}

impl AddAssign for Quantity {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Quantity {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Quantity(self.0 - other.0)
    }
}

impl Sum for Quantity {
    fn sum<I: Iterator<Item = Quantity>>(iter: I) -> Self {
        iter.fold(Quantity::zero(), |acc, q| acc + q)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checked_add_and_storable_limit() {
        let big = Quantity::new(Decimal::MAX);
        assert!(big.checked_add(Quantity::from_units(1)).is_none());
        assert_eq!(
            Quantity::from_units(2).checked_add(Quantity::from_units(3)),
            Some(Quantity::from_units(5))
        );

        assert_eq!(Quantity::max_storable().to_micros(), Some(i64::MAX));
        assert!(Quantity::new(Decimal::from(10_000_000_000_000_i64)).to_micros().is_none());
    }

    #[test]
    fn test_ratio() {
        let half = Quantity::ratio(Decimal::ONE, Decimal::TWO).unwrap();
        assert_eq!(half, Quantity::from_str_exact("0.5").unwrap());
        assert!(Quantity::ratio(Decimal::ONE, Decimal::ZERO).is_none());
    }

    #[test]
    fn test_micros_conversion() {
        let q = Quantity::from_str_exact("0.3").unwrap();
        assert_eq!(q.to_micros(), Some(300_000));
        assert_eq!(Quantity::from_micros(300_000), q);

        assert_eq!(Quantity::from_units(100).to_micros(), Some(100_000_000));
        assert_eq!(Quantity::from_micros(90_000_000), Quantity::from_units(90));
    }

    #[test]
    fn test_repeating_fraction_rounds_at_storage() {
        let third = Quantity::ratio(Decimal::ONE, Decimal::from(3)).unwrap();
        assert_eq!(third.to_micros(), Some(333_333));
        assert_eq!(
            third.at_storage_scale(),
            Quantity::from_str_exact("0.333333").unwrap()
        );
    }

    #[test]
    fn test_display_strips_trailing_zeros() {
        assert_eq!(Quantity::from_micros(500_000).to_string(), "0.5");
        assert_eq!(Quantity::from_units(90).to_string(), "90");
    }

    #[test]
    fn test_sum() {
        let total: Quantity = [
            Quantity::from_str_exact("0.5").unwrap(),
            Quantity::from_str_exact("0.25").unwrap(),
        ]
        .into_iter()
        .sum();
        assert_eq!(total, Quantity::from_str_exact("0.75").unwrap());
    }
}
