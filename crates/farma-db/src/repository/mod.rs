//! # Repository Module
//!
//! Database repository implementations for FarmaTrack.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Caller                                                                 │
//! │       │  db.products().lookup("7702001")                               │
//! │       ▼                                                                 │
//! │  ProductRepository / SaleRepository / InvoiceRepository                │
//! │       │  SQL + row ↔ domain conversion                                 │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Repository methods take `&self` and use the pool. Operations that must
//! join a caller's transaction are associated functions taking
//! `&mut SqliteConnection` (pass `&mut *tx`).
//!
//! ## Available Repositories
//!
//! - [`product::ProductRepository`] - Product CRUD, search, stock updates
//! - [`sale::SaleRepository`] - Append-only sale records
//! - [`invoice::InvoiceRepository`] - Supplier invoice receipt

pub mod invoice;
pub mod product;
pub mod sale;

use farma_core::{Money, Quantity, ValidationError};
use rust_decimal::Decimal;

use crate::error::{DbError, DbResult};

/// Reads a decimal TEXT column.
pub(crate) fn parse_decimal(table: &str, column: &str, text: &str) -> DbResult<Decimal> {
    Decimal::from_str_exact(text.trim())
        .map_err(|e| DbError::corrupt(table, format!("{column} = '{text}': {e}")))
}

/// Reads a money TEXT column.
pub(crate) fn parse_money(table: &str, column: &str, text: &str) -> DbResult<Money> {
    parse_decimal(table, column, text).map(Money::new)
}

/// Converts a quantity to its stored micro-box count.
pub(crate) fn to_micros(field: &str, quantity: Quantity) -> DbResult<i64> {
    quantity.to_micros().ok_or_else(|| {
        DbError::Validation(ValidationError::OutOfRange {
            field: field.to_string(),
            min: i64::MIN.to_string(),
            max: i64::MAX.to_string(),
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_money() {
        assert_eq!(
            parse_money("products", "sale_price", "1234.50").unwrap(),
            Money::from_str_exact("1234.5").unwrap()
        );
        assert!(matches!(
            parse_money("products", "sale_price", "abc"),
            Err(DbError::CorruptData { .. })
        ));
    }

    #[test]
    fn test_to_micros_overflow() {
        let huge = Quantity::new(Decimal::MAX);
        assert!(matches!(to_micros("quantity", huge), Err(DbError::Validation(_))));
        assert_eq!(to_micros("quantity", Quantity::from_units(2)).unwrap(), 2_000_000);
    }
}
