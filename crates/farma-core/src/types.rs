//! # Domain Types
//!
//! Core domain types used throughout FarmaTrack.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────────┐   │
//! │  │    Product      │   │      Sale       │   │  SupplierInvoice    │   │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────────  │   │
//! │  │  barcode (key)  │   │  id (auto)      │   │  id (auto)          │   │
//! │  │  description    │   │  created_at     │   │  supplier, number   │   │
//! │  │  quantity       │   │  total          │   │  lines              │   │
//! │  │  sale_price     │   │  items (doc)    │   │                     │   │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Identity
//! Products are keyed by barcode. Sales and invoices use auto-incrementing
//! database ids.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::line_item::LineItem;
use crate::money::Money;
use crate::quantity::Quantity;

// =============================================================================
// Product
// =============================================================================

/// A stock-keeping unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    /// Unique barcode (business key).
    pub barcode: String,

    /// Name shown to the cashier and on receipts.
    pub description: String,

    pub supplier: Option<String>,

    /// Unit of measure, e.g. "CAJA", "FRASCO".
    pub unit: Option<String>,

    /// Boxes on hand. Never negative after a committed sale.
    pub quantity: Quantity,

    pub purchase_price: Money,

    pub sale_price: Money,

    /// Free-text tax label, e.g. "19% IVA".
    pub tax_label: String,

    /// Supplier bonus percentage.
    pub bonus_pct: Decimal,

    pub group_name: Option<String>,

    pub subgroup: Option<String>,

    pub expiration_date: Option<NaiveDate>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Creates a product with the required fields; everything else empty.
    pub fn new(
        barcode: impl Into<String>,
        description: impl Into<String>,
        quantity: Quantity,
        purchase_price: Money,
        sale_price: Money,
    ) -> Self {
        let now = Utc::now();
        Product {
            barcode: barcode.into(),
            description: description.into(),
            supplier: None,
            unit: None,
            quantity,
            purchase_price,
            sale_price,
            tax_label: String::new(),
            bonus_pct: Decimal::ZERO,
            group_name: None,
            subgroup: None,
            expiration_date: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Checks if `quantity` boxes can be taken from stock.
    pub fn can_sell(&self, quantity: Quantity) -> bool {
        self.quantity >= quantity.at_storage_scale()
    }

    /// Sale price minus purchase price, per box.
    pub fn unit_margin(&self) -> Money {
        self.sale_price - self.purchase_price
    }

    /// Whether the product expires on or before `date`.
    pub fn expires_by(&self, date: NaiveDate) -> bool {
        self.expiration_date.is_some_and(|d| d <= date)
    }
}

/// The subset of a product the sale processor needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockLevel {
    pub barcode: String,
    pub description: String,
    pub quantity: Quantity,
    pub sale_price: Money,
}

impl From<&Product> for StockLevel {
    fn from(p: &Product) -> Self {
        StockLevel {
            barcode: p.barcode.clone(),
            description: p.description.clone(),
            quantity: p.quantity,
            sale_price: p.sale_price,
        }
    }
}

// =============================================================================
// Sale
// =============================================================================

/// An immutable record of a completed transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sale {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    /// Always equal to the sum of the line subtotals.
    pub total: Money,
    pub cashier: String,
    /// Ordered line items, stored as one JSON document.
    pub items: Vec<LineItem>,
}

impl Sale {
    /// Recomputes the total from the line items.
    pub fn items_total(&self) -> Money {
        crate::line_item::total_of(&self.items)
    }
}

// =============================================================================
// Supplier Invoices
// =============================================================================

/// One product line on a supplier invoice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceLine {
    pub barcode: String,
    pub quantity: Quantity,
    pub unit_cost: Money,
}

impl InvoiceLine {
    pub fn line_total(&self) -> Money {
        self.unit_cost * self.quantity
    }
}

/// A supplier invoice about to be received into stock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewSupplierInvoice {
    pub supplier: String,
    pub invoice_number: String,
    pub issued_on: NaiveDate,
    pub lines: Vec<InvoiceLine>,
}

impl NewSupplierInvoice {
    /// Σ quantity × unit cost.
    pub fn total(&self) -> Money {
        self.lines.iter().map(InvoiceLine::line_total).sum()
    }
}

/// A received supplier invoice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupplierInvoice {
    pub id: i64,
    pub supplier: String,
    pub invoice_number: String,
    pub issued_on: NaiveDate,
    pub total: Money,
    pub received_at: DateTime<Utc>,
    pub lines: Vec<InvoiceLine>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(stock: &str) -> Product {
        Product::new(
            "7702001",
            "Acetaminofen 500mg",
            Quantity::from_str_exact(stock).unwrap(),
            Money::from_units(3000),
            Money::from_units(5000),
        )
    }

    #[test]
    fn test_can_sell_fraction() {
        let p = product("0.5");
        assert!(p.can_sell(Quantity::from_str_exact("0.5").unwrap()));
        assert!(!p.can_sell(Quantity::from_str_exact("0.6").unwrap()));
    }

    #[test]
    fn test_unit_margin() {
        assert_eq!(product("1").unit_margin(), Money::from_units(2000));
    }

    #[test]
    fn test_expires_by() {
        let mut p = product("1");
        let day = NaiveDate::from_ymd_opt(2026, 12, 31).unwrap();
        assert!(!p.expires_by(day));

        p.expiration_date = NaiveDate::from_ymd_opt(2026, 6, 30);
        assert!(p.expires_by(day));
    }

    #[test]
    fn test_invoice_total() {
        let invoice = NewSupplierInvoice {
            supplier: "Drogueria Central".to_string(),
            invoice_number: "FV-100".to_string(),
            issued_on: NaiveDate::from_ymd_opt(2026, 10, 1).unwrap(),
            lines: vec![
                InvoiceLine {
                    barcode: "A".to_string(),
                    quantity: Quantity::from_units(10),
                    unit_cost: Money::from_units(1200),
                },
                InvoiceLine {
                    barcode: "B".to_string(),
                    quantity: Quantity::from_str_exact("2.5").unwrap(),
                    unit_cost: Money::from_units(800),
                },
            ],
        };
        assert_eq!(invoice.total(), Money::from_units(14_000));
    }
}
