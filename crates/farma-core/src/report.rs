//! # Sales Reporting
//!
//! Revenue, cost and profit over a set of committed sales.
//!
//! Cost per line kind:
//! - Normal: the product's purchase price × quantity (unknown product: 0)
//! - Service: 0
//! - Kit: the cost stored with the sale, never current prices, so historical
//!   kit profit stays as it was recorded

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::line_item::LineItem;
use crate::money::Money;
use crate::types::Sale;

/// Aggregated figures for a period.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SalesSummary {
    pub sale_count: usize,
    pub revenue: Money,
    pub cost: Money,
    pub profit: Money,
    /// profit / revenue × 100; 0 with no revenue.
    pub margin_pct: Decimal,
}

impl SalesSummary {
    /// Summarizes `sales`, pricing normal lines with `purchase_price`.
    pub fn from_sales<F>(sales: &[Sale], purchase_price: F) -> Self
    where
        F: Fn(&str) -> Option<Money>,
    {
        let revenue: Money = sales.iter().map(|s| s.total).sum();
        let cost: Money = sales
            .iter()
            .flat_map(|s| s.items.iter())
            .map(|item| line_cost(item, &purchase_price))
            .sum();
        let profit = revenue - cost;

        let margin_pct = if revenue.is_zero() {
            Decimal::ZERO
        } else {
            (profit.amount() * Decimal::ONE_HUNDRED)
                .checked_div(revenue.amount())
                .unwrap_or(Decimal::ZERO)
        };

        SalesSummary {
            sale_count: sales.len(),
            revenue,
            cost,
            profit,
            margin_pct,
        }
    }
}

/// Cost basis of one line.
pub fn line_cost<F>(item: &LineItem, purchase_price: F) -> Money
where
    F: Fn(&str) -> Option<Money>,
{
    match item {
        LineItem::Normal(line) => purchase_price(&line.barcode)
            .map(|price| price * line.quantity)
            .unwrap_or_default(),
        LineItem::Service(_) => Money::zero(),
        LineItem::Kit(kit) => kit.cost,
    }
}
