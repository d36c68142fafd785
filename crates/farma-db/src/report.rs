//! # Sales Reports
//!
//! Loads sales for a period and summarizes them with
//! [`farma_core::SalesSummary`].

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use farma_core::{Money, SalesSummary};
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use crate::repository::product::ProductRepository;
use crate::repository::sale::SaleRepository;

/// Reporting queries.
#[derive(Debug, Clone)]
pub struct Reports {
    pool: SqlitePool,
}

impl Reports {
    pub fn new(pool: SqlitePool) -> Self {
        Reports { pool }
    }

    /// Revenue, cost and profit of sales with `from <= created_at < to`.
    ///
    /// Normal lines are costed at today's purchase price; kits at the cost
    /// stored with the sale.
    pub async fn summary_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> DbResult<SalesSummary> {
        let sales = SaleRepository::new(self.pool.clone())
            .list_between(from, to)
            .await?;

        let prices: HashMap<String, Money> = ProductRepository::new(self.pool.clone())
            .purchase_prices()
            .await?
            .into_iter()
            .collect();

        let summary = SalesSummary::from_sales(&sales, |barcode| prices.get(barcode).copied());

        debug!(
            sales = summary.sale_count,
            revenue = %summary.revenue,
            profit = %summary.profit,
            "Sales summary computed"
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};
    use chrono::Duration;
    use farma_core::{KitDraft, KitSelection, LineItem, Product, Quantity};
    use rust_decimal::Decimal;

    #[tokio::test]
    async fn test_summary_uses_stored_kit_cost() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let a = Product::new("A", "Gasa", Quantity::from_units(10), Money::from_units(600), Money::from_units(1000));
        let b = Product::new("B", "Venda", Quantity::from_units(10), Money::from_units(900), Money::from_units(2000));
        db.products().insert(&a).await.unwrap();
        db.products().insert(&b).await.unwrap();

        let mut kit = KitDraft::new("Kit curacion");
        kit.add(KitSelection::new(&a, Decimal::from(2), Decimal::ONE).unwrap());
        kit.add(KitSelection::new(&b, Decimal::from(4), Decimal::ONE).unwrap());
        kit.set_price(Some(Money::from_units(4000)));

        let items = vec![
            LineItem::normal(&a, Quantity::from_units(2)),
            kit.into_line_item().unwrap(),
        ];
        db.checkout().register_sale(items, "caja1").await.unwrap();

        // later price changes must not move the kit's recorded cost
        db.products().bulk_update_prices(None, Decimal::from(50)).await.unwrap();

        let now = Utc::now();
        let summary = db
            .reports()
            .summary_between(now - Duration::hours(1), now + Duration::hours(1))
            .await
            .unwrap();

        assert_eq!(summary.sale_count, 1);
        assert_eq!(summary.revenue, Money::from_units(6000));
        // 2 × 600 purchase price + 1000 stored kit cost
        assert_eq!(summary.cost, Money::from_units(2200));
        assert_eq!(summary.profit, Money::from_units(3800));
    }
}
