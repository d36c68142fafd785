//! # Sale Repository
//!
//! Database operations for sale records.
//!
//! ## Sale Records
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  sales                                                                  │
//! │  ┌────┬──────────────────────┬────────┬──────────────────┬─────────┐   │
//! │  │ id │ created_at           │ total  │ items (JSON)     │ cashier │   │
//! │  ├────┼──────────────────────┼────────┼──────────────────┼─────────┤   │
//! │  │ 41 │ 2026-10-19T14:02:11Z │ 54000  │ [{codigo:...}]   │ caja1   │   │
//! │  └────┴──────────────────────┴────────┴──────────────────┴─────────┘   │
//! │                                                                         │
//! │  Rows are written once, inside the checkout transaction, and never     │
//! │  updated or deleted. Reports read the stored document back, so kit     │
//! │  costs stay as they were when the sale happened.                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use farma_core::line_item::decode_document;
use farma_core::{Money, Sale};
use sqlx::{FromRow, SqliteConnection, SqlitePool};
use tracing::debug;

use super::parse_money;
use crate::error::{DbError, DbResult};

#[derive(Debug, FromRow)]
struct SaleRow {
    id: i64,
    created_at: DateTime<Utc>,
    total: String,
    items: String,
    cashier: String,
}

impl TryFrom<SaleRow> for Sale {
    type Error = DbError;

    fn try_from(row: SaleRow) -> DbResult<Self> {
        let items = decode_document(&row.items)
            .map_err(|e| DbError::corrupt("sales", format!("sale {}: {}", row.id, e)))?;

        Ok(Sale {
            id: row.id,
            created_at: row.created_at,
            total: parse_money("sales", "total", &row.total)?,
            cashier: row.cashier,
            items,
        })
    }
}

fn into_sales(rows: Vec<SaleRow>) -> DbResult<Vec<Sale>> {
    rows.into_iter().map(Sale::try_from).collect()
}

/// Repository for sale database operations.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
}

impl SaleRepository {
    /// Creates a new SaleRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SaleRepository { pool }
    }

    /// Inserts a sale row and returns its id.
    ///
    /// `items_document` is the encoded line-item JSON
    /// (see [`farma_core::line_item::encode_document`]).
    pub async fn insert(
        &self,
        created_at: DateTime<Utc>,
        total: Money,
        items_document: &str,
        cashier: &str,
    ) -> DbResult<i64> {
        let mut conn = self.pool.acquire().await?;
        Self::insert_in(&mut conn, created_at, total, items_document, cashier).await
    }

    /// [`SaleRepository::insert`] on a caller-supplied connection, typically
    /// the checkout transaction.
    pub async fn insert_in(
        conn: &mut SqliteConnection,
        created_at: DateTime<Utc>,
        total: Money,
        items_document: &str,
        cashier: &str,
    ) -> DbResult<i64> {
        let result = sqlx::query(
            "INSERT INTO sales (created_at, total, items, cashier) VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(created_at)
        .bind(total.amount().to_string())
        .bind(items_document)
        .bind(cashier)
        .execute(&mut *conn)
        .await?;

        let id = result.last_insert_rowid();
        debug!(sale_id = id, total = %total, cashier = %cashier, "Inserted sale");
        Ok(id)
    }

    /// Gets a sale by id, with its line items decoded.
    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<Sale>> {
        let row = sqlx::query_as::<_, SaleRow>(
            "SELECT id, created_at, total, items, cashier FROM sales WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Sale::try_from).transpose()
    }

    /// Sales with `from <= created_at < to`, oldest first.
    pub async fn list_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> DbResult<Vec<Sale>> {
        let rows = sqlx::query_as::<_, SaleRow>(
            r#"
            SELECT id, created_at, total, items, cashier
            FROM sales
            WHERE created_at >= ?1 AND created_at < ?2
            ORDER BY created_at, id
            "#,
        )
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;

        into_sales(rows)
    }

    /// The most recent sales, newest first.
    pub async fn recent(&self, limit: u32) -> DbResult<Vec<Sale>> {
        let rows = sqlx::query_as::<_, SaleRow>(
            "SELECT id, created_at, total, items, cashier FROM sales ORDER BY id DESC LIMIT ?1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        into_sales(rows)
    }

    /// Counts sales.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sales")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};
    use chrono::Duration;
    use farma_core::line_item::{encode_document, total_of};
    use farma_core::{LineItem, Quantity};

    fn items() -> Vec<LineItem> {
        vec![LineItem::service(
            "INY",
            "Inyectologia",
            Quantity::from_units(2),
            Money::from_units(3000),
        )]
    }

    async fn repo() -> SaleRepository {
        Database::new(DbConfig::in_memory()).await.unwrap().sales()
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let repo = repo().await;
        let items = items();
        let doc = encode_document(&items).unwrap();

        let id = repo
            .insert(Utc::now(), total_of(&items), &doc, "caja1")
            .await
            .unwrap();

        let sale = repo.get_by_id(id).await.unwrap().unwrap();
        assert_eq!(sale.total, Money::from_units(6000));
        assert_eq!(sale.items, items);
        assert_eq!(sale.items_total(), sale.total);
        assert_eq!(sale.cashier, "caja1");

        assert!(repo.get_by_id(id + 1).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_corrupt_document_is_reported() {
        let repo = repo().await;
        let id = repo
            .insert(Utc::now(), Money::from_units(1), "not json", "caja1")
            .await
            .unwrap();

        assert!(matches!(
            repo.get_by_id(id).await,
            Err(DbError::CorruptData { .. })
        ));
    }

    #[tokio::test]
    async fn test_list_between_and_recent() {
        let repo = repo().await;
        let doc = encode_document(&items()).unwrap();
        let now = Utc::now();

        let old = repo
            .insert(now - Duration::days(3), Money::from_units(6000), &doc, "caja1")
            .await
            .unwrap();
        let new = repo
            .insert(now, Money::from_units(6000), &doc, "caja2")
            .await
            .unwrap();

        let today = repo
            .list_between(now - Duration::hours(1), now + Duration::hours(1))
            .await
            .unwrap();
        assert_eq!(today.len(), 1);
        assert_eq!(today[0].id, new);

        let recent = repo.recent(10).await.unwrap();
        assert_eq!(recent.iter().map(|s| s.id).collect::<Vec<_>>(), vec![new, old]);
        assert_eq!(repo.count().await.unwrap(), 2);
    }
}
