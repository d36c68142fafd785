//! # Product Repository
//!
//! Database operations for products.
//!
//! ## Key Operations
//! - Lookup by barcode (the sale processor's read path)
//! - Search, CRUD and bulk import (upsert)
//! - Stock updates, including the conditional decrement
//!
//! ## Conditional Decrement
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    How a Sale Takes Stock                               │
//! │                                                                         │
//! │  UPDATE products                                                        │
//! │     SET stock_micros = stock_micros - :amount                           │
//! │   WHERE barcode = :barcode                                              │
//! │     AND stock_micros >= :amount        ← the guard                      │
//! │                                                                         │
//! │  rows_affected = 1  → stock taken                                       │
//! │  rows_affected = 0  → someone else took it first (or no such product)   │
//! │                                                                         │
//! │  Check and write happen in one statement, so two terminals selling     │
//! │  the last box can never both succeed.                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, NaiveDate, Utc};
use farma_core::validation::{
    validate_price_adjustment, validate_product, validate_sale_quantity, validate_stock,
};
use farma_core::{Money, Product, Quantity, StockLevel, ValidationError};
use rust_decimal::Decimal;
use sqlx::{FromRow, SqliteConnection, SqlitePool};
use tracing::{debug, info};

use super::{parse_decimal, parse_money, to_micros};
use crate::error::{DbError, DbResult};

const PRODUCT_COLUMNS: &str = r#"
    barcode, description, supplier, unit, stock_micros,
    purchase_price, sale_price, tax_label, bonus_pct,
    group_name, subgroup, expiration_date, created_at, updated_at
"#;

// =============================================================================
// Row Mapping
// =============================================================================

#[derive(Debug, FromRow)]
struct ProductRow {
    barcode: String,
    description: String,
    supplier: Option<String>,
    unit: Option<String>,
    stock_micros: i64,
    purchase_price: String,
    sale_price: String,
    tax_label: String,
    bonus_pct: String,
    group_name: Option<String>,
    subgroup: Option<String>,
    expiration_date: Option<NaiveDate>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ProductRow> for Product {
    type Error = DbError;

    fn try_from(row: ProductRow) -> DbResult<Self> {
        Ok(Product {
            purchase_price: parse_money("products", "purchase_price", &row.purchase_price)?,
            sale_price: parse_money("products", "sale_price", &row.sale_price)?,
            bonus_pct: parse_decimal("products", "bonus_pct", &row.bonus_pct)?,
            quantity: Quantity::from_micros(row.stock_micros),
            barcode: row.barcode,
            description: row.description,
            supplier: row.supplier,
            unit: row.unit,
            tax_label: row.tax_label,
            group_name: row.group_name,
            subgroup: row.subgroup,
            expiration_date: row.expiration_date,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct StockRow {
    barcode: String,
    description: String,
    stock_micros: i64,
    sale_price: String,
}

impl TryFrom<StockRow> for StockLevel {
    type Error = DbError;

    fn try_from(row: StockRow) -> DbResult<Self> {
        Ok(StockLevel {
            sale_price: parse_money("products", "sale_price", &row.sale_price)?,
            quantity: Quantity::from_micros(row.stock_micros),
            barcode: row.barcode,
            description: row.description,
        })
    }
}

fn into_products(rows: Vec<ProductRow>) -> DbResult<Vec<Product>> {
    rows.into_iter().map(Product::try_from).collect()
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for product database operations.
///
/// ## Usage
/// ```rust,ignore
/// let repo = db.products();
///
/// let results = repo.search("acetaminofen", 20).await?;
/// let stock = repo.lookup("7702001").await?;
/// ```
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Gets a full product by barcode.
    pub async fn get_by_barcode(&self, barcode: &str) -> DbResult<Option<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE barcode = ?1");
        let row = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(barcode)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Product::try_from).transpose()
    }

    /// Current stock, sale price and description for a barcode.
    ///
    /// ## Returns
    /// * `Ok(Some(StockLevel))` - Product found
    /// * `Ok(None)` - No product with that barcode
    pub async fn lookup(&self, barcode: &str) -> DbResult<Option<StockLevel>> {
        let mut conn = self.pool.acquire().await?;
        Self::lookup_in(&mut conn, barcode).await
    }

    /// [`ProductRepository::lookup`] on a caller-supplied connection.
    pub async fn lookup_in(
        conn: &mut SqliteConnection,
        barcode: &str,
    ) -> DbResult<Option<StockLevel>> {
        let row = sqlx::query_as::<_, StockRow>(
            "SELECT barcode, description, stock_micros, sale_price FROM products WHERE barcode = ?1",
        )
        .bind(barcode)
        .fetch_optional(&mut *conn)
        .await?;

        row.map(StockLevel::try_from).transpose()
    }

    /// Searches by barcode prefix or description substring.
    ///
    /// An empty query lists products by description.
    pub async fn search(&self, query: &str, limit: u32) -> DbResult<Vec<Product>> {
        let query = query.trim();

        debug!(query = %query, limit = %limit, "Searching products");

        if query.is_empty() {
            return self.list(limit).await;
        }

        let sql = format!(
            r#"
            SELECT {PRODUCT_COLUMNS} FROM products
            WHERE barcode LIKE ?1 || '%'
               OR description LIKE '%' || ?1 || '%'
            ORDER BY description
            LIMIT ?2
            "#
        );
        let rows = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(query)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        debug!(count = rows.len(), "Search returned products");
        into_products(rows)
    }

    /// Lists products ordered by description.
    pub async fn list(&self, limit: u32) -> DbResult<Vec<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products ORDER BY description LIMIT ?1");
        let rows = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        into_products(rows)
    }

    /// Products whose expiration date is on or before `date`, soonest first.
    pub async fn expiring_before(&self, date: NaiveDate) -> DbResult<Vec<Product>> {
        let sql = format!(
            r#"
            SELECT {PRODUCT_COLUMNS} FROM products
            WHERE expiration_date IS NOT NULL AND expiration_date <= ?1
            ORDER BY expiration_date, description
            "#
        );
        let rows = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(date)
            .fetch_all(&self.pool)
            .await?;

        into_products(rows)
    }

    /// Current purchase price of every product (reporting cost basis).
    pub async fn purchase_prices(&self) -> DbResult<Vec<(String, Money)>> {
        let rows: Vec<(String, String)> =
            sqlx::query_as("SELECT barcode, purchase_price FROM products")
                .fetch_all(&self.pool)
                .await?;

        rows.into_iter()
            .map(|(barcode, price)| {
                let price = parse_money("products", "purchase_price", &price)?;
                Ok((barcode, price))
            })
            .collect()
    }

    /// Counts products.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Inserts a new product.
    ///
    /// ## Returns
    /// * `Err(DbError::UniqueViolation)` - Barcode already exists
    pub async fn insert(&self, product: &Product) -> DbResult<()> {
        validate_product(product)?;
        debug!(barcode = %product.barcode, "Inserting product");

        let sql = format!(
            "INSERT INTO products ({PRODUCT_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)"
        );
        sqlx::query(&sql)
            .bind(&product.barcode)
            .bind(&product.description)
            .bind(&product.supplier)
            .bind(&product.unit)
            .bind(to_micros("stock", product.quantity)?)
            .bind(product.purchase_price.amount().to_string())
            .bind(product.sale_price.amount().to_string())
            .bind(&product.tax_label)
            .bind(product.bonus_pct.to_string())
            .bind(&product.group_name)
            .bind(&product.subgroup)
            .bind(product.expiration_date)
            .bind(product.created_at)
            .bind(product.updated_at)
            .execute(&self.pool)
            .await
            .map_err(|e| match DbError::from(e) {
                DbError::UniqueViolation { field, .. } => DbError::UniqueViolation {
                    field,
                    value: product.barcode.clone(),
                },
                other => other,
            })?;

        Ok(())
    }

    /// Inserts a product, or replaces the attributes of an existing one.
    ///
    /// Used by bulk imports. With `keep_stock`, a re-imported product keeps
    /// its current stock instead of the imported quantity.
    pub async fn upsert(&self, product: &Product, keep_stock: bool) -> DbResult<()> {
        validate_product(product)?;
        debug!(barcode = %product.barcode, keep_stock, "Upserting product");

        let sql = format!(
            r#"
            INSERT INTO products ({PRODUCT_COLUMNS})
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
            ON CONFLICT (barcode) DO UPDATE SET
                description = excluded.description,
                supplier = excluded.supplier,
                unit = excluded.unit,
                stock_micros = CASE WHEN ?15 THEN products.stock_micros
                                    ELSE excluded.stock_micros END,
                purchase_price = excluded.purchase_price,
                sale_price = excluded.sale_price,
                tax_label = excluded.tax_label,
                bonus_pct = excluded.bonus_pct,
                group_name = excluded.group_name,
                subgroup = excluded.subgroup,
                expiration_date = excluded.expiration_date,
                updated_at = excluded.updated_at
            "#
        );
        sqlx::query(&sql)
            .bind(&product.barcode)
            .bind(&product.description)
            .bind(&product.supplier)
            .bind(&product.unit)
            .bind(to_micros("stock", product.quantity)?)
            .bind(product.purchase_price.amount().to_string())
            .bind(product.sale_price.amount().to_string())
            .bind(&product.tax_label)
            .bind(product.bonus_pct.to_string())
            .bind(&product.group_name)
            .bind(&product.subgroup)
            .bind(product.expiration_date)
            .bind(product.created_at)
            .bind(Utc::now())
            .bind(keep_stock)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Updates a product's attributes. Stock is left untouched; use
    /// [`ProductRepository::set_stock`] for inventory counts.
    ///
    /// ## Returns
    /// * `Err(DbError::NotFound)` - Product doesn't exist
    pub async fn update(&self, product: &Product) -> DbResult<()> {
        validate_product(product)?;
        debug!(barcode = %product.barcode, "Updating product");

        let result = sqlx::query(
            r#"
            UPDATE products SET
                description = ?2,
                supplier = ?3,
                unit = ?4,
                purchase_price = ?5,
                sale_price = ?6,
                tax_label = ?7,
                bonus_pct = ?8,
                group_name = ?9,
                subgroup = ?10,
                expiration_date = ?11,
                updated_at = ?12
            WHERE barcode = ?1
            "#,
        )
        .bind(&product.barcode)
        .bind(&product.description)
        .bind(&product.supplier)
        .bind(&product.unit)
        .bind(product.purchase_price.amount().to_string())
        .bind(product.sale_price.amount().to_string())
        .bind(&product.tax_label)
        .bind(product.bonus_pct.to_string())
        .bind(&product.group_name)
        .bind(&product.subgroup)
        .bind(product.expiration_date)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", &product.barcode));
        }

        Ok(())
    }

    /// Sets the stock to an absolute value (inventory count).
    pub async fn set_stock(&self, barcode: &str, quantity: Quantity) -> DbResult<()> {
        validate_stock(quantity)?;
        debug!(barcode = %barcode, quantity = %quantity, "Setting stock");

        let result =
            sqlx::query("UPDATE products SET stock_micros = ?2, updated_at = ?3 WHERE barcode = ?1")
                .bind(barcode)
                .bind(to_micros("stock", quantity)?)
                .bind(Utc::now())
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", barcode));
        }

        Ok(())
    }

    /// Adds stock (restock).
    pub async fn add_stock(&self, barcode: &str, quantity: Quantity) -> DbResult<()> {
        let mut conn = self.pool.acquire().await?;
        Self::add_stock_in(&mut conn, barcode, quantity).await
    }

    /// [`ProductRepository::add_stock`] on a caller-supplied connection.
    pub async fn add_stock_in(
        conn: &mut SqliteConnection,
        barcode: &str,
        quantity: Quantity,
    ) -> DbResult<()> {
        validate_sale_quantity(quantity)?;
        debug!(barcode = %barcode, quantity = %quantity, "Adding stock");

        let result = sqlx::query(
            "UPDATE products SET stock_micros = stock_micros + ?2, updated_at = ?3 WHERE barcode = ?1",
        )
        .bind(barcode)
        .bind(to_micros("quantity", quantity)?)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", barcode));
        }

        Ok(())
    }

    /// Takes `amount` boxes from stock only if that many are available.
    ///
    /// ## Returns
    /// Rows affected: `1` when the stock was taken, `0` when the product
    /// has less than `amount` (or does not exist). Stock never goes negative.
    pub async fn decrement_if_available(&self, barcode: &str, amount: Quantity) -> DbResult<u64> {
        let mut conn = self.pool.acquire().await?;
        Self::decrement_in(&mut conn, barcode, amount).await
    }

    /// [`ProductRepository::decrement_if_available`] on a caller-supplied
    /// connection, typically the sale transaction.
    pub async fn decrement_in(
        conn: &mut SqliteConnection,
        barcode: &str,
        amount: Quantity,
    ) -> DbResult<u64> {
        validate_sale_quantity(amount)?;
        let micros = to_micros("quantity", amount)?;
        if micros == 0 {
            return Err(ValidationError::MustBePositive {
                field: "quantity".to_string(),
            }
            .into());
        }

        let result = sqlx::query(
            r#"
            UPDATE products
            SET stock_micros = stock_micros - ?2,
                updated_at = ?3
            WHERE barcode = ?1 AND stock_micros >= ?2
            "#,
        )
        .bind(barcode)
        .bind(micros)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;

        debug!(
            barcode = %barcode,
            amount = %amount,
            rows_affected = result.rows_affected(),
            "Conditional stock decrement"
        );

        Ok(result.rows_affected())
    }

    /// Sets the purchase price (last invoice cost) of a product.
    pub async fn set_purchase_price_in(
        conn: &mut SqliteConnection,
        barcode: &str,
        price: Money,
    ) -> DbResult<()> {
        let result = sqlx::query(
            "UPDATE products SET purchase_price = ?2, updated_at = ?3 WHERE barcode = ?1",
        )
        .bind(barcode)
        .bind(price.amount().to_string())
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", barcode));
        }

        Ok(())
    }

    /// Raises (or lowers) sale prices by `percent`, rounded to cents.
    ///
    /// `group` limits the change to one product group; `None` changes every
    /// product. Returns the number of products repriced.
    pub async fn bulk_update_prices(&self, group: Option<&str>, percent: Decimal) -> DbResult<u64> {
        validate_price_adjustment(percent)?;

        let mut tx = self.pool.begin().await?;
        let now = Utc::now();

        // Writing first takes the write lock before anything is read.
        let rows: Vec<(String, String)> = sqlx::query_as(
            r#"
            UPDATE products
            SET updated_at = ?2
            WHERE ?1 IS NULL OR group_name = ?1
            RETURNING barcode, sale_price
            "#,
        )
        .bind(group)
        .bind(now)
        .fetch_all(&mut *tx)
        .await?;

        for (barcode, price) in &rows {
            let new_price = parse_money("products", "sale_price", price)?.adjust_by_percent(percent);
            sqlx::query("UPDATE products SET sale_price = ?2, updated_at = ?3 WHERE barcode = ?1")
                .bind(barcode)
                .bind(new_price.amount().to_string())
                .bind(now)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        info!(
            group = group.unwrap_or("*"),
            percent = %percent,
            updated = rows.len(),
            "Bulk price update applied"
        );
        Ok(rows.len() as u64)
    }

    /// Deletes a product.
    ///
    /// Past sales keep their own copy of the line items and are unaffected.
    /// Products referenced by received supplier invoices cannot be deleted
    /// (`DbError::ForeignKeyViolation`).
    pub async fn delete(&self, barcode: &str) -> DbResult<()> {
        info!(barcode = %barcode, "Deleting product");

        let result = sqlx::query("DELETE FROM products WHERE barcode = ?1")
            .bind(barcode)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", barcode));
        }

        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};

    fn qty(s: &str) -> Quantity {
        Quantity::from_str_exact(s).unwrap()
    }

    fn product(barcode: &str, stock: &str, price: i64) -> Product {
        let mut p = Product::new(
            barcode,
            format!("Producto {barcode}"),
            qty(stock),
            Money::from_units(price / 2),
            Money::from_units(price),
        );
        p.group_name = Some("ANALGESICOS".to_string());
        p
    }

    async fn repo() -> ProductRepository {
        Database::new(DbConfig::in_memory()).await.unwrap().products()
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let repo = repo().await;
        let mut p = product("7702001", "12.5", 5000);
        p.expiration_date = NaiveDate::from_ymd_opt(2027, 3, 31);
        p.bonus_pct = Decimal::new(25, 1);
        repo.insert(&p).await.unwrap();

        let loaded = repo.get_by_barcode("7702001").await.unwrap().unwrap();
        assert_eq!(loaded.quantity, qty("12.5"));
        assert_eq!(loaded.sale_price, Money::from_units(5000));
        assert_eq!(loaded.bonus_pct, Decimal::new(25, 1));
        assert_eq!(loaded.expiration_date, p.expiration_date);

        assert!(repo.get_by_barcode("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_barcode() {
        let repo = repo().await;
        repo.insert(&product("A", "1", 100)).await.unwrap();

        let err = repo.insert(&product("A", "1", 100)).await.unwrap_err();
        assert!(err.is_unique_violation());
    }

    #[tokio::test]
    async fn test_insert_rejects_invalid_product() {
        let repo = repo().await;
        let err = repo.insert(&product("", "1", 100)).await.unwrap_err();
        assert!(matches!(err, DbError::Validation(_)));
    }

    #[tokio::test]
    async fn test_kit_and_service_barcodes_are_reserved() {
        let repo = repo().await;
        for barcode in ["KIT", "SERV-7701"] {
            let err = repo.insert(&product(barcode, "1", 100)).await.unwrap_err();
            assert!(matches!(err, DbError::Validation(ValidationError::InvalidFormat { .. })));
        }
        assert_eq!(repo.count().await.unwrap(), 0);

        repo.insert(&product("KIT-01", "1", 100)).await.unwrap();
        assert!(repo.lookup("KIT-01").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_lookup() {
        let repo = repo().await;
        repo.insert(&product("A", "0.3", 1000)).await.unwrap();

        let stock = repo.lookup("A").await.unwrap().unwrap();
        assert_eq!(stock.quantity, qty("0.3"));
        assert_eq!(stock.sale_price, Money::from_units(1000));
        assert!(repo.lookup("B").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_decrement_if_available() {
        let repo = repo().await;
        repo.insert(&product("A", "1", 1000)).await.unwrap();

        assert_eq!(repo.decrement_if_available("A", qty("0.7")).await.unwrap(), 1);
        assert_eq!(repo.decrement_if_available("A", qty("0.5")).await.unwrap(), 0);
        assert_eq!(repo.decrement_if_available("A", qty("0.3")).await.unwrap(), 1);
        assert_eq!(repo.decrement_if_available("missing", qty("1")).await.unwrap(), 0);

        let stock = repo.lookup("A").await.unwrap().unwrap();
        assert!(stock.quantity.is_zero());
    }

    #[tokio::test]
    async fn test_decrement_rejects_non_positive_amounts() {
        let repo = repo().await;
        repo.insert(&product("A", "2", 1000)).await.unwrap();

        for amount in [Quantity::zero(), Quantity::from_units(-3), qty("0.0000001")] {
            assert!(matches!(
                repo.decrement_if_available("A", amount).await,
                Err(DbError::Validation(_))
            ));
        }
        assert_eq!(repo.lookup("A").await.unwrap().unwrap().quantity, Quantity::from_units(2));
    }

    #[tokio::test]
    async fn test_stock_edits() {
        let repo = repo().await;
        repo.insert(&product("A", "2", 1000)).await.unwrap();

        repo.add_stock("A", qty("1.5")).await.unwrap();
        assert_eq!(repo.lookup("A").await.unwrap().unwrap().quantity, qty("3.5"));

        repo.set_stock("A", Quantity::from_units(10)).await.unwrap();
        assert_eq!(repo.lookup("A").await.unwrap().unwrap().quantity, Quantity::from_units(10));

        assert!(repo.set_stock("A", Quantity::from_units(-1)).await.is_err());
        assert!(matches!(
            repo.add_stock("missing", qty("1")).await,
            Err(DbError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_search_and_list() {
        let repo = repo().await;
        repo.insert(&product("7702001", "1", 100)).await.unwrap();
        repo.insert(&product("7702002", "1", 100)).await.unwrap();
        let mut other = product("990", "1", 100);
        other.description = "Ibuprofeno 400mg".to_string();
        repo.insert(&other).await.unwrap();

        assert_eq!(repo.search("7702", 10).await.unwrap().len(), 2);
        assert_eq!(repo.search("ibupro", 10).await.unwrap().len(), 1);
        assert_eq!(repo.search("", 10).await.unwrap().len(), 3);
        assert_eq!(repo.list(2).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_update_keeps_stock() {
        let repo = repo().await;
        repo.insert(&product("A", "4", 1000)).await.unwrap();

        let mut edited = product("A", "99", 1500);
        edited.description = "Renamed".to_string();
        repo.update(&edited).await.unwrap();

        let loaded = repo.get_by_barcode("A").await.unwrap().unwrap();
        assert_eq!(loaded.description, "Renamed");
        assert_eq!(loaded.sale_price, Money::from_units(1500));
        assert_eq!(loaded.quantity, Quantity::from_units(4));

        assert!(matches!(
            repo.update(&product("missing", "1", 1)).await,
            Err(DbError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_upsert() {
        let repo = repo().await;
        repo.upsert(&product("A", "5", 1000), true).await.unwrap();
        assert_eq!(repo.lookup("A").await.unwrap().unwrap().quantity, Quantity::from_units(5));

        repo.upsert(&product("A", "50", 1200), true).await.unwrap();
        let stock = repo.lookup("A").await.unwrap().unwrap();
        assert_eq!(stock.quantity, Quantity::from_units(5));
        assert_eq!(stock.sale_price, Money::from_units(1200));

        repo.upsert(&product("A", "50", 1200), false).await.unwrap();
        assert_eq!(repo.lookup("A").await.unwrap().unwrap().quantity, Quantity::from_units(50));
    }

    #[tokio::test]
    async fn test_bulk_update_prices() {
        let repo = repo().await;
        repo.insert(&product("A", "1", 1000)).await.unwrap();
        let mut b = product("B", "1", 999);
        b.group_name = Some("VITAMINAS".to_string());
        repo.insert(&b).await.unwrap();

        let updated = repo
            .bulk_update_prices(Some("ANALGESICOS"), Decimal::from(10))
            .await
            .unwrap();
        assert_eq!(updated, 1);
        assert_eq!(repo.lookup("A").await.unwrap().unwrap().sale_price, Money::from_units(1100));
        assert_eq!(repo.lookup("B").await.unwrap().unwrap().sale_price, Money::from_units(999));

        // 999 × 0.95 = 949.05
        repo.bulk_update_prices(None, Decimal::from(-5)).await.unwrap();
        assert_eq!(
            repo.lookup("B").await.unwrap().unwrap().sale_price,
            Money::from_str_exact("949.05").unwrap()
        );

        assert!(repo.bulk_update_prices(None, Decimal::from(-100)).await.is_err());

        let none = repo
            .bulk_update_prices(Some("SIN GRUPO"), Decimal::from(10))
            .await
            .unwrap();
        assert_eq!(none, 0);
    }

    #[tokio::test]
    async fn test_expiring_before() {
        let repo = repo().await;
        let mut soon = product("A", "1", 100);
        soon.expiration_date = NaiveDate::from_ymd_opt(2026, 11, 1);
        let mut later = product("B", "1", 100);
        later.expiration_date = NaiveDate::from_ymd_opt(2028, 1, 1);
        repo.insert(&soon).await.unwrap();
        repo.insert(&later).await.unwrap();
        repo.insert(&product("C", "1", 100)).await.unwrap();

        let cutoff = NaiveDate::from_ymd_opt(2026, 12, 31).unwrap();
        let expiring = repo.expiring_before(cutoff).await.unwrap();
        assert_eq!(expiring.len(), 1);
        assert_eq!(expiring[0].barcode, "A");
    }

    #[tokio::test]
    async fn test_delete() {
        let repo = repo().await;
        repo.insert(&product("A", "1", 100)).await.unwrap();

        repo.delete("A").await.unwrap();
        assert_eq!(repo.count().await.unwrap(), 0);
        assert!(matches!(repo.delete("A").await, Err(DbError::NotFound { .. })));
    }
}
