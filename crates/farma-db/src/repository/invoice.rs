//! # Supplier Invoice Repository
//!
//! Receiving merchandise from suppliers.
//!
//! ## Receiving an Invoice
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  BEGIN                                                                  │
//! │   ├── INSERT supplier_invoices        (UNIQUE supplier + number)        │
//! │   └── for each line                                                     │
//! │        ├── product must exist                                           │
//! │        ├── INSERT supplier_invoice_lines                                │
//! │        ├── stock += quantity                                            │
//! │        └── purchase_price = unit cost                                   │
//! │  COMMIT   (any failure: nothing is received)                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, NaiveDate, Utc};
use farma_core::validation::{validate_barcode, validate_price, validate_sale_quantity};
use farma_core::{InvoiceLine, NewSupplierInvoice, Quantity, SupplierInvoice, ValidationError};
use sqlx::{FromRow, SqliteConnection, SqlitePool};
use tracing::{debug, info};

use super::product::ProductRepository;
use super::{parse_money, to_micros};
use crate::error::{DbError, DbResult};

#[derive(Debug, FromRow)]
struct InvoiceRow {
    id: i64,
    supplier: String,
    invoice_number: String,
    issued_on: NaiveDate,
    total: String,
    received_at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
struct InvoiceLineRow {
    barcode: String,
    quantity_micros: i64,
    unit_cost: String,
}

impl TryFrom<InvoiceLineRow> for InvoiceLine {
    type Error = DbError;

    fn try_from(row: InvoiceLineRow) -> DbResult<Self> {
        Ok(InvoiceLine {
            unit_cost: parse_money("supplier_invoice_lines", "unit_cost", &row.unit_cost)?,
            quantity: Quantity::from_micros(row.quantity_micros),
            barcode: row.barcode,
        })
    }
}

fn validate_invoice(invoice: &NewSupplierInvoice) -> Result<(), ValidationError> {
    if invoice.supplier.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "supplier".to_string(),
        });
    }
    if invoice.invoice_number.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "invoice number".to_string(),
        });
    }
    if invoice.lines.is_empty() {
        return Err(ValidationError::Required {
            field: "invoice lines".to_string(),
        });
    }
    for line in &invoice.lines {
        validate_barcode(&line.barcode)?;
        validate_sale_quantity(line.quantity)?;
        validate_price(line.unit_cost)?;
    }
    Ok(())
}

/// Repository for supplier invoices.
#[derive(Debug, Clone)]
pub struct InvoiceRepository {
    pool: SqlitePool,
}

impl InvoiceRepository {
    /// Creates a new InvoiceRepository.
    pub fn new(pool: SqlitePool) -> Self {
        InvoiceRepository { pool }
    }

    /// Receives an invoice into stock and returns its id.
    ///
    /// ## Errors
    /// - `DbError::Validation` for empty fields or non-positive quantities
    /// - `DbError::NotFound` if a line names an unknown barcode
    /// - `DbError::UniqueViolation` if the supplier's invoice number was
    ///   already received
    pub async fn receive(&self, invoice: &NewSupplierInvoice) -> DbResult<i64> {
        validate_invoice(invoice)?;

        let total = invoice.total();
        let mut tx = self.pool.begin().await?;

        let id = sqlx::query(
            r#"
            INSERT INTO supplier_invoices (supplier, invoice_number, issued_on, total, received_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(invoice.supplier.trim())
        .bind(invoice.invoice_number.trim())
        .bind(invoice.issued_on)
        .bind(total.amount().to_string())
        .bind(Utc::now())
        .execute(&mut *tx)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { .. } => DbError::duplicate(
                "supplier invoice",
                format!("{} {}", invoice.supplier.trim(), invoice.invoice_number.trim()),
            ),
            other => other,
        })?
        .last_insert_rowid();

        for (line_no, line) in invoice.lines.iter().enumerate() {
            receive_line(&mut tx, id, line_no as i64 + 1, line).await?;
        }

        tx.commit().await?;

        info!(
            invoice_id = id,
            supplier = %invoice.supplier,
            number = %invoice.invoice_number,
            lines = invoice.lines.len(),
            total = %total,
            "Supplier invoice received"
        );
        Ok(id)
    }

    /// Gets a received invoice with its lines.
    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<SupplierInvoice>> {
        let row = sqlx::query_as::<_, InvoiceRow>(
            r#"
            SELECT id, supplier, invoice_number, issued_on, total, received_at
            FROM supplier_invoices WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(self.with_lines(row).await?)),
            None => Ok(None),
        }
    }

    /// Invoices from one supplier, most recently issued first.
    pub async fn list_by_supplier(&self, supplier: &str) -> DbResult<Vec<SupplierInvoice>> {
        let rows = sqlx::query_as::<_, InvoiceRow>(
            r#"
            SELECT id, supplier, invoice_number, issued_on, total, received_at
            FROM supplier_invoices
            WHERE supplier = ?1
            ORDER BY issued_on DESC, id DESC
            "#,
        )
        .bind(supplier.trim())
        .fetch_all(&self.pool)
        .await?;

        let mut invoices = Vec::with_capacity(rows.len());
        for row in rows {
            invoices.push(self.with_lines(row).await?);
        }
        Ok(invoices)
    }

    async fn with_lines(&self, row: InvoiceRow) -> DbResult<SupplierInvoice> {
        let lines = sqlx::query_as::<_, InvoiceLineRow>(
            r#"
            SELECT barcode, quantity_micros, unit_cost
            FROM supplier_invoice_lines
            WHERE invoice_id = ?1
            ORDER BY line_no
            "#,
        )
        .bind(row.id)
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(InvoiceLine::try_from)
        .collect::<DbResult<Vec<_>>>()?;

        Ok(SupplierInvoice {
            total: parse_money("supplier_invoices", "total", &row.total)?,
            id: row.id,
            supplier: row.supplier,
            invoice_number: row.invoice_number,
            issued_on: row.issued_on,
            received_at: row.received_at,
            lines,
        })
    }
}

async fn receive_line(
    conn: &mut SqliteConnection,
    invoice_id: i64,
    line_no: i64,
    line: &InvoiceLine,
) -> DbResult<()> {
    if ProductRepository::lookup_in(conn, &line.barcode).await?.is_none() {
        return Err(DbError::not_found("Product", &line.barcode));
    }

    sqlx::query(
        r#"
        INSERT INTO supplier_invoice_lines (invoice_id, line_no, barcode, quantity_micros, unit_cost)
        VALUES (?1, ?2, ?3, ?4, ?5)
        "#,
    )
    .bind(invoice_id)
    .bind(line_no)
    .bind(&line.barcode)
    .bind(to_micros("quantity", line.quantity)?)
    .bind(line.unit_cost.amount().to_string())
    .execute(&mut *conn)
    .await?;

    ProductRepository::add_stock_in(conn, &line.barcode, line.quantity).await?;
    ProductRepository::set_purchase_price_in(conn, &line.barcode, line.unit_cost).await?;

    debug!(invoice_id, barcode = %line.barcode, quantity = %line.quantity, "Invoice line received");
    Ok(())
}
