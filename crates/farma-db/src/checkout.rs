//! # Sale Transaction Processor
//!
//! Commits a sale and takes its stock, all or nothing.
//!
//! ## Two Steps
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  validate(items) ──► ValidatedSale ──► commit(sale, cashier)            │
//! │                                                                         │
//! │  VALIDATE (no writes)                                                   │
//! │  ├── empty cart?                         → EmptyCart                    │
//! │  ├── each line well formed?              → Invalid / CorruptedKitData   │
//! │  ├── demand per barcode (lines + kit components, merged)                │
//! │  └── each demand ≤ current stock?        → ProductNotFound /            │
//! │                                            InsufficientStock            │
//! │                                                                         │
//! │  COMMIT (one transaction)                                               │
//! │  ├── INSERT sale row (total = Σ subtotals, JSON line items)             │
//! │  ├── for each demand:                                                   │
//! │  │     UPDATE ... WHERE stock_micros >= amount                          │
//! │  │     0 rows → ConcurrentModification, ROLLBACK everything             │
//! │  └── COMMIT                                                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Validation only fails fast with a precise message. Another terminal can
//! sell the same stock between the two steps; the guarded UPDATE inside the
//! commit is what prevents overselling. Both steps compare stock at the
//! same six-decimal storage precision.
//!
//! The sale row is inserted first so the transaction holds SQLite's write
//! lock before it touches any product.

use chrono::{DateTime, Utc};
use farma_core::line_item::{aggregate_demands, checked_total_of, encode_document};
use farma_core::validation::validate_cart;
use farma_core::{CoreError, LineItem, Money, Quantity, StockDemand, ValidationError};
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::error::DbError;
use crate::repository::product::ProductRepository;
use crate::repository::sale::SaleRepository;

// =============================================================================
// Errors
// =============================================================================

/// Why a sale was not registered.
///
/// Every variant means nothing was written: no sale row, no stock change.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// No line items were submitted.
    #[error("The cart is empty")]
    EmptyCart,

    /// A line has a non-positive quantity, a negative price, etc.
    #[error("Invalid sale: {0}")]
    Invalid(#[from] ValidationError),

    /// A line names a barcode that is not in the product table.
    #[error("Product not found: {barcode}")]
    ProductNotFound { barcode: String },

    /// A product has less stock than the sale needs (found before commit).
    #[error(
        "Insufficient stock for {description} ({barcode}): available {available}, required {requested}"
    )]
    InsufficientStock {
        barcode: String,
        description: String,
        available: Quantity,
        requested: Quantity,
    },

    /// Another sale took the stock between validation and commit.
    ///
    /// ## When This Occurs
    /// - Two terminals sell the last units of a product at the same time
    ///
    /// Re-reading stock and retrying may succeed.
    #[error("Stock of {description} ({barcode}) changed during the sale")]
    ConcurrentModification { barcode: String, description: String },

    /// A kit line's components are missing or unreadable.
    #[error("Corrupted kit data: {reason}")]
    CorruptedKitData { reason: String },

    /// Any other database failure; the transaction was rolled back.
    #[error("Database error: {0}")]
    Database(#[from] DbError),
}

impl From<CoreError> for CheckoutError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Validation(e) => CheckoutError::Invalid(e),
            CoreError::ProductNotFound(barcode) => CheckoutError::ProductNotFound { barcode },
            CoreError::InsufficientStock {
                barcode,
                description,
                available,
                requested,
            } => CheckoutError::InsufficientStock {
                barcode,
                description,
                available,
                requested,
            },
            CoreError::CorruptedKitData { reason } => CheckoutError::CorruptedKitData { reason },
            other @ (CoreError::KitTooSmall { .. } | CoreError::MalformedDocument(_)) => {
                CheckoutError::CorruptedKitData {
                    reason: other.to_string(),
                }
            }
        }
    }
}

impl From<sqlx::Error> for CheckoutError {
    fn from(err: sqlx::Error) -> Self {
        CheckoutError::Database(err.into())
    }
}

impl CheckoutError {
    /// Message for the cashier. Always states that nothing was changed.
    pub fn user_message(&self) -> String {
        const NOT_PERFORMED: &str = "The sale was NOT performed; inventory was not modified.";

        match self {
            CheckoutError::EmptyCart => {
                format!("There are no products in the sale. {NOT_PERFORMED}")
            }
            CheckoutError::ConcurrentModification { description, .. } => format!(
                "The stock of {description} was changed by another sale in progress. \
                 {NOT_PERFORMED} Check the stock and try again."
            ),
            other => format!("{other}. {NOT_PERFORMED}"),
        }
    }

    /// Only a lost race is worth retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(self, CheckoutError::ConcurrentModification { .. })
    }
}

pub type CheckoutResult<T> = Result<T, CheckoutError>;

// =============================================================================
// Sale States
// =============================================================================

/// A sale that passed validation and may be committed.
///
/// Only [`SaleProcessor::validate`] creates one.
#[derive(Debug, Clone)]
pub struct ValidatedSale {
    items: Vec<LineItem>,
    total: Money,
    demands: Vec<StockDemand>,
}

impl ValidatedSale {
    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    /// Σ line subtotals.
    pub fn total(&self) -> Money {
        self.total
    }

    /// Stock to take, one entry per product.
    pub fn demands(&self) -> &[StockDemand] {
        &self.demands
    }
}

/// A sale that is durably recorded.
#[derive(Debug, Clone, PartialEq)]
pub struct CommittedSale {
    pub sale_id: i64,
    pub created_at: DateTime<Utc>,
    pub total: Money,
    pub line_count: usize,
}

// =============================================================================
// Processor
// =============================================================================

/// Registers sales against the product table.
///
/// ## Usage
/// ```rust,ignore
/// match db.checkout().register_sale(items, "caja1").await {
///     Ok(sale) => println!("sale #{} total {}", sale.sale_id, sale.total),
///     Err(e) => show_warning(&e.user_message()),
/// }
/// ```
#[derive(Debug, Clone)]
pub struct SaleProcessor {
    pool: SqlitePool,
}

impl SaleProcessor {
    pub fn new(pool: SqlitePool) -> Self {
        SaleProcessor { pool }
    }

    /// Validates and commits in one call.
    pub async fn register_sale(
        &self,
        items: Vec<LineItem>,
        cashier: &str,
    ) -> CheckoutResult<CommittedSale> {
        let validated = self.validate(items).await?;
        self.commit(validated, cashier).await
    }

    /// Checks the cart against current stock without writing anything.
    pub async fn validate(&self, items: Vec<LineItem>) -> CheckoutResult<ValidatedSale> {
        if validate_cart(&items).is_err() {
            return Err(CheckoutError::EmptyCart);
        }

        for item in &items {
            item.validate()?;
        }

        let demands = aggregate_demands(&items)?;
        let total = checked_total_of(&items)?;
        for demand in &demands {
            if demand.amount.at_storage_scale().is_zero() {
                return Err(ValidationError::InvalidFormat {
                    field: "quantity".to_string(),
                    reason: format!("{} boxes of {} is below the stock precision", demand.amount, demand.barcode),
                }
                .into());
            }
        }

        let mut conn = self.pool.acquire().await?;
        for demand in &demands {
            let stock = ProductRepository::lookup_in(&mut conn, &demand.barcode)
                .await?
                .ok_or_else(|| CheckoutError::ProductNotFound {
                    barcode: demand.barcode.clone(),
                })?;

            if stock.quantity < demand.amount.at_storage_scale() {
                debug!(
                    barcode = %demand.barcode,
                    available = %stock.quantity,
                    requested = %demand.amount,
                    "Sale rejected: insufficient stock"
                );
                return Err(CheckoutError::InsufficientStock {
                    barcode: demand.barcode.clone(),
                    description: stock.description,
                    available: stock.quantity,
                    requested: demand.amount,
                });
            }
        }

        debug!(lines = items.len(), products = demands.len(), total = %total, "Sale validated");

        Ok(ValidatedSale {
            items,
            total,
            demands,
        })
    }

    /// Writes the sale and takes its stock in one transaction.
    ///
    /// ## Errors
    /// - [`CheckoutError::ConcurrentModification`] if any product no longer
    ///   has enough stock; the whole transaction is rolled back
    /// - [`CheckoutError::Database`] for any other failure, also rolled back
    pub async fn commit(
        &self,
        sale: ValidatedSale,
        cashier: &str,
    ) -> CheckoutResult<CommittedSale> {
        let cashier = cashier.trim();
        if cashier.is_empty() {
            return Err(ValidationError::Required {
                field: "cashier".to_string(),
            }
            .into());
        }

        let document = encode_document(&sale.items)?;
        let created_at = Utc::now();

        let mut tx = self.pool.begin().await?;

        let sale_id =
            SaleRepository::insert_in(&mut tx, created_at, sale.total, &document, cashier).await?;

        for demand in &sale.demands {
            let rows = ProductRepository::decrement_in(&mut tx, &demand.barcode, demand.amount).await?;
            if rows == 0 {
                warn!(
                    barcode = %demand.barcode,
                    requested = %demand.amount,
                    "Stock changed during sale, rolling back"
                );
                if let Err(e) = tx.rollback().await {
                    warn!(error = %e, "Rollback failed");
                }
                return Err(CheckoutError::ConcurrentModification {
                    barcode: demand.barcode.clone(),
                    description: demand.description.clone(),
                });
            }
        }

        tx.commit().await?;

        info!(
            sale_id,
            total = %sale.total,
            lines = sale.items.len(),
            cashier = %cashier,
            "Sale registered"
        );

        Ok(CommittedSale {
            sale_id,
            created_at,
            total: sale.total,
            line_count: sale.items.len(),
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
