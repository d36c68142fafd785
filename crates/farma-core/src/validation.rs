//! # Validation Module
//!
//! Input validation for products, cart lines and kits.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Parsers (crate::parse)                                       │
//! │  └── Text → Money / Quantity, rejects non-numeric input                │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                  │
//! │  └── Business rules on typed values (positive quantities, ...)         │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── CHECK (stock_micros >= 0)                                         │
//! │  └── PRIMARY KEY / UNIQUE constraints                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use farma_core::validation::{validate_barcode, validate_sale_quantity};
//! use farma_core::Quantity;
//!
//! validate_barcode("7702001").unwrap();
//! validate_sale_quantity(Quantity::from_str_exact("0.5").unwrap()).unwrap();
//! assert!(validate_sale_quantity(Quantity::zero()).is_err());
//! ```

use rust_decimal::Decimal;

use crate::error::ValidationError;
use crate::line_item::LineItem;
use crate::money::Money;
use crate::quantity::Quantity;
use crate::types::Product;
use crate::{KIT_BARCODE, SERVICE_BARCODE_PREFIX};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

const MAX_BARCODE_LEN: usize = 64;
const MAX_DESCRIPTION_LEN: usize = 200;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a (cleaned) barcode.
///
/// ## Rules
/// - Must not be empty
/// - At most 64 characters
/// - No whitespace (see [`crate::parse::clean_barcode`])
/// - Not `KIT` and not starting with `SERV-`: stored sale documents use
///   those to mark kit and service lines
pub fn validate_barcode(barcode: &str) -> ValidationResult<()> {
    if barcode.trim().is_empty() {
        return Err(ValidationError::required("barcode"));
    }

    if barcode.chars().count() > MAX_BARCODE_LEN {
        return Err(ValidationError::TooLong {
            field: "barcode".to_string(),
            max: MAX_BARCODE_LEN,
        });
    }

    if barcode.chars().any(char::is_whitespace) {
        return Err(ValidationError::invalid_format(
            "barcode",
            "must not contain spaces",
        ));
    }

    if barcode == KIT_BARCODE || barcode.starts_with(SERVICE_BARCODE_PREFIX) {
        return Err(ValidationError::invalid_format(
            "barcode",
            format!("'{barcode}' is reserved for kit and service lines"),
        ));
    }

    Ok(())
}

/// Validates a product or kit description.
pub fn validate_description(description: &str) -> ValidationResult<()> {
    let description = description.trim();

    if description.is_empty() {
        return Err(ValidationError::required("description"));
    }

    if description.chars().count() > MAX_DESCRIPTION_LEN {
        return Err(ValidationError::TooLong {
            field: "description".to_string(),
            max: MAX_DESCRIPTION_LEN,
        });
    }

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a quantity on a sale line.
///
/// Fractions are allowed ("half a box"); zero and negatives are not, nor
/// anything larger than a stock column can hold.
pub fn validate_sale_quantity(quantity: Quantity) -> ValidationResult<()> {
    if !quantity.is_positive() {
        return Err(ValidationError::must_be_positive("quantity"));
    }
    validate_storable("quantity", quantity)
}

/// The quantity fits the stock columns (millionths of a box in an `i64`).
pub fn validate_storable(field: &str, quantity: Quantity) -> ValidationResult<()> {
    if quantity.to_micros().is_none() {
        return Err(ValidationError::out_of_range(field, 0, Quantity::max_storable()));
    }
    Ok(())
}

/// Validates a stock level. Zero is allowed.
pub fn validate_stock(quantity: Quantity) -> ValidationResult<()> {
    if quantity.is_negative() {
        return Err(ValidationError::negative("stock"));
    }
    validate_storable("stock", quantity)
}

/// Validates a price. Zero is allowed (free items, courtesy services).
pub fn validate_price(price: Money) -> ValidationResult<()> {
    if price.is_negative() {
        return Err(ValidationError::negative("price"));
    }
    Ok(())
}

/// Validates a percentage in `0..=100`.
pub fn validate_percent(field: &str, percent: Decimal) -> ValidationResult<()> {
    if percent < Decimal::ZERO || percent > Decimal::ONE_HUNDRED {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: "0".to_string(),
            max: "100".to_string(),
        });
    }
    Ok(())
}

/// Validates a bulk price adjustment. A price may not drop by 100% or more.
pub fn validate_price_adjustment(percent: Decimal) -> ValidationResult<()> {
    if percent <= -Decimal::ONE_HUNDRED {
        return Err(ValidationError::OutOfRange {
            field: "percent".to_string(),
            min: "-100 (exclusive)".to_string(),
            max: "unbounded".to_string(),
        });
    }
    Ok(())
}

// =============================================================================
// Aggregate Validators
// =============================================================================

/// Validates a product before it is stored.
pub fn validate_product(product: &Product) -> ValidationResult<()> {
    validate_barcode(&product.barcode)?;
    validate_description(&product.description)?;
    validate_stock(product.quantity)?;
    validate_price(product.purchase_price)?;
    validate_price(product.sale_price)?;
    validate_percent("bonus", product.bonus_pct)?;
    Ok(())
}

/// A sale must have at least one line.
pub fn validate_cart(items: &[LineItem]) -> ValidationResult<()> {
    if items.is_empty() {
        return Err(ValidationError::required("items"));
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
