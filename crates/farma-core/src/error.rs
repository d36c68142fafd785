//! # Error Types
//!
//! Domain-specific error types for farma-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  farma-core errors (this file)                                         │
//! │  ├── CoreError        - General domain errors                          │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  farma-db errors (separate crate)                                      │
//! │  ├── DbError          - Database operation failures                    │
//! │  └── CheckoutError    - Sale registration failures                     │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → CheckoutError → UI message        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

use crate::quantity::Quantity;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Product cannot be found.
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// Insufficient stock for a requested quantity.
    ///
    /// ## When This Occurs
    /// - A kit component needs more boxes than the product has in stock
    #[error(
        "Insufficient stock for {description} ({barcode}): available {available}, required {requested}"
    )]
    InsufficientStock {
        barcode: String,
        description: String,
        available: Quantity,
        requested: Quantity,
    },

    /// A kit was assembled with fewer than the minimum number of components.
    #[error("A kit needs at least {min} components, got {count}")]
    KitTooSmall { count: usize, min: usize },

    /// A kit line's component list is missing or cannot be parsed.
    ///
    /// ## When This Occurs
    /// - Stored sale document with a `KIT` line whose `componentes` is not a
    ///   list of components
    /// - Kit line with no components, or a component consuming zero boxes
    #[error("Corrupted kit data: {reason}")]
    CorruptedKitData { reason: String },

    /// A stored sale document is not a list of line items.
    #[error("Malformed sale document: {0}")]
    MalformedDocument(String),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Creates a CorruptedKitData error.
    pub fn corrupted_kit(reason: impl Into<String>) -> Self {
        CoreError::CorruptedKitData {
            reason: reason.into(),
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when user input doesn't meet requirements.
/// Used for early validation before business logic runs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    Negative { field: String },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange {
        field: String,
        min: String,
        max: String,
    },

    /// Invalid format (e.g. non-numeric quantity).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

impl ValidationError {
    pub(crate) fn required(field: &str) -> Self {
        ValidationError::Required {
            field: field.to_string(),
        }
    }

    pub(crate) fn must_be_positive(field: &str) -> Self {
        ValidationError::MustBePositive {
            field: field.to_string(),
        }
    }

    pub(crate) fn negative(field: &str) -> Self {
        ValidationError::Negative {
            field: field.to_string(),
        }
    }

    pub(crate) fn out_of_range(field: &str, min: impl ToString, max: impl ToString) -> Self {
        ValidationError::OutOfRange {
            field: field.to_string(),
            min: min.to_string(),
            max: max.to_string(),
        }
    }

    pub(crate) fn invalid_format(field: &str, reason: impl Into<String>) -> Self {
        ValidationError::InvalidFormat {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;
