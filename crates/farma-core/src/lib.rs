//! # farma-core: Pure Business Logic for FarmaTrack
//!
//! This crate contains the pharmacy's business rules as pure functions with
//! zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        FarmaTrack Architecture                          │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    UI (outside this workspace)                  │   │
//! │  │    Product entry ──► Cart ──► Kit assembly ──► Register sale    │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ farma-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌──────────┐ ┌──────────┐ ┌──────────┐ ┌──────────┐          │   │
//! │  │   │  money   │ │ quantity │ │line_item │ │   kit    │          │   │
//! │  │   │  Money   │ │ Quantity │ │ Normal   │ │ KitDraft │          │   │
//! │  │   │          │ │ (boxes)  │ │ Service  │ │ allocate │          │   │
//! │  │   │          │ │          │ │ Kit      │ │          │          │   │
//! │  │   └──────────┘ └──────────┘ └──────────┘ └──────────┘          │   │
//! │  │   ┌──────────┐ ┌──────────┐ ┌──────────┐ ┌──────────┐          │   │
//! │  │   │  parse   │ │validation│ │  report  │ │  types   │          │   │
//! │  │   └──────────┘ └──────────┘ └──────────┘ └──────────┘          │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │          farma-db (Database Layer + Sale Transaction)           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, Sale, supplier invoices)
//! - [`money`] - Money type over exact decimals
//! - [`quantity`] - Fractional stock quantities ("box fractions")
//! - [`line_item`] - Sale line items and their stored document format
//! - [`kit`] - Kit drafts and the kit cost allocator
//! - [`parse`] - Barcode cleaning and locale-tolerant number parsing
//! - [`report`] - Revenue / cost / profit summaries
//! - [`validation`] - Business rule validation
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use farma_core::parse::parse_price;
//! use farma_core::Money;
//!
//! let price = parse_price("1.234.567,89").unwrap();
//! assert_eq!(price, Money::from_str_exact("1234567.89").unwrap());
//! assert!(parse_price("ABC").is_none());
//! ```

pub mod error;
pub mod kit;
pub mod line_item;
pub mod money;
pub mod parse;
pub mod quantity;
pub mod report;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use kit::{KitAllocation, KitDraft, KitSelection};
pub use line_item::{ItemLine, KitComponent, KitLine, LineItem, StockDemand};
pub use money::Money;
pub use quantity::Quantity;
pub use report::SalesSummary;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Barcode prefix that marks a service line (no stock effect).
///
/// Stored sale documents identify service lines by this prefix on the
/// `codigo` field; in memory they are [`LineItem::Service`].
pub const SERVICE_BARCODE_PREFIX: &str = "SERV-";

/// Literal barcode that marks a kit line in stored sale documents.
pub const KIT_BARCODE: &str = "KIT";

/// A kit needs at least this many components; a single product is sold as a
/// normal line instead.
pub const MIN_KIT_COMPONENTS: usize = 2;

/// Decimal places used when presenting money and quantities.
pub const DISPLAY_DECIMALS: u32 = 2;
