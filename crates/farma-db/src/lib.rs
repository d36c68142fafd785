//! # farma-db: Database Layer for FarmaTrack
//!
//! This crate provides database access for FarmaTrack.
//! It uses SQLite for local storage with sqlx for async operations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        FarmaTrack Data Flow                             │
//! │                                                                         │
//! │  Cashier presses "Register sale"                                       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     farma-db (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   checkout    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │               │    │               │    │  (embedded)  │  │   │
//! │  │   │ SaleProcessor │───►│ ProductRepo   │    │              │  │   │
//! │  │   │ validate      │    │ SaleRepo      │    │ 001_initial  │  │   │
//! │  │   │ commit        │    │ InvoiceRepo   │    │ _schema.sql  │  │   │
//! │  │   └───────────────┘    └───────┬───────┘    └──────────────┘  │   │
//! │  │                                │                                │   │
//! │  │   Database (pool.rs) ── SqlitePool, WAL, foreign keys          │   │
//! │  └─────────────────────────────────┬───────────────────────────────┘   │
//! │                                    ▼                                    │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database                             │   │
//! │  │   ~/.local/share/farmatrack/farmatrack.db                       │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Products, sales, supplier invoices
//! - [`checkout`] - Sale Transaction Processor
//! - [`report`] - Sales summaries
//! - [`config`] - Application configuration file
//!
//! ## Usage
//!
//! ```rust,ignore
//! use farma_db::{AppConfig, Database};
//!
//! let config = AppConfig::load(None)?;
//! let db = Database::new(config.db_config()).await?;
//!
//! let found = db.products().search("acetam", 20).await?;
//! let sale = db.checkout().register_sale(items, config.cashier()).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod checkout;
pub mod config;
pub mod error;
pub mod migrations;
pub mod pool;
pub mod report;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use checkout::{CheckoutError, CheckoutResult, CommittedSale, SaleProcessor, ValidatedSale};
pub use config::{AppConfig, ConfigError};
pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};
pub use report::Reports;

// Repository re-exports for convenience
pub use repository::invoice::InvoiceRepository;
pub use repository::product::ProductRepository;
pub use repository::sale::SaleRepository;

use tracing_subscriber::EnvFilter;

/// Installs the global `tracing` subscriber for binaries.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages
/// - `RUST_LOG=farma_db=trace` - Trace this crate only
/// - Default: `info,farma=debug,sqlx=warn`
///
/// Calling it twice is harmless; the second call is ignored.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,farma=debug,sqlx=warn"));

    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
