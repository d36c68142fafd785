//! # Seed Data Generator
//!
//! Populates the database with pharmacy products for development.
//!
//! ## Usage
//! ```bash
//! # Generate 2,000 products (default) into the configured database
//! cargo run -p farma-db --bin seed
//!
//! # Generate custom amount
//! cargo run -p farma-db --bin seed -- --count 500
//!
//! # Specify database path or config file
//! cargo run -p farma-db --bin seed -- --db ./data/farmatrack_dev.db
//! cargo run -p farma-db --bin seed -- --config ./farmatrack.toml
//! ```
//!
//! Each product has:
//! - Barcode: `770` + 10 digits
//! - Name: active ingredient + presentation
//! - Sale price: 1.500 - 60.000 in steps of 100
//! - Purchase price: 55-80% of the sale price
//! - Stock: 0 - 120 boxes, some with a half box open
//! - Expiration date within the next three years
//!
//! Re-running is safe: products are upserted and existing stock is kept.

use std::env;
use std::path::PathBuf;

use chrono::{Duration, Utc};
use farma_core::{Money, Product, Quantity};
use farma_db::{AppConfig, Database};
use rust_decimal::Decimal;
use tracing::warn;

/// Product groups with their active ingredients.
const GROUPS: &[(&str, &[&str])] = &[
    (
        "ANALGESICOS",
        &[
            "Acetaminofen",
            "Ibuprofeno",
            "Naproxeno",
            "Diclofenaco",
            "Dipirona",
            "Acido Acetilsalicilico",
        ],
    ),
    (
        "ANTIBIOTICOS",
        &[
            "Amoxicilina",
            "Azitromicina",
            "Cefalexina",
            "Ciprofloxacino",
            "Clindamicina",
            "Doxiciclina",
        ],
    ),
    (
        "GASTRO",
        &[
            "Omeprazol",
            "Esomeprazol",
            "Loperamida",
            "Metoclopramida",
            "Hidroxido de Aluminio",
            "Sales de Rehidratacion",
        ],
    ),
    (
        "CARDIO",
        &[
            "Losartan",
            "Enalapril",
            "Amlodipino",
            "Atorvastatina",
            "Metoprolol",
            "Hidroclorotiazida",
        ],
    ),
    (
        "RESPIRATORIO",
        &[
            "Loratadina",
            "Cetirizina",
            "Salbutamol",
            "Ambroxol",
            "Dextrometorfano",
            "Fenilefrina",
        ],
    ),
    (
        "CURACION",
        &[
            "Gasa Esteril",
            "Venda Elastica",
            "Esparadrapo",
            "Alcohol Antiseptico",
            "Yodopovidona",
            "Jeringa",
        ],
    ),
];

/// Presentations and how much they add to the base price.
const PRESENTATIONS: &[(&str, i64)] = &[
    ("Tab 500 mg x 10", 0),
    ("Tab 500 mg x 20", 1_800),
    ("Cap 250 mg x 30", 3_500),
    ("Jarabe 120 ml", 4_200),
    ("Susp 60 ml", 2_600),
    ("Caja x 100", 9_000),
];

const SUPPLIERS: &[&str] = &["Drogueria Central", "Distribuidora Andina", "Laboratorios Sur"];

const TAX_LABELS: &[&str] = &["", "IVA 19%", "", "IVA 5%"];

struct Args {
    count: usize,
    db_path: Option<PathBuf>,
    config_path: Option<PathBuf>,
}

fn parse_args() -> Option<Args> {
    let args: Vec<String> = env::args().collect();
    let mut parsed = Args {
        count: 2000,
        db_path: None,
        config_path: None,
    };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--count" | "-c" => {
                if let Some(value) = args.get(i + 1) {
                    parsed.count = value.parse().unwrap_or(parsed.count);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if let Some(value) = args.get(i + 1) {
                    parsed.db_path = Some(PathBuf::from(value));
                    i += 1;
                }
            }
            "--config" => {
                if let Some(value) = args.get(i + 1) {
                    parsed.config_path = Some(PathBuf::from(value));
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("FarmaTrack Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --count <N>      Number of products to generate (default: 2000)");
                println!("  -d, --db <PATH>      Database file (default: from config)");
                println!("      --config <PATH>  Config file (default: platform config dir)");
                println!("  -h, --help           Show this help message");
                return None;
            }
            other => warn!(argument = %other, "Ignoring unknown argument"),
        }
        i += 1;
    }

    Some(parsed)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    farma_db::init_tracing();

    let Some(args) = parse_args() else {
        return Ok(());
    };

    let mut config = AppConfig::load(args.config_path)?;
    if let Some(path) = args.db_path {
        config.database.path = Some(path);
    }

    let db_path = config.database_path();
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    println!("FarmaTrack Seed Data Generator");
    println!("==============================");
    println!("Database: {}", db_path.display());
    println!("Products: {}", args.count);
    println!();

    let db = Database::new(config.db_config()).await?;
    println!("✓ Connected to database, migrations applied");

    let existing = db.products().count().await?;
    if existing > 0 {
        println!("  {} products already present; stock will be kept", existing);
    }

    let start = std::time::Instant::now();
    let mut generated = 0;

    'outer: for (group_idx, (group, ingredients)) in GROUPS.iter().enumerate() {
        for (ingredient_idx, ingredient) in ingredients.iter().enumerate() {
            for (presentation_idx, (presentation, price_addon)) in PRESENTATIONS.iter().enumerate()
            {
                if generated >= args.count {
                    break 'outer;
                }

                let seed = group_idx * 1000 + ingredient_idx * 20 + presentation_idx;
                let product = generate_product(group, ingredient, presentation, *price_addon, seed);

                if let Err(e) = db.products().upsert(&product, true).await {
                    eprintln!("Failed to insert {}: {}", product.barcode, e);
                    continue;
                }

                generated += 1;
                if generated % 100 == 0 {
                    println!("  Generated {} products...", generated);
                }
            }
        }
    }

    let elapsed = start.elapsed();
    println!();
    println!("✓ Generated {} products in {:?}", generated, elapsed);

    let found = db.products().search("acetam", 10).await?;
    println!("  Search 'acetam': {} results", found.len());

    let soon = Utc::now().date_naive() + Duration::days(90);
    let expiring = db.products().expiring_before(soon).await?;
    println!("  Expiring within 90 days: {}", expiring.len());

    println!();
    println!("✓ Seed complete!");

    db.close().await;
    Ok(())
}

/// Builds one product with deterministic pseudo-random attributes.
fn generate_product(
    group: &str,
    ingredient: &str,
    presentation: &str,
    price_addon: i64,
    seed: usize,
) -> Product {
    let barcode = format!("770{:010}", seed);

    let sale_units = 1_500 + ((seed as i64 * 37) % 400) * 100 + price_addon;
    let cost_pct = 55 + (seed % 26) as i64;
    let purchase_units = sale_units * cost_pct / 100;

    // every seventh product has an opened box
    let boxes = (seed % 121) as i64;
    let stock = if seed % 7 == 0 {
        Quantity::from_units(boxes) + Quantity::new(Decimal::new(5, 1))
    } else {
        Quantity::from_units(boxes)
    };

    let mut product = Product::new(
        barcode,
        format!("{} {}", ingredient, presentation),
        stock,
        Money::from_units(purchase_units),
        Money::from_units(sale_units),
    );
    product.supplier = Some(SUPPLIERS[seed % SUPPLIERS.len()].to_string());
    product.unit = Some("CAJA".to_string());
    product.tax_label = TAX_LABELS[seed % TAX_LABELS.len()].to_string();
    product.group_name = Some(group.to_string());
    product.expiration_date = Some(Utc::now().date_naive() + Duration::days(30 + (seed as i64 * 13) % 1095));
    product
}
