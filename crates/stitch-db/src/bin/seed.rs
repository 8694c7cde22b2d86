//! # Seed Data Generator
//!
//! Populates the database with a small apparel catalog for development.
//!
//! ## Usage
//! ```bash
//! # Seed ./stitch.db
//! cargo run -p stitch-db --bin seed
//!
//! # Specify database path
//! cargo run -p stitch-db --bin seed -- --db ./data/stitch.db
//! ```
//!
//! ## Generated Data
//! - Apparel products, each with size × color variants
//! - A demo customer with one saved address
//! - Coupons: a capped percentage, a fixed amount, a single-use code
//! - The store settings row

use anyhow::Context;
use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use std::env;
use tracing::info;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use stitch_core::{Coupon, DiscountType, Money, Settings, TaxRate};
use stitch_db::{Database, DbConfig, NewAddress};

/// (sku prefix, name, base price, aggregate stock)
const PRODUCTS: &[(&str, &str, i64, i64)] = &[
    ("TEE", "Organic Cotton Tee", 190_000, 120),
    ("SHT", "Linen Shirt", 450_000, 60),
    ("JNS", "Slim Selvedge Jeans", 890_000, 40),
    ("DRS", "Wrap Midi Dress", 750_000, 35),
    ("HOD", "Heavyweight Hoodie", 650_000, 50),
    ("TOT", "Canvas Tote", 150_000, 80),
];

const SIZES: &[(&str, i64)] = &[("S", 0), ("M", 0), ("L", 20_000), ("XL", 40_000)];
const COLORS: &[&str] = &["Black", "White", "Olive"];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = env::args().collect();
    let mut db_path = String::from("./stitch.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Stitch Storefront Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: ./stitch.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    info!(path = %db_path, "Seeding database");

    let db = Database::new(DbConfig::new(&db_path))
        .await
        .context("opening database")?;

    if db.users().count().await? > 0 {
        println!("⚠ Database already has data; skipping seed.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    // -------------------------------------------------------------------------
    // Settings
    // -------------------------------------------------------------------------
    db.settings()
        .save(&Settings {
            shipping_fee: Money::from_units(30_000),
            free_shipping_threshold: Some(Money::from_units(1_000_000)),
            tax_rate: TaxRate::from_percent(Decimal::from(10)),
            payment_cod_enabled: true,
            payment_bank_transfer_enabled: true,
            payment_credit_card_enabled: false,
        })
        .await?;
    println!("✓ Settings saved");

    // -------------------------------------------------------------------------
    // Catalog
    // -------------------------------------------------------------------------
    let mut variants = 0;
    for (idx, (prefix, name, base_price, stock)) in PRODUCTS.iter().enumerate() {
        let product = db
            .products()
            .create(
                &format!("{prefix}-{:03}", idx + 1),
                name,
                Money::from_units(*base_price),
                *stock,
            )
            .await
            .with_context(|| format!("inserting {name}"))?;

        for (size, addon) in SIZES {
            for (color_idx, color) in COLORS.iter().enumerate() {
                let variant_stock = ((idx + color_idx) % 4 * 5) as i64;
                db.products()
                    .create_variant(
                        &product.id,
                        size,
                        color,
                        Money::from_units(base_price + addon),
                        variant_stock,
                    )
                    .await?;
                variants += 1;
            }
        }
    }
    println!("✓ {} products, {} variants", PRODUCTS.len(), variants);

    // -------------------------------------------------------------------------
    // Demo customer
    // -------------------------------------------------------------------------
    let user = db.users().create("demo@stitch.test", "Demo Customer").await?;
    let address = db
        .addresses()
        .create(
            &user.id,
            NewAddress {
                full_name: "Demo Customer",
                phone: "+84 900 000 000",
                street: "12 Silk Street",
                city: "Hanoi",
                state: "Hoan Kiem",
                postal_code: "100000",
                country: "VN",
            },
        )
        .await?;
    println!("✓ Demo user {} (address {})", user.id, address.id);

    // -------------------------------------------------------------------------
    // Coupons
    // -------------------------------------------------------------------------
    let now = Utc::now();
    let coupons = [
        Coupon {
            id: Uuid::new_v4().to_string(),
            code: "WELCOME10".to_string(),
            discount_type: DiscountType::Percentage,
            value: Decimal::from(10),
            min_order_amount: Some(Money::from_units(200_000)),
            max_discount_amount: Some(Money::from_units(40_000)),
            is_active: true,
            valid_from: now - Duration::days(1),
            valid_until: now + Duration::days(90),
            usage_limit: None,
            used_count: 0,
        },
        Coupon {
            id: Uuid::new_v4().to_string(),
            code: "FLAT50K".to_string(),
            discount_type: DiscountType::Fixed,
            value: Decimal::from(50_000),
            min_order_amount: None,
            max_discount_amount: None,
            is_active: true,
            valid_from: now - Duration::days(1),
            valid_until: now + Duration::days(30),
            usage_limit: Some(100),
            used_count: 0,
        },
        Coupon {
            id: Uuid::new_v4().to_string(),
            code: "LASTONE".to_string(),
            discount_type: DiscountType::Fixed,
            value: Decimal::from(100_000),
            min_order_amount: None,
            max_discount_amount: None,
            is_active: true,
            valid_from: now - Duration::days(1),
            valid_until: now + Duration::days(7),
            usage_limit: Some(1),
            used_count: 0,
        },
    ];
    for coupon in &coupons {
        db.coupons().insert(coupon).await?;
        println!("✓ Coupon {} ({})", coupon.code, coupon.id);
    }

    println!();
    println!("✓ Seed complete!");
    Ok(())
}
