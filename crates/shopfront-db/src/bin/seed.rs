//! # Seed Data Generator
//!
//! Populates a development database with categories and stocked products.
//!
//! ## Usage
//! ```bash
//! # Generate 200 products (default), DATABASE_URL from the environment or .env
//! cargo run -p shopfront-db --bin seed
//!
//! # Generate custom amount
//! cargo run -p shopfront-db --bin seed -- --count 1000
//!
//! # Specify database
//! cargo run -p shopfront-db --bin seed -- --database-url postgres://localhost/shopfront
//! ```
//!
//! Each product gets:
//! - Name: `{base name} {variant}`
//! - Price: $4.99 - $49.99 plus a variant surcharge
//! - Stock: 0 - 50, so some products are sold out from the start

use std::env;

use shopfront_db::repository::product::NewProduct;
use shopfront_db::{Database, DbConfig};

const DEFAULT_COUNT: usize = 200;

/// Categories and their base product names.
const CATEGORIES: &[(&str, &[&str])] = &[
    (
        "Apparel",
        &["T-Shirt", "Hoodie", "Cap", "Socks", "Rain Jacket", "Tote Bag"],
    ),
    (
        "Kitchen",
        &["Ceramic Mug", "Water Bottle", "Tea Infuser", "Cutting Board", "Apron"],
    ),
    (
        "Stationery",
        &["Notebook", "Gel Pen", "Sticker Pack", "Desk Calendar", "Postcard Set"],
    ),
    (
        "Home",
        &["Candle", "Throw Pillow", "Poster", "Plant Pot", "Doormat"],
    ),
];

/// Variants and their surcharge in cents.
const VARIANTS: &[(&str, i64)] = &[
    ("Black", 0),
    ("White", 0),
    ("Navy", 100),
    ("Forest", 100),
    ("Small", 0),
    ("Large", 300),
    ("Limited Edition", 1500),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let args: Vec<String> = env::args().collect();

    let mut count = DEFAULT_COUNT;
    let mut database_url = env::var("DATABASE_URL").ok();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--count" | "-c" => {
                if i + 1 < args.len() {
                    count = args[i + 1].parse().unwrap_or(DEFAULT_COUNT);
                    i += 1;
                }
            }
            "--database-url" | "-d" => {
                if i + 1 < args.len() {
                    database_url = Some(args[i + 1].clone());
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Shopfront Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --count <N>           Number of products to generate (default: {DEFAULT_COUNT})");
                println!("  -d, --database-url <URL>  PostgreSQL URL (default: $DATABASE_URL)");
                println!("  -h, --help                Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    let Some(database_url) = database_url else {
        eprintln!("DATABASE_URL is not set and --database-url was not given");
        std::process::exit(2);
    };

    println!("🌱 Shopfront Seed Data Generator");
    println!("================================");
    println!("Products: {}", count);
    println!();

    let db = Database::new(DbConfig::new(database_url)).await?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.products().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} products", existing);
        println!("  Skipping seed to avoid duplicates.");
        return Ok(());
    }

    println!();
    println!("Generating products...");

    let mut generated = 0;
    let start = std::time::Instant::now();

    'outer: for (category_name, names) in CATEGORIES {
        let category_id = db.products().insert_category(category_name).await?;

        for name in names.iter() {
            for (variant, surcharge) in VARIANTS {
                if generated >= count {
                    break 'outer;
                }

                let product = generate_product(category_id, name, variant, *surcharge, generated);
                if let Err(e) = db.products().insert(&product).await {
                    eprintln!("Failed to insert {}: {}", product.name, e);
                    continue;
                }

                generated += 1;
                if generated % 50 == 0 {
                    println!("  Generated {} products...", generated);
                }
            }
        }
    }

    let elapsed = start.elapsed();
    println!();
    println!("✓ Generated {} products in {:?}", generated, elapsed);
    println!();
    println!("✓ Seed complete!");

    db.close().await;
    Ok(())
}

/// Builds one product with deterministic pseudo-random price and stock.
fn generate_product(
    category_id: i64,
    name: &str,
    variant: &str,
    surcharge: i64,
    seed: usize,
) -> NewProduct {
    let base_price = 499 + ((seed * 37) % 4500) as i64;
    let stock = (seed * 13 % 51) as i64;

    NewProduct::new(format!("{name} {variant}"), base_price + surcharge, stock)
        .in_category(category_id)
}
