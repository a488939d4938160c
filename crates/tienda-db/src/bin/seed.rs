//! # Seed Data Generator
//!
//! Populates the database with demo products for development.
//!
//! ## Usage
//! ```bash
//! # Generate 200 products (default)
//! cargo run -p tienda-db --bin seed
//!
//! # Generate custom amount
//! cargo run -p tienda-db --bin seed -- --count 500
//!
//! # Specify database path
//! cargo run -p tienda-db --bin seed -- --db ./data/tienda.db
//! ```
//!
//! ## Generated Products
//! Creates product data across the catalog categories:
//! - bebidas (coffee, tea, juice)
//! - almacen (pantry staples)
//! - limpieza (household cleaning)
//! - electronica (small electronics)
//! - libreria (stationery)
//!
//! Each product has:
//! - Unique code: `{CAT}-{INDEX}`
//! - Price: $1.99 - $49.99
//! - Stock: 0 - 100

use std::env;
use tienda_core::{NewProduct, Product};
use tienda_db::{Database, DbConfig};

/// Product categories with base names for demo data
const CATEGORIES: &[(&str, &str, &[&str])] = &[
    (
        "BEB",
        "bebidas",
        &[
            "Café molido",
            "Café en grano",
            "Té verde",
            "Té negro",
            "Yerba mate",
            "Jugo de naranja",
            "Jugo de manzana",
            "Agua mineral",
            "Agua con gas",
            "Limonada",
        ],
    ),
    (
        "ALM",
        "almacen",
        &[
            "Arroz largo fino",
            "Fideos spaghetti",
            "Harina 000",
            "Azúcar",
            "Sal fina",
            "Aceite de girasol",
            "Aceite de oliva",
            "Lentejas",
            "Garbanzos",
            "Puré de tomate",
        ],
    ),
    (
        "LIM",
        "limpieza",
        &[
            "Detergente",
            "Lavandina",
            "Jabón en polvo",
            "Suavizante",
            "Limpiador de pisos",
            "Esponja",
            "Trapo de piso",
            "Bolsas de residuo",
            "Desengrasante",
            "Lustramuebles",
        ],
    ),
    (
        "ELE",
        "electronica",
        &[
            "Auriculares in-ear",
            "Cargador USB-C",
            "Cable HDMI",
            "Mouse inalámbrico",
            "Teclado compacto",
            "Pendrive 64GB",
            "Lámpara LED",
            "Pilas AA x4",
            "Parlante bluetooth",
            "Webcam HD",
        ],
    ),
    (
        "LIB",
        "libreria",
        &[
            "Cuaderno A4",
            "Lapicera azul",
            "Lápiz HB",
            "Resaltador",
            "Carpeta 3 anillos",
            "Resma A4",
            "Tijera escolar",
            "Plasticola",
            "Regla 30cm",
            "Marcador permanente",
        ],
    ),
];

/// Size/presentation variants, with a price addon in cents
const VARIANTS: &[(&str, i64)] = &[
    ("250g", 0),
    ("500g", 150),
    ("1kg", 400),
    ("x1", 0),
    ("x3", 250),
    ("x6", 600),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    // Parse command line arguments
    let args: Vec<String> = env::args().collect();

    let mut count: usize = 200;
    let mut db_path = String::from("./tienda_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--count" | "-c" => {
                if i + 1 < args.len() {
                    count = args[i + 1].parse().unwrap_or(200);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("tienda Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --count <N>    Number of products to generate (default: 200)");
                println!("  -d, --db <PATH>    Database file path (default: ./tienda_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 tienda Seed Data Generator");
    println!("=============================");
    println!("Database: {}", db_path);
    println!("Products: {}", count);
    println!();

    // Connect to database
    let config = DbConfig::new(&db_path);
    let db = Database::new(config).await?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    // Check existing products
    let existing = db.products().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} products", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    // Generate products
    println!();
    println!("Generating products...");

    let mut generated = 0;
    let start = std::time::Instant::now();

    'outer: for (category_idx, (code_prefix, category, names)) in CATEGORIES.iter().enumerate() {
        for (name_idx, name) in names.iter().enumerate() {
            for (variant_idx, (variant, price_addon)) in VARIANTS.iter().enumerate() {
                if generated >= count {
                    break 'outer;
                }

                let seed = category_idx * 1000 + name_idx * 10 + variant_idx;
                let product =
                    generate_product(code_prefix, category, name, variant, *price_addon, seed)?;

                if let Err(e) = db.products().insert(&product).await {
                    eprintln!("Failed to insert {}: {}", product.code, e);
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

    Ok(())
}

/// Generates a single product with plausible data.
fn generate_product(
    code_prefix: &str,
    category: &str,
    name: &str,
    variant: &str,
    price_addon: i64,
    seed: usize,
) -> Result<Product, Box<dyn std::error::Error>> {
    // Price: base $1.99-$9.99 plus variant addon
    let base_price = 199 + ((seed * 17) % 800) as i64;
    let price_cents = base_price + price_addon;

    // Stock: 0-100, with some products deliberately out of stock
    let stock = (seed % 101) as i64;

    let product = Product::new(NewProduct {
        code: format!("{}-{:04}", code_prefix, seed),
        title: format!("{} {}", name, variant),
        description: None,
        price_cents,
        stock,
        category: category.to_string(),
    })?;

    Ok(product)
}
