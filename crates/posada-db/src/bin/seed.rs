//! # Seed Data Generator
//!
//! Populates a development database with a demo operator, rooms, a POS
//! catalog and a few guests.
//!
//! ## Usage
//! ```bash
//! cargo run -p posada-db --bin seed
//!
//! # Specify database path
//! cargo run -p posada-db --bin seed -- --db ./data/posada.db
//! ```
//!
//! The seeded operator authenticates step-up requests with the password
//! printed at the end of the run.

use chrono::Utc;
use std::env;
use uuid::Uuid;

use posada_core::{Customer, Operator, Product, Room, RoomStatus};
use posada_db::{hash_password, Database, DbConfig};

/// Step-up password for the demo operator.
const DEMO_PASSWORD: &str = "posada-demo";

/// Rooms: (number, type, nightly, 3h tariff, 6h tariff).
const ROOMS: &[(&str, &str, i64, Option<i64>, Option<i64>)] = &[
    ("101", "simple", 10_000, Some(4_000), Some(6_000)),
    ("102", "simple", 10_000, Some(4_000), Some(6_000)),
    ("103", "doble", 15_000, Some(6_000), Some(9_000)),
    ("104", "doble", 15_000, Some(6_000), Some(9_000)),
    ("201", "doble", 16_000, None, None),
    ("202", "suite", 25_000, None, None),
    ("203", "suite", 25_000, None, None),
    ("301", "ejecutiva", 35_000, None, None),
];

/// Catalog: (category, name, price, tax bps, track inventory, stock).
const PRODUCTS: &[(&str, &str, i64, u32, bool, i64)] = &[
    ("minibar", "Agua 600ml", 800, 1300, true, 48),
    ("minibar", "Coca-Cola 500ml", 1_200, 1300, true, 36),
    ("minibar", "Cerveza Paceña", 2_000, 1300, true, 24),
    ("minibar", "Snack mixto", 1_500, 1300, true, 30),
    ("restaurant", "Desayuno continental", 3_500, 1300, false, 0),
    ("restaurant", "Almuerzo del día", 4_500, 1300, false, 0),
    ("laundry", "Lavandería por kilo", 2_500, 0, false, 0),
    ("other", "Estacionamiento por noche", 2_000, 0, false, 0),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let args: Vec<String> = env::args().collect();

    let mut db_path = String::from("./posada_dev.db");

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
                println!("Posada Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: ./posada_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Posada Seed Data Generator");
    println!("=============================");
    println!("Database: {}", db_path);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    // One demo operator owns everything.
    let now = Utc::now();
    let operator = Operator {
        id: Uuid::new_v4().to_string(),
        name: "Hostal El Prado".into(),
        phone: Some("+59170000000".into()),
        password_hash: hash_password(DEMO_PASSWORD)?,
        created_at: now,
    };
    db.operators().create(&operator).await?;
    println!("✓ Operator {} ({})", operator.name, operator.id);

    for (number, room_type, nightly, p3h, p6h) in ROOMS {
        let room = Room {
            id: Uuid::new_v4().to_string(),
            operator_id: operator.id.clone(),
            room_number: number.to_string(),
            room_type: room_type.to_string(),
            base_price_cents: *nightly,
            short_stay_3h_price_cents: *p3h,
            short_stay_6h_price_cents: *p6h,
            floor: number.chars().next().and_then(|c| c.to_digit(10)).map(i64::from),
            max_occupancy: if *room_type == "simple" { 1 } else { 2 },
            status: RoomStatus::Available,
            created_at: now,
            updated_at: now,
        };
        db.rooms().create(&room).await?;
    }
    println!("✓ {} rooms", ROOMS.len());

    for (category, name, price, tax_bps, track, stock) in PRODUCTS {
        let product = Product {
            id: Uuid::new_v4().to_string(),
            operator_id: operator.id.clone(),
            category: category.to_string(),
            name: name.to_string(),
            price_cents: *price,
            tax_rate_bps: *tax_bps,
            track_inventory: *track,
            stock_quantity: *stock,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        db.products().create(&product).await?;
    }
    println!("✓ {} products", PRODUCTS.len());

    for (name, document) in [
        ("Ana Quispe", "4567890"),
        ("Luis Mamani", "5678901"),
        ("María Fernández", "6789012"),
    ] {
        let customer = Customer {
            id: Uuid::new_v4().to_string(),
            operator_id: operator.id.clone(),
            full_name: name.to_string(),
            document_number: Some(document.to_string()),
            phone: None,
            age: None,
            nationality: Some("Bolivia".into()),
            origin: None,
            total_stays: 0,
            total_spent_cents: 0,
            last_stay_date: None,
            is_frequent: false,
            created_at: now,
        };
        db.customers().create(&customer).await?;
    }
    println!("✓ 3 customers");

    println!();
    println!("✓ Seed complete!");
    println!();
    println!("Operator id:       {}", operator.id);
    println!("Step-up password:  {}", DEMO_PASSWORD);

    Ok(())
}
