//! # Seed Data Generator
//!
//! Populates the database with aisles, medicines and opening stock for
//! development.
//!
//! ## Usage
//! ```bash
//! # Seed ./rebonnte_dev.db
//! cargo run -p rebonnte-db --bin seed
//!
//! # Specify database path
//! cargo run -p rebonnte-db --bin seed -- --db ./data/rebonnte.db
//!
//! # Print the resulting catalog as JSON
//! cargo run -p rebonnte-db --bin seed -- --dump
//! ```
//!
//! ## Generated Data
//! - One aisle per storage area (fridge, shelves, controlled cabinet)
//! - A handful of common medicines in each aisle
//! - Opening stock written through the stock repository, so every
//!   quantity has a matching history entry authored by `seed@rebonnte.local`

use std::env;

use rebonnte_core::NewMedicine;
use rebonnte_db::{Database, DbConfig};
use tracing_subscriber::EnvFilter;

const SEED_AUTHOR: &str = "seed@rebonnte.local";

/// Storage areas and the medicines they hold:
/// (aisle, aisle description, [(name, active ingredient, dosage, opening stock)])
const AISLES: &[(&str, &str, &[(&str, &str, &str, i64)])] = &[
    (
        "Fridge",
        "Cold storage, 2-8 °C",
        &[
            ("Insulin Glargine", "Insulin glargine", "100 UI/ml", 12),
            ("Amoxicillin Suspension", "Amoxicillin", "250mg/5ml", 8),
            ("Hepatitis B Vaccine", "HBsAg", "20µg/ml", 5),
        ],
    ),
    (
        "Shelf A",
        "Pain and fever",
        &[
            ("Ibuprofen", "Ibuprofen", "200mg", 40),
            ("Doliprane", "Paracetamol", "1000mg", 60),
            ("Aspirin", "Acetylsalicylic acid", "500mg", 25),
        ],
    ),
    (
        "Shelf B",
        "Allergy and respiratory",
        &[
            ("Cetirizine", "Cetirizine", "10mg", 30),
            ("Ventolin", "Salbutamol", "100µg/dose", 10),
            ("Loratadine", "Loratadine", "10mg", 18),
        ],
    ),
    (
        "Controlled Cabinet",
        "Locked, double signature",
        &[
            ("Tramadol", "Tramadol", "50mg", 6),
            ("Morphine Sulfate", "Morphine", "10mg", 4),
        ],
    ),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Parse command line arguments
    let args: Vec<String> = env::args().collect();

    let mut db_path = String::from("./rebonnte_dev.db");
    let mut dump = false;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--dump" => dump = true,
            "--help" | "-h" => {
                println!("Rebonnte Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: ./rebonnte_dev.db)");
                println!("      --dump         Print the seeded catalog as JSON");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Rebonnte Seed Data Generator");
    println!("===============================");
    println!("Database: {}", db_path);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.medicines().list_medicines(false).await?;
    if !existing.is_empty() {
        println!("⚠ Database already has {} medicines", existing.len());
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    println!();
    println!("Seeding aisles and medicines...");

    let start = std::time::Instant::now();
    let mut medicines = 0;

    for (aisle_name, aisle_description, entries) in AISLES {
        let aisle = db.aisles().create_aisle(aisle_name, aisle_description).await?;
        println!("  + {}", aisle.name);

        for (name, ingredient, dosage, opening) in entries.iter() {
            let input = NewMedicine {
                name: name.to_string(),
                description: format!("{} {}", ingredient, dosage),
                dosage: dosage.to_string(),
                manufacturer: "Rebonnte Labs".to_string(),
                indication: aisle_description.to_string(),
                active_ingredient: ingredient.to_string(),
                usage: "As prescribed".to_string(),
                warning: "Keep out of reach of children".to_string(),
            };

            let medicine = match db.medicines().create_medicine(&input, Some(&aisle.aisle_id)).await {
                Ok(medicine) => medicine,
                Err(e) => {
                    eprintln!("Failed to insert {}: {}", name, e);
                    continue;
                }
            };

            db.stock()
                .apply_quantity_delta(&medicine.medicine_id, *opening, SEED_AUTHOR, "Opening stock")
                .await?;

            medicines += 1;
        }
    }

    println!();
    println!("✓ Seeded {} medicines in {:?}", medicines, start.elapsed());

    // Verify prefix search
    println!();
    println!("Verifying prefix search...");
    let mut results = db.medicines().search_medicines_real_time("Ins");
    let matches = results.next().await.unwrap_or_default();
    println!("  Search 'Ins': {} results", matches.len());

    if dump {
        let catalog = db.medicines().list_with_stock(false).await?;
        println!();
        println!("{}", serde_json::to_string_pretty(&catalog)?);
    }

    println!();
    println!("✓ Seed complete!");

    Ok(())
}
