#![allow(dead_code)]

use std::io::Write;
use chrono::{Duration, NaiveDate};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use salesdex::core::types::RecordKeys;
use salesdex::{EngineConfig, QueryEngine, Record, RecordId};
use tempfile::NamedTempFile;

pub const FIRST_NAMES: &[&str] = &[
    "Aarav", "Priya", "Rahul", "Ananya", "Vikram", "Sneha", "Arjun", "Kavya", "Rohan", "Meera",
    "Ishaan", "Divya", "Karan", "Pooja", "Anish",
];
pub const LAST_NAMES: &[&str] = &[
    "Sharma", "Verma", "Iyer", "Das", "Gupta", "Nair", "Khan", "Reddy", "Joshi", "Mehta",
];
pub const REGIONS: &[&str] = &["North", "South", "East", "West", "Central"];
pub const GENDERS: &[&str] = &["Male", "Female"];
pub const CATEGORIES: &[&str] = &["Electronics", "Clothing", "Beauty"];
pub const PAYMENTS: &[&str] = &["Cash", "UPI", "Credit Card", "Debit Card", "Wallet"];
pub const STATUSES: &[&str] = &["Completed", "Pending", "Cancelled", "Returned"];
pub const TAGS: &[&str] = &["organic", "wireless", "fashion", "gadgets", "skincare", "portable"];

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// A record with its lowercase keys filled in.
pub fn record(id: u64, name: &str, phone: &str, region: &str, age: u32, date: Option<NaiveDate>) -> Record {
    let mut record = Record {
        id: RecordId(id),
        date,
        customer_name: name.to_string(),
        phone_number: phone.to_string(),
        age,
        region: region.to_string(),
        gender: "Female".to_string(),
        product_category: "Clothing".to_string(),
        payment_method: "Cash".to_string(),
        order_status: "Completed".to_string(),
        tags: Vec::new(),
        quantity: 1,
        unit_price: 10.0,
        discount_percentage: 0.0,
        total_amount: 10.0,
        final_amount: 10.0,
        keys: RecordKeys::default(),
    };
    record.keys = RecordKeys::from_record(&record);
    record
}

fn pick<'a>(rng: &mut StdRng, values: &[&'a str]) -> &'a str {
    values.choose(rng).copied().unwrap_or_default()
}

/// Deterministic synthetic sales, ids `1..=count`.
pub fn generate_records(count: usize, seed: u64) -> Vec<Record> {
    let mut rng = StdRng::seed_from_u64(seed);
    let base = NaiveDate::from_ymd_opt(2021, 1, 1).unwrap();

    (0..count)
        .map(|i| {
            let name = format!("{} {}", pick(&mut rng, FIRST_NAMES), pick(&mut rng, LAST_NAMES));
            let phone = format!("+91 9{:09}", rng.gen_range(0..1_000_000_000u64));
            let date = if rng.gen_bool(0.02) {
                None
            } else {
                Some(base + Duration::days(rng.gen_range(0..1000)))
            };

            let mut record = record(
                i as u64 + 1,
                &name,
                &phone,
                pick(&mut rng, REGIONS),
                rng.gen_range(18..70),
                date,
            );
            record.gender = pick(&mut rng, GENDERS).to_string();
            record.product_category = pick(&mut rng, CATEGORIES).to_string();
            record.payment_method = pick(&mut rng, PAYMENTS).to_string();
            record.order_status = pick(&mut rng, STATUSES).to_string();
            record.tags = (0..rng.gen_range(0..3))
                .map(|_| pick(&mut rng, TAGS).to_string())
                .collect();
            record.tags.dedup();
            record.quantity = rng.gen_range(1..10);
            record.unit_price = rng.gen_range(5..500) as f64;
            record.discount_percentage = [0.0, 5.0, 10.0, 20.0][rng.gen_range(0..4)];
            record.total_amount = record.quantity as f64 * record.unit_price;
            record.final_amount = record.total_amount * (1.0 - record.discount_percentage / 100.0);
            record.keys = RecordKeys::from_record(&record);
            record
        })
        .collect()
}

/// Engine whose index is built before this returns.
pub fn indexed_engine(records: Vec<Record>) -> QueryEngine {
    QueryEngine::from_records(records, EngineConfig::foreground()).unwrap()
}

/// Write JSON lines to a temp file that lives as long as the handle.
pub fn jsonl_file(lines: &[&str]) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    for line in lines {
        writeln!(file, "{}", line).unwrap();
    }
    file.flush().unwrap();
    file
}
