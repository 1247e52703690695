/// Salesdex API Demo
///
/// Demonstrates the main query engine operations:
/// - Loading a collection and waiting for the search index
/// - Text search, structural filters, sorting and paging
/// - Filter options and sales statistics
/// - Reloading the collection

use std::time::Duration;
use serde_json::json;
use salesdex::store::source::MemorySource;
use salesdex::{
    EngineConfig, FilterField, FilterSpec, PageSpec, QueryEngine, QueryOutcome, SortDirection, SortKey,
    SortSpec,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().with_env_filter("salesdex=info").init();

    println!("\n╔═══════════════════════════════════════════════╗");
    println!("║        Salesdex Query Engine - API Demo       ║");
    println!("╚═══════════════════════════════════════════════╝\n");

    // Step 1: Load
    println!("Step 1: LOAD - Opening engine...");
    let engine = QueryEngine::open(&sample_sales(), EngineConfig::default())?;
    println!("  Loaded {} records", engine.len());
    let ready = engine.wait_for_index(Duration::from_secs(10));
    println!("  Index ready: {} ({:?})\n", ready, engine.index_status());

    // Step 2: Search
    println!("Step 2: SEARCH - Text queries...");
    for query in ["nish", "98765", "erm"] {
        let filters = FilterSpec::new().with_query(query);
        match engine.execute_query(&filters, SortSpec::NATURAL, PageSpec::default())? {
            QueryOutcome::Ready(page) => println!(
                "  '{}': {} results via {}",
                query,
                page.total_items,
                page.search_strategy.unwrap_or("-")
            ),
            QueryOutcome::IndexNotReady(status) => println!("  '{}': index not ready ({:?})", query, status),
        }
    }
    println!();

    // Step 3: Filter + sort
    println!("Step 3: FILTER - North region, age 25-40, by amount...");
    let filters = FilterSpec::new()
        .with_values(FilterField::Region, ["North"])
        .with_age(Some(25), Some(40));
    let sort = SortSpec::new(SortKey::FinalAmount, SortDirection::Desc);
    if let Some(page) = engine.execute_query(&filters, sort, PageSpec::new(1, 5))?.ready() {
        for record in &page.records {
            println!(
                "  #{} {:<16} age {:>2}  {:>8.2}",
                record.id.value(),
                record.customer_name,
                record.age,
                record.final_amount
            );
        }
        println!("  page {}/{} of {} matches\n", page.current_page, page.total_pages, page.total_items);
    }

    // Step 4: Aggregates
    println!("Step 4: AGGREGATES - Filter options and totals...");
    let aggregates = engine.aggregates();
    for (field, values) in &aggregates.distinct_values_by_field {
        println!("  {}: {:?}", field, values);
    }
    println!("  {}\n", serde_json::to_string_pretty(&aggregates.stats)?);

    // Step 5: Reload
    println!("Step 5: RELOAD - Replacing the collection...");
    engine.reload(&MemorySource::from_values(vec![json!({
        "id": 100, "customerName": "Farah Khan", "region": "West", "date": "2024-02-02",
        "quantity": 1, "unitPrice": 999.0
    })]))?;
    println!("  Generation {} with {} records", engine.generation(), engine.len());
    println!("  Cache: {:?}", engine.cache_stats());

    println!("\nDone!");
    Ok(())
}

fn sample_sales() -> MemorySource {
    let rows = [
        ("Nishant Rao", "+91 98765 43210", "North", 31, "2023-05-01", 2, 450.0, 10.0),
        ("Asha Verma", "+91 91234 56789", "South", 28, "2023-06-11", 1, 1200.0, 0.0),
        ("Rohan Mehta", "+91 99887 76655", "North", 39, "2023-04-20", 3, 80.0, 5.0),
        ("Kavya Nair", "+91 90000 12345", "East", 45, "2022-12-30", 5, 35.0, 0.0),
        ("Vikram Sharma", "+91 98111 22233", "North", 26, "2023-01-15", 1, 2300.0, 20.0),
    ];

    MemorySource::from_values(
        rows.iter()
            .enumerate()
            .map(|(i, (name, phone, region, age, date, quantity, price, discount))| {
                json!({
                    "id": i + 1,
                    "customerName": name,
                    "phoneNumber": phone,
                    "region": region,
                    "age": age,
                    "date": date,
                    "quantity": quantity,
                    "unitPrice": price,
                    "discountPercentage": discount,
                    "tags": "retail",
                })
            })
            .collect(),
    )
}
