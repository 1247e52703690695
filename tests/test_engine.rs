mod test_support;

use std::time::Duration;
use serde_json::json;
use salesdex::core::cancel::CancelToken;
use salesdex::index::background::IndexStatus;
use salesdex::store::loader::LoadPhase;
use salesdex::store::source::{JsonLinesSource, MemorySource};
use salesdex::{
    EngineConfig, ErrorKind, FilterField, FilterSpec, PageSpec, QueryEngine, QueryOutcome, Record, RecordId,
    SortDirection, SortKey, SortSpec,
};
use test_support::{generate_records, indexed_engine, init_tracing, jsonl_file};

fn sales_source() -> MemorySource {
    MemorySource::from_values(vec![
        json!({"Customer ID": 11, "Customer Name": "Nishant Rao", "Phone Number": "9876543210",
               "Customer Region": "North", "Age": 31, "Date": "2023-05-01", "Tags": "vip,new",
               "Quantity": 2, "Price per Unit": 50, "Discount Percentage": 10}),
        json!({"Customer ID": 12, "Customer Name": "Kavya Iyer", "Phone Number": "9123456789",
               "Customer Region": "South", "Age": 27, "Date": "2023-06-12",
               "Quantity": 1, "Price per Unit": 200}),
        json!({"Customer ID": 13, "Customer Name": "Rohan Das", "Phone Number": "8000043210",
               "Customer Region": "north", "Age": 44, "Date": "2022-11-30",
               "Quantity": 5, "Price per Unit": 10}),
    ])
}

#[test]
fn background_build_becomes_ready() {
    init_tracing();
    let engine = QueryEngine::open(&sales_source(), EngineConfig::default()).unwrap();

    // structural queries never wait for the index
    let page = engine
        .execute_query(&FilterSpec::new(), SortSpec::NATURAL, PageSpec::default())
        .unwrap();
    assert!(page.is_ready());

    assert!(engine.wait_for_index(Duration::from_secs(30)));
    assert!(engine.is_index_ready());
    match engine.index_status() {
        IndexStatus::Ready { generation, stats } => {
            assert_eq!(generation, engine.generation());
            assert_eq!(stats.records, 3);
        }
        other => panic!("unexpected status {:?}", other),
    }

    let hits = engine
        .execute_query(&FilterSpec::new().with_query("kav"), SortSpec::NATURAL, PageSpec::default())
        .unwrap()
        .ready()
        .unwrap();
    assert_eq!(hits.records.len(), 1);
    assert_eq!(hits.records[0].id, RecordId(12));
}

#[test]
fn loads_normalized_records_from_csv_style_rows() {
    let engine = QueryEngine::open(&sales_source(), EngineConfig::foreground()).unwrap();

    let nishant = engine.record(RecordId(11)).unwrap();
    assert_eq!(nishant.tags, vec!["vip", "new"]);
    assert!((nishant.total_amount - 100.0).abs() < 1e-9);
    assert!((nishant.final_amount - 90.0).abs() < 1e-9);

    let progress = engine.load_progress();
    assert_eq!(progress.phase, LoadPhase::Done);
    assert_eq!(progress.rows_read, 3);
    assert_eq!(progress.rows_defaulted, 0);

    // region values compare case-insensitively
    let north = engine
        .execute_query(
            &FilterSpec::new().with_values(FilterField::Region, ["NORTH"]),
            SortSpec::NATURAL,
            PageSpec::default(),
        )
        .unwrap()
        .ready()
        .unwrap();
    assert_eq!(north.total_items, 2);
}

#[test]
fn jsonl_source_defaults_malformed_lines() {
    let file = jsonl_file(&[
        r#"{"id": 1, "customerName": "Asha Verma", "date": "2023-01-05", "finalAmount": 10}"#,
        "",
        "{not json",
        r#"{"id": 3, "customerName": "Ravi Nair", "age": "forty", "date": "2023-01-06"}"#,
    ]);

    let engine = QueryEngine::open(&JsonLinesSource::new(file.path()), EngineConfig::foreground()).unwrap();
    assert_eq!(engine.len(), 3);

    let progress = engine.load_progress();
    assert_eq!(progress.rows_read, 3);
    assert_eq!(progress.rows_defaulted, 2);

    // the malformed row keeps its row number as id
    let defaulted = engine.record(RecordId(2)).unwrap();
    assert!(defaulted.customer_name.is_empty());
    assert!(defaulted.date.is_none());
    assert_eq!(engine.record(RecordId(3)).unwrap().age, 0);
}

#[test]
fn empty_and_missing_sources_fail_to_open() {
    let empty = QueryEngine::open(&MemorySource::default(), EngineConfig::foreground());
    assert_eq!(empty.err().map(|e| e.kind), Some(ErrorKind::EmptySource));

    let missing = QueryEngine::open(
        &JsonLinesSource::new("/nonexistent/sales.jsonl"),
        EngineConfig::foreground(),
    );
    assert_eq!(missing.err().map(|e| e.kind), Some(ErrorKind::Io));
}

#[test]
fn deserialized_records_filter_sort_and_search() {
    let sale = |id: u64, name: &str, phone: &str, region: &str, date: &str| -> Record {
        serde_json::from_value(json!({
            "id": id, "date": date, "customerName": name, "phoneNumber": phone, "age": 30,
            "region": region, "gender": "Female", "productCategory": "Beauty",
            "paymentMethod": "UPI", "orderStatus": "Completed", "tags": ["Organic"],
            "quantity": 1, "unitPrice": 10.0, "discountPercentage": 0.0,
            "totalAmount": 10.0, "finalAmount": 10.0
        }))
        .unwrap()
    };
    let engine = indexed_engine(vec![
        sale(1, "Zoya Khan", "9000000001", "South", "2023-03-01"),
        sale(2, "Nishant Rao", "9876543210", "North", "2023-02-01"),
        sale(3, "Aarav Das", "9123400000", "North", "2023-01-01"),
    ]);

    let north = engine
        .execute_query(
            &FilterSpec::new().with_values(FilterField::Region, ["north"]),
            SortSpec::new(SortKey::CustomerName, SortDirection::Asc),
            PageSpec::default(),
        )
        .unwrap()
        .ready()
        .unwrap();
    let ids: Vec<u64> = north.records.iter().map(|r| r.id.value()).collect();
    assert_eq!(ids, vec![3, 2]);

    let tagged = engine
        .execute_query(
            &FilterSpec::new().with_values(FilterField::Tags, ["organic"]),
            SortSpec::NATURAL,
            PageSpec::default(),
        )
        .unwrap()
        .ready()
        .unwrap();
    assert_eq!(tagged.total_items, 3);

    for query in ["98765", "rao"] {
        let page = engine
            .execute_query(&FilterSpec::new().with_query(query), SortSpec::NATURAL, PageSpec::default())
            .unwrap()
            .ready()
            .unwrap();
        assert_eq!(page.total_items, 1, "query {:?}", query);
        assert_eq!(page.records[0].id, RecordId(2));
        assert_eq!(page.search_strategy, Some("index"));
    }
}

#[test]
fn empty_record_list_fails_to_build() {
    let err = QueryEngine::from_records(Vec::new(), EngineConfig::foreground()).err().unwrap();
    assert_eq!(err.kind, ErrorKind::EmptySource);
}

#[test]
fn rejects_bad_pagination() {
    let engine = indexed_engine(generate_records(50, 1));
    let filters = FilterSpec::new();

    for page in [PageSpec::new(0, 10), PageSpec::new(1, 0), PageSpec::new(1, 5_000_001)] {
        let err = engine.execute_query(&filters, SortSpec::NATURAL, page).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidInput);
    }
    assert!(SortSpec::parse("colour", "asc").is_err());
}

#[test]
fn reload_swaps_collection_and_caches() {
    let engine = QueryEngine::open(&sales_source(), EngineConfig::foreground()).unwrap();
    let filters = FilterSpec::new().with_values(FilterField::Region, ["North"]);

    let before = engine
        .execute_query(&filters, SortSpec::NATURAL, PageSpec::default())
        .unwrap()
        .ready()
        .unwrap();
    assert_eq!(before.total_items, 2);
    assert_eq!(engine.aggregates().record_count, 3);
    let generation = engine.generation();

    let replacement = MemorySource::from_values(vec![
        json!({"id": 21, "customerName": "Meera Joshi", "region": "North", "date": "2024-01-01"}),
        json!({"id": 22, "customerName": "Arjun Khan", "region": "West", "date": "2024-01-02"}),
        json!({"id": 23, "customerName": "Divya Reddy", "region": "North", "date": "2024-01-03"}),
        json!({"id": 24, "customerName": "Karan Gupta", "region": "North", "date": "2024-01-04"}),
    ]);
    engine.reload(&replacement).unwrap();

    assert_eq!(engine.generation(), generation + 1);
    assert!(engine.record(RecordId(11)).is_none());
    assert_eq!(engine.aggregates().record_count, 4);

    let after = engine
        .execute_query(&filters, SortSpec::NATURAL, PageSpec::default())
        .unwrap()
        .ready()
        .unwrap();
    assert_eq!(after.total_items, 3);
    assert_eq!(after.records[0].id, RecordId(24));

    let hits = engine
        .execute_query(&FilterSpec::new().with_query("div"), SortSpec::NATURAL, PageSpec::default())
        .unwrap()
        .ready()
        .unwrap();
    assert_eq!(hits.records[0].customer_name, "Divya Reddy");
}

#[test]
fn failed_reload_keeps_serving_old_collection() {
    let engine = QueryEngine::open(&sales_source(), EngineConfig::foreground()).unwrap();
    let generation = engine.generation();

    let err = engine.reload(&MemorySource::default()).unwrap_err();
    assert_eq!(err.kind, ErrorKind::EmptySource);
    assert_eq!(engine.generation(), generation);
    assert_eq!(engine.len(), 3);
    assert!(engine.record(RecordId(12)).is_some());
    assert_eq!(engine.load_progress().phase, LoadPhase::Failed);
}

#[test]
fn repeated_small_pages_hit_the_cache() {
    let engine = indexed_engine(generate_records(200, 3));
    let filters = FilterSpec::new().with_values(FilterField::Gender, ["Male"]);

    let first = engine.execute_query(&filters, SortSpec::NATURAL, PageSpec::new(2, 20)).unwrap();
    let second = engine.execute_query(&filters, SortSpec::NATURAL, PageSpec::new(2, 20)).unwrap();
    assert_eq!(first, second);
    assert_eq!(engine.cache_stats().hit_count, 1);

    // pages above the cacheable size are always recomputed
    engine.execute_query(&filters, SortSpec::NATURAL, PageSpec::new(1, 1_000)).unwrap();
    engine.execute_query(&filters, SortSpec::NATURAL, PageSpec::new(1, 1_000)).unwrap();
    assert_eq!(engine.cache_stats().hit_count, 1);
    assert_eq!(engine.cache_stats().size, 1);
}

#[test]
fn cancelled_query_returns_cancelled() {
    let engine = indexed_engine(generate_records(100, 5));
    let cancel = CancelToken::new();
    cancel.cancel();

    let err = engine
        .execute_query_with(
            &FilterSpec::new().with_age(Some(20), Some(30)),
            SortSpec::NATURAL,
            PageSpec::default(),
            &cancel,
        )
        .unwrap_err();
    assert!(err.is_cancelled());
}

#[test]
fn stats_follow_filters() {
    let engine = QueryEngine::open(&sales_source(), EngineConfig::foreground()).unwrap();

    let global = engine.stats(None).unwrap().ready().unwrap();
    assert_eq!(global.total_records, 3);
    assert!((global.total_amount - 340.0).abs() < 1e-9);

    let north = engine
        .stats(Some(&FilterSpec::new().with_values(FilterField::Region, ["North"])))
        .unwrap();
    match north {
        QueryOutcome::Ready(stats) => {
            assert_eq!(stats.total_records, 2);
            assert_eq!(stats.total_quantity, 7);
            assert!((stats.total_discount - 10.0).abs() < 1e-9);
        }
        other => panic!("unexpected outcome {:?}", other),
    }
}

#[test]
fn outcome_serializes_with_status_tag() {
    let engine = indexed_engine(generate_records(5, 2));
    let outcome = engine
        .execute_query(&FilterSpec::new(), SortSpec::NATURAL, PageSpec::new(1, 2))
        .unwrap();
    let value = serde_json::to_value(&outcome).unwrap();

    assert_eq!(value["status"], "ready");
    assert_eq!(value["data"]["totalItems"], 5);
    assert_eq!(value["data"]["hasNextPage"], true);
    assert_eq!(value["data"]["records"].as_array().map(|r| r.len()), Some(2));
}
