//! Behavior-driven tests for the price-history warehouse
//!
//! These tests verify HOW the warehouse stores and returns daily bars,
//! focusing on write-mode semantics and bounded reads.

use tempfile::{tempdir, TempDir};
use volcast_core::{PriceBar, PriceTableStore, Symbol, VolatilityErrorKind};
use volcast_warehouse::{PriceRecord, Warehouse, WarehouseConfig, WarehouseError, WriteMode};

fn open_warehouse() -> (TempDir, Warehouse) {
    let temp = tempdir().expect("tempdir");
    let warehouse = Warehouse::open(WarehouseConfig {
        db_path: temp.path().join("data").join("prices.duckdb"),
        max_pool_size: 2,
    })
    .expect("warehouse open");
    (temp, warehouse)
}

fn record(date: &str, close: f64) -> PriceRecord {
    PriceRecord {
        date: date.to_string(),
        open: close,
        high: close + 1.0,
        low: close - 1.0,
        close,
        volume: 1_000.0,
    }
}

fn january(days: std::ops::RangeInclusive<u8>) -> Vec<PriceRecord> {
    days.map(|day| record(&format!("2024-01-{day:02}"), 100.0 + f64::from(day)))
        .collect()
}

// =============================================================================
// Write modes
// =============================================================================

#[test]
fn when_user_replaces_a_table_old_rows_disappear() {
    // Given: A ticker with January 1st to 10th stored
    let (_temp, warehouse) = open_warehouse();
    warehouse
        .write_prices("AAPL", &january(1..=10), WriteMode::Replace)
        .expect("seed");

    // When: The table is replaced with three later rows
    let report = warehouse
        .write_prices("AAPL", &january(20..=22), WriteMode::Replace)
        .expect("replace");

    // Then: Only the new rows remain
    assert_eq!(report.inserted, 3);
    let rows = warehouse.read_recent_prices("AAPL", None).expect("read");
    let dates: Vec<&str> = rows.iter().map(|row| row.date.as_str()).collect();
    assert_eq!(dates, vec!["2024-01-20", "2024-01-21", "2024-01-22"]);
}

#[test]
fn fail_mode_refuses_to_touch_an_existing_table() {
    // Given: A populated ticker
    let (_temp, warehouse) = open_warehouse();
    warehouse
        .write_prices("MSFT", &january(1..=3), WriteMode::Fail)
        .expect("first write into empty table");

    // When: Writing again in fail mode
    let error = warehouse
        .write_prices("MSFT", &january(4..=5), WriteMode::Fail)
        .expect_err("table exists");

    // Then: The error names the ticker and nothing changed
    assert!(matches!(error, WarehouseError::TableExists { ref symbol } if symbol == "MSFT"));
    assert_eq!(warehouse.price_count("MSFT").expect("count"), 3);
}

#[test]
fn append_with_a_duplicate_date_rolls_back_the_whole_write() {
    // Given: January 1st to 5th
    let (_temp, warehouse) = open_warehouse();
    warehouse
        .write_prices("NVDA", &january(1..=5), WriteMode::Replace)
        .expect("seed");

    // When: Appending 5th to 7th (the 5th already exists)
    let result = warehouse.write_prices("NVDA", &january(5..=7), WriteMode::Append);

    // Then: The write fails and no partial rows are visible
    assert!(result.is_err());
    assert_eq!(warehouse.price_count("NVDA").expect("count"), 5);

    // And: A clean append succeeds
    let report = warehouse
        .write_prices("NVDA", &january(6..=7), WriteMode::Append)
        .expect("append");
    assert_eq!(report.inserted, 2);
    assert_eq!(warehouse.price_count("NVDA").expect("count"), 7);
}

// =============================================================================
// Reads
// =============================================================================

#[test]
fn recent_reads_return_the_newest_rows_oldest_first() {
    // Given: Ten stored days
    let (_temp, warehouse) = open_warehouse();
    warehouse
        .write_prices("AMZN", &january(1..=10), WriteMode::Replace)
        .expect("seed");

    // When: Reading the four most recent
    let rows = warehouse
        .read_recent_prices("AMZN", Some(4))
        .expect("read");

    // Then: Days 7 to 10 come back in ascending order
    let dates: Vec<&str> = rows.iter().map(|row| row.date.as_str()).collect();
    assert_eq!(
        dates,
        vec!["2024-01-07", "2024-01-08", "2024-01-09", "2024-01-10"]
    );
}

#[test]
fn a_limit_larger_than_the_table_returns_everything() {
    let (_temp, warehouse) = open_warehouse();
    warehouse
        .write_prices("META", &january(1..=3), WriteMode::Replace)
        .expect("seed");

    let rows = warehouse
        .read_recent_prices("META", Some(250))
        .expect("read");
    assert_eq!(rows.len(), 3);
}

#[test]
fn unknown_tickers_read_as_empty() {
    let (_temp, warehouse) = open_warehouse();
    assert!(warehouse
        .read_recent_prices("NONE", None)
        .expect("read")
        .is_empty());
    assert_eq!(warehouse.price_count("NONE").expect("count"), 0);
}

#[test]
fn tickers_are_isolated_from_each_other() {
    // Given: Two tickers sharing dates
    let (_temp, warehouse) = open_warehouse();
    warehouse
        .write_prices("AAA", &january(1..=4), WriteMode::Replace)
        .expect("AAA");
    warehouse
        .write_prices("BBB", &january(1..=2), WriteMode::Replace)
        .expect("BBB");

    // When: One of them is replaced with nothing
    warehouse
        .write_prices("AAA", &[], WriteMode::Replace)
        .expect("clear AAA");

    // Then: The other is untouched
    assert_eq!(warehouse.price_count("AAA").expect("count"), 0);
    assert_eq!(warehouse.price_count("BBB").expect("count"), 2);
    let rows = warehouse.read_recent_prices("BBB", None).expect("read");
    let dates: Vec<&str> = rows.iter().map(|row| row.date.as_str()).collect();
    assert_eq!(dates, vec!["2024-01-01", "2024-01-02"]);
}

// =============================================================================
// Price-table contract
// =============================================================================

#[test]
fn price_table_contract_round_trips_validated_bars() {
    // Given: Bars written through the lifecycle's store contract
    let (_temp, warehouse) = open_warehouse();
    let symbol = Symbol::parse("tsla").expect("symbol");
    let bars: Vec<PriceBar> = (1..=3)
        .map(|day| {
            PriceBar::new(
                time::Date::from_calendar_date(2024, time::Month::February, day).expect("date"),
                200.0,
                210.0,
                195.0,
                205.0 + f64::from(day),
                9_000.0,
            )
            .expect("bar")
        })
        .collect();
    PriceTableStore::write(&warehouse, &symbol, &bars, WriteMode::Replace).expect("write");

    // Then: The upper-cased ticker reads back the same bars
    assert_eq!(warehouse.price_count("TSLA").expect("count"), 3);
    assert_eq!(
        PriceTableStore::read_recent(&warehouse, &symbol, Some(2)).expect("read"),
        bars[1..].to_vec()
    );
}

#[test]
fn store_conflicts_surface_as_persistence_errors() {
    let (_temp, warehouse) = open_warehouse();
    let symbol = Symbol::parse("IBM").expect("symbol");
    let bar = PriceBar::new(
        time::macros::date!(2024 - 02 - 01),
        1.0,
        1.0,
        1.0,
        1.0,
        0.0,
    )
    .expect("bar");

    PriceTableStore::write(&warehouse, &symbol, &[bar], WriteMode::Fail).expect("first");
    let error = PriceTableStore::write(&warehouse, &symbol, &[bar], WriteMode::Fail)
        .expect_err("second");
    assert_eq!(error.kind(), VolatilityErrorKind::Persistence);
}
