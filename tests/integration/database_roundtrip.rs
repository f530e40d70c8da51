//! SQLite persistence round-trips: batch upserts and the watermark read

use chrono::{NaiveDate, Utc};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

use stock_ingest::database::DatabaseManager;
use stock_ingest::models::{observation_id, PriceTarget, Recommendation, StockPrice};

use crate::common::test_data::date;

async fn fresh_database(dir: &TempDir) -> DatabaseManager {
    let path = dir.path().join("test.db");
    DatabaseManager::new(path.to_str().unwrap())
        .await
        .expect("Failed to create database")
}

fn price(symbol: &str, d: NaiveDate, close: f64) -> StockPrice {
    StockPrice {
        id: observation_id(symbol, d),
        symbol: symbol.to_string(),
        date: d,
        open_price: close - 1.0,
        high_price: close + 1.0,
        low_price: close - 2.0,
        close_price: close,
        volume: 1_000_000,
        dividends: 0.0,
        stock_splits: 0.0,
        inserted_at: Utc::now(),
    }
}

#[tokio::test]
async fn test_watermark_read_returns_max_date_per_symbol() {
    let dir = TempDir::new().unwrap();
    let database = fresh_database(&dir).await;

    let batch = vec![
        price("AAA", date(2024, 1, 10), 100.0),
        price("AAA", date(2024, 1, 12), 102.0),
        price("AAA", date(2024, 1, 11), 101.0),
        price("BBB", date(2024, 1, 5), 50.0),
    ];

    let stored = database.insert_stock_prices(&batch).await.unwrap();
    assert_eq!(stored, 4);

    let watermarks = database.latest_price_dates().await.unwrap();
    assert_eq!(watermarks.len(), 2);
    assert_eq!(watermarks["AAA"], date(2024, 1, 12));
    assert_eq!(watermarks["BBB"], date(2024, 1, 5));
}

#[tokio::test]
async fn test_reinserting_a_batch_does_not_duplicate_rows() {
    let dir = TempDir::new().unwrap();
    let database = fresh_database(&dir).await;

    let batch = vec![
        price("AAA", date(2024, 1, 10), 100.0),
        price("AAA", date(2024, 1, 11), 101.0),
    ];

    database.insert_stock_prices(&batch).await.unwrap();
    database.insert_stock_prices(&batch).await.unwrap();

    let counts = database.record_counts().await.unwrap();
    assert_eq!(counts["stock_price"], 2);
}

#[tokio::test]
async fn test_recommendation_batch_roundtrip() {
    let dir = TempDir::new().unwrap();
    let database = fresh_database(&dir).await;

    let as_of = date(2024, 1, 15);
    let batch = vec![Recommendation {
        id: observation_id("XYZ", as_of),
        symbol: "XYZ".to_string(),
        date: as_of,
        strong_buy: 5,
        buy: 10,
        hold: 3,
        sell: 1,
        strong_sell: 0,
    }];

    let stored = database.insert_recommendations(&batch).await.unwrap();
    assert_eq!(stored, 1);

    let counts = database.record_counts().await.unwrap();
    assert_eq!(counts["recommendation"], 1);
}

#[tokio::test]
async fn test_price_target_with_null_field_is_persisted() {
    let dir = TempDir::new().unwrap();
    let database = fresh_database(&dir).await;

    let as_of = date(2024, 1, 15);
    let batch = vec![PriceTarget {
        id: observation_id("ABC", as_of),
        symbol: "ABC".to_string(),
        date: as_of,
        current: None,
        low: Some(80.0),
        high: Some(120.0),
        mean: Some(101.0),
        median: Some(99.5),
    }];

    let stored = database.insert_price_targets(&batch).await.unwrap();
    assert_eq!(stored, 1);

    let counts = database.record_counts().await.unwrap();
    assert_eq!(counts["price_target"], 1);
}

#[tokio::test]
async fn test_empty_batch_is_a_no_op() {
    let dir = TempDir::new().unwrap();
    let database = fresh_database(&dir).await;

    let stored = database.insert_stock_prices(&[]).await.unwrap();
    assert_eq!(stored, 0);

    let counts = database.record_counts().await.unwrap();
    assert_eq!(counts["stock_price"], 0);
}
