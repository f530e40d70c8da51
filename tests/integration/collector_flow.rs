//! End-to-end collector scenarios against the scripted provider

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use pretty_assertions::assert_eq;

use stock_ingest::data_collector::DataCollector;
use stock_ingest::retry::RetryPolicy;

use crate::common::api_mock::ScriptedProvider;
use crate::common::test_data::{bar, date, target_fields, trend_row};

fn symbols(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

#[test_log::test(tokio::test)]
async fn test_incremental_windows_for_seen_and_unseen_symbols() {
    let mut provider = ScriptedProvider::new();
    provider.bars.insert(
        "AAA".to_string(),
        vec![
            // Older than the watermark; must not reappear in the output
            bar(date(2024, 1, 9), 100.0),
            bar(date(2024, 1, 10), 101.0),
            bar(date(2024, 1, 11), 102.0),
            bar(date(2024, 1, 12), 103.0),
        ],
    );
    provider.bars.insert(
        "BBB".to_string(),
        vec![bar(date(2024, 1, 12), 50.0), bar(date(2024, 1, 13), 51.0)],
    );

    let provider = Arc::new(provider);
    let collector = DataCollector::new(provider.clone(), RetryPolicy::no_delay(3));

    let mut watermarks = HashMap::new();
    watermarks.insert("AAA".to_string(), date(2024, 1, 10));

    let today = date(2024, 1, 15);
    let inserted_at = Utc::now();

    let records = collector
        .collect_price_history(&symbols(&["AAA", "BBB"]), &watermarks, today, inserted_at)
        .await;

    // AAA resumes the day after its watermark; BBB gets the deep-history
    // default of today minus 99 years. End is always today, exclusive.
    assert_eq!(
        provider.recorded_history_requests(),
        vec![
            ("AAA".to_string(), date(2024, 1, 11), date(2024, 1, 15)),
            ("BBB".to_string(), date(1925, 1, 15), date(2024, 1, 15)),
        ]
    );

    let ids: Vec<&str> = records.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(
        ids,
        vec![
            "AAA_2024-01-11",
            "AAA_2024-01-12",
            "BBB_2024-01-12",
            "BBB_2024-01-13",
        ]
    );
    assert!(records.iter().all(|r| r.inserted_at == inserted_at));
}

#[tokio::test]
async fn test_current_watermark_makes_rerun_a_no_op() {
    let mut provider = ScriptedProvider::new();
    provider
        .bars
        .insert("AAA".to_string(), vec![bar(date(2024, 1, 12), 100.0)]);

    let provider = Arc::new(provider);
    let collector = DataCollector::new(provider.clone(), RetryPolicy::no_delay(3));

    let today = date(2024, 1, 15);
    let mut watermarks = HashMap::new();
    watermarks.insert("AAA".to_string(), today);

    let records = collector
        .collect_price_history(&symbols(&["AAA"]), &watermarks, today, Utc::now())
        .await;

    assert!(records.is_empty());
    assert!(provider.recorded_history_requests().is_empty());
}

#[tokio::test]
async fn test_transient_failures_are_retried_then_recovered() {
    let mut provider = ScriptedProvider::new();
    provider
        .bars
        .insert("AAA".to_string(), vec![bar(date(2024, 1, 12), 100.0)]);
    provider.fail_first("AAA", 2); // two transient failures, then success

    let provider = Arc::new(provider);
    let collector = DataCollector::new(provider.clone(), RetryPolicy::no_delay(3));

    let records = collector
        .collect_price_history(
            &symbols(&["AAA"]),
            &HashMap::new(),
            date(2024, 1, 15),
            Utc::now(),
        )
        .await;

    assert_eq!(records.len(), 1);
    assert_eq!(provider.recorded_history_requests().len(), 3);
}

#[tokio::test]
async fn test_exhausted_retries_skip_the_symbol_but_not_the_batch() {
    let mut provider = ScriptedProvider::new();
    provider
        .bars
        .insert("BAD".to_string(), vec![bar(date(2024, 1, 12), 1.0)]);
    provider
        .bars
        .insert("GOOD".to_string(), vec![bar(date(2024, 1, 12), 2.0)]);
    provider.fail_first("BAD", 5); // more failures than the attempt ceiling

    let provider = Arc::new(provider);
    let collector = DataCollector::new(provider.clone(), RetryPolicy::no_delay(3));

    let records = collector
        .collect_price_history(
            &symbols(&["BAD", "GOOD"]),
            &HashMap::new(),
            date(2024, 1, 15),
            Utc::now(),
        )
        .await;

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].symbol, "GOOD");

    // BAD was attempted exactly three times, then given up on
    let bad_attempts = provider
        .recorded_history_requests()
        .iter()
        .filter(|(symbol, _, _)| symbol == "BAD")
        .count();
    assert_eq!(bad_attempts, 3);
}

#[test_log::test(tokio::test)]
async fn test_recommendation_batch_produces_identified_records() {
    let mut provider = ScriptedProvider::new();
    provider
        .recommendations
        .insert("XYZ".to_string(), vec![trend_row(5, 10, 3, 1, 0)]);
    // ABC has no rows scripted: skipped, not fatal

    let collector = DataCollector::new(Arc::new(provider), RetryPolicy::no_delay(3));
    let records = collector
        .collect_recommendations(&symbols(&["XYZ", "ABC"]), date(2024, 1, 15))
        .await;

    assert_eq!(records.len(), 1);
    let record = &records[0];
    assert_eq!(record.id, "XYZ_2024-01-15");
    assert_eq!(record.strong_buy, 5);
    assert_eq!(record.buy, 10);
    assert_eq!(record.hold, 3);
    assert_eq!(record.sell, 1);
    assert_eq!(record.strong_sell, 0);
}

#[tokio::test]
async fn test_price_target_null_field_survives_and_missing_key_skips() {
    let mut provider = ScriptedProvider::new();
    provider.price_targets.insert(
        "FULL".to_string(),
        target_fields(&[
            ("current", None),
            ("low", Some(80.0)),
            ("high", Some(120.0)),
            ("mean", Some(101.0)),
            ("median", Some(99.5)),
        ]),
    );
    provider.price_targets.insert(
        "PARTIAL".to_string(),
        target_fields(&[
            ("current", Some(50.0)),
            ("low", Some(40.0)),
            ("high", Some(60.0)),
            ("mean", Some(51.0)),
        ]),
    );

    let collector = DataCollector::new(Arc::new(provider), RetryPolicy::no_delay(3));
    let records = collector
        .collect_price_targets(&symbols(&["FULL", "PARTIAL"]), date(2024, 1, 15))
        .await;

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].symbol, "FULL");
    assert_eq!(records[0].current, None);
    assert_eq!(records[0].median, Some(99.5));
}
