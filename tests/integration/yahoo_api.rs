//! HTTP-level client behavior against a stub server

use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use stock_ingest::api::{ListingClient, MarketDataProvider, YahooClient};

use crate::common::test_data::date;

// High request rate keeps the client's pacing delay negligible in tests
const TEST_RATE: u32 = 60_000;

#[tokio::test]
async fn test_fetch_recommendations_parses_quote_summary() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v10/finance/quoteSummary/XYZ"))
        .and(query_param("modules", "recommendationTrend"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "quoteSummary": {
                "result": [{
                    "recommendationTrend": {
                        "trend": [
                            {"period": "0m", "strongBuy": 5, "buy": 10, "hold": 3, "sell": 1, "strongSell": 0}
                        ]
                    }
                }],
                "error": null
            }
        })))
        .mount(&server)
        .await;

    let client = YahooClient::with_base_url(&server.uri(), TEST_RATE).unwrap();
    let rows = client.fetch_recommendations("XYZ").await.unwrap();

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].strong_buy, Some(5));
    assert_eq!(rows[0].strong_sell, Some(0));
}

#[tokio::test]
async fn test_fetch_price_history_requests_the_exact_window() {
    let server = MockServer::start().await;

    // [2024-01-11, 2024-01-15) as midnight UTC timestamps
    Mock::given(method("GET"))
        .and(path("/v8/finance/chart/AAA"))
        .and(query_param("period1", "1704931200"))
        .and(query_param("period2", "1705276800"))
        .and(query_param("interval", "1d"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "chart": {
                "result": [{
                    "timestamp": [1704931200],
                    "indicators": {
                        "quote": [{
                            "open": [100.0],
                            "high": [105.0],
                            "low": [99.0],
                            "close": [102.0],
                            "volume": [1000000]
                        }]
                    }
                }],
                "error": null
            }
        })))
        .mount(&server)
        .await;

    let client = YahooClient::with_base_url(&server.uri(), TEST_RATE).unwrap();
    let bars = client
        .fetch_price_history("AAA", date(2024, 1, 11), date(2024, 1, 15))
        .await
        .unwrap();

    assert_eq!(bars.len(), 1);
    assert_eq!(bars[0].date, date(2024, 1, 11));
    assert_eq!(bars[0].close, 102.0);
}

#[tokio::test]
async fn test_server_error_surfaces_as_an_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
        .mount(&server)
        .await;

    let client = YahooClient::with_base_url(&server.uri(), TEST_RATE).unwrap();
    let result = client.fetch_recommendations("XYZ").await;

    assert!(result.is_err());
}

#[tokio::test]
async fn test_listing_client_parses_symbol_csv() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/query"))
        .and(query_param("function", "LISTING_STATUS"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "symbol,name,exchange,assetType,ipoDate,delistingDate,status\n\
             AAPL,Apple Inc,NASDAQ,Stock,1980-12-12,null,Active\n\
             MSFT,Microsoft Corp,NASDAQ,Stock,1986-03-13,null,Active\n",
        ))
        .mount(&server)
        .await;

    let client =
        ListingClient::with_base_url(&format!("{}/query", server.uri()), "demo").unwrap();
    let symbols = client.list_symbols().await.unwrap();

    assert_eq!(symbols, vec!["AAPL".to_string(), "MSFT".to_string()]);
}
