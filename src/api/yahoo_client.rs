use std::collections::HashMap;

use anyhow::{anyhow, Result};
use chrono::NaiveDate;
use reqwest::Client;
use serde_json::Value;
use tracing::debug;
use url::Url;

use super::{ApiRateLimiter, MarketDataProvider};
use crate::models::{Config, GrowthTrendRow, InsiderSummary, PriceBar, RecommendationTrendRow};

/// Yahoo Finance quote summary API base URL.
const QUOTE_SUMMARY_URL: &str = "https://query2.finance.yahoo.com/v10/finance/quoteSummary";

/// Yahoo Finance chart API base URL.
const CHART_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";

/// Yahoo rejects requests without a browser-like user agent.
const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36";

/// Provider field names mapped to the canonical price-target keys.
const PRICE_TARGET_FIELDS: [(&str, &str); 5] = [
    ("currentPrice", "current"),
    ("targetLowPrice", "low"),
    ("targetHighPrice", "high"),
    ("targetMeanPrice", "mean"),
    ("targetMedianPrice", "median"),
];

/// Yahoo Finance market-data client
pub struct YahooClient {
    client: Client,
    quote_summary_base: String,
    chart_base: String,
    rate_limiter: ApiRateLimiter,
}

impl YahooClient {
    /// Create a new Yahoo client
    pub fn new(config: &Config) -> Result<Self> {
        Self::with_rate_limit(config.rate_limit_per_minute)
    }

    /// Create a new Yahoo client with a custom request rate
    pub fn with_rate_limit(requests_per_minute: u32) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            quote_summary_base: QUOTE_SUMMARY_URL.to_string(),
            chart_base: CHART_URL.to_string(),
            rate_limiter: ApiRateLimiter::new(requests_per_minute),
        })
    }

    /// Create a client pointed at a different host, for exercising the HTTP
    /// path against a local stub server.
    pub fn with_base_url(base: &str, requests_per_minute: u32) -> Result<Self> {
        let mut client = Self::with_rate_limit(requests_per_minute)?;
        client.quote_summary_base = format!("{}/v10/finance/quoteSummary", base);
        client.chart_base = format!("{}/v8/finance/chart", base);
        Ok(client)
    }

    /// Make a request and decode the JSON body
    async fn make_request(&self, url: Url) -> Result<Value> {
        self.rate_limiter.wait().await;

        debug!("Making request to: {}", url);

        let response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(anyhow!(
                "API request failed with status {}: {}",
                status,
                error_text
            ));
        }

        let json: Value = response.json().await?;
        Ok(json)
    }

    /// Fetch one quoteSummary module for a symbol and return the module
    /// object, or `Value::Null` when the provider has no such block.
    async fn quote_summary_module(&self, symbol: &str, module: &str) -> Result<Value> {
        let mut url = Url::parse(&format!("{}/{}", self.quote_summary_base, symbol))?;
        url.query_pairs_mut().append_pair("modules", module);

        let data = self.make_request(url).await?;

        let summary = data
            .get("quoteSummary")
            .ok_or_else(|| anyhow!("Malformed quoteSummary response for {}", symbol))?;

        if let Some(error) = summary.get("error") {
            if !error.is_null() {
                return Err(anyhow!("Provider error for {}: {}", symbol, error));
            }
        }

        let result = summary
            .get("result")
            .and_then(|r| r.as_array())
            .and_then(|r| r.first());

        Ok(result
            .and_then(|r| r.get(module))
            .cloned()
            .unwrap_or(Value::Null))
    }
}

#[async_trait::async_trait]
impl MarketDataProvider for YahooClient {
    async fn fetch_recommendations(&self, symbol: &str) -> Result<Vec<RecommendationTrendRow>> {
        let module = self
            .quote_summary_module(symbol, "recommendationTrend")
            .await?;
        parse_recommendation_trend(&module)
    }

    async fn fetch_price_target(&self, symbol: &str) -> Result<HashMap<String, Option<f64>>> {
        let module = self.quote_summary_module(symbol, "financialData").await?;
        Ok(parse_price_target(&module))
    }

    async fn fetch_price_history(
        &self,
        symbol: &str,
        from_date: NaiveDate,
        to_date: NaiveDate,
    ) -> Result<Vec<PriceBar>> {
        // Midnight-to-midnight timestamps give the provider's half-open
        // [from, to) daily range.
        let period1 = from_date
            .and_hms_opt(0, 0, 0)
            .ok_or_else(|| anyhow!("Invalid start date: {}", from_date))?
            .and_utc()
            .timestamp();
        let period2 = to_date
            .and_hms_opt(0, 0, 0)
            .ok_or_else(|| anyhow!("Invalid end date: {}", to_date))?
            .and_utc()
            .timestamp();

        let mut url = Url::parse(&format!("{}/{}", self.chart_base, symbol))?;
        url.query_pairs_mut()
            .append_pair("period1", &period1.to_string())
            .append_pair("period2", &period2.to_string())
            .append_pair("interval", "1d")
            .append_pair("events", "div|split");

        let data = self.make_request(url).await?;
        parse_chart(&data, symbol)
    }

    async fn fetch_insider_summary(&self, symbol: &str) -> Result<Option<InsiderSummary>> {
        let module = self
            .quote_summary_module(symbol, "netSharePurchaseActivity")
            .await?;
        Ok(parse_insider_summary(&module))
    }

    async fn fetch_growth_estimates(&self, symbol: &str) -> Result<Vec<GrowthTrendRow>> {
        let module = self.quote_summary_module(symbol, "earningsTrend").await?;
        Ok(parse_growth_trend(&module))
    }
}

/// Unwrap one of Yahoo's numeric fields.
///
/// Numbers arrive either bare or wrapped as `{"raw": 1.23, "fmt": "1.23"}`;
/// an empty object stands for a reported-but-null value.
fn numeric_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::Object(obj) => obj.get("raw").and_then(|raw| raw.as_f64()),
        _ => None,
    }
}

fn integer_value(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::Object(obj) => obj.get("raw").and_then(|raw| raw.as_i64()),
        _ => None,
    }
}

/// Parse the recommendationTrend module into trend rows, most recent first.
fn parse_recommendation_trend(module: &Value) -> Result<Vec<RecommendationTrendRow>> {
    let trend = match module.get("trend") {
        Some(trend) => trend.clone(),
        None => return Ok(Vec::new()),
    };

    Ok(serde_json::from_value(trend)?)
}

/// Parse the financialData module into the canonical price-target mapping.
///
/// Only keys the provider actually reported appear in the map; a reported
/// key with no usable number maps to `None`.
fn parse_price_target(module: &Value) -> HashMap<String, Option<f64>> {
    let mut fields = HashMap::new();

    let obj = match module.as_object() {
        Some(obj) => obj,
        None => return fields,
    };

    for (provider_key, canonical_key) in PRICE_TARGET_FIELDS {
        if let Some(value) = obj.get(provider_key) {
            fields.insert(canonical_key.to_string(), numeric_value(value));
        }
    }

    fields
}

fn parse_insider_summary(module: &Value) -> Option<InsiderSummary> {
    let obj = module.as_object()?;

    Some(InsiderSummary {
        purchases: obj.get("buyInfoCount").and_then(integer_value),
        sales: obj.get("sellInfoCount").and_then(integer_value),
        insider_shares_held: obj.get("totalInsiderShares").and_then(integer_value),
    })
}

fn parse_growth_trend(module: &Value) -> Vec<GrowthTrendRow> {
    let rows = match module.get("trend").and_then(|t| t.as_array()) {
        Some(rows) => rows,
        None => return Vec::new(),
    };

    rows.iter()
        .map(|row| GrowthTrendRow {
            period: row
                .get("period")
                .and_then(|p| p.as_str())
                .unwrap_or_default()
                .to_string(),
            growth: row.get("growth").map(numeric_value).unwrap_or(None),
        })
        .collect()
}

/// Parse a chart response into daily bars.
///
/// Yahoo pads non-trading days with null quote entries; those rows are
/// dropped here so downstream only sees complete bars. Dividend and split
/// events are folded into their matching bar by date.
fn parse_chart(data: &Value, symbol: &str) -> Result<Vec<PriceBar>> {
    let chart = data
        .get("chart")
        .ok_or_else(|| anyhow!("Malformed chart response for {}", symbol))?;

    if let Some(error) = chart.get("error") {
        if !error.is_null() {
            return Err(anyhow!("Provider error for {}: {}", symbol, error));
        }
    }

    let result = match chart
        .get("result")
        .and_then(|r| r.as_array())
        .and_then(|r| r.first())
    {
        Some(result) => result,
        None => return Ok(Vec::new()),
    };

    let timestamps: Vec<i64> = result
        .get("timestamp")
        .and_then(|t| t.as_array())
        .map(|t| t.iter().filter_map(|v| v.as_i64()).collect())
        .unwrap_or_default();

    if timestamps.is_empty() {
        return Ok(Vec::new());
    }

    let quote = result
        .get("indicators")
        .and_then(|i| i.get("quote"))
        .and_then(|q| q.as_array())
        .and_then(|q| q.first())
        .ok_or_else(|| anyhow!("Missing quote data for {}", symbol))?;

    let dividends = event_amounts(result, "dividends", "amount");
    let splits = split_ratios(result);

    let series = |field: &str| -> Vec<Option<f64>> {
        quote
            .get(field)
            .and_then(|v| v.as_array())
            .map(|v| v.iter().map(|x| x.as_f64()).collect())
            .unwrap_or_default()
    };

    let opens = series("open");
    let highs = series("high");
    let lows = series("low");
    let closes = series("close");
    let volumes: Vec<Option<i64>> = quote
        .get("volume")
        .and_then(|v| v.as_array())
        .map(|v| v.iter().map(|x| x.as_i64()).collect())
        .unwrap_or_default();

    let mut bars = Vec::new();

    for (i, &ts) in timestamps.iter().enumerate() {
        let date = match chrono::DateTime::from_timestamp(ts, 0) {
            Some(dt) => dt.date_naive(),
            None => continue,
        };

        let ohlc = (
            opens.get(i).copied().flatten(),
            highs.get(i).copied().flatten(),
            lows.get(i).copied().flatten(),
            closes.get(i).copied().flatten(),
        );

        // Null placeholder row for a holiday or halted session
        let (Some(open), Some(high), Some(low), Some(close)) = ohlc else {
            continue;
        };

        bars.push(PriceBar {
            date,
            open,
            high,
            low,
            close,
            volume: volumes.get(i).copied().flatten().unwrap_or(0),
            dividends: dividends.get(&date).copied().unwrap_or(0.0),
            stock_splits: splits.get(&date).copied().unwrap_or(0.0),
        });
    }

    Ok(bars)
}

/// Collect `events.<kind>` amounts keyed by bar date.
fn event_amounts(result: &Value, kind: &str, field: &str) -> HashMap<NaiveDate, f64> {
    let mut amounts = HashMap::new();

    let events = match result
        .get("events")
        .and_then(|e| e.get(kind))
        .and_then(|e| e.as_object())
    {
        Some(events) => events,
        None => return amounts,
    };

    for event in events.values() {
        let date = event
            .get("date")
            .and_then(|d| d.as_i64())
            .and_then(|ts| chrono::DateTime::from_timestamp(ts, 0))
            .map(|dt| dt.date_naive());

        if let (Some(date), Some(amount)) = (date, event.get(field).and_then(numeric_value)) {
            amounts.insert(date, amount);
        }
    }

    amounts
}

fn split_ratios(result: &Value) -> HashMap<NaiveDate, f64> {
    let mut ratios = HashMap::new();

    let events = match result
        .get("events")
        .and_then(|e| e.get("splits"))
        .and_then(|e| e.as_object())
    {
        Some(events) => events,
        None => return ratios,
    };

    for event in events.values() {
        let date = event
            .get("date")
            .and_then(|d| d.as_i64())
            .and_then(|ts| chrono::DateTime::from_timestamp(ts, 0))
            .map(|dt| dt.date_naive());

        let numerator = event.get("numerator").and_then(numeric_value);
        let denominator = event.get("denominator").and_then(numeric_value);

        if let (Some(date), Some(num), Some(den)) = (date, numerator, denominator) {
            if den != 0.0 {
                ratios.insert(date, num / den);
            }
        }
    }

    ratios
}
