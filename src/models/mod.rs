use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Build the composite identity shared by every observation record.
///
/// The persistence layer enforces uniqueness on this value per table.
pub fn observation_id(symbol: &str, date: NaiveDate) -> String {
    format!("{}_{}", symbol, date.format("%Y-%m-%d"))
}

/// Analyst recommendation snapshot for one symbol on one day
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recommendation {
    pub id: String,
    pub symbol: String,
    pub date: NaiveDate,
    pub strong_buy: i64,
    pub buy: i64,
    pub hold: i64,
    pub sell: i64,
    pub strong_sell: i64,
}

/// Analyst price-target snapshot for one symbol on one day
///
/// Fields are nullable: the provider may report a key with no value, in which
/// case the stored column is null rather than coerced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceTarget {
    pub id: String,
    pub symbol: String,
    pub date: NaiveDate,
    pub current: Option<f64>,
    pub low: Option<f64>,
    pub high: Option<f64>,
    pub mean: Option<f64>,
    pub median: Option<f64>,
}

/// One daily price bar persisted for a symbol
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockPrice {
    pub id: String,
    pub symbol: String,
    pub date: NaiveDate,
    pub open_price: f64,
    pub high_price: f64,
    pub low_price: f64,
    pub close_price: f64,
    pub volume: i64,
    pub dividends: f64,
    pub stock_splits: f64,
    pub inserted_at: DateTime<Utc>,
}

/// Insider purchase/sale activity summary for one symbol on one day
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InsiderTransaction {
    pub id: String,
    pub symbol: String,
    pub date: NaiveDate,
    pub purchases: i64,
    pub sales: i64,
    pub insider_shares_held: i64,
}

/// Earnings growth estimates for one symbol on one day
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GrowthEstimate {
    pub id: String,
    pub symbol: String,
    pub date: NaiveDate,
    pub current_quarter: f64,
    pub next_quarter: f64,
    pub current_year: f64,
    pub next_year: f64,
}

/// One row of the provider's recommendation trend response
///
/// Counts are optional at this boundary; the extractor decides whether a row
/// is complete enough to persist.
#[derive(Debug, Clone, Deserialize)]
pub struct RecommendationTrendRow {
    #[serde(default)]
    pub period: String,
    #[serde(rename = "strongBuy")]
    pub strong_buy: Option<i64>,
    pub buy: Option<i64>,
    pub hold: Option<i64>,
    pub sell: Option<i64>,
    #[serde(rename = "strongSell")]
    pub strong_sell: Option<i64>,
}

/// One daily bar as returned by the price-history endpoint
#[derive(Debug, Clone, PartialEq)]
pub struct PriceBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: i64,
    pub dividends: f64,
    pub stock_splits: f64,
}

/// Insider activity counts as returned by the provider
#[derive(Debug, Clone, Default)]
pub struct InsiderSummary {
    pub purchases: Option<i64>,
    pub sales: Option<i64>,
    pub insider_shares_held: Option<i64>,
}

/// One row of the provider's earnings trend response
#[derive(Debug, Clone)]
pub struct GrowthTrendRow {
    pub period: String,
    pub growth: Option<f64>,
}

/// Configuration for the application
#[derive(Debug, Clone)]
pub struct Config {
    pub alphavantage_api_key: String,
    pub database_path: String,
    pub rate_limit_per_minute: u32,
    pub batch_size: usize,
    pub retry_max_attempts: u32,
    pub retry_delay_secs: u64,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok(); // Load .env file if it exists

        Ok(Config {
            alphavantage_api_key: std::env::var("ALPHAVANTAGE_API_KEY")
                .map_err(|_| anyhow::anyhow!("ALPHAVANTAGE_API_KEY environment variable required"))?,
            database_path: std::env::var("DATABASE_PATH")
                .unwrap_or_else(|_| "stock_data.db".to_string()),
            rate_limit_per_minute: std::env::var("RATE_LIMIT_PER_MINUTE")
                .unwrap_or_else(|_| "60".to_string())
                .parse()
                .unwrap_or(60),
            batch_size: std::env::var("BATCH_SIZE")
                .unwrap_or_else(|_| "100".to_string())
                .parse()
                .unwrap_or(100),
            retry_max_attempts: std::env::var("RETRY_MAX_ATTEMPTS")
                .unwrap_or_else(|_| "3".to_string())
                .parse()
                .unwrap_or(3),
            retry_delay_secs: std::env::var("RETRY_DELAY_SECS")
                .unwrap_or_else(|_| "1".to_string())
                .parse()
                .unwrap_or(1),
        })
    }
}
