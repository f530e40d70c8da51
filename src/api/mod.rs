use std::collections::HashMap;
use std::time::Duration;

use anyhow::Result;
use chrono::NaiveDate;

use crate::models::{GrowthTrendRow, InsiderSummary, PriceBar, RecommendationTrendRow};

pub mod listing;
pub mod yahoo_client;

pub use listing::ListingClient;
pub use yahoo_client::YahooClient;

/// Simple fixed-delay pacing between API requests
pub struct ApiRateLimiter {
    delay_ms: u64,
}

impl ApiRateLimiter {
    pub fn new(requests_per_minute: u32) -> Self {
        let delay_ms = if requests_per_minute > 0 {
            60_000 / requests_per_minute as u64
        } else {
            1000 // Default 1 second delay
        };

        Self { delay_ms }
    }

    pub async fn wait(&self) {
        tokio::time::sleep(Duration::from_millis(self.delay_ms)).await;
    }
}

/// Upstream market-data capabilities the ingestion core depends on.
///
/// Every method returns `Err` on transient provider failure; the retry
/// primitive is responsible for absorbing those. Price history takes a
/// half-open `[from_date, to_date)` window.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait MarketDataProvider {
    async fn fetch_recommendations(&self, symbol: &str) -> Result<Vec<RecommendationTrendRow>>;

    /// Price-target summary keyed `current`/`low`/`high`/`mean`/`median`.
    /// A key may be present with no value; an absent key means the provider
    /// did not report that field at all.
    async fn fetch_price_target(&self, symbol: &str) -> Result<HashMap<String, Option<f64>>>;

    async fn fetch_price_history(
        &self,
        symbol: &str,
        from_date: NaiveDate,
        to_date: NaiveDate,
    ) -> Result<Vec<PriceBar>>;

    async fn fetch_insider_summary(&self, symbol: &str) -> Result<Option<InsiderSummary>>;

    async fn fetch_growth_estimates(&self, symbol: &str) -> Result<Vec<GrowthTrendRow>>;
}
