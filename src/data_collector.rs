use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use tracing::{debug, info};

use crate::api::MarketDataProvider;
use crate::extract::{
    extract_growth_estimate, extract_insider_transaction, extract_price_history,
    extract_price_target, extract_recommendation,
};
use crate::incremental::fetch_window;
use crate::models::{
    GrowthEstimate, InsiderTransaction, PriceTarget, Recommendation, StockPrice,
};
use crate::retry::RetryPolicy;

/// Batch aggregator: drives extraction across an ordered list of symbols and
/// collects successes.
///
/// One symbol is processed at a time; a failed symbol is skipped (the
/// extractor has already logged why) and never aborts the batch. Retries are
/// confined to the per-call retry primitive, never repeated at this level.
pub struct DataCollector<P> {
    provider: Arc<P>,
    policy: RetryPolicy,
}

impl<P: MarketDataProvider> DataCollector<P> {
    /// Create a new data collector
    pub fn new(provider: Arc<P>, policy: RetryPolicy) -> Self {
        Self { provider, policy }
    }

    /// Collect one recommendation snapshot per symbol that has usable data.
    pub async fn collect_recommendations(
        &self,
        symbols: &[String],
        as_of: NaiveDate,
    ) -> Vec<Recommendation> {
        let mut records = Vec::new();
        let mut skipped = 0;

        for symbol in symbols {
            match extract_recommendation(self.provider.as_ref(), &self.policy, symbol, as_of).await
            {
                Ok(record) => records.push(record),
                Err(_) => skipped += 1,
            }
        }

        info!(
            "✅ Recommendations: {} collected, {} skipped of {} symbols",
            records.len(),
            skipped,
            symbols.len()
        );
        records
    }

    /// Collect one price-target snapshot per symbol that has usable data.
    pub async fn collect_price_targets(
        &self,
        symbols: &[String],
        as_of: NaiveDate,
    ) -> Vec<PriceTarget> {
        let mut records = Vec::new();
        let mut skipped = 0;

        for symbol in symbols {
            match extract_price_target(self.provider.as_ref(), &self.policy, symbol, as_of).await {
                Ok(record) => records.push(record),
                Err(_) => skipped += 1,
            }
        }

        info!(
            "✅ Price targets: {} collected, {} skipped of {} symbols",
            records.len(),
            skipped,
            symbols.len()
        );
        records
    }

    /// Collect one insider-activity snapshot per symbol that has usable data.
    pub async fn collect_insider_transactions(
        &self,
        symbols: &[String],
        as_of: NaiveDate,
    ) -> Vec<InsiderTransaction> {
        let mut records = Vec::new();
        let mut skipped = 0;

        for symbol in symbols {
            match extract_insider_transaction(self.provider.as_ref(), &self.policy, symbol, as_of)
                .await
            {
                Ok(record) => records.push(record),
                Err(_) => skipped += 1,
            }
        }

        info!(
            "✅ Insider transactions: {} collected, {} skipped of {} symbols",
            records.len(),
            skipped,
            symbols.len()
        );
        records
    }

    /// Collect one growth-estimate snapshot per symbol that has usable data.
    pub async fn collect_growth_estimates(
        &self,
        symbols: &[String],
        as_of: NaiveDate,
    ) -> Vec<GrowthEstimate> {
        let mut records = Vec::new();
        let mut skipped = 0;

        for symbol in symbols {
            match extract_growth_estimate(self.provider.as_ref(), &self.policy, symbol, as_of).await
            {
                Ok(record) => records.push(record),
                Err(_) => skipped += 1,
            }
        }

        info!(
            "✅ Growth estimates: {} collected, {} skipped of {} symbols",
            records.len(),
            skipped,
            symbols.len()
        );
        records
    }

    /// Collect daily price records for every symbol, fetching only the window
    /// each symbol is missing.
    ///
    /// `watermarks` maps a symbol to the most recent date already persisted;
    /// symbols absent from the map are fetched from the deep-history default.
    /// A symbol whose window is already empty is not requested at all, so
    /// re-runs are idempotent. Every record in the returned batch carries the
    /// same `inserted_at`, captured once at the start of the run.
    pub async fn collect_price_history(
        &self,
        symbols: &[String],
        watermarks: &HashMap<String, NaiveDate>,
        today: NaiveDate,
        inserted_at: DateTime<Utc>,
    ) -> Vec<StockPrice> {
        let mut records = Vec::new();
        let mut skipped = 0;
        let mut up_to_date = 0;

        for symbol in symbols {
            let window = fetch_window(watermarks.get(symbol).copied(), today);

            if window.is_empty() {
                debug!("{}: already up to date, nothing to fetch", symbol);
                up_to_date += 1;
                continue;
            }

            debug!(
                "{}: fetching {} to {}",
                symbol, window.start, window.end
            );

            match extract_price_history(
                self.provider.as_ref(),
                &self.policy,
                symbol,
                window,
                inserted_at,
            )
            .await
            {
                Ok(rows) => records.extend(rows),
                Err(_) => skipped += 1,
            }
        }

        info!(
            "✅ Price history: {} records from {} symbols ({} up to date, {} skipped)",
            records.len(),
            symbols.len(),
            up_to_date,
            skipped
        );
        records
    }
}
