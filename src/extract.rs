//! Per-symbol extractors: compose the retry primitive with payload
//! validation, producing a domain record or a tagged skip.
//!
//! Extractors never raise past their boundary. The aggregator only needs to
//! know whether a record was produced; the reason is logged here, once,
//! naming the symbol.

use chrono::{DateTime, NaiveDate, Utc};
use thiserror::Error;
use tracing::warn;

use crate::api::MarketDataProvider;
use crate::incremental::FetchWindow;
use crate::models::{
    observation_id, GrowthEstimate, InsiderTransaction, PriceTarget, Recommendation, StockPrice,
};
use crate::retry::{fetch_with_retry, RetryPolicy};

/// The five keys a usable price-target payload must carry.
pub const PRICE_TARGET_KEYS: [&str; 5] = ["current", "low", "high", "mean", "median"];

/// The estimate periods a usable growth payload must carry, in output order.
const GROWTH_PERIODS: [&str; 4] = ["0q", "+1q", "0y", "+1y"];

/// Why a symbol produced no record this run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SkipReason {
    #[error("never retrieved")]
    NeverRetrieved,
    #[error("incomplete: missing {0}")]
    Incomplete(&'static str),
    #[error("no rows returned")]
    Empty,
}

fn skip(kind: &str, symbol: &str, reason: SkipReason) -> SkipReason {
    warn!("Skipping {} for {}: {}", kind, symbol, reason);
    reason
}

/// Fetch the recommendation trend for one symbol and map its most recent row
/// into a record.
pub async fn extract_recommendation<P: MarketDataProvider>(
    provider: &P,
    policy: &RetryPolicy,
    symbol: &str,
    as_of: NaiveDate,
) -> Result<Recommendation, SkipReason> {
    let rows = match fetch_with_retry(policy, symbol, || provider.fetch_recommendations(symbol))
        .await
    {
        Some(rows) => rows,
        None => return Err(skip("recommendation", symbol, SkipReason::NeverRetrieved)),
    };

    // First row is the current month; older rows are historical context.
    let row = match rows.first() {
        Some(row) => row,
        None => return Err(skip("recommendation", symbol, SkipReason::Empty)),
    };

    let require = |field: &'static str, value: Option<i64>| {
        value.ok_or(SkipReason::Incomplete(field))
    };

    let build = || -> Result<Recommendation, SkipReason> {
        Ok(Recommendation {
            id: observation_id(symbol, as_of),
            symbol: symbol.to_string(),
            date: as_of,
            strong_buy: require("strongBuy", row.strong_buy)?,
            buy: require("buy", row.buy)?,
            hold: require("hold", row.hold)?,
            sell: require("sell", row.sell)?,
            strong_sell: require("strongSell", row.strong_sell)?,
        })
    };

    build().map_err(|reason| skip("recommendation", symbol, reason))
}

/// Fetch the price-target summary for one symbol.
///
/// All five keys must be present; a present key with no value becomes a null
/// field on the record rather than a skip.
pub async fn extract_price_target<P: MarketDataProvider>(
    provider: &P,
    policy: &RetryPolicy,
    symbol: &str,
    as_of: NaiveDate,
) -> Result<PriceTarget, SkipReason> {
    let fields = match fetch_with_retry(policy, symbol, || provider.fetch_price_target(symbol))
        .await
    {
        Some(fields) => fields,
        None => return Err(skip("price target", symbol, SkipReason::NeverRetrieved)),
    };

    for key in PRICE_TARGET_KEYS {
        if !fields.contains_key(key) {
            return Err(skip("price target", symbol, SkipReason::Incomplete(key)));
        }
    }

    let value = |key: &str| fields.get(key).copied().flatten();

    Ok(PriceTarget {
        id: observation_id(symbol, as_of),
        symbol: symbol.to_string(),
        date: as_of,
        current: value("current"),
        low: value("low"),
        high: value("high"),
        mean: value("mean"),
        median: value("median"),
    })
}

/// Fetch the daily bars for one symbol over an explicit `[start, end)` window
/// and map every bar into a record.
///
/// An empty response is a logged skip either way; the provider does not let
/// us tell a delisted symbol from a window with no trading days.
pub async fn extract_price_history<P: MarketDataProvider>(
    provider: &P,
    policy: &RetryPolicy,
    symbol: &str,
    window: FetchWindow,
    inserted_at: DateTime<Utc>,
) -> Result<Vec<StockPrice>, SkipReason> {
    let bars = match fetch_with_retry(policy, symbol, || {
        provider.fetch_price_history(symbol, window.start, window.end)
    })
    .await
    {
        Some(bars) => bars,
        None => return Err(skip("price history", symbol, SkipReason::NeverRetrieved)),
    };

    if bars.is_empty() {
        return Err(skip("price history", symbol, SkipReason::Empty));
    }

    Ok(bars
        .into_iter()
        .map(|bar| StockPrice {
            id: observation_id(symbol, bar.date),
            symbol: symbol.to_string(),
            date: bar.date,
            open_price: bar.open,
            high_price: bar.high,
            low_price: bar.low,
            close_price: bar.close,
            volume: bar.volume,
            dividends: bar.dividends,
            stock_splits: bar.stock_splits,
            inserted_at,
        })
        .collect())
}

/// Fetch the insider activity summary for one symbol.
pub async fn extract_insider_transaction<P: MarketDataProvider>(
    provider: &P,
    policy: &RetryPolicy,
    symbol: &str,
    as_of: NaiveDate,
) -> Result<InsiderTransaction, SkipReason> {
    let summary = match fetch_with_retry(policy, symbol, || provider.fetch_insider_summary(symbol))
        .await
    {
        Some(summary) => summary,
        None => {
            return Err(skip(
                "insider transactions",
                symbol,
                SkipReason::NeverRetrieved,
            ))
        }
    };

    let summary = match summary {
        Some(summary) => summary,
        None => {
            return Err(skip(
                "insider transactions",
                symbol,
                SkipReason::Incomplete("netSharePurchaseActivity"),
            ))
        }
    };

    let require = |field: &'static str, value: Option<i64>| {
        value.ok_or(SkipReason::Incomplete(field))
    };

    let build = || -> Result<InsiderTransaction, SkipReason> {
        Ok(InsiderTransaction {
            id: observation_id(symbol, as_of),
            symbol: symbol.to_string(),
            date: as_of,
            purchases: require("purchases", summary.purchases)?,
            sales: require("sales", summary.sales)?,
            insider_shares_held: require("insiderSharesHeld", summary.insider_shares_held)?,
        })
    };

    build().map_err(|reason| skip("insider transactions", symbol, reason))
}

/// Fetch the earnings growth estimates for one symbol.
pub async fn extract_growth_estimate<P: MarketDataProvider>(
    provider: &P,
    policy: &RetryPolicy,
    symbol: &str,
    as_of: NaiveDate,
) -> Result<GrowthEstimate, SkipReason> {
    let rows = match fetch_with_retry(policy, symbol, || provider.fetch_growth_estimates(symbol))
        .await
    {
        Some(rows) => rows,
        None => return Err(skip("growth estimates", symbol, SkipReason::NeverRetrieved)),
    };

    if rows.is_empty() {
        return Err(skip("growth estimates", symbol, SkipReason::Empty));
    }

    let growth_for = |period: &'static str| -> Result<f64, SkipReason> {
        rows.iter()
            .find(|row| row.period == period)
            .and_then(|row| row.growth)
            .ok_or(SkipReason::Incomplete(period))
    };

    let build = || -> Result<GrowthEstimate, SkipReason> {
        Ok(GrowthEstimate {
            id: observation_id(symbol, as_of),
            symbol: symbol.to_string(),
            date: as_of,
            current_quarter: growth_for(GROWTH_PERIODS[0])?,
            next_quarter: growth_for(GROWTH_PERIODS[1])?,
            current_year: growth_for(GROWTH_PERIODS[2])?,
            next_year: growth_for(GROWTH_PERIODS[3])?,
        })
    };

    build().map_err(|reason| skip("growth estimates", symbol, reason))
}
