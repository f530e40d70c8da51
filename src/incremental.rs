//! Incremental fetch-window computation for price-history ingestion.
//!
//! Each symbol's window starts the day after its watermark (the most recent
//! date already persisted) so re-runs never re-request stored days. Symbols
//! never seen before fall back to a fixed deep-history start instead of an
//! unbounded query.

use chrono::{Duration, Months, NaiveDate};

/// How far back a first-ever fetch reaches, in years.
pub const DEFAULT_HISTORY_YEARS: u32 = 99;

/// Half-open date window `[start, end)` to request from the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl FetchWindow {
    /// An empty window means the symbol is already up to date and the
    /// provider should not be called at all.
    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }
}

/// Compute the fetch window for one symbol.
///
/// The end bound is always `today`, exclusive, matching the provider's own
/// range semantics.
pub fn fetch_window(watermark: Option<NaiveDate>, today: NaiveDate) -> FetchWindow {
    let start = match watermark {
        Some(last_stored) => last_stored + Duration::days(1),
        None => default_history_start(today),
    };

    FetchWindow { start, end: today }
}

fn default_history_start(today: NaiveDate) -> NaiveDate {
    today
        .checked_sub_months(Months::new(DEFAULT_HISTORY_YEARS * 12))
        .unwrap_or(NaiveDate::MIN)
}
