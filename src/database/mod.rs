use std::collections::HashMap;

use anyhow::Result;
use chrono::NaiveDate;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use tracing::info;

use crate::models::{
    GrowthEstimate, InsiderTransaction, PriceTarget, Recommendation, StockPrice,
};

/// SQLX-based database manager for the raw observation tables
#[derive(Clone)]
pub struct DatabaseManager {
    pool: SqlitePool,
}

impl DatabaseManager {
    /// Open (or create) the database and ensure the schema exists
    pub async fn new(database_path: &str) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .acquire_timeout(std::time::Duration::from_secs(30))
            .connect_with(
                SqliteConnectOptions::new()
                    .filename(database_path)
                    .create_if_missing(true),
            )
            .await?;

        // WAL keeps readers unblocked while a batch commits
        sqlx::query("PRAGMA journal_mode = WAL").execute(&pool).await?;
        sqlx::query("PRAGMA synchronous = NORMAL").execute(&pool).await?;

        // Create tables directly instead of using migrations
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS recommendation (
                id TEXT PRIMARY KEY,
                symbol TEXT NOT NULL,
                date DATE NOT NULL,
                strong_buy INTEGER NOT NULL,
                buy INTEGER NOT NULL,
                hold INTEGER NOT NULL,
                sell INTEGER NOT NULL,
                strong_sell INTEGER NOT NULL
            )
            "#,
        )
        .execute(&pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS price_target (
                id TEXT PRIMARY KEY,
                symbol TEXT NOT NULL,
                date DATE NOT NULL,
                current REAL,
                low REAL,
                high REAL,
                mean REAL,
                median REAL
            )
            "#,
        )
        .execute(&pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS stock_price (
                id TEXT PRIMARY KEY,
                symbol TEXT NOT NULL,
                date DATE NOT NULL,
                open_price REAL NOT NULL,
                high_price REAL NOT NULL,
                low_price REAL NOT NULL,
                close_price REAL NOT NULL,
                volume INTEGER NOT NULL,
                dividends REAL NOT NULL,
                stock_splits REAL NOT NULL,
                inserted_at DATETIME NOT NULL
            )
            "#,
        )
        .execute(&pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS insider_transaction (
                id TEXT PRIMARY KEY,
                symbol TEXT NOT NULL,
                date DATE NOT NULL,
                purchases INTEGER NOT NULL,
                sales INTEGER NOT NULL,
                insider_shares_held INTEGER NOT NULL
            )
            "#,
        )
        .execute(&pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS growth_estimate (
                id TEXT PRIMARY KEY,
                symbol TEXT NOT NULL,
                date DATE NOT NULL,
                current_quarter REAL NOT NULL,
                next_quarter REAL NOT NULL,
                current_year REAL NOT NULL,
                next_year REAL NOT NULL
            )
            "#,
        )
        .execute(&pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_stock_price_symbol_date ON stock_price(symbol, date)",
        )
        .execute(&pool)
        .await?;

        info!("Database initialized at {}", database_path);
        Ok(Self { pool })
    }

    /// Upsert a batch of recommendation records in one transaction
    pub async fn insert_recommendations(&self, records: &[Recommendation]) -> Result<usize> {
        let mut tx = self.pool.begin().await?;

        for record in records {
            sqlx::query(
                r#"
                INSERT INTO recommendation (id, symbol, date, strong_buy, buy, hold, sell, strong_sell)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT(id) DO UPDATE SET
                    strong_buy = excluded.strong_buy,
                    buy = excluded.buy,
                    hold = excluded.hold,
                    sell = excluded.sell,
                    strong_sell = excluded.strong_sell
                "#,
            )
            .bind(&record.id)
            .bind(&record.symbol)
            .bind(record.date)
            .bind(record.strong_buy)
            .bind(record.buy)
            .bind(record.hold)
            .bind(record.sell)
            .bind(record.strong_sell)
            .execute(&mut tx)
            .await?;
        }

        tx.commit().await?;
        Ok(records.len())
    }

    /// Upsert a batch of price-target records in one transaction
    pub async fn insert_price_targets(&self, records: &[PriceTarget]) -> Result<usize> {
        let mut tx = self.pool.begin().await?;

        for record in records {
            sqlx::query(
                r#"
                INSERT INTO price_target (id, symbol, date, current, low, high, mean, median)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT(id) DO UPDATE SET
                    current = excluded.current,
                    low = excluded.low,
                    high = excluded.high,
                    mean = excluded.mean,
                    median = excluded.median
                "#,
            )
            .bind(&record.id)
            .bind(&record.symbol)
            .bind(record.date)
            .bind(record.current)
            .bind(record.low)
            .bind(record.high)
            .bind(record.mean)
            .bind(record.median)
            .execute(&mut tx)
            .await?;
        }

        tx.commit().await?;
        Ok(records.len())
    }

    /// Upsert a batch of daily price records in one transaction
    pub async fn insert_stock_prices(&self, records: &[StockPrice]) -> Result<usize> {
        let mut tx = self.pool.begin().await?;

        for record in records {
            sqlx::query(
                r#"
                INSERT INTO stock_price (id, symbol, date, open_price, high_price, low_price,
                                         close_price, volume, dividends, stock_splits, inserted_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT(id) DO UPDATE SET
                    open_price = excluded.open_price,
                    high_price = excluded.high_price,
                    low_price = excluded.low_price,
                    close_price = excluded.close_price,
                    volume = excluded.volume,
                    dividends = excluded.dividends,
                    stock_splits = excluded.stock_splits,
                    inserted_at = excluded.inserted_at
                "#,
            )
            .bind(&record.id)
            .bind(&record.symbol)
            .bind(record.date)
            .bind(record.open_price)
            .bind(record.high_price)
            .bind(record.low_price)
            .bind(record.close_price)
            .bind(record.volume)
            .bind(record.dividends)
            .bind(record.stock_splits)
            .bind(record.inserted_at)
            .execute(&mut tx)
            .await?;
        }

        tx.commit().await?;
        Ok(records.len())
    }

    /// Upsert a batch of insider-transaction records in one transaction
    pub async fn insert_insider_transactions(
        &self,
        records: &[InsiderTransaction],
    ) -> Result<usize> {
        let mut tx = self.pool.begin().await?;

        for record in records {
            sqlx::query(
                r#"
                INSERT INTO insider_transaction (id, symbol, date, purchases, sales, insider_shares_held)
                VALUES (?, ?, ?, ?, ?, ?)
                ON CONFLICT(id) DO UPDATE SET
                    purchases = excluded.purchases,
                    sales = excluded.sales,
                    insider_shares_held = excluded.insider_shares_held
                "#,
            )
            .bind(&record.id)
            .bind(&record.symbol)
            .bind(record.date)
            .bind(record.purchases)
            .bind(record.sales)
            .bind(record.insider_shares_held)
            .execute(&mut tx)
            .await?;
        }

        tx.commit().await?;
        Ok(records.len())
    }

    /// Upsert a batch of growth-estimate records in one transaction
    pub async fn insert_growth_estimates(&self, records: &[GrowthEstimate]) -> Result<usize> {
        let mut tx = self.pool.begin().await?;

        for record in records {
            sqlx::query(
                r#"
                INSERT INTO growth_estimate (id, symbol, date, current_quarter, next_quarter,
                                             current_year, next_year)
                VALUES (?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT(id) DO UPDATE SET
                    current_quarter = excluded.current_quarter,
                    next_quarter = excluded.next_quarter,
                    current_year = excluded.current_year,
                    next_year = excluded.next_year
                "#,
            )
            .bind(&record.id)
            .bind(&record.symbol)
            .bind(record.date)
            .bind(record.current_quarter)
            .bind(record.next_quarter)
            .bind(record.current_year)
            .bind(record.next_year)
            .execute(&mut tx)
            .await?;
        }

        tx.commit().await?;
        Ok(records.len())
    }

    /// Read the watermark map: the most recent stored date per symbol in the
    /// stock_price table.
    pub async fn latest_price_dates(&self) -> Result<HashMap<String, NaiveDate>> {
        let rows = sqlx::query(
            r#"
            SELECT symbol, MAX(date) AS max_date
            FROM stock_price
            GROUP BY symbol
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut max_dates = HashMap::new();
        for row in rows {
            let symbol: String = row.get("symbol");
            if let Some(max_date) = row.get::<Option<NaiveDate>, _>("max_date") {
                max_dates.insert(symbol, max_date);
            }
        }

        Ok(max_dates)
    }

    /// Row counts per observation table
    pub async fn record_counts(&self) -> Result<HashMap<String, i64>> {
        let tables = [
            "recommendation",
            "price_target",
            "stock_price",
            "insider_transaction",
            "growth_estimate",
        ];

        let mut counts = HashMap::new();
        for table in tables {
            let count: i64 = sqlx::query(&format!("SELECT COUNT(*) AS n FROM {}", table))
                .fetch_one(&self.pool)
                .await?
                .get("n");
            counts.insert(table.to_string(), count);
        }

        Ok(counts)
    }
}
