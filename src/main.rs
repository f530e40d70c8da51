use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use stock_ingest::api::{ListingClient, YahooClient};
use stock_ingest::data_collector::DataCollector;
use stock_ingest::database::DatabaseManager;
use stock_ingest::models::Config;
use stock_ingest::retry::RetryPolicy;

/// Scheduled ingestion of stock market reference data into the raw store
#[derive(Parser)]
#[command(name = "stock-ingest")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Ingest analyst recommendation snapshots
    Recommendations,
    /// Ingest analyst price-target snapshots
    PriceTargets,
    /// Ingest daily price history incrementally
    Prices,
    /// Ingest insider-transaction summaries
    Insiders,
    /// Ingest earnings growth estimates
    Growth,
    /// Run every ingestion job in sequence
    All,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_env_filter("stock_ingest=info")
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .expect("setting default subscriber failed");

    let cli = Cli::parse();

    info!("🚀 Starting stock data ingestion");

    let config = Config::from_env()?;
    let database = DatabaseManager::new(&config.database_path).await?;

    let provider = Arc::new(YahooClient::new(&config)?);
    let policy = RetryPolicy::new(
        config.retry_max_attempts,
        Duration::from_secs(config.retry_delay_secs),
    );
    let collector = DataCollector::new(provider, policy);

    let symbols = ListingClient::new(&config)?.list_symbols().await?;
    info!(
        "📊 Processing {} symbols in chunks of {}",
        symbols.len(),
        config.batch_size
    );

    // One observation date and one insertion timestamp for the whole run
    let today = Utc::now().date_naive();
    let inserted_at = Utc::now();

    match cli.command {
        Command::Recommendations => {
            ingest_recommendations(&collector, &database, &symbols, config.batch_size, today)
                .await?;
        }
        Command::PriceTargets => {
            ingest_price_targets(&collector, &database, &symbols, config.batch_size, today).await?;
        }
        Command::Prices => {
            ingest_prices(&collector, &database, &symbols, config.batch_size, today, inserted_at)
                .await?;
        }
        Command::Insiders => {
            ingest_insiders(&collector, &database, &symbols, config.batch_size, today).await?;
        }
        Command::Growth => {
            ingest_growth(&collector, &database, &symbols, config.batch_size, today).await?;
        }
        Command::All => {
            ingest_recommendations(&collector, &database, &symbols, config.batch_size, today)
                .await?;
            ingest_price_targets(&collector, &database, &symbols, config.batch_size, today).await?;
            ingest_insiders(&collector, &database, &symbols, config.batch_size, today).await?;
            ingest_growth(&collector, &database, &symbols, config.batch_size, today).await?;
            ingest_prices(&collector, &database, &symbols, config.batch_size, today, inserted_at)
                .await?;
        }
    }

    let counts = database.record_counts().await?;
    info!(
        "📈 Store totals: {} recommendations, {} price targets, {} prices, {} insider, {} growth",
        counts.get("recommendation").unwrap_or(&0),
        counts.get("price_target").unwrap_or(&0),
        counts.get("stock_price").unwrap_or(&0),
        counts.get("insider_transaction").unwrap_or(&0),
        counts.get("growth_estimate").unwrap_or(&0),
    );

    Ok(())
}

async fn ingest_recommendations(
    collector: &DataCollector<YahooClient>,
    database: &DatabaseManager,
    symbols: &[String],
    batch_size: usize,
    today: NaiveDate,
) -> Result<()> {
    info!("📥 Ingesting recommendations");

    let mut stored = 0;
    for chunk in symbols.chunks(batch_size) {
        let records = collector.collect_recommendations(chunk, today).await;
        stored += database.insert_recommendations(&records).await?;
    }

    info!("✅ Stored {} recommendation records", stored);
    Ok(())
}

async fn ingest_price_targets(
    collector: &DataCollector<YahooClient>,
    database: &DatabaseManager,
    symbols: &[String],
    batch_size: usize,
    today: NaiveDate,
) -> Result<()> {
    info!("📥 Ingesting price targets");

    let mut stored = 0;
    for chunk in symbols.chunks(batch_size) {
        let records = collector.collect_price_targets(chunk, today).await;
        stored += database.insert_price_targets(&records).await?;
    }

    info!("✅ Stored {} price-target records", stored);
    Ok(())
}

async fn ingest_prices(
    collector: &DataCollector<YahooClient>,
    database: &DatabaseManager,
    symbols: &[String],
    batch_size: usize,
    today: NaiveDate,
    inserted_at: chrono::DateTime<Utc>,
) -> Result<()> {
    info!("📥 Ingesting price history");

    // Watermarks are read once per run and only consulted afterwards
    let watermarks = database.latest_price_dates().await?;
    info!("Loaded watermarks for {} symbols", watermarks.len());

    let mut stored = 0;
    for chunk in symbols.chunks(batch_size) {
        let records = collector
            .collect_price_history(chunk, &watermarks, today, inserted_at)
            .await;
        stored += database.insert_stock_prices(&records).await?;
    }

    info!("✅ Stored {} daily price records", stored);
    Ok(())
}

async fn ingest_insiders(
    collector: &DataCollector<YahooClient>,
    database: &DatabaseManager,
    symbols: &[String],
    batch_size: usize,
    today: NaiveDate,
) -> Result<()> {
    info!("📥 Ingesting insider transactions");

    let mut stored = 0;
    for chunk in symbols.chunks(batch_size) {
        let records = collector.collect_insider_transactions(chunk, today).await;
        stored += database.insert_insider_transactions(&records).await?;
    }

    info!("✅ Stored {} insider-transaction records", stored);
    Ok(())
}

async fn ingest_growth(
    collector: &DataCollector<YahooClient>,
    database: &DatabaseManager,
    symbols: &[String],
    batch_size: usize,
    today: NaiveDate,
) -> Result<()> {
    info!("📥 Ingesting growth estimates");

    let mut stored = 0;
    for chunk in symbols.chunks(batch_size) {
        let records = collector.collect_growth_estimates(chunk, today).await;
        stored += database.insert_growth_estimates(&records).await?;
    }

    info!("✅ Stored {} growth-estimate records", stored);
    Ok(())
}
