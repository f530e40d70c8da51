use anyhow::{anyhow, Result};
use reqwest::Client;
use tracing::info;
use url::Url;

use crate::models::Config;

/// AlphaVantage query endpoint serving the listing-status CSV.
const LISTING_STATUS_URL: &str = "https://www.alphavantage.co/query";

/// Reference-data client for the exchange listing feed
pub struct ListingClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl ListingClient {
    /// Create a new listing client
    pub fn new(config: &Config) -> Result<Self> {
        Self::with_base_url(LISTING_STATUS_URL, &config.alphavantage_api_key)
    }

    pub fn with_base_url(base_url: &str, api_key: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .user_agent("stock-ingest/1.0")
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.to_string(),
            api_key: api_key.to_string(),
        })
    }

    /// Retrieve the list of currently listed US stock symbols
    pub async fn list_symbols(&self) -> Result<Vec<String>> {
        info!("Getting list of stock symbols");

        let mut url = Url::parse(&self.base_url)?;
        url.query_pairs_mut()
            .append_pair("function", "LISTING_STATUS")
            .append_pair("apikey", &self.api_key);

        let response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "Listing request failed with status {}",
                response.status()
            ));
        }

        let csv_text = response.text().await?;
        let symbols = parse_symbol_csv(&csv_text)?;

        info!("✅ Retrieved {} listed symbols", symbols.len());
        Ok(symbols)
    }
}

/// Parse the listing-status CSV, taking the symbol column and skipping the
/// header row.
fn parse_symbol_csv(csv_text: &str) -> Result<Vec<String>> {
    let mut reader = csv::Reader::from_reader(csv_text.as_bytes());
    let mut symbols = Vec::new();

    for result in reader.records() {
        let record = result?;
        if let Some(symbol) = record.get(0) {
            let symbol = symbol.trim();
            if !symbol.is_empty() {
                symbols.push(symbol.to_string());
            }
        }
    }

    Ok(symbols)
}
