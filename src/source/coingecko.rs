//! CoinGecko price source.
//!
//! Fetches spot prices from the CoinGecko simple-price endpoint.
//!
//! API docs: https://docs.coingecko.com/reference/simple-price
//! Base URL: https://api.coingecko.com/api/v3
//! Auth: Not required; an optional demo API key raises the rate limit
//! (`x-cg-demo-api-key` header).

use std::collections::HashMap;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::debug;

use super::PriceSource;
use crate::types::PriceObservation;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

const BASE_URL: &str = "https://api.coingecko.com/api/v3";
const SOURCE_NAME: &str = "coingecko";

/// Map a ticker symbol to the CoinGecko coin id. Unknown symbols fall
/// through lowercased, which works for coins whose id is their name.
fn coin_id(symbol: &str) -> String {
    match symbol.to_uppercase().as_str() {
        "BTC" => "bitcoin".to_string(),
        "ETH" => "ethereum".to_string(),
        "SOL" => "solana".to_string(),
        "DOGE" => "dogecoin".to_string(),
        "XRP" => "ripple".to_string(),
        _ => symbol.to_lowercase(),
    }
}

// ---------------------------------------------------------------------------
// API response types (CoinGecko JSON → Rust)
// ---------------------------------------------------------------------------

/// One entry of the `/simple/price` response:
/// `{ "bitcoin": { "usd": 97000.12 } }`.
#[derive(Debug, Deserialize)]
struct SimplePrice {
    usd: f64,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// CoinGecko price source client.
pub struct CoinGeckoSource {
    http: Client,
    /// Optional demo API key — public endpoints work without one.
    api_key: Option<SecretString>,
    base_url: String,
}

impl CoinGeckoSource {
    /// Create a new CoinGecko client against the public API.
    pub fn new(api_key: Option<SecretString>) -> Result<Self> {
        Self::with_base_url(api_key, BASE_URL)
    }

    /// Create a client against a custom base URL (test servers).
    pub fn with_base_url(api_key: Option<SecretString>, base_url: impl Into<String>) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(10))
            .user_agent("updown/0.1.0 (price-guessing-game)")
            .build()
            .context("Failed to build HTTP client for CoinGecko")?;

        Ok(Self {
            http,
            api_key,
            base_url: base_url.into(),
        })
    }
}

#[async_trait]
impl PriceSource for CoinGeckoSource {
    async fn fetch(&self, symbol: &str) -> Result<PriceObservation> {
        let id = coin_id(symbol);
        let url = format!(
            "{}/simple/price?ids={}&vs_currencies=usd",
            self.base_url,
            urlencoding::encode(&id),
        );

        let mut request = self.http.get(&url);
        if let Some(key) = &self.api_key {
            request = request.header("x-cg-demo-api-key", key.expose_secret());
        }

        let response = request
            .send()
            .await
            .context("CoinGecko request failed")?;

        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!("CoinGecko returned HTTP {status}"));
        }

        let body: HashMap<String, SimplePrice> = response
            .json()
            .await
            .context("Failed to parse CoinGecko simple-price response")?;

        let quote = body
            .get(&id)
            .ok_or_else(|| anyhow!("CoinGecko response missing coin id '{id}'"))?;

        let observation = PriceObservation {
            symbol: symbol.to_uppercase(),
            amount: quote.usd,
            timestamp_ms: Utc::now().timestamp_millis(),
        };
        debug!(%observation, "Price fetched");

        Ok(observation)
    }

    fn name(&self) -> &str {
        SOURCE_NAME
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
