/// CoinGecko API client
///
/// API Documentation: https://docs.coingecko.com/reference/introduction
///
/// Endpoints implemented:
/// 1. /coins/markets - top markets by market cap with 24h/7d change
/// 2. /simple/price - spot USD prices for a set of asset ids

pub mod types;

use async_trait::async_trait;
use std::collections::HashMap;

use self::types::{Quote, SimplePriceResponse};
use crate::apis::client::HttpClient;
use crate::apis::PriceApi;
use crate::errors::{TrackerError, TrackerResult};
use crate::logger::{self, LogTag};

// ============================================================================
// API CONFIGURATION
// ============================================================================

/// Request timeout - CoinGecko can be slow with large datasets, 20s recommended
pub const DEFAULT_TIMEOUT_SECS: u64 = 20;

// ============================================================================
// CLIENT IMPLEMENTATION
// ============================================================================

pub struct CoinGeckoClient {
    http_client: HttpClient,
    base_url: String,
    per_page: u32,
}

impl CoinGeckoClient {
    pub fn new(base_url: &str, per_page: u32, timeout_secs: u64) -> TrackerResult<Self> {
        let http_client = HttpClient::new(timeout_secs)?;

        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            per_page,
        })
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> TrackerResult<T> {
        let response = self
            .http_client
            .client()
            .get(url)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| TrackerError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(TrackerError::InvalidResponse(format!(
                "HTTP {}",
                response.status()
            )));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| TrackerError::InvalidResponse(e.to_string()))
    }
}

#[async_trait]
impl PriceApi for CoinGeckoClient {
    async fn fetch_markets(&self) -> TrackerResult<Vec<Quote>> {
        let url = format!(
            "{}/coins/markets?vs_currency=usd&order=market_cap_desc&per_page={}&page=1&sparkline=false&price_change_percentage=24h,7d",
            self.base_url, self.per_page
        );

        logger::debug(LogTag::Api, &format!("GET {}", url));

        let quotes: Vec<Quote> = self.get_json(&url).await?;

        logger::debug(
            LogTag::Api,
            &format!("Markets response: {} quotes", quotes.len()),
        );

        Ok(quotes)
    }

    async fn fetch_usd_prices(&self, ids: &[&str]) -> TrackerResult<HashMap<String, f64>> {
        let url = format!(
            "{}/simple/price?ids={}&vs_currencies=usd",
            self.base_url,
            ids.join(",")
        );

        logger::debug(LogTag::Api, &format!("GET {}", url));

        let response: SimplePriceResponse = self.get_json(&url).await?;

        let prices = response
            .into_iter()
            .filter_map(|(id, entry)| entry.usd.map(|usd| (id, usd)))
            .collect();

        Ok(prices)
    }
}
