/// Remote pricing API surface.
///
/// The rest of the crate talks to the pricing service through [`PriceApi`]
/// so the network edge stays swappable; [`coingecko`] is the production
/// implementation and `mock` the deterministic one used by tests.
pub mod client;
pub mod coingecko;

#[cfg(test)]
pub mod mock;

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

use crate::apis::coingecko::types::Quote;
use crate::errors::TrackerResult;

#[async_trait]
pub trait PriceApi: Send + Sync {
    /// Fetch the top markets ordered by market cap, with 24h and 7d
    /// percentage-change fields. Response order is preserved by callers.
    async fn fetch_markets(&self) -> TrackerResult<Vec<Quote>>;

    /// Fetch current USD prices for the given asset ids. Ids unknown to
    /// the service are simply absent from the returned map.
    async fn fetch_usd_prices(&self, ids: &[&str]) -> TrackerResult<HashMap<String, f64>>;
}

pub type SharedPriceApi = Arc<dyn PriceApi>;
