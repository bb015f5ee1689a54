/// CoinGecko wire types.
///
/// Field names are part of the wire contract and must stay exactly as the
/// service sends them; do not rename.
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One market entry from `/coins/markets`. Immutable once received; a
/// refresh replaces the whole collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub id: String,
    pub symbol: String,
    pub name: String,
    pub image: String,
    pub current_price: f64,
    pub price_change_percentage_24h: f64,
    pub price_change_percentage_7d_in_currency: Option<f64>,
    pub market_cap_rank: Option<u32>,
}

/// One entry of the `/simple/price` response map. Ids unknown to the
/// service are absent from the map rather than flagged in-band.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimplePriceEntry {
    pub usd: Option<f64>,
}

pub type SimplePriceResponse = HashMap<String, SimplePriceEntry>;
