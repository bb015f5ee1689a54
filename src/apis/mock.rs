/// Scriptable in-memory [`PriceApi`] for tests.
///
/// Calls are answered from queues in issue order; each scripted call can
/// carry a virtual-time delay so arrival order can be forced to differ
/// from issue order.
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::apis::coingecko::types::Quote;
use crate::apis::PriceApi;
use crate::errors::TrackerResult;

struct ScriptedCall<T> {
    delay: Duration,
    result: TrackerResult<T>,
}

pub struct MockPriceApi {
    markets: Mutex<VecDeque<ScriptedCall<Vec<Quote>>>>,
    prices: Mutex<VecDeque<ScriptedCall<HashMap<String, f64>>>>,
    markets_calls: AtomicUsize,
    price_calls: AtomicUsize,
}

impl MockPriceApi {
    pub fn new() -> Self {
        Self {
            markets: Mutex::new(VecDeque::new()),
            prices: Mutex::new(VecDeque::new()),
            markets_calls: AtomicUsize::new(0),
            price_calls: AtomicUsize::new(0),
        }
    }

    pub fn queue_markets(&self, result: TrackerResult<Vec<Quote>>) {
        self.queue_markets_after(Duration::ZERO, result);
    }

    pub fn queue_markets_after(&self, delay: Duration, result: TrackerResult<Vec<Quote>>) {
        self.markets.lock().push_back(ScriptedCall { delay, result });
    }

    pub fn queue_prices(&self, result: TrackerResult<HashMap<String, f64>>) {
        self.queue_prices_after(Duration::ZERO, result);
    }

    pub fn queue_prices_after(&self, delay: Duration, result: TrackerResult<HashMap<String, f64>>) {
        self.prices.lock().push_back(ScriptedCall { delay, result });
    }

    pub fn markets_calls(&self) -> usize {
        self.markets_calls.load(Ordering::SeqCst)
    }

    pub fn price_calls(&self) -> usize {
        self.price_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PriceApi for MockPriceApi {
    async fn fetch_markets(&self) -> TrackerResult<Vec<Quote>> {
        self.markets_calls.fetch_add(1, Ordering::SeqCst);
        let call = self.markets.lock().pop_front();
        match call {
            Some(call) => {
                tokio::time::sleep(call.delay).await;
                call.result
            }
            None => Ok(Vec::new()),
        }
    }

    async fn fetch_usd_prices(&self, ids: &[&str]) -> TrackerResult<HashMap<String, f64>> {
        self.price_calls.fetch_add(1, Ordering::SeqCst);
        let call = self.prices.lock().pop_front();
        match call {
            Some(call) => {
                tokio::time::sleep(call.delay).await;
                // Scripted maps may hold more ids than this request asked for.
                call.result.map(|prices| {
                    prices
                        .into_iter()
                        .filter(|(id, _)| ids.contains(&id.as_str()))
                        .collect()
                })
            }
            None => Ok(HashMap::new()),
        }
    }
}

/// Shorthand quote constructor for test fixtures.
pub fn quote(id: &str, symbol: &str, name: &str, current_price: f64) -> Quote {
    Quote {
        id: id.to_string(),
        symbol: symbol.to_string(),
        name: name.to_string(),
        image: format!("https://img.test/{}.png", id),
        current_price,
        price_change_percentage_24h: 0.0,
        price_change_percentage_7d_in_currency: None,
        market_cap_rank: None,
    }
}

/// Shorthand price-map constructor for test fixtures.
pub fn price_map(entries: &[(&str, f64)]) -> HashMap<String, f64> {
    entries
        .iter()
        .map(|(id, usd)| (id.to_string(), *usd))
        .collect()
}
