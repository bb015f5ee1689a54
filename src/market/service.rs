/// Quote cache ownership and refresh orchestration.
///
/// The service is the only writer of the quote cache. A refresh replaces
/// the whole cache on success and leaves it untouched on failure; the
/// loading flag is cleared on every completion. Refreshes carry a
/// monotonic sequence so a slow response from an older refresh can never
/// overwrite the cache committed by a newer one.
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;

use parking_lot::Mutex;

use crate::apis::coingecko::types::Quote;
use crate::apis::SharedPriceApi;
use crate::logger::{self, LogTag};

/// Atomic read of everything the service owns. Taken under one lock, so a
/// consumer never observes a half-applied refresh.
#[derive(Debug, Clone)]
pub struct MarketView {
    pub quotes: Arc<Vec<Quote>>,
    pub loading: bool,
    pub last_error: Option<String>,
}

struct MarketState {
    quotes: Arc<Vec<Quote>>,
    loading: bool,
    last_error: Option<String>,
    version: u64,
}

pub struct MarketService {
    api: SharedPriceApi,
    state: Mutex<MarketState>,
    issued: AtomicU64,
    changed_tx: watch::Sender<u64>,
}

impl MarketService {
    pub fn new(api: SharedPriceApi) -> Self {
        let (changed_tx, _) = watch::channel(0);
        Self {
            api,
            state: Mutex::new(MarketState {
                quotes: Arc::new(Vec::new()),
                loading: false,
                last_error: None,
                version: 0,
            }),
            issued: AtomicU64::new(0),
            changed_tx,
        }
    }

    /// Fetch the top markets and replace the cache.
    ///
    /// Errors are absorbed here: the previous cache survives, the failure
    /// is recorded and logged, and `loading` always returns to false.
    pub async fn refresh(&self) {
        let sequence = self.issued.fetch_add(1, Ordering::SeqCst) + 1;

        {
            let mut state = self.state.lock();
            state.loading = true;
            self.bump(&mut state);
        }
        logger::debug(LogTag::Market, &format!("Refresh #{} started", sequence));

        let result = self.api.fetch_markets().await;

        let mut state = self.state.lock();
        let stale = sequence < self.issued.load(Ordering::SeqCst);

        match result {
            Ok(quotes) if stale => {
                logger::debug(
                    LogTag::Market,
                    &format!(
                        "Refresh #{} superseded, discarding {} quotes",
                        sequence,
                        quotes.len()
                    ),
                );
            }
            Ok(quotes) => {
                logger::info(
                    LogTag::Market,
                    &format!("Refresh #{} cached {} quotes", sequence, quotes.len()),
                );
                state.quotes = Arc::new(quotes);
                state.last_error = None;
            }
            Err(e) if stale => {
                logger::debug(
                    LogTag::Market,
                    &format!("Refresh #{} superseded, dropping error: {}", sequence, e),
                );
            }
            Err(e) => {
                if e.is_recoverable() {
                    logger::warning(LogTag::Market, &format!("Refresh #{} failed: {}", sequence, e));
                } else {
                    logger::error(LogTag::Market, &format!("Refresh #{} failed: {}", sequence, e));
                }
                state.last_error = Some(e.to_string());
            }
        }

        state.loading = false;
        self.bump(&mut state);
    }

    pub fn view(&self) -> MarketView {
        let state = self.state.lock();
        MarketView {
            quotes: Arc::clone(&state.quotes),
            loading: state.loading,
            last_error: state.last_error.clone(),
        }
    }

    pub fn quotes(&self) -> Arc<Vec<Quote>> {
        Arc::clone(&self.state.lock().quotes)
    }

    pub fn is_loading(&self) -> bool {
        self.state.lock().loading
    }

    pub fn last_error(&self) -> Option<String> {
        self.state.lock().last_error.clone()
    }

    /// Change notifications carrying a state version.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.changed_tx.subscribe()
    }

    fn bump(&self, state: &mut MarketState) {
        state.version += 1;
        self.changed_tx.send_replace(state.version);
    }
}
