/// Application state store.
///
/// Composes the market service, converter and search debouncer into one
/// read-only snapshot for presentation. Each component keeps its own
/// state behind a single lock and is its only writer, so a snapshot is
/// assembled from atomic per-component reads and the filtered view is
/// always derived from exactly the cache captured in that snapshot.
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::watch;

use parking_lot::Mutex;

use crate::apis::coingecko::types::Quote;
use crate::apis::SharedPriceApi;
use crate::config::TrackerConfig;
use crate::convert::{ConversionView, Converter};
use crate::debounce::Debouncer;
use crate::errors::TrackerResult;
use crate::logger::{self, LogTag};
use crate::market::{MarketService, SearchFilter};

#[derive(Debug, Clone)]
pub struct SearchSnapshot {
    pub raw: String,
    pub settled: String,
    /// True while the debounce window is open, i.e. raw input is ahead of
    /// the settled query the filter uses.
    pub pending: bool,
}

#[derive(Debug, Clone)]
pub struct ConversionInput {
    pub from_id: String,
    pub to_id: String,
    pub amount: String,
}

/// One consistent read of the whole application state.
#[derive(Debug, Clone)]
pub struct AppSnapshot {
    pub quotes: Arc<Vec<Quote>>,
    pub filtered: Arc<Vec<Quote>>,
    pub loading: bool,
    pub last_error: Option<String>,
    pub search: SearchSnapshot,
    pub conversion_input: ConversionInput,
    pub conversion: ConversionView,
}

pub struct AppStore {
    weak: Weak<AppStore>,
    market: Arc<MarketService>,
    converter: Arc<Converter>,
    search: Debouncer<String>,
    filter: SearchFilter,
    pair: Mutex<ConversionInput>,
    snapshot_tx: watch::Sender<AppSnapshot>,
}

impl AppStore {
    pub fn new(api: SharedPriceApi, config: &TrackerConfig) -> Arc<Self> {
        let initial_input = ConversionInput {
            from_id: config.default_from.clone(),
            to_id: config.default_to.clone(),
            amount: config.default_amount.clone(),
        };
        let initial = AppSnapshot {
            quotes: Arc::new(Vec::new()),
            filtered: Arc::new(Vec::new()),
            loading: false,
            last_error: None,
            search: SearchSnapshot {
                raw: String::new(),
                settled: String::new(),
                pending: false,
            },
            conversion_input: initial_input.clone(),
            conversion: ConversionView {
                amount: None,
                rate: None,
                loading: false,
                last_error: None,
            },
        };
        let (snapshot_tx, _) = watch::channel(initial);

        Arc::new_cyclic(|weak| Self {
            weak: weak.clone(),
            market: Arc::new(MarketService::new(Arc::clone(&api))),
            converter: Arc::new(Converter::new(api)),
            search: Debouncer::new(String::new(), Duration::from_millis(config.debounce_ms)),
            filter: SearchFilter::new(),
            pair: Mutex::new(initial_input),
            snapshot_tx,
        })
    }

    /// Kick off the startup work: the first refresh, the default-pair
    /// conversion, and the background task that republishes snapshots
    /// whenever any component changes.
    pub fn start(&self) {
        logger::info(LogTag::Store, "Store starting: initial refresh and default conversion");
        self.spawn_notifier();
        self.request_refresh();
        self.request_convert();
    }

    /// Refresh the quote cache and wait for completion.
    pub async fn refresh(&self) {
        self.market.refresh().await;
    }

    /// Fire-and-forget refresh for presentation callbacks.
    pub fn request_refresh(&self) {
        let market = Arc::clone(&self.market);
        tokio::spawn(async move { market.refresh().await });
    }

    /// Feed a keystroke into the search debouncer. The raw text and the
    /// pending flag are visible immediately; the filtered view follows
    /// once the input settles.
    pub fn set_search_text(&self, text: &str) {
        logger::debug(LogTag::Search, &format!("Input {:?}, debouncing", text));
        self.search.input(text.to_string());
        self.publish();
    }

    pub fn set_from(&self, id: &str) {
        self.pair.lock().from_id = id.to_string();
        self.publish();
        self.request_convert();
    }

    pub fn set_to(&self, id: &str) {
        self.pair.lock().to_id = id.to_string();
        self.publish();
        self.request_convert();
    }

    pub fn set_amount(&self, amount: &str) {
        self.pair.lock().amount = amount.to_string();
        self.publish();
        self.request_convert();
    }

    /// Wait until the search input has settled through the debouncer.
    /// Returns immediately when no debounce window is open.
    pub async fn wait_search_settled(&self) {
        let mut settled_rx = self.search.subscribe();
        while self.search.is_pending() {
            if settled_rx.changed().await.is_err() {
                break;
            }
        }
    }

    /// Run a conversion for the current pair and wait for completion.
    pub async fn convert_now(&self) -> TrackerResult<()> {
        let input = self.pair.lock().clone();
        self.converter
            .convert(&input.from_id, &input.to_id, &input.amount)
            .await
    }

    fn request_convert(&self) {
        let input = self.pair.lock().clone();
        let converter = Arc::clone(&self.converter);
        tokio::spawn(async move {
            // An unparsable amount is a validated no-op, not a failure.
            if let Err(e) = converter
                .convert(&input.from_id, &input.to_id, &input.amount)
                .await
            {
                logger::debug(LogTag::Store, &format!("Conversion not issued: {}", e));
            }
        });
    }

    /// Assemble a consistent snapshot of the current state.
    pub fn snapshot(&self) -> AppSnapshot {
        let market = self.market.view();
        let raw = self.search.raw();
        let settled = self.search.settled();
        let pending = raw != settled;
        let filtered = self.filter.filter(&market.quotes, &settled);

        AppSnapshot {
            quotes: market.quotes,
            filtered,
            loading: market.loading,
            last_error: market.last_error,
            search: SearchSnapshot { raw, settled, pending },
            conversion_input: self.pair.lock().clone(),
            conversion: self.converter.view(),
        }
    }

    /// Snapshot stream for presentation; a new value is published after
    /// every state change.
    pub fn subscribe(&self) -> watch::Receiver<AppSnapshot> {
        self.snapshot_tx.subscribe()
    }

    fn publish(&self) {
        self.snapshot_tx.send_replace(self.snapshot());
    }

    fn spawn_notifier(&self) {
        let weak = self.weak.clone();
        let mut market_rx = self.market.subscribe();
        let mut convert_rx = self.converter.subscribe();
        let mut settled_rx = self.search.subscribe();

        tokio::spawn(async move {
            loop {
                let changed = tokio::select! {
                    r = market_rx.changed() => r,
                    r = convert_rx.changed() => r,
                    r = settled_rx.changed() => r,
                };
                if changed.is_err() {
                    break;
                }
                match weak.upgrade() {
                    Some(store) => store.publish(),
                    None => break,
                }
            }
        });
    }
}
