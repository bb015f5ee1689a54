/// Race-safe currency conversion against the pricing service.
///
/// Every request gets a monotonically increasing sequence number at issue
/// time. Responses may arrive out of issue order; a response commits to
/// visible state only while its sequence is still the highest ever
/// issued, so a stale result can never overwrite a newer one. In-flight
/// requests are not cancelled, only ignored once superseded.
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::watch;

use parking_lot::Mutex;

use crate::apis::SharedPriceApi;
use crate::errors::{TrackerError, TrackerResult};
use crate::logger::{self, LogTag};

/// Committed conversion state. `amount` is in the target currency's
/// native units; `rate` is the derived cross-rate `price_from / price_to`.
#[derive(Debug, Clone)]
pub struct ConversionView {
    pub amount: Option<f64>,
    pub rate: Option<f64>,
    pub loading: bool,
    pub last_error: Option<String>,
}

/// One issued conversion, identified by the sequence number assigned at
/// issue time. The sequence is the commit gate: by the time the response
/// arrives, a newer request may have claimed a higher one.
#[derive(Debug)]
struct ConversionRequest {
    from_id: String,
    to_id: String,
    amount: f64,
    sequence: u64,
}

struct ConversionState {
    amount: Option<f64>,
    rate: Option<f64>,
    loading: bool,
    last_error: Option<String>,
    version: u64,
}

pub struct Converter {
    api: SharedPriceApi,
    state: Mutex<ConversionState>,
    issued: AtomicU64,
    changed_tx: watch::Sender<u64>,
}

impl Converter {
    pub fn new(api: SharedPriceApi) -> Self {
        let (changed_tx, _) = watch::channel(0);
        Self {
            api,
            state: Mutex::new(ConversionState {
                amount: None,
                rate: None,
                loading: false,
                last_error: None,
                version: 0,
            }),
            issued: AtomicU64::new(0),
            changed_tx,
        }
    }

    /// Convert `amount` of `from_id` into `to_id` units.
    ///
    /// The amount is validated before any request is issued; an empty or
    /// unparsable amount is rejected without touching state. Network and
    /// unknown-asset failures are absorbed into the committed state.
    pub async fn convert(&self, from_id: &str, to_id: &str, amount: &str) -> TrackerResult<()> {
        let request = ConversionRequest {
            from_id: from_id.to_string(),
            to_id: to_id.to_string(),
            amount: parse_amount(amount)?,
            sequence: self.issued.fetch_add(1, Ordering::SeqCst) + 1,
        };

        {
            let mut state = self.state.lock();
            state.loading = true;
            self.bump(&mut state);
        }
        logger::debug(
            LogTag::Convert,
            &format!(
                "Conversion #{}: {} {} -> {}",
                request.sequence, request.amount, request.from_id, request.to_id
            ),
        );

        let result = self
            .api
            .fetch_usd_prices(&[request.from_id.as_str(), request.to_id.as_str()])
            .await;

        let mut state = self.state.lock();
        let stale = request.sequence < self.issued.load(Ordering::SeqCst);

        match result {
            _ if stale => {
                logger::debug(
                    LogTag::Convert,
                    &format!("Conversion #{} superseded, result discarded", request.sequence),
                );
            }
            Ok(prices) => {
                let from_price = prices.get(&request.from_id).copied();
                let to_price = prices.get(&request.to_id).copied();

                match (from_price, to_price) {
                    (Some(from_price), Some(to_price)) => {
                        // IEEE division: a zero to_price yields a
                        // non-finite rate, never a panic.
                        let rate = from_price / to_price;
                        state.rate = Some(rate);
                        state.amount = Some(request.amount * rate);
                        state.last_error = None;
                        logger::info(
                            LogTag::Convert,
                            &format!(
                                "Conversion #{} committed: rate {:.8}, result {:.8}",
                                request.sequence,
                                rate,
                                request.amount * rate
                            ),
                        );
                    }
                    _ => {
                        let missing = if from_price.is_none() {
                            &request.from_id
                        } else {
                            &request.to_id
                        };
                        let error = TrackerError::UnknownAsset(missing.clone());
                        logger::warning(
                            LogTag::Convert,
                            &format!("Conversion #{}: {}", request.sequence, error),
                        );
                        state.amount = None;
                        state.rate = None;
                        state.last_error = Some(error.to_string());
                    }
                }
            }
            Err(e) => {
                // Committed numbers stay as they were; only the failure is
                // recorded.
                logger::warning(
                    LogTag::Convert,
                    &format!("Conversion #{} failed: {}", request.sequence, e),
                );
                state.last_error = Some(e.to_string());
            }
        }

        state.loading = false;
        self.bump(&mut state);
        Ok(())
    }

    pub fn view(&self) -> ConversionView {
        let state = self.state.lock();
        ConversionView {
            amount: state.amount,
            rate: state.rate,
            loading: state.loading,
            last_error: state.last_error.clone(),
        }
    }

    pub fn is_loading(&self) -> bool {
        self.state.lock().loading
    }

    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.changed_tx.subscribe()
    }

    fn bump(&self, state: &mut ConversionState) {
        state.version += 1;
        self.changed_tx.send_replace(state.version);
    }
}

/// A conversion amount must be a non-negative finite real; anything else
/// rejects the conversion before a request is issued.
fn parse_amount(raw: &str) -> TrackerResult<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(TrackerError::InvalidAmount(raw.to_string()));
    }
    match trimmed.parse::<f64>() {
        Ok(value) if value.is_finite() && value >= 0.0 => Ok(value),
        _ => Err(TrackerError::InvalidAmount(raw.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::apis::mock::{price_map, MockPriceApi};
    use std::sync::Arc;
    use std::time::Duration;

    fn converter_with(api: Arc<MockPriceApi>) -> Arc<Converter> {
        Arc::new(Converter::new(api))
    }

    #[tokio::test]
    async fn derives_cross_rate_from_usd_prices() {
        let api = Arc::new(MockPriceApi::new());
        api.queue_prices(Ok(price_map(&[("bitcoin", 50000.0), ("ethereum", 2500.0)])));

        let converter = converter_with(api);
        converter.convert("bitcoin", "ethereum", "2").await.unwrap();

        let view = converter.view();
        assert_eq!(view.rate, Some(20.0));
        assert_eq!(view.amount, Some(40.0));
        assert!(!view.loading);
        assert!(view.last_error.is_none());
    }

    #[tokio::test]
    async fn invalid_amount_issues_no_request() {
        let api = Arc::new(MockPriceApi::new());
        api.queue_prices(Ok(price_map(&[("bitcoin", 50000.0), ("ethereum", 2500.0)])));

        let converter = converter_with(Arc::clone(&api));
        converter.convert("bitcoin", "ethereum", "1").await.unwrap();
        let before = converter.view();

        for bad in ["", "   ", "abc", "-3", "NaN"] {
            let result = converter.convert("bitcoin", "ethereum", bad).await;
            assert!(
                matches!(result, Err(TrackerError::InvalidAmount(_))),
                "amount {:?} must be rejected",
                bad
            );
        }

        assert_eq!(api.price_calls(), 1, "rejections never reach the network");
        let after = converter.view();
        assert_eq!(after.amount, before.amount);
        assert_eq!(after.rate, before.rate);
    }

    #[tokio::test(start_paused = true)]
    async fn latest_issued_request_wins_regardless_of_arrival_order() {
        let api = Arc::new(MockPriceApi::new());
        // First issued call is slow and would commit rate 20; the second
        // is fast and commits rate 10.
        api.queue_prices_after(
            Duration::from_millis(500),
            Ok(price_map(&[("bitcoin", 50000.0), ("ethereum", 2500.0)])),
        );
        api.queue_prices_after(
            Duration::from_millis(20),
            Ok(price_map(&[("bitcoin", 25000.0), ("ethereum", 2500.0)])),
        );

        let converter = converter_with(api);

        let slow = tokio::spawn({
            let converter = Arc::clone(&converter);
            async move { converter.convert("bitcoin", "ethereum", "1").await }
        });
        let fast = tokio::spawn({
            let converter = Arc::clone(&converter);
            async move { converter.convert("bitcoin", "ethereum", "1").await }
        });

        slow.await.unwrap().unwrap();
        fast.await.unwrap().unwrap();

        let view = converter.view();
        assert_eq!(view.rate, Some(10.0), "late result of the older request is discarded");
        assert_eq!(view.amount, Some(10.0));
        assert!(!view.loading);
    }

    #[tokio::test]
    async fn unknown_asset_clears_committed_result() {
        let api = Arc::new(MockPriceApi::new());
        api.queue_prices(Ok(price_map(&[("bitcoin", 50000.0), ("ethereum", 2500.0)])));
        api.queue_prices(Ok(price_map(&[("bitcoin", 50000.0)])));

        let converter = converter_with(api);
        converter.convert("bitcoin", "ethereum", "1").await.unwrap();
        assert!(converter.view().amount.is_some());

        converter.convert("bitcoin", "no-such-coin", "1").await.unwrap();
        let view = converter.view();
        assert_eq!(view.amount, None, "missing price degrades to an absent result");
        assert_eq!(view.rate, None);
        assert!(view.last_error.unwrap().contains("no-such-coin"));
        assert!(!view.loading);
    }

    #[tokio::test]
    async fn network_failure_keeps_committed_result() {
        let api = Arc::new(MockPriceApi::new());
        api.queue_prices(Ok(price_map(&[("bitcoin", 50000.0), ("ethereum", 2500.0)])));
        api.queue_prices(Err(TrackerError::Network("timeout".into())));

        let converter = converter_with(api);
        converter.convert("bitcoin", "ethereum", "2").await.unwrap();
        converter.convert("bitcoin", "ethereum", "2").await.unwrap();

        let view = converter.view();
        assert_eq!(view.amount, Some(40.0), "failed request leaves the last commit");
        assert!(view.last_error.unwrap().contains("timeout"));
        assert!(!view.loading);
    }

    #[tokio::test]
    async fn zero_target_price_yields_non_finite_rate() {
        let api = Arc::new(MockPriceApi::new());
        api.queue_prices(Ok(price_map(&[("bitcoin", 50000.0), ("worthless", 0.0)])));

        let converter = converter_with(api);
        converter.convert("bitcoin", "worthless", "1").await.unwrap();

        let view = converter.view();
        assert!(view.rate.unwrap().is_infinite());
        assert!(view.amount.unwrap().is_infinite());
    }
}
