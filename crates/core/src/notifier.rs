//! Price notifier.
//!
//! One [`PriceNotifier::execute`] call runs a full cycle:
//! fetch every pair → denominate gas pairs → decide which pairs changed → notify.
//!
//! Fetch and gas conversion failures abort the cycle before any state is
//! touched. Deciding and recording the new "last notified" prices happen under
//! one lock, so overlapping cycles cannot interleave their comparisons. The
//! recorded prices are updated before the notifee is called; a failed delivery
//! is reported but does not roll them back.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use oracle_api::PriceSource;
use parking_lot::Mutex;
use tracing::{debug, info, instrument, warn};

use crate::error::{GasPriceError, NotifierError};
use crate::gas::{verify_required_pairs, GasPairInfo, GasPriceConverter};
use crate::notifee::{ChangeRecord, PriceNotifee};
use crate::pair::{ArgsPair, Pair};
use crate::polling::PollingExecutor;

/// Smallest accepted auto-send interval.
pub const MIN_AUTO_SEND_INTERVAL: Duration = Duration::from_secs(1);

/// Below this a last-notified price counts as "never notified" and a threshold as zero.
const EPSILON: f64 = 0.0001;

type TimeSince = Box<dyn Fn(Instant) -> Duration + Send + Sync>;

pub struct ArgsPriceNotifier {
    pub pairs: Vec<ArgsPair>,
    pub aggregator: Arc<dyn PriceSource>,
    /// Required when any `GWEI/*` pair is configured.
    pub gas_price_service: Option<Arc<dyn GasPriceConverter>>,
    pub notifee: Arc<dyn PriceNotifee>,
    pub auto_send_interval: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct PriceInfo {
    price: f64,
    timestamp: i64,
}

#[derive(Debug)]
struct NotifierState {
    /// Aligned with `pairs`; `0.0` means never notified.
    last_notified_prices: Vec<f64>,
    last_time_auto_sent: Instant,
}

pub struct PriceNotifier {
    pairs: Vec<Pair>,
    aggregator: Arc<dyn PriceSource>,
    gas_price_service: Option<Arc<dyn GasPriceConverter>>,
    notifee: Arc<dyn PriceNotifee>,
    auto_send_interval: Duration,
    /// Positions of the `GWEI/*` pairs.
    gas_pair_indices: Vec<usize>,
    has_eth_usd_pair: bool,
    state: Mutex<NotifierState>,
    time_since: TimeSince,
}

impl PriceNotifier {
    pub fn new(args: ArgsPriceNotifier) -> Result<Self, NotifierError> {
        if args.pairs.is_empty() {
            return Err(NotifierError::EmptyPairs);
        }
        if args.auto_send_interval < MIN_AUTO_SEND_INTERVAL {
            return Err(NotifierError::InvalidAutoSendInterval {
                min: MIN_AUTO_SEND_INTERVAL,
                got: args.auto_send_interval,
            });
        }

        let pairs = args
            .pairs
            .iter()
            .enumerate()
            .map(|(index, pair)| Pair::new(pair).map_err(|source| NotifierError::InvalidPair { index, source }))
            .collect::<Result<Vec<_>, _>>()?;

        let gas_pair_indices: Vec<usize> = pairs
            .iter()
            .enumerate()
            .filter(|(_, pair)| pair.is_gas_pair())
            .map(|(index, _)| index)
            .collect();
        let has_eth_usd_pair = pairs
            .iter()
            .any(|pair| pair.base == oracle_api::ETH_TICKER && pair.quote == oracle_api::QUOTE_USD_FIAT);

        if !gas_pair_indices.is_empty() {
            if args.gas_price_service.is_none() {
                return Err(NotifierError::MissingGasPriceService);
            }
            let snapshot: Vec<GasPairInfo> = pairs
                .iter()
                .map(|pair| GasPairInfo::new(pair.base.as_str(), pair.quote.as_str(), 0.0, 0))
                .collect();
            verify_required_pairs(&snapshot).map_err(NotifierError::MissingGasPairs)?;
        }

        let state = NotifierState {
            last_notified_prices: vec![0.0; pairs.len()],
            last_time_auto_sent: Instant::now(),
        };

        info!(
            pairs = pairs.len(),
            gas_pairs = gas_pair_indices.len(),
            has_eth_usd_pair,
            auto_send_interval = ?args.auto_send_interval,
            "Price notifier created"
        );

        Ok(Self {
            pairs,
            aggregator: args.aggregator,
            gas_price_service: args.gas_price_service,
            notifee: args.notifee,
            auto_send_interval: args.auto_send_interval,
            gas_pair_indices,
            has_eth_usd_pair,
            state: Mutex::new(state),
            time_since: Box::new(|instant: Instant| instant.elapsed()),
        })
    }

    /// Replace the clock used for the auto-send check.
    pub fn with_time_since(mut self, time_since: impl Fn(Instant) -> Duration + Send + Sync + 'static) -> Self {
        self.time_since = Box::new(time_since);
        self
    }

    pub fn pairs(&self) -> &[Pair] {
        &self.pairs
    }

    pub fn last_notified_prices(&self) -> Vec<f64> {
        self.state.lock().last_notified_prices.clone()
    }

    /// Overwrite the recorded prices, position by position.
    pub fn set_last_notified_prices(&self, prices: &[f64]) {
        let mut state = self.state.lock();
        for (slot, price) in state.last_notified_prices.iter_mut().zip(prices) {
            *slot = *price;
        }
    }

    pub fn last_time_auto_sent(&self) -> Instant {
        self.state.lock().last_time_auto_sent
    }

    /// Run one fetch → denominate → decide → notify cycle.
    #[instrument(skip(self))]
    pub async fn execute(&self) -> Result<(), NotifierError> {
        let fetched = self.fetch_all_prices().await?;
        let prices = self.denominate_gas_prices(fetched).await?;
        let changes = self.record_changes(&prices);
        self.notify(changes).await
    }

    async fn fetch_all_prices(&self) -> Result<Vec<PriceInfo>, NotifierError> {
        let mut fetched = Vec::with_capacity(self.pairs.len());
        for pair in &self.pairs {
            let timestamp = chrono::Utc::now().timestamp();
            if pair.is_gas_pair() {
                // Priced during denomination.
                fetched.push(PriceInfo { price: 0.0, timestamp });
                continue;
            }

            let price = self
                .aggregator
                .fetch_price(&pair.base, &pair.quote)
                .await
                .map_err(|source| NotifierError::Fetch {
                    base: pair.base.clone(),
                    quote: pair.quote.clone(),
                    source,
                })?;

            fetched.push(PriceInfo {
                price: pair.trim(price),
                timestamp,
            });
        }
        Ok(fetched)
    }

    async fn denominate_gas_prices(&self, mut prices: Vec<PriceInfo>) -> Result<Vec<PriceInfo>, NotifierError> {
        if self.gas_pair_indices.is_empty() {
            return Ok(prices);
        }
        let Some(service) = &self.gas_price_service else {
            return Err(NotifierError::MissingGasPriceService);
        };

        let snapshot: Vec<GasPairInfo> = self
            .pairs
            .iter()
            .zip(&prices)
            .map(|(pair, info)| GasPairInfo::new(pair.base.as_str(), pair.quote.as_str(), info.price, info.timestamp))
            .collect();

        let converted = service
            .convert_gas_prices(&snapshot)
            .await
            .map_err(NotifierError::GasConversion)?;

        for &index in &self.gas_pair_indices {
            let pair = &self.pairs[index];
            let info = converted.get(index).ok_or_else(|| {
                NotifierError::GasConversion(GasPriceError::MissingPairs(vec![pair.to_string()]))
            })?;
            prices[index] = PriceInfo {
                price: pair.trim(info.price),
                timestamp: info.timestamp,
            };
        }
        Ok(prices)
    }

    /// Decide which pairs to notify and record their prices, under one lock.
    ///
    /// A pair whose price cannot be denominated is logged and left out of the
    /// batch; its last notified price stays untouched.
    fn record_changes(&self, prices: &[PriceInfo]) -> Vec<ChangeRecord> {
        let mut state = self.state.lock();
        let notify_all = (self.time_since)(state.last_time_auto_sent) > self.auto_send_interval;

        let mut changes = Vec::new();
        let mut notified = Vec::new();
        for (index, (pair, info)) in self.pairs.iter().zip(prices).enumerate() {
            let last_notified = state.last_notified_prices[index];
            if !notify_all && !should_notify(pair.percent_difference_to_notify, last_notified, info.price) {
                continue;
            }

            let trimmed = pair.trim(info.price);
            let denominated_price = match pair.denominate(trimmed) {
                Ok(value) => value,
                Err(e) => {
                    warn!(pair = %pair, price = trimmed, error = %e, "Skipping pair that cannot be denominated");
                    continue;
                }
            };

            changes.push(ChangeRecord {
                base: pair.base.clone(),
                quote: pair.quote.clone(),
                denominated_price,
                decimals: u64::from(pair.decimals),
                timestamp: info.timestamp,
            });
            notified.push((index, trimmed));
        }

        if notify_all {
            state.last_time_auto_sent = Instant::now();
            debug!(pairs = changes.len(), "Auto-send interval elapsed, notifying all pairs");
        }
        for (index, trimmed) in notified {
            state.last_notified_prices[index] = trimmed;
        }

        changes
    }

    async fn notify(&self, changes: Vec<ChangeRecord>) -> Result<(), NotifierError> {
        if changes.is_empty() {
            debug!("No price changes to notify");
            return Ok(());
        }

        info!(changes = changes.len(), "Notifying price changes");
        self.notifee
            .price_changed(&changes)
            .await
            .map_err(NotifierError::Notifee)
    }
}

/// Change test for one pair. `threshold_percent` is in percent (`1.0` = 1%).
fn should_notify(threshold_percent: f64, last_notified: f64, new_price: f64) -> bool {
    if last_notified < EPSILON || threshold_percent / 100.0 < EPSILON {
        return true;
    }
    let change_percent = (last_notified - new_price).abs() * 100.0 / last_notified;
    change_percent >= threshold_percent
}

impl fmt::Debug for PriceNotifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PriceNotifier")
            .field("pairs", &self.pairs.len())
            .field("gas_pair_indices", &self.gas_pair_indices)
            .field("has_eth_usd_pair", &self.has_eth_usd_pair)
            .field("auto_send_interval", &self.auto_send_interval)
            .finish()
    }
}

#[async_trait]
impl PollingExecutor for PriceNotifier {
    type Error = NotifierError;

    async fn execute(&self) -> Result<(), NotifierError> {
        PriceNotifier::execute(self).await
    }
}
