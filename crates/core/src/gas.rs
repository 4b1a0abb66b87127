//! Gas price denomination.
//!
//! One raw GWEI reading from the gas station is turned into USD and into any
//! token `X` for which an `X/USD` price is already known this cycle.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use oracle_api::{PriceFetcher, ETH_TICKER, GWEI_TICKER, QUOTE_USD_FIAT};
use tracing::{debug, instrument};

use crate::error::GasPriceError;

/// GWEI → ETH conversion factor.
pub const GWEI_TO_ETH: f64 = 1e-9;

/// Plain pair snapshot crossing the gas service boundary.
#[derive(Debug, Clone, PartialEq)]
pub struct GasPairInfo {
    pub base: String,
    pub quote: String,
    pub price: f64,
    pub timestamp: i64,
}

impl GasPairInfo {
    pub fn new(base: impl Into<String>, quote: impl Into<String>, price: f64, timestamp: i64) -> Self {
        Self {
            base: base.into(),
            quote: quote.into(),
            price,
            timestamp,
        }
    }

    fn is_gas_pair(&self) -> bool {
        self.base == GWEI_TICKER
    }

    fn is(&self, base: &str, quote: &str) -> bool {
        self.base == base && self.quote == quote
    }
}

/// Check that every `GWEI/X` pair can be denominated from the other pairs.
///
/// `ETH/USD` is always required; `X/USD` is required for every `X` other than
/// `USD`. All missing `X/USD` pairs are reported together, in input order.
pub fn verify_required_pairs(pairs: &[GasPairInfo]) -> Result<(), GasPriceError> {
    let gas_quotes: Vec<&str> = pairs
        .iter()
        .filter(|pair| pair.is_gas_pair())
        .map(|pair| pair.quote.as_str())
        .collect();
    if gas_quotes.is_empty() {
        return Err(GasPriceError::NoGasPairs);
    }

    if !pairs.iter().any(|pair| pair.is(ETH_TICKER, QUOTE_USD_FIAT)) {
        return Err(GasPriceError::MissingPairs(vec![format!(
            "{ETH_TICKER}/{QUOTE_USD_FIAT}"
        )]));
    }

    let mut missing: Vec<String> = Vec::new();
    for quote in gas_quotes {
        if quote == QUOTE_USD_FIAT || pairs.iter().any(|pair| pair.is(quote, QUOTE_USD_FIAT)) {
            continue;
        }
        let required = format!("{quote}/{QUOTE_USD_FIAT}");
        if !missing.contains(&required) {
            missing.push(required);
        }
    }

    if missing.is_empty() {
        Ok(())
    } else {
        Err(GasPriceError::MissingPairs(missing))
    }
}

#[async_trait]
pub trait GasPriceConverter: Send + Sync {
    /// `Err(NoGasPairs)` when there is nothing to convert.
    fn verify_required_pairs(&self, pairs: &[GasPairInfo]) -> Result<(), GasPriceError>;

    /// Copy of `pairs` with every `GWEI/*` entry repriced.
    async fn convert_gas_prices(&self, pairs: &[GasPairInfo]) -> Result<Vec<GasPairInfo>, GasPriceError>;
}

pub struct GasPriceService {
    gas_price_fetcher: Arc<dyn PriceFetcher>,
}

impl GasPriceService {
    /// Registers `GWEI/USD` on the gas fetcher.
    pub fn new(gas_price_fetcher: Arc<dyn PriceFetcher>) -> Self {
        gas_price_fetcher.add_pair(GWEI_TICKER, QUOTE_USD_FIAT);
        Self { gas_price_fetcher }
    }
}

#[async_trait]
impl GasPriceConverter for GasPriceService {
    fn verify_required_pairs(&self, pairs: &[GasPairInfo]) -> Result<(), GasPriceError> {
        verify_required_pairs(pairs)
    }

    #[instrument(skip_all, fields(pairs = pairs.len()))]
    async fn convert_gas_prices(&self, pairs: &[GasPairInfo]) -> Result<Vec<GasPairInfo>, GasPriceError> {
        match self.verify_required_pairs(pairs) {
            Err(GasPriceError::NoGasPairs) => return Ok(pairs.to_vec()),
            other => other?,
        }

        let eth_usd = pairs
            .iter()
            .find(|pair| pair.is(ETH_TICKER, QUOTE_USD_FIAT))
            .map(|pair| pair.price)
            .unwrap_or_default();
        if eth_usd == 0.0 {
            return Err(GasPriceError::EthUsdPriceZero);
        }

        let gwei_rate = self
            .gas_price_fetcher
            .fetch_price(GWEI_TICKER, QUOTE_USD_FIAT)
            .await
            .map_err(GasPriceError::GasFetch)?;

        let usd_prices: HashMap<&str, f64> = pairs
            .iter()
            .filter(|pair| pair.quote == QUOTE_USD_FIAT && !pair.is_gas_pair())
            .map(|pair| (pair.base.as_str(), pair.price))
            .collect();

        let usd_nominal = eth_usd * (gwei_rate * GWEI_TO_ETH);
        let timestamp = chrono::Utc::now().timestamp();

        let mut converted = pairs.to_vec();
        for pair in converted.iter_mut().filter(|pair| pair.is_gas_pair()) {
            pair.price = if pair.quote == QUOTE_USD_FIAT {
                usd_nominal
            } else {
                // Presence was checked by verify_required_pairs.
                let token_usd = usd_prices
                    .get(pair.quote.as_str())
                    .copied()
                    .ok_or_else(|| GasPriceError::MissingPairs(vec![format!("{}/{QUOTE_USD_FIAT}", pair.quote)]))?;
                if token_usd == 0.0 || !token_usd.is_finite() {
                    return Err(GasPriceError::TokenUsdPriceInvalid(pair.quote.clone(), token_usd));
                }
                usd_nominal / token_usd
            };
            pair.timestamp = timestamp;
            debug!(quote = %pair.quote, gwei_rate, price = pair.price, "Converted gas price");
        }

        Ok(converted)
    }
}
