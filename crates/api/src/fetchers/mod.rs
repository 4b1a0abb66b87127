//! Exchange price fetchers.
//!
//! Every fetcher answers `fetch_price(base, quote)` for the pairs that were
//! registered on it with `add_pair`. HTTP exchanges differ only in URL template
//! and response schema, so they are all [`ExchangeFetcher`] instances
//! parameterised by an [`ExchangeApi`] description. The GraphQL (xExchange) and
//! gas station fetchers have their own types but reuse [`PairRegistry`] and the
//! price parsing helpers.

mod binance;
mod bitfinex;
mod cryptocom;
mod evm_gas;
mod gemini;
mod hitbtc;
mod huobi;
mod kraken;
mod okx;
mod registry;
mod xexchange;

pub use binance::{Binance, BinanceFetcher};
pub use bitfinex::{Bitfinex, BitfinexFetcher};
pub use cryptocom::{Cryptocom, CryptocomFetcher};
pub use evm_gas::{EvmGasPriceFetcher, EvmGasPriceFetcherConfig, EVM_GAS_PRICE_STATION};
pub use gemini::{Gemini, GeminiFetcher};
pub use hitbtc::{Hitbtc, HitbtcFetcher};
pub use huobi::{Huobi, HuobiFetcher};
pub use kraken::{Kraken, KrakenFetcher};
pub use okx::{Okx, OkxFetcher};
pub use registry::{FetcherArgs, FetcherConstructor, FetcherRegistry};
pub use xexchange::{XExchangeFetcher, XExchangeTokensPair, XEXCHANGE};

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashSet;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::error::{FetchError, FetchResult};
use crate::transport::{get_json, ResponseGetter};

/// Fiat USD quote ticker.
pub const QUOTE_USD_FIAT: &str = "USD";
/// Stablecoin ticker used instead of fiat USD by some exchanges.
pub const QUOTE_USDT: &str = "USDT";
/// Synthetic base ticker for gas prices.
pub const GWEI_TICKER: &str = "GWEI";
/// Native coin ticker the gas price is paid in.
pub const ETH_TICKER: &str = "ETH";

/// Anything able to produce a price for a base/quote pair.
#[async_trait]
pub trait PriceSource: Send + Sync {
    /// Stable identifier, used for exchange filtering.
    fn name(&self) -> &str;

    async fn fetch_price(&self, base: &str, quote: &str) -> FetchResult<f64>;
}

/// A price source that only answers for explicitly registered pairs.
pub trait PriceFetcher: PriceSource {
    /// Register a pair. Idempotent.
    fn add_pair(&self, base: &str, quote: &str);

    fn has_pair(&self, base: &str, quote: &str) -> bool;
}

/// Concurrent set of registered base/quote pairs.
#[derive(Debug, Default)]
pub struct PairRegistry {
    pairs: DashSet<(String, String)>,
}

impl PairRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, base: &str, quote: &str) {
        self.pairs.insert((base.to_string(), quote.to_string()));
    }

    pub fn contains(&self, base: &str, quote: &str) -> bool {
        self.pairs.contains(&(base.to_string(), quote.to_string()))
    }

    pub(crate) fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Fail with `PairNotSupported` unless the pair was registered.
    pub fn ensure(&self, fetcher: &str, base: &str, quote: &str) -> FetchResult<()> {
        if self.contains(base, quote) {
            Ok(())
        } else {
            Err(FetchError::PairNotSupported {
                fetcher: fetcher.to_string(),
                base: base.to_string(),
                quote: quote.to_string(),
            })
        }
    }
}

/// Parse a price string, rejecting empty, non-finite and non-positive values.
pub fn str_to_positive_f64(value: &str) -> FetchResult<f64> {
    if value.is_empty() {
        return Err(FetchError::InvalidResponseData);
    }
    let price: f64 = value.trim().parse()?;
    positive(price)
}

pub(super) fn positive(price: f64) -> FetchResult<f64> {
    if price.is_finite() && price > 0.0 {
        Ok(price)
    } else {
        Err(FetchError::InvalidResponseData)
    }
}

/// A price leaf that some APIs encode as a string and others as a number.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum PriceField {
    Number(f64),
    Text(String),
}

impl PriceField {
    pub fn to_positive_f64(&self) -> FetchResult<f64> {
        match self {
            PriceField::Number(price) => positive(*price),
            PriceField::Text(text) => str_to_positive_f64(text),
        }
    }
}

/// Parse an optional price leaf; a missing leaf is invalid response data.
pub fn price_field_to_f64(field: Option<&PriceField>) -> FetchResult<f64> {
    field
        .ok_or(FetchError::InvalidResponseData)?
        .to_positive_f64()
}

/// URL template and response schema of one HTTP exchange.
pub trait ExchangeApi: Send + Sync + 'static {
    /// Name used in pair configuration (`exchanges = [...]`).
    const NAME: &'static str;

    /// Ticker this exchange lists instead of fiat `USD`, if any.
    const USD_ALIAS: Option<&'static str> = None;

    type Response: DeserializeOwned + Send;

    fn price_url(base: &str, quote: &str) -> String;

    fn extract_price(response: Self::Response) -> FetchResult<f64>;

    fn normalize_quote(quote: &str) -> &str {
        match Self::USD_ALIAS {
            Some(alias) if quote == QUOTE_USD_FIAT => alias,
            _ => quote,
        }
    }
}

/// Generic HTTP exchange fetcher.
pub struct ExchangeFetcher<E: ExchangeApi> {
    getter: Arc<dyn ResponseGetter>,
    pairs: PairRegistry,
    _api: PhantomData<fn() -> E>,
}

impl<E: ExchangeApi> ExchangeFetcher<E> {
    pub fn new(getter: Arc<dyn ResponseGetter>) -> Self {
        Self {
            getter,
            pairs: PairRegistry::new(),
            _api: PhantomData,
        }
    }
}

impl<E: ExchangeApi> fmt::Debug for ExchangeFetcher<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExchangeFetcher")
            .field("exchange", &E::NAME)
            .field("pair_count", &self.pairs.len())
            .finish()
    }
}

#[async_trait]
impl<E: ExchangeApi> PriceSource for ExchangeFetcher<E> {
    fn name(&self) -> &str {
        E::NAME
    }

    #[instrument(skip(self), fields(exchange = E::NAME))]
    async fn fetch_price(&self, base: &str, quote: &str) -> FetchResult<f64> {
        self.pairs.ensure(E::NAME, base, quote)?;

        let quote = E::normalize_quote(quote);
        let url = E::price_url(base, quote);
        let response: E::Response = get_json(self.getter.as_ref(), &url).await?;
        let price = E::extract_price(response)?;

        debug!(base, quote, price, "Fetched exchange price");
        Ok(price)
    }
}

impl<E: ExchangeApi> PriceFetcher for ExchangeFetcher<E> {
    fn add_pair(&self, base: &str, quote: &str) {
        self.pairs.add(base, quote);
    }

    fn has_pair(&self, base: &str, quote: &str) -> bool {
        self.pairs.contains(base, quote)
    }
}
