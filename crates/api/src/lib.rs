//! Price source clients for external services.
//!
//! This crate provides:
//! - Transport: `reqwest` backed JSON GET and GraphQL POST behind small traits
//! - Fetchers: one per exchange (Binance, Bitfinex, Crypto.com, Gemini, HitBTC,
//!   Huobi, Kraken, Okx, xExchange) plus the EVM gas price station
//! - A name → constructor registry used at startup

mod error;
pub mod fetchers;
mod transport;

pub use error::{FetchError, FetchResult, TransportError};
pub use fetchers::{
    str_to_positive_f64, EvmGasPriceFetcher, EvmGasPriceFetcherConfig, ExchangeApi, ExchangeFetcher,
    FetcherArgs, FetcherRegistry, PairRegistry, PriceFetcher, PriceSource, XExchangeFetcher,
    XExchangeTokensPair, ETH_TICKER, EVM_GAS_PRICE_STATION, GWEI_TICKER, QUOTE_USDT, QUOTE_USD_FIAT,
    XEXCHANGE,
};
pub use transport::{get_json, GraphqlGetter, HttpResponseGetter, ResponseGetter};
