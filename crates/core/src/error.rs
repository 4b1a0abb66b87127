//! Error kinds of the oracle core.
//!
//! Construction failures and per-cycle failures are separate variants so the
//! scheduler can tell "refuse to start" from "skip this tick".

use std::time::Duration;

use oracle_api::FetchError;
use thiserror::Error;

/// Invalid pair definition or a price that cannot be denominated.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PairError {
    #[error("empty base ticker")]
    EmptyBase,

    #[error("empty quote ticker")]
    EmptyQuote,

    #[error("invalid decimals {0}, maximum is {max}", max = crate::pair::MAX_DECIMALS)]
    InvalidDecimals(u32),

    #[error("invalid percent difference to notify {0}")]
    InvalidThreshold(f64),

    #[error("price {price} cannot be denominated with {decimals} decimals")]
    Denomination { price: f64, decimals: u32 },
}

/// Aggregator construction errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AggregatorError {
    #[error("invalid min results num {0}, must be at least 1")]
    InvalidMinResultsNum(usize),

    #[error("not enough fetchers: got {got}, min results num is {required}")]
    NotEnoughFetchers { got: usize, required: usize },
}

#[derive(Debug, Error)]
pub enum GasPriceError {
    /// No `GWEI/*` pair in the input. Callers treat this as "nothing to convert".
    #[error("no gas pairs found for gas price calculation")]
    NoGasPairs,

    #[error("missing pairs for gas price conversion: {}", .0.join(", "))]
    MissingPairs(Vec<String>),

    #[error("ETH/USD price is zero, gas price calculation not possible")]
    EthUsdPriceZero,

    /// `X/USD` is zero or not finite after trimming, so `GWEI/X` cannot be derived.
    #[error("{0}/USD price is {1}, gas price conversion not possible")]
    TokenUsdPriceInvalid(String, f64),

    #[error("failed to fetch gas price in GWEI: {0}")]
    GasFetch(#[source] FetchError),
}

#[derive(Debug, Error)]
pub enum NotifierError {
    #[error("empty pairs list")]
    EmptyPairs,

    #[error("invalid auto send interval {got:?}, minimum {min:?}")]
    InvalidAutoSendInterval { min: Duration, got: Duration },

    #[error("invalid pair at index {index}: {source}")]
    InvalidPair {
        index: usize,
        #[source]
        source: PairError,
    },

    #[error("gas pairs configured: {0}")]
    MissingGasPairs(#[source] GasPriceError),

    #[error("gas pairs configured but no gas price service provided")]
    MissingGasPriceService,

    #[error("{source} while querying the pair {base}-{quote}")]
    Fetch {
        base: String,
        quote: String,
        #[source]
        source: FetchError,
    },

    #[error("gas price conversion failed: {0}")]
    GasConversion(#[source] GasPriceError),

    #[error("price notifee failed: {0:#}")]
    Notifee(anyhow::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PollingError {
    #[error("{0} must be greater than zero")]
    ZeroInterval(&'static str),

    #[error("polling handler {0} already started")]
    AlreadyStarted(String),
}
