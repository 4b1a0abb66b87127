//! Error types for the transport boundary and the fetcher family.

use std::num::ParseFloatError;

use thiserror::Error;

/// Failures of the HTTP/GraphQL transport.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to build http client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} responded with status {status}: {body}")]
    Status {
        url: String,
        status: u16,
        body: String,
    },

    #[error("failed to decode response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Errors produced while fetching a price from a single source or a set of sources.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("pair {base}/{quote} is not supported by {fetcher}")]
    PairNotSupported {
        fetcher: String,
        base: String,
        quote: String,
    },

    #[error("invalid response data")]
    InvalidResponseData,

    #[error("invalid price value: {0}")]
    InvalidNumber(#[from] ParseFloatError),

    #[error("invalid pair {base}/{quote}: no token identifiers mapped")]
    InvalidPair { base: String, quote: String },

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("not enough results for {base}/{quote}: got {got}, required {required}")]
    NotEnoughResults {
        base: String,
        quote: String,
        got: usize,
        required: usize,
    },

    #[error("invalid fetcher name: {0}")]
    InvalidFetcherName(String),

    #[error("invalid gas price selector: {0:?}")]
    InvalidGasPriceSelector(String),

    #[error("invalid api url: {0:?}")]
    InvalidApiUrl(String),
}

impl FetchError {
    /// True when the error means the source could not provide a quorum of samples.
    pub fn is_quorum_failure(&self) -> bool {
        matches!(self, FetchError::NotEnoughResults { .. })
    }
}

pub type FetchResult<T> = Result<T, FetchError>;
