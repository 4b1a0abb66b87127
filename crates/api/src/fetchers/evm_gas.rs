//! Gas price station fetcher.
//!
//! Reads a gas price (in GWEI) out of an arbitrary JSON API using a dotted
//! field path such as `result.SafeGasPrice`. Numeric segments index arrays.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, instrument};

use super::{positive, str_to_positive_f64, PairRegistry, PriceFetcher, PriceSource};
use crate::error::{FetchError, FetchResult};
use crate::transport::ResponseGetter;

pub const EVM_GAS_PRICE_STATION: &str = "EVMGasPriceStation";

/// Where to read the gas price from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvmGasPriceFetcherConfig {
    /// Gas station endpoint.
    #[serde(default)]
    pub api_url: String,

    /// Dotted path of the price field inside the response.
    #[serde(default)]
    pub selector: String,
}

pub struct EvmGasPriceFetcher {
    getter: Arc<dyn ResponseGetter>,
    pairs: PairRegistry,
    api_url: String,
    path: Vec<String>,
}

impl std::fmt::Debug for EvmGasPriceFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvmGasPriceFetcher")
            .field("api_url", &self.api_url)
            .field("path", &self.path)
            .finish()
    }
}

impl EvmGasPriceFetcher {
    pub fn new(getter: Arc<dyn ResponseGetter>, config: &EvmGasPriceFetcherConfig) -> FetchResult<Self> {
        let api_url = config.api_url.trim();
        if !(api_url.starts_with("http://") || api_url.starts_with("https://")) {
            return Err(FetchError::InvalidApiUrl(config.api_url.clone()));
        }

        let path: Vec<String> = config.selector.split('.').map(str::to_string).collect();
        if path.iter().any(|segment| segment.trim().is_empty()) {
            return Err(FetchError::InvalidGasPriceSelector(config.selector.clone()));
        }

        Ok(Self {
            getter,
            pairs: PairRegistry::new(),
            api_url: api_url.to_string(),
            path,
        })
    }

    fn select<'a>(&self, response: &'a Value) -> Option<&'a Value> {
        self.path.iter().try_fold(response, |current, segment| match current {
            Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            Value::Object(fields) => fields.get(segment),
            _ => None,
        })
    }
}

fn leaf_to_price(leaf: Option<&Value>) -> FetchResult<f64> {
    match leaf {
        Some(Value::String(text)) => str_to_positive_f64(text),
        Some(Value::Number(number)) => positive(number.as_f64().ok_or(FetchError::InvalidResponseData)?),
        _ => Err(FetchError::InvalidResponseData),
    }
}

#[async_trait]
impl PriceSource for EvmGasPriceFetcher {
    fn name(&self) -> &str {
        EVM_GAS_PRICE_STATION
    }

    #[instrument(skip(self), fields(exchange = EVM_GAS_PRICE_STATION))]
    async fn fetch_price(&self, base: &str, quote: &str) -> FetchResult<f64> {
        self.pairs.ensure(EVM_GAS_PRICE_STATION, base, quote)?;

        let response = self.getter.get(&self.api_url).await?;
        let price = leaf_to_price(self.select(&response))?;

        debug!(gas_price_gwei = price, "Fetched gas price");
        Ok(price)
    }
}

impl PriceFetcher for EvmGasPriceFetcher {
    fn add_pair(&self, base: &str, quote: &str) {
        self.pairs.add(base, quote);
    }

    fn has_pair(&self, base: &str, quote: &str) -> bool {
        self.pairs.contains(base, quote)
    }
}
