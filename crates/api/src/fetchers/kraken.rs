use std::collections::HashMap;

use serde::Deserialize;

use super::{str_to_positive_f64, ExchangeApi, ExchangeFetcher};
use crate::error::{FetchError, FetchResult};

/// Kraken public ticker. The result object is keyed by Kraken's own pair name
/// (e.g. `XETHZUSD`), so the first entry is used.
#[derive(Debug, Clone, Copy)]
pub struct Kraken;

pub type KrakenFetcher = ExchangeFetcher<Kraken>;

#[derive(Debug, Deserialize)]
pub struct KrakenPriceResponse {
    #[serde(default)]
    pub result: HashMap<String, KrakenTicker>,
}

#[derive(Debug, Deserialize)]
pub struct KrakenTicker {
    /// Last trade closed: `[price, lot volume]`.
    #[serde(default)]
    pub c: Vec<String>,
}

impl ExchangeApi for Kraken {
    const NAME: &'static str = "Kraken";

    type Response = KrakenPriceResponse;

    fn price_url(base: &str, quote: &str) -> String {
        format!("https://api.kraken.com/0/public/Ticker?pair={base}{quote}")
    }

    fn extract_price(response: Self::Response) -> FetchResult<f64> {
        let price = response
            .result
            .values()
            .next()
            .and_then(|ticker| ticker.c.first())
            .ok_or(FetchError::InvalidResponseData)?;
        str_to_positive_f64(price)
    }
}

#[cfg(test)]
pub(crate) fn sample_response(price: &str) -> serde_json::Value {
    serde_json::json!({
        "error": [],
        "result": { "XETHZUSD": { "a": ["4715.0", "1", "1.0"], "c": [price, "0.1"] } }
    })
}
