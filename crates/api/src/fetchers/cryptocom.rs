use serde::Deserialize;

use super::{str_to_positive_f64, ExchangeApi, ExchangeFetcher, QUOTE_USDT};
use crate::error::{FetchError, FetchResult};

/// Crypto.com exchange v2 public ticker.
#[derive(Debug, Clone, Copy)]
pub struct Cryptocom;

pub type CryptocomFetcher = ExchangeFetcher<Cryptocom>;

#[derive(Debug, Deserialize)]
pub struct CryptocomPriceResponse {
    #[serde(default)]
    pub result: CryptocomResult,
}

#[derive(Debug, Default, Deserialize)]
pub struct CryptocomResult {
    #[serde(default)]
    pub data: Vec<CryptocomTicker>,
}

#[derive(Debug, Deserialize)]
pub struct CryptocomTicker {
    /// Latest trade price.
    #[serde(default)]
    pub a: String,
}

impl ExchangeApi for Cryptocom {
    const NAME: &'static str = "Crypto.com";
    const USD_ALIAS: Option<&'static str> = Some(QUOTE_USDT);

    type Response = CryptocomPriceResponse;

    fn price_url(base: &str, quote: &str) -> String {
        format!("https://api.crypto.com/v2/public/get-ticker?instrument_name={base}_{quote}")
    }

    fn extract_price(response: Self::Response) -> FetchResult<f64> {
        let ticker = response
            .result
            .data
            .first()
            .ok_or(FetchError::InvalidResponseData)?;
        str_to_positive_f64(&ticker.a)
    }
}

#[cfg(test)]
pub(crate) fn sample_response(price: &str) -> serde_json::Value {
    serde_json::json!({
        "code": 0,
        "method": "public/get-ticker",
        "result": { "data": [{ "i": "ETH_USDT", "a": price }] }
    })
}
