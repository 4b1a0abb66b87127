use serde::Deserialize;

use super::{str_to_positive_f64, ExchangeApi, ExchangeFetcher, QUOTE_USDT};
use crate::error::{FetchError, FetchResult};

#[derive(Debug, Clone, Copy)]
pub struct Okx;

pub type OkxFetcher = ExchangeFetcher<Okx>;

#[derive(Debug, Deserialize)]
pub struct OkxPriceResponse {
    #[serde(default)]
    pub data: Vec<OkxTicker>,
}

#[derive(Debug, Deserialize)]
pub struct OkxTicker {
    #[serde(default)]
    pub last: String,
}

impl ExchangeApi for Okx {
    const NAME: &'static str = "Okx";
    const USD_ALIAS: Option<&'static str> = Some(QUOTE_USDT);

    type Response = OkxPriceResponse;

    fn price_url(base: &str, quote: &str) -> String {
        format!("https://www.okx.com/api/v5/market/ticker?instId={base}-{quote}")
    }

    fn extract_price(response: Self::Response) -> FetchResult<f64> {
        let ticker = response.data.first().ok_or(FetchError::InvalidResponseData)?;
        str_to_positive_f64(&ticker.last)
    }
}

#[cfg(test)]
pub(crate) fn sample_response(price: &str) -> serde_json::Value {
    serde_json::json!({ "code": "0", "msg": "", "data": [{ "instId": "ETH-USDT", "last": price }] })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_price_url() {
        assert_eq!(
            Okx::price_url("ETH", Okx::normalize_quote("USD")),
            "https://www.okx.com/api/v5/market/ticker?instId=ETH-USDT"
        );
    }
}
