use serde::Deserialize;

use super::{str_to_positive_f64, ExchangeApi, ExchangeFetcher, QUOTE_USDT};
use crate::error::FetchResult;

#[derive(Debug, Clone, Copy)]
pub struct Hitbtc;

pub type HitbtcFetcher = ExchangeFetcher<Hitbtc>;

#[derive(Debug, Deserialize)]
pub struct HitbtcPriceResponse {
    #[serde(default)]
    pub last: String,
}

impl ExchangeApi for Hitbtc {
    const NAME: &'static str = "HitBTC";
    const USD_ALIAS: Option<&'static str> = Some(QUOTE_USDT);

    type Response = HitbtcPriceResponse;

    fn price_url(base: &str, quote: &str) -> String {
        format!("https://api.hitbtc.com/api/3/public/ticker/{base}{quote}")
    }

    fn extract_price(response: Self::Response) -> FetchResult<f64> {
        str_to_positive_f64(&response.last)
    }
}

#[cfg(test)]
pub(crate) fn sample_response(price: &str) -> serde_json::Value {
    serde_json::json!({ "ask": "4715.0", "bid": "4714.0", "last": price, "volume": "10.5" })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_price_url_with_usdt() {
        let quote = Hitbtc::normalize_quote("USD");
        assert_eq!(
            Hitbtc::price_url("BTC", quote),
            "https://api.hitbtc.com/api/3/public/ticker/BTCUSDT"
        );
    }
}
