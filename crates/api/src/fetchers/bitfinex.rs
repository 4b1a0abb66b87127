use serde::Deserialize;

use super::{str_to_positive_f64, ExchangeApi, ExchangeFetcher};
use crate::error::FetchResult;

/// Bitfinex v1 public ticker. Lists fiat USD directly.
#[derive(Debug, Clone, Copy)]
pub struct Bitfinex;

pub type BitfinexFetcher = ExchangeFetcher<Bitfinex>;

#[derive(Debug, Deserialize)]
pub struct BitfinexPriceResponse {
    #[serde(default)]
    pub last_price: String,
}

impl ExchangeApi for Bitfinex {
    const NAME: &'static str = "Bitfinex";

    type Response = BitfinexPriceResponse;

    fn price_url(base: &str, quote: &str) -> String {
        format!("https://api.bitfinex.com/v1/pubticker/{base}{quote}")
    }

    fn extract_price(response: Self::Response) -> FetchResult<f64> {
        str_to_positive_f64(&response.last_price)
    }
}

#[cfg(test)]
pub(crate) fn sample_response(price: &str) -> serde_json::Value {
    serde_json::json!({
        "mid": "4714.5",
        "bid": "4714.0",
        "ask": "4715.0",
        "last_price": price,
        "timestamp": "1638297862.5"
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetchers::test_support::StubGetter;
    use crate::fetchers::{PriceFetcher, PriceSource};

    #[tokio::test]
    async fn test_keeps_fiat_usd_quote() {
        let getter = StubGetter::returning(sample_response("4714.05"));
        let fetcher = BitfinexFetcher::new(getter.clone());
        fetcher.add_pair("BTC", "USD");

        fetcher.fetch_price("BTC", "USD").await.unwrap();
        assert_eq!(
            getter.last_url().as_deref(),
            Some("https://api.bitfinex.com/v1/pubticker/BTCUSD")
        );
    }
}
