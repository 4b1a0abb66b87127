use serde::Deserialize;

use super::{str_to_positive_f64, ExchangeApi, ExchangeFetcher, QUOTE_USDT};
use crate::error::FetchResult;

/// Binance spot ticker.
#[derive(Debug, Clone, Copy)]
pub struct Binance;

pub type BinanceFetcher = ExchangeFetcher<Binance>;

#[derive(Debug, Deserialize)]
pub struct BinancePriceResponse {
    #[serde(default)]
    pub price: String,
}

impl ExchangeApi for Binance {
    const NAME: &'static str = "Binance";
    const USD_ALIAS: Option<&'static str> = Some(QUOTE_USDT);

    type Response = BinancePriceResponse;

    fn price_url(base: &str, quote: &str) -> String {
        format!("https://api.binance.com/api/v3/ticker/price?symbol={base}{quote}")
    }

    fn extract_price(response: Self::Response) -> FetchResult<f64> {
        str_to_positive_f64(&response.price)
    }
}

#[cfg(test)]
pub(crate) fn sample_response(price: &str) -> serde_json::Value {
    serde_json::json!({ "symbol": "ETHUSDT", "price": price })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetchers::test_support::StubGetter;
    use crate::fetchers::{PriceFetcher, PriceSource};

    #[tokio::test]
    async fn test_requests_usdt_symbol_for_usd_quote() {
        let getter = StubGetter::returning(sample_response("2000.5"));
        let fetcher = BinanceFetcher::new(getter.clone());
        fetcher.add_pair("ETH", "USD");

        assert_eq!(fetcher.fetch_price("ETH", "USD").await.unwrap(), 2000.5);
        assert_eq!(
            getter.last_url().as_deref(),
            Some("https://api.binance.com/api/v3/ticker/price?symbol=ETHUSDT")
        );
    }

    #[test]
    fn test_missing_price_field_is_invalid() {
        let response: BinancePriceResponse = serde_json::from_value(serde_json::json!({})).unwrap();
        assert!(Binance::extract_price(response).is_err());
    }
}
