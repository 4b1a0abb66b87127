use serde::Deserialize;

use super::{price_field_to_f64, ExchangeApi, ExchangeFetcher, PriceField, QUOTE_USDT};
use crate::error::FetchResult;

/// Huobi merged market detail. Symbols are lower-case and the close price is numeric.
#[derive(Debug, Clone, Copy)]
pub struct Huobi;

pub type HuobiFetcher = ExchangeFetcher<Huobi>;

#[derive(Debug, Deserialize)]
pub struct HuobiPriceResponse {
    #[serde(default)]
    pub tick: HuobiTick,
}

#[derive(Debug, Default, Deserialize)]
pub struct HuobiTick {
    pub close: Option<PriceField>,
}

impl ExchangeApi for Huobi {
    const NAME: &'static str = "Huobi";
    const USD_ALIAS: Option<&'static str> = Some(QUOTE_USDT);

    type Response = HuobiPriceResponse;

    fn price_url(base: &str, quote: &str) -> String {
        format!(
            "https://api.huobi.pro/market/detail/merged?symbol={}{}",
            base.to_lowercase(),
            quote.to_lowercase()
        )
    }

    fn extract_price(response: Self::Response) -> FetchResult<f64> {
        price_field_to_f64(response.tick.close.as_ref())
    }
}

/// Numeric `close` when `price` parses, raw text otherwise.
#[cfg(test)]
pub(crate) fn sample_response(price: &str) -> serde_json::Value {
    let close = match price.parse::<f64>() {
        Ok(number) => serde_json::json!(number),
        Err(_) if price.is_empty() => serde_json::Value::Null,
        Err(_) => serde_json::json!(price),
    };
    serde_json::json!({ "status": "ok", "tick": { "close": close, "vol": 1.5 } })
}
