use serde::Deserialize;

use super::{str_to_positive_f64, ExchangeApi, ExchangeFetcher};
use crate::error::FetchResult;

#[derive(Debug, Clone, Copy)]
pub struct Gemini;

pub type GeminiFetcher = ExchangeFetcher<Gemini>;

#[derive(Debug, Deserialize)]
pub struct GeminiPriceResponse {
    #[serde(default)]
    pub last: String,
}

impl ExchangeApi for Gemini {
    const NAME: &'static str = "Gemini";

    type Response = GeminiPriceResponse;

    fn price_url(base: &str, quote: &str) -> String {
        format!("https://api.gemini.com/v1/pubticker/{base}{quote}")
    }

    fn extract_price(response: Self::Response) -> FetchResult<f64> {
        str_to_positive_f64(&response.last)
    }
}

#[cfg(test)]
pub(crate) fn sample_response(price: &str) -> serde_json::Value {
    serde_json::json!({ "bid": "4714.0", "ask": "4715.0", "last": price })
}
