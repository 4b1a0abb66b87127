//! xExchange (MultiversX DEX) fetcher.
//!
//! Prices come from the data API over GraphQL. Tickers have to be mapped to
//! on-chain token identifiers first; the mapping is keyed by `BASE-QUOTE`.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use super::{price_field_to_f64, PairRegistry, PriceField, PriceFetcher, PriceSource};
use crate::error::{FetchError, FetchResult, TransportError};
use crate::transport::GraphqlGetter;

pub const XEXCHANGE: &str = "XExchange";

const DATA_API_URL: &str = "https://tools.multiversx.com/data-api/graphql";

const PAIR_PRICE_QUERY: &str = "query XExchangePriceUrl($base: String!, $quote: String!) { \
trading { pair(first_token: $base, second_token: $quote) { price { last time } } } }";

/// On-chain token identifiers of one traded pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct XExchangeTokensPair {
    pub base: String,
    pub quote: String,
}

#[derive(Debug, Serialize)]
struct PairVariables<'a> {
    base: &'a str,
    quote: &'a str,
}

#[derive(Debug, Default, Deserialize)]
struct GraphqlResponse {
    #[serde(default)]
    data: GraphqlData,
}

#[derive(Debug, Default, Deserialize)]
struct GraphqlData {
    #[serde(default)]
    trading: Trading,
}

#[derive(Debug, Default, Deserialize)]
struct Trading {
    #[serde(default)]
    pair: TradingPair,
}

#[derive(Debug, Default, Deserialize)]
struct TradingPair {
    #[serde(default)]
    price: Vec<PricePoint>,
}

#[derive(Debug, Deserialize)]
struct PricePoint {
    last: Option<PriceField>,
}

pub struct XExchangeFetcher {
    getter: Arc<dyn GraphqlGetter>,
    pairs: PairRegistry,
    tokens: HashMap<String, XExchangeTokensPair>,
    url: String,
}

impl XExchangeFetcher {
    pub fn new(getter: Arc<dyn GraphqlGetter>, tokens: HashMap<String, XExchangeTokensPair>) -> Self {
        Self {
            getter,
            pairs: PairRegistry::new(),
            tokens,
            url: DATA_API_URL.to_string(),
        }
    }

    fn tokens_for(&self, base: &str, quote: &str) -> FetchResult<&XExchangeTokensPair> {
        self.tokens
            .get(&format!("{base}-{quote}"))
            .ok_or_else(|| FetchError::InvalidPair {
                base: base.to_string(),
                quote: quote.to_string(),
            })
    }
}

impl fmt::Debug for XExchangeFetcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("XExchangeFetcher")
            .field("url", &self.url)
            .field("pair_count", &self.pairs.len())
            .field("token_mappings", &self.tokens.len())
            .finish()
    }
}

#[async_trait]
impl PriceSource for XExchangeFetcher {
    fn name(&self) -> &str {
        XEXCHANGE
    }

    #[instrument(skip(self), fields(exchange = XEXCHANGE))]
    async fn fetch_price(&self, base: &str, quote: &str) -> FetchResult<f64> {
        self.pairs.ensure(XEXCHANGE, base, quote)?;
        let tokens = self.tokens_for(base, quote)?;

        let variables = serde_json::to_string(&PairVariables {
            base: &tokens.base,
            quote: &tokens.quote,
        })
        .map_err(|source| TransportError::Decode {
            url: self.url.clone(),
            source,
        })?;

        let body = self.getter.query(&self.url, PAIR_PRICE_QUERY, &variables).await?;
        let response: GraphqlResponse =
            serde_json::from_slice(&body).map_err(|source| TransportError::Decode {
                url: self.url.clone(),
                source,
            })?;

        let last = response
            .data
            .trading
            .pair
            .price
            .first()
            .ok_or(FetchError::InvalidResponseData)?
            .last
            .as_ref();
        let price = price_field_to_f64(last)?;

        debug!(base, quote, price, "Fetched xExchange price");
        Ok(price)
    }
}

impl PriceFetcher for XExchangeFetcher {
    fn add_pair(&self, base: &str, quote: &str) {
        self.pairs.add(base, quote);
    }

    fn has_pair(&self, base: &str, quote: &str) -> bool {
        self.pairs.contains(base, quote)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    struct StubGraphql {
        body: Vec<u8>,
        variables: Mutex<Option<String>>,
    }

    impl StubGraphql {
        fn returning(body: serde_json::Value) -> Arc<Self> {
            Arc::new(Self {
                body: body.to_string().into_bytes(),
                variables: Mutex::new(None),
            })
        }
    }

    #[async_trait]
    impl GraphqlGetter for StubGraphql {
        async fn query(&self, _url: &str, _query: &str, variables: &str) -> Result<Vec<u8>, TransportError> {
            *self.variables.lock() = Some(variables.to_string());
            Ok(self.body.clone())
        }
    }

    fn tokens() -> HashMap<String, XExchangeTokensPair> {
        HashMap::from([(
            "EGLD-USD".to_string(),
            XExchangeTokensPair {
                base: "WEGLD-bd4d79".to_string(),
                quote: "USDC-c76f1f".to_string(),
            },
        )])
    }

    fn price_body(last: serde_json::Value) -> serde_json::Value {
        serde_json::json!({
            "data": { "trading": { "pair": { "price": [{ "last": last, "time": "2024-01-01T00:00:00Z" }] } } }
        })
    }

    #[tokio::test]
    async fn test_fetches_mapped_pair() {
        let getter = StubGraphql::returning(price_body(serde_json::json!(42.17)));
        let fetcher = XExchangeFetcher::new(getter.clone(), tokens());
        fetcher.add_pair("EGLD", "USD");

        assert_eq!(fetcher.fetch_price("EGLD", "USD").await.unwrap(), 42.17);

        let variables = getter.variables.lock().clone().unwrap();
        assert!(variables.contains("WEGLD-bd4d79"));
        assert!(variables.contains("USDC-c76f1f"));
    }

    #[tokio::test]
    async fn test_unmapped_pair_is_invalid() {
        let fetcher = XExchangeFetcher::new(StubGraphql::returning(price_body(serde_json::json!(1.0))), tokens());
        fetcher.add_pair("ETH", "USD");

        let err = fetcher.fetch_price("ETH", "USD").await.unwrap_err();
        assert!(matches!(err, FetchError::InvalidPair { .. }));
    }

    #[tokio::test]
    async fn test_empty_price_list_is_invalid_response_data() {
        let body = serde_json::json!({ "data": { "trading": { "pair": { "price": [] } } } });
        let fetcher = XExchangeFetcher::new(StubGraphql::returning(body), tokens());
        fetcher.add_pair("EGLD", "USD");

        let err = fetcher.fetch_price("EGLD", "USD").await.unwrap_err();
        assert!(matches!(err, FetchError::InvalidResponseData));
    }

    #[tokio::test]
    async fn test_non_positive_price_is_invalid_response_data() {
        let fetcher =
            XExchangeFetcher::new(StubGraphql::returning(price_body(serde_json::json!(-1.0))), tokens());
        fetcher.add_pair("EGLD", "USD");

        let err = fetcher.fetch_price("EGLD", "USD").await.unwrap_err();
        assert!(matches!(err, FetchError::InvalidResponseData));
    }

    #[tokio::test]
    async fn test_pair_not_added() {
        let fetcher = XExchangeFetcher::new(StubGraphql::returning(price_body(serde_json::json!(1.0))), tokens());
        let err = fetcher.fetch_price("EGLD", "USD").await.unwrap_err();
        assert!(matches!(err, FetchError::PairNotSupported { .. }));
    }
}
