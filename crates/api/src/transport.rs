//! HTTP transport used by the price fetchers.
//!
//! Fetchers never talk to `reqwest` directly: they receive a [`ResponseGetter`]
//! (plain GET + JSON decode) or a [`GraphqlGetter`] so tests can inject canned
//! payloads.

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, instrument};

use crate::error::TransportError;

/// Component able to GET a URL and decode the JSON body.
#[async_trait]
pub trait ResponseGetter: Send + Sync {
    async fn get(&self, url: &str) -> Result<Value, TransportError>;
}

/// Component able to run a GraphQL query against a URL.
#[async_trait]
pub trait GraphqlGetter: Send + Sync {
    /// `variables` is the JSON-encoded variables object.
    async fn query(&self, url: &str, query: &str, variables: &str) -> Result<Vec<u8>, TransportError>;
}

/// GET `url` and decode the body into `T`.
pub async fn get_json<T: DeserializeOwned>(
    getter: &dyn ResponseGetter,
    url: &str,
) -> Result<T, TransportError> {
    let value = getter.get(url).await?;
    serde_json::from_value(value).map_err(|source| TransportError::Decode {
        url: url.to_string(),
        source,
    })
}

/// `reqwest` backed implementation of both transport traits.
#[derive(Debug, Clone)]
pub struct HttpResponseGetter {
    client: reqwest::Client,
}

impl HttpResponseGetter {
    pub fn with_timeout(timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(TransportError::Client)?;
        Ok(Self { client })
    }

    async fn read_body(url: &str, response: reqwest::Response) -> Result<Vec<u8>, TransportError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::Status {
                url: url.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response.bytes().await.map_err(|source| TransportError::Request {
            url: url.to_string(),
            source,
        })?;
        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl ResponseGetter for HttpResponseGetter {
    #[instrument(skip(self))]
    async fn get(&self, url: &str) -> Result<Value, TransportError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| TransportError::Request {
                url: url.to_string(),
                source,
            })?;

        let body = Self::read_body(url, response).await?;
        debug!(url, bytes = body.len(), "Received response");

        serde_json::from_slice(&body).map_err(|source| TransportError::Decode {
            url: url.to_string(),
            source,
        })
    }
}

#[async_trait]
impl GraphqlGetter for HttpResponseGetter {
    #[instrument(skip(self, query))]
    async fn query(&self, url: &str, query: &str, variables: &str) -> Result<Vec<u8>, TransportError> {
        let variables: Value =
            serde_json::from_str(variables).map_err(|source| TransportError::Decode {
                url: url.to_string(),
                source,
            })?;
        let payload = serde_json::json!({
            "query": query,
            "variables": variables,
        });

        let response = self
            .client
            .post(url)
            .json(&payload)
            .send()
            .await
            .map_err(|source| TransportError::Request {
                url: url.to_string(),
                source,
            })?;

        Self::read_body(url, response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    struct FixedGetter(Value);

    #[async_trait]
    impl ResponseGetter for FixedGetter {
        async fn get(&self, _url: &str) -> Result<Value, TransportError> {
            Ok(self.0.clone())
        }
    }

    #[derive(Debug, Deserialize)]
    struct Ticker {
        price: String,
    }

    #[tokio::test]
    async fn test_get_json_decodes_into_target() {
        let getter = FixedGetter(serde_json::json!({ "price": "12.5", "extra": 1 }));
        let ticker: Ticker = get_json(&getter, "http://localhost").await.unwrap();
        assert_eq!(ticker.price, "12.5");
    }

    #[tokio::test]
    async fn test_get_json_reports_decode_errors() {
        let getter = FixedGetter(serde_json::json!({ "other": true }));
        let err = get_json::<Ticker>(&getter, "http://localhost").await.unwrap_err();
        assert!(matches!(err, TransportError::Decode { .. }));
    }

    #[test]
    fn test_http_getter_builds() {
        assert!(HttpResponseGetter::with_timeout(Duration::from_secs(1)).is_ok());
    }
}
