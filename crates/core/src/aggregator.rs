//! Quorum/median price aggregation over several exchange fetchers.
//!
//! A single failing or slow exchange never blocks publication: failed sources
//! only reduce the sample count. Publishing below `min_results_num` samples is
//! refused.

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;
use oracle_api::{FetchError, FetchResult, PriceFetcher, PriceSource};
use tracing::{debug, instrument, warn};

use crate::error::AggregatorError;
use crate::pair::Pair;

pub const PRICE_AGGREGATOR: &str = "price aggregator";

pub struct PriceAggregator {
    fetchers: Vec<Arc<dyn PriceFetcher>>,
    min_results_num: usize,
}

impl PriceAggregator {
    pub fn new(
        fetchers: Vec<Arc<dyn PriceFetcher>>,
        min_results_num: usize,
    ) -> Result<Self, AggregatorError> {
        if min_results_num < 1 {
            return Err(AggregatorError::InvalidMinResultsNum(min_results_num));
        }
        if fetchers.len() < min_results_num {
            return Err(AggregatorError::NotEnoughFetchers {
                got: fetchers.len(),
                required: min_results_num,
            });
        }

        Ok(Self {
            fetchers,
            min_results_num,
        })
    }

    pub fn min_results_num(&self) -> usize {
        self.min_results_num
    }

    /// Register `pair` on every fetcher named in its exchange set.
    pub fn add_pair(&self, pair: &Pair) {
        for fetcher in &self.fetchers {
            if pair.exchanges.contains(fetcher.name()) {
                fetcher.add_pair(&pair.base, &pair.quote);
                debug!(pair = %pair, exchange = fetcher.name(), "Registered pair on fetcher");
            }
        }
    }
}

#[async_trait]
impl PriceSource for PriceAggregator {
    fn name(&self) -> &str {
        PRICE_AGGREGATOR
    }

    #[instrument(skip(self))]
    async fn fetch_price(&self, base: &str, quote: &str) -> FetchResult<f64> {
        let queries = self
            .fetchers
            .iter()
            .filter(|fetcher| fetcher.has_pair(base, quote))
            .map(|fetcher| async move { (fetcher.name(), fetcher.fetch_price(base, quote).await) });

        let mut prices = Vec::with_capacity(self.fetchers.len());
        for (exchange, result) in join_all(queries).await {
            match result {
                Ok(price) => prices.push(price),
                Err(e) => warn!(exchange, base, quote, error = %e, "Price fetcher failed"),
            }
        }

        if prices.len() < self.min_results_num {
            return Err(FetchError::NotEnoughResults {
                base: base.to_string(),
                quote: quote.to_string(),
                got: prices.len(),
                required: self.min_results_num,
            });
        }

        let price = median(&mut prices);
        debug!(base, quote, price, samples = prices.len(), "Aggregated price");
        Ok(price)
    }
}

/// Median of a non-empty sample; an even count averages the two central values.
fn median(prices: &mut [f64]) -> f64 {
    prices.sort_by(f64::total_cmp);
    let mid = prices.len() / 2;
    if prices.len() % 2 == 0 {
        (prices[mid - 1] + prices[mid]) / 2.0
    } else {
        prices[mid]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pair::ArgsPair;
    use oracle_api::PairRegistry;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StubFetcher {
        name: String,
        price: Option<f64>,
        pairs: PairRegistry,
        calls: AtomicUsize,
    }

    impl StubFetcher {
        fn new(name: &str, price: Option<f64>) -> Arc<Self> {
            Arc::new(Self {
                name: name.to_string(),
                price,
                pairs: PairRegistry::new(),
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl PriceSource for StubFetcher {
        fn name(&self) -> &str {
            &self.name
        }

        async fn fetch_price(&self, base: &str, quote: &str) -> FetchResult<f64> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.pairs.ensure(&self.name, base, quote)?;
            self.price.ok_or(FetchError::InvalidResponseData)
        }
    }

    impl PriceFetcher for StubFetcher {
        fn add_pair(&self, base: &str, quote: &str) {
            self.pairs.add(base, quote);
        }

        fn has_pair(&self, base: &str, quote: &str) -> bool {
            self.pairs.contains(base, quote)
        }
    }

    fn eth_usd(exchanges: &[&str]) -> Pair {
        Pair::new(&ArgsPair {
            base: "ETH".to_string(),
            quote: "USD".to_string(),
            percent_difference_to_notify: 1.0,
            decimals: 2,
            exchanges: exchanges.iter().map(|e| e.to_string()).collect(),
        })
        .unwrap()
    }

    fn aggregator(stubs: &[Arc<StubFetcher>], min_results_num: usize) -> PriceAggregator {
        let fetchers = stubs
            .iter()
            .map(|stub| stub.clone() as Arc<dyn PriceFetcher>)
            .collect();
        PriceAggregator::new(fetchers, min_results_num).unwrap()
    }

    #[test]
    fn test_new_validates_arguments() {
        let stub: Arc<dyn PriceFetcher> = StubFetcher::new("a", Some(1.0));
        assert!(matches!(
            PriceAggregator::new(vec![stub.clone()], 0),
            Err(AggregatorError::InvalidMinResultsNum(0))
        ));
        assert!(matches!(
            PriceAggregator::new(vec![stub], 2),
            Err(AggregatorError::NotEnoughFetchers { got: 1, required: 2 })
        ));
    }

    #[test]
    fn test_median() {
        assert_eq!(median(&mut [3.0]), 3.0);
        assert_eq!(median(&mut [5.0, 1.0, 3.0]), 3.0);
        assert_eq!(median(&mut [4.0, 1.0, 3.0, 2.0]), 2.5);
        assert_eq!(median(&mut [10.0, 1.0]), 5.5);
    }

    #[tokio::test]
    async fn test_add_pair_fans_out_by_exchange_name() {
        let stubs = [
            StubFetcher::new("Binance", Some(1.0)),
            StubFetcher::new("Kraken", Some(1.0)),
            StubFetcher::new("Okx", Some(1.0)),
        ];
        let aggregator = aggregator(&stubs, 1);
        aggregator.add_pair(&eth_usd(&["Binance", "Okx"]));

        assert!(stubs[0].has_pair("ETH", "USD"));
        assert!(!stubs[1].has_pair("ETH", "USD"));
        assert!(stubs[2].has_pair("ETH", "USD"));
    }

    #[tokio::test]
    async fn test_only_eligible_fetchers_are_queried() {
        let stubs = [StubFetcher::new("Binance", Some(2.0)), StubFetcher::new("Kraken", Some(4.0))];
        let aggregator = aggregator(&stubs, 1);
        aggregator.add_pair(&eth_usd(&["Binance"]));

        assert_eq!(aggregator.fetch_price("ETH", "USD").await.unwrap(), 2.0);
        assert_eq!(stubs[0].calls.load(Ordering::SeqCst), 1);
        assert_eq!(stubs[1].calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_median_of_successful_samples() {
        let stubs = [
            StubFetcher::new("a", Some(100.0)),
            StubFetcher::new("b", Some(103.0)),
            StubFetcher::new("c", None),
            StubFetcher::new("d", Some(101.0)),
            StubFetcher::new("e", Some(110.0)),
        ];
        let aggregator = aggregator(&stubs, 3);
        aggregator.add_pair(&eth_usd(&["a", "b", "c", "d", "e"]));

        // 100, 101, 103, 110
        assert_eq!(aggregator.fetch_price("ETH", "USD").await.unwrap(), 102.0);
    }

    #[tokio::test]
    async fn test_quorum_failure() {
        let stubs = [
            StubFetcher::new("a", Some(100.0)),
            StubFetcher::new("b", None),
            StubFetcher::new("c", None),
        ];
        let aggregator = aggregator(&stubs, 2);
        aggregator.add_pair(&eth_usd(&["a", "b", "c"]));

        let err = aggregator.fetch_price("ETH", "USD").await.unwrap_err();
        assert!(err.is_quorum_failure());
        assert!(matches!(err, FetchError::NotEnoughResults { got: 1, required: 2, .. }));
    }

    #[tokio::test]
    async fn test_unknown_pair_fails_quorum() {
        let stubs = [StubFetcher::new("a", Some(100.0))];
        let aggregator = aggregator(&stubs, 1);

        let err = aggregator.fetch_price("BTC", "USD").await.unwrap_err();
        assert!(matches!(err, FetchError::NotEnoughResults { got: 0, .. }));
        assert_eq!(aggregator.name(), PRICE_AGGREGATOR);
    }
}
