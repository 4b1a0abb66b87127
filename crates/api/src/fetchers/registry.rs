//! Name → constructor table for every implemented fetcher.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use tracing::debug;

use super::{
    EvmGasPriceFetcher, EvmGasPriceFetcherConfig, ExchangeApi, ExchangeFetcher, PriceFetcher,
    XExchangeFetcher, XExchangeTokensPair, EVM_GAS_PRICE_STATION, XEXCHANGE,
};
use super::{Binance, Bitfinex, Cryptocom, Gemini, Hitbtc, Huobi, Kraken, Okx};
use crate::error::{FetchError, FetchResult};
use crate::transport::{GraphqlGetter, ResponseGetter};

/// Everything a fetcher constructor may need.
#[derive(Clone)]
pub struct FetcherArgs {
    pub response_getter: Arc<dyn ResponseGetter>,
    pub graphql_getter: Arc<dyn GraphqlGetter>,
    pub evm_gas_config: EvmGasPriceFetcherConfig,
    /// `BASE-QUOTE` → token identifiers, used by xExchange.
    pub xexchange_tokens: HashMap<String, XExchangeTokensPair>,
}

pub type FetcherConstructor = fn(&FetcherArgs) -> FetchResult<Arc<dyn PriceFetcher>>;

#[derive(Clone, Default)]
pub struct FetcherRegistry {
    constructors: BTreeMap<&'static str, FetcherConstructor>,
}

impl FetcherRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding all exchanges plus the gas price station.
    pub fn with_defaults() -> Self {
        Self::new()
            .with(Binance::NAME, exchange::<Binance>)
            .with(Bitfinex::NAME, exchange::<Bitfinex>)
            .with(Cryptocom::NAME, exchange::<Cryptocom>)
            .with(Gemini::NAME, exchange::<Gemini>)
            .with(Hitbtc::NAME, exchange::<Hitbtc>)
            .with(Huobi::NAME, exchange::<Huobi>)
            .with(Kraken::NAME, exchange::<Kraken>)
            .with(Okx::NAME, exchange::<Okx>)
            .with(XEXCHANGE, xexchange)
            .with(EVM_GAS_PRICE_STATION, evm_gas_station)
    }

    /// Register (or replace) a constructor.
    pub fn with(mut self, name: &'static str, constructor: FetcherConstructor) -> Self {
        self.constructors.insert(name, constructor);
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.constructors.contains_key(name)
    }

    pub fn create(&self, name: &str, args: &FetcherArgs) -> FetchResult<Arc<dyn PriceFetcher>> {
        let constructor = self
            .constructors
            .get(name)
            .ok_or_else(|| FetchError::InvalidFetcherName(name.to_string()))?;
        debug!(fetcher = name, "Creating price fetcher");
        constructor(args)
    }

    /// Names of the price exchanges, i.e. every fetcher except the gas station.
    pub fn exchange_names(&self) -> Vec<&'static str> {
        self.constructors
            .keys()
            .copied()
            .filter(|name| *name != EVM_GAS_PRICE_STATION)
            .collect()
    }

    /// Build one fetcher per exchange name.
    pub fn create_exchanges(&self, args: &FetcherArgs) -> FetchResult<Vec<Arc<dyn PriceFetcher>>> {
        self.exchange_names()
            .into_iter()
            .map(|name| self.create(name, args))
            .collect()
    }
}

fn exchange<E: ExchangeApi>(args: &FetcherArgs) -> FetchResult<Arc<dyn PriceFetcher>> {
    Ok(Arc::new(ExchangeFetcher::<E>::new(args.response_getter.clone())))
}

fn xexchange(args: &FetcherArgs) -> FetchResult<Arc<dyn PriceFetcher>> {
    Ok(Arc::new(XExchangeFetcher::new(
        args.graphql_getter.clone(),
        args.xexchange_tokens.clone(),
    )))
}

fn evm_gas_station(args: &FetcherArgs) -> FetchResult<Arc<dyn PriceFetcher>> {
    Ok(Arc::new(EvmGasPriceFetcher::new(
        args.response_getter.clone(),
        &args.evm_gas_config,
    )?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportError;
    use crate::fetchers::test_support::StubGetter;
    use async_trait::async_trait;

    struct NoGraphql;

    #[async_trait]
    impl GraphqlGetter for NoGraphql {
        async fn query(&self, url: &str, _: &str, _: &str) -> Result<Vec<u8>, TransportError> {
            Err(TransportError::Status {
                url: url.to_string(),
                status: 500,
                body: String::new(),
            })
        }
    }

    fn args() -> FetcherArgs {
        FetcherArgs {
            response_getter: StubGetter::failing(),
            graphql_getter: Arc::new(NoGraphql),
            evm_gas_config: EvmGasPriceFetcherConfig {
                api_url: "https://gas.example.org/api".to_string(),
                selector: "result.SafeGasPrice".to_string(),
            },
            xexchange_tokens: HashMap::new(),
        }
    }

    #[test]
    fn test_unknown_name_is_rejected() {
        let Err(err) = FetcherRegistry::with_defaults().create("Coinbase", &args()) else {
            panic!("unknown fetcher name was accepted");
        };
        assert!(matches!(err, FetchError::InvalidFetcherName(name) if name == "Coinbase"));
    }

    #[test]
    fn test_every_registered_name_creates_matching_fetcher() {
        let registry = FetcherRegistry::with_defaults();
        let args = args();
        for name in registry.exchange_names().into_iter().chain([EVM_GAS_PRICE_STATION]) {
            let fetcher = registry.create(name, &args).unwrap();
            assert_eq!(fetcher.name(), name);
        }
    }

    #[test]
    fn test_exchange_names_exclude_gas_station() {
        let names = FetcherRegistry::with_defaults().exchange_names();
        assert_eq!(names.len(), 9);
        assert!(names.contains(&"Crypto.com"));
        assert!(names.contains(&XEXCHANGE));
        assert!(!names.contains(&EVM_GAS_PRICE_STATION));

        let registry = FetcherRegistry::with_defaults();
        assert!(registry.contains(EVM_GAS_PRICE_STATION));
        assert!(registry.contains("Kraken"));
        assert!(!registry.contains("kraken"));
    }

    #[test]
    fn test_gas_station_config_errors_propagate() {
        let mut args = args();
        args.evm_gas_config.selector.clear();
        let Err(err) = FetcherRegistry::with_defaults().create(EVM_GAS_PRICE_STATION, &args) else {
            panic!("empty selector was accepted");
        };
        assert!(matches!(err, FetchError::InvalidGasPriceSelector(_)));
    }
}
