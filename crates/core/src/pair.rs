//! Monitored base/quote pairs.

use std::collections::HashSet;
use std::fmt;

use oracle_api::GWEI_TICKER;
use serde::{Deserialize, Serialize};

use crate::error::PairError;

/// Largest supported `decimals`; `10^18` still fits in a `u64`.
pub const MAX_DECIMALS: u32 = 18;

/// Pair definition as it comes from configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArgsPair {
    pub base: String,
    pub quote: String,

    /// Threshold in percent. `0` notifies on every fetch.
    #[serde(default)]
    pub percent_difference_to_notify: f64,

    #[serde(default = "default_decimals")]
    pub decimals: u32,

    /// Fetcher names allowed to answer this pair.
    #[serde(default)]
    pub exchanges: Vec<String>,
}

fn default_decimals() -> u32 {
    2
}

/// A validated pair. Immutable after construction.
#[derive(Debug, Clone, PartialEq)]
pub struct Pair {
    pub base: String,
    pub quote: String,
    pub percent_difference_to_notify: f64,
    pub decimals: u32,
    /// `10^decimals`
    pub denomination_factor: u64,
    /// Digits kept by [`Pair::trim`].
    pub trim_precision: u32,
    pub exchanges: HashSet<String>,
}

impl Pair {
    pub fn new(args: &ArgsPair) -> Result<Self, PairError> {
        if args.base.is_empty() {
            return Err(PairError::EmptyBase);
        }
        if args.quote.is_empty() {
            return Err(PairError::EmptyQuote);
        }
        if args.decimals > MAX_DECIMALS {
            return Err(PairError::InvalidDecimals(args.decimals));
        }
        let threshold = args.percent_difference_to_notify;
        if !threshold.is_finite() || threshold < 0.0 {
            return Err(PairError::InvalidThreshold(threshold));
        }

        Ok(Self {
            base: args.base.clone(),
            quote: args.quote.clone(),
            percent_difference_to_notify: threshold,
            decimals: args.decimals,
            denomination_factor: 10u64.pow(args.decimals),
            trim_precision: args.decimals,
            exchanges: args.exchanges.iter().cloned().collect(),
        })
    }

    /// Gas pairs have the synthetic `GWEI` base and are priced by the gas service.
    pub fn is_gas_pair(&self) -> bool {
        self.base == GWEI_TICKER
    }

    /// Round `price` to `trim_precision` decimal digits.
    pub fn trim(&self, price: f64) -> f64 {
        let scale = 10f64.powi(self.trim_precision as i32);
        (price * scale).round() / scale
    }

    /// `round(trim(price) * 10^decimals)` as an on-chain integer.
    pub fn denominate(&self, price: f64) -> Result<u64, PairError> {
        let scaled = (self.trim(price) * self.denomination_factor as f64).round();
        if !scaled.is_finite() || scaled < 0.0 || scaled >= u64::MAX as f64 {
            return Err(PairError::Denomination {
                price,
                decimals: self.decimals,
            });
        }
        Ok(scaled as u64)
    }
}

impl fmt::Display for Pair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.base, self.quote)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(base: &str, quote: &str, decimals: u32) -> ArgsPair {
        ArgsPair {
            base: base.to_string(),
            quote: quote.to_string(),
            percent_difference_to_notify: 1.0,
            decimals,
            exchanges: vec!["Binance".to_string(), "Kraken".to_string()],
        }
    }

    #[test]
    fn test_new_validates() {
        assert_eq!(Pair::new(&args("", "USD", 2)), Err(PairError::EmptyBase));
        assert_eq!(Pair::new(&args("ETH", "", 2)), Err(PairError::EmptyQuote));
        assert_eq!(Pair::new(&args("ETH", "USD", 19)), Err(PairError::InvalidDecimals(19)));
        assert_eq!(
            PairError::InvalidDecimals(19).to_string(),
            "invalid decimals 19, maximum is 18"
        );

        let mut negative = args("ETH", "USD", 2);
        negative.percent_difference_to_notify = -0.5;
        assert!(matches!(Pair::new(&negative), Err(PairError::InvalidThreshold(_))));

        let mut nan = args("ETH", "USD", 2);
        nan.percent_difference_to_notify = f64::NAN;
        assert!(matches!(Pair::new(&nan), Err(PairError::InvalidThreshold(_))));
    }

    #[test]
    fn test_new_derives_scale() {
        let pair = Pair::new(&args("ETH", "USD", 6)).unwrap();
        assert_eq!(pair.denomination_factor, 1_000_000);
        assert_eq!(pair.trim_precision, 6);
        assert!(pair.exchanges.contains("Kraken"));
        assert!(!pair.is_gas_pair());
        assert_eq!(pair.to_string(), "ETH/USD");

        let max = Pair::new(&args("ETH", "USD", MAX_DECIMALS)).unwrap();
        assert_eq!(max.denomination_factor, 1_000_000_000_000_000_000);
    }

    #[test]
    fn test_denominate() {
        let pair = Pair::new(&args("ETH", "USD", 2)).unwrap();
        assert_eq!(pair.trim(1.987654321), 1.99);
        assert_eq!(pair.denominate(1.987654321).unwrap(), 199);

        let gas = Pair::new(&args(GWEI_TICKER, "USD", 12)).unwrap();
        assert!(gas.is_gas_pair());
        assert_eq!(gas.denominate(1.987654321e-9).unwrap(), 1988);
    }

    #[test]
    fn test_denominate_round_trip_within_precision() {
        let pair = Pair::new(&args("BTC", "USD", 4)).unwrap();
        for price in [0.00012, 1.23456789, 40_000.123456, 98_765.4321] {
            let denominated = pair.denominate(price).unwrap();
            let recovered = denominated as f64 / pair.denomination_factor as f64;
            assert!((recovered - pair.trim(price)).abs() < 1e-4, "{price}");
        }
    }

    #[test]
    fn test_zero_decimals() {
        let pair = Pair::new(&args("BTC", "USD", 0)).unwrap();
        assert_eq!(pair.denomination_factor, 1);
        assert_eq!(pair.trim(40_000.6), 40_001.0);
        assert_eq!(pair.denominate(40_000.4).unwrap(), 40_000);
    }

    #[test]
    fn test_denominate_overflow_is_error() {
        let pair = Pair::new(&args("BTC", "USD", 18)).unwrap();
        assert!(matches!(
            pair.denominate(1e6),
            Err(PairError::Denomination { decimals: 18, .. })
        ));
        assert!(pair.denominate(f64::NAN).is_err());
    }

    #[test]
    fn test_deserialize_defaults() {
        let args: ArgsPair = toml::from_str("base = \"ETH\"\nquote = \"USD\"").unwrap();
        assert_eq!(args.decimals, 2);
        assert_eq!(args.percent_difference_to_notify, 0.0);
        assert!(args.exchanges.is_empty());
    }
}
