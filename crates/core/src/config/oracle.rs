//! Oracle runtime configuration.
//!
//! Loaded from a TOML file:
//! ```toml
//! [general]
//! min_results_num = 3
//! auto_send_interval_secs = 3600
//! gas_station_api = "https://api.etherscan.io/api?module=gastracker&action=gasoracle"
//!
//! [[pairs]]
//! base = "ETH"
//! quote = "USD"
//! percent_difference_to_notify = 1.0
//! decimals = 2
//! exchanges = ["Binance", "Bitfinex", "Kraken"]
//!
//! [[gas_station_pairs]]
//! quote = "USD"
//! decimals = 12
//!
//! [xexchange_token_ids]
//! "EGLD-USD" = { base = "WEGLD-bd4d79", quote = "USDC-c76f1f" }
//! ```

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use oracle_api::{EvmGasPriceFetcherConfig, XExchangeTokensPair, GWEI_TICKER};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::notifier::MIN_AUTO_SEND_INTERVAL;
use crate::pair::{ArgsPair, Pair};

/// Environment variable holding the config file path.
pub const CONFIG_PATH_ENV: &str = "ORACLE_CONFIG";
/// Config file used when `ORACLE_CONFIG` is unset.
pub const DEFAULT_CONFIG_PATH: &str = "config/config.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OracleConfig {
    #[serde(default)]
    pub general: GeneralConfig,

    /// Exchange-priced pairs.
    #[serde(default)]
    pub pairs: Vec<ArgsPair>,

    /// `GWEI/<quote>` pairs priced from the gas station.
    #[serde(default)]
    pub gas_station_pairs: Vec<GasStationPairConfig>,

    /// `BASE-QUOTE` → xExchange token identifiers.
    #[serde(default)]
    pub xexchange_token_ids: HashMap<String, XExchangeTokensPair>,
}

/// Aggregation, scheduling and gas station settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Minimum successful exchange answers per price
    #[serde(default = "default_min_results_num")]
    pub min_results_num: usize,

    /// Force-notify every pair after this long without a full send (seconds)
    #[serde(default = "default_auto_send_interval")]
    pub auto_send_interval_secs: u64,

    /// Delay between successful cycles (seconds)
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    /// Delay after a failed cycle (seconds)
    #[serde(default = "default_poll_interval_when_error")]
    pub poll_interval_when_error_secs: u64,

    /// HTTP request timeout (seconds)
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Gas station endpoint
    #[serde(default)]
    pub gas_station_api: String,

    /// Dotted path of the GWEI price inside the gas station response
    #[serde(default = "default_gas_station_selector")]
    pub gas_station_selector: String,
}

fn default_min_results_num() -> usize {
    3
}
fn default_auto_send_interval() -> u64 {
    3600
}
fn default_poll_interval() -> u64 {
    10
}
fn default_poll_interval_when_error() -> u64 {
    30
}
fn default_request_timeout() -> u64 {
    10
}
fn default_gas_station_selector() -> String {
    "result.SafeGasPrice".to_string()
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            min_results_num: default_min_results_num(),
            auto_send_interval_secs: default_auto_send_interval(),
            poll_interval_secs: default_poll_interval(),
            poll_interval_when_error_secs: default_poll_interval_when_error(),
            request_timeout_secs: default_request_timeout(),
            gas_station_api: String::new(),
            gas_station_selector: default_gas_station_selector(),
        }
    }
}

impl GeneralConfig {
    pub fn auto_send_interval(&self) -> Duration {
        Duration::from_secs(self.auto_send_interval_secs)
    }
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
    pub fn poll_interval_when_error(&self) -> Duration {
        Duration::from_secs(self.poll_interval_when_error_secs)
    }
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// A `GWEI/<quote>` pair. The base is implied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GasStationPairConfig {
    pub quote: String,

    #[serde(default)]
    pub percent_difference_to_notify: f64,

    #[serde(default = "default_gas_decimals")]
    pub decimals: u32,
}

fn default_gas_decimals() -> u32 {
    12
}

impl GasStationPairConfig {
    pub fn to_args_pair(&self) -> ArgsPair {
        ArgsPair {
            base: GWEI_TICKER.to_string(),
            quote: self.quote.clone(),
            percent_difference_to_notify: self.percent_difference_to_notify,
            decimals: self.decimals,
            exchanges: Vec::new(),
        }
    }
}

impl OracleConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml(&content).with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Load from `ORACLE_CONFIG`, falling back to `config/config.toml`.
    pub fn from_env() -> Result<Self> {
        let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        info!(path = %path, "Loading oracle configuration");
        Self::from_file(path)
    }

    /// Exchange pairs followed by the gas station pairs, in notification order.
    pub fn all_pairs(&self) -> Vec<ArgsPair> {
        self.pairs
            .iter()
            .cloned()
            .chain(self.gas_station_pairs.iter().map(GasStationPairConfig::to_args_pair))
            .collect()
    }

    pub fn evm_gas_config(&self) -> EvmGasPriceFetcherConfig {
        EvmGasPriceFetcherConfig {
            api_url: self.general.gas_station_api.clone(),
            selector: self.general.gas_station_selector.clone(),
        }
    }

    /// Reject settings the components would refuse at construction.
    pub fn validate(&self) -> Result<()> {
        let general = &self.general;
        if general.min_results_num < 1 {
            bail!("general.min_results_num must be at least 1");
        }
        if general.auto_send_interval() < MIN_AUTO_SEND_INTERVAL {
            bail!(
                "general.auto_send_interval_secs must be at least {}",
                MIN_AUTO_SEND_INTERVAL.as_secs()
            );
        }
        if general.poll_interval_secs == 0 || general.poll_interval_when_error_secs == 0 {
            bail!("general poll intervals must be greater than zero");
        }
        if general.request_timeout_secs == 0 {
            bail!("general.request_timeout_secs must be greater than zero");
        }
        if self.pairs.is_empty() && self.gas_station_pairs.is_empty() {
            bail!("no pairs configured");
        }

        for (index, pair) in self.pairs.iter().enumerate() {
            Pair::new(pair).with_context(|| format!("pairs[{index}] is invalid"))?;
            if pair.base == GWEI_TICKER {
                bail!("pairs[{index}]: {GWEI_TICKER} pairs belong in gas_station_pairs");
            }
            if pair.exchanges.is_empty() {
                bail!("pairs[{index}] {}/{} has no exchanges", pair.base, pair.quote);
            }
        }
        for (index, pair) in self.gas_station_pairs.iter().enumerate() {
            Pair::new(&pair.to_args_pair()).with_context(|| format!("gas_station_pairs[{index}] is invalid"))?;
        }
        if !self.gas_station_pairs.is_empty() && general.gas_station_api.trim().is_empty() {
            bail!("general.gas_station_api is required when gas_station_pairs are configured");
        }

        for key in self.xexchange_token_ids.keys() {
            match key.split_once('-') {
                Some((base, quote)) if !base.is_empty() && !quote.is_empty() => {}
                _ => bail!("xexchange_token_ids key {key:?} must look like BASE-QUOTE"),
            }
        }

        Ok(())
    }

    /// Log the current configuration.
    pub fn log_config(&self) {
        info!(
            min_results_num = self.general.min_results_num,
            auto_send_interval_secs = self.general.auto_send_interval_secs,
            poll_interval_secs = self.general.poll_interval_secs,
            poll_interval_when_error_secs = self.general.poll_interval_when_error_secs,
            request_timeout_secs = self.general.request_timeout_secs,
            "Oracle configuration loaded"
        );
        for pair in &self.pairs {
            info!(
                pair = %format!("{}/{}", pair.base, pair.quote),
                threshold_pct = pair.percent_difference_to_notify,
                decimals = pair.decimals,
                exchanges = %pair.exchanges.join(","),
                "Configured pair"
            );
        }
        for pair in &self.gas_station_pairs {
            info!(
                pair = %format!("{GWEI_TICKER}/{}", pair.quote),
                threshold_pct = pair.percent_difference_to_notify,
                decimals = pair.decimals,
                gas_station = %self.general.gas_station_api,
                selector = %self.general.gas_station_selector,
                "Configured gas pair"
            );
        }
        if !self.xexchange_token_ids.is_empty() {
            info!(mappings = self.xexchange_token_ids.len(), "xExchange token mappings");
        }
    }
}
