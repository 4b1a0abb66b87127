//! Configuration for the price oracle.

mod oracle;

pub use oracle::{GasStationPairConfig, GeneralConfig, OracleConfig, CONFIG_PATH_ENV, DEFAULT_CONFIG_PATH};
