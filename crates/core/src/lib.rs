//! Price oracle core logic.
//!
//! This crate provides:
//! - Pair validation, trimming and integer denomination
//! - Quorum/median aggregation over exchange fetchers
//! - GWEI gas price denomination into USD and other tokens
//! - The change-detecting price notifier and its notifee boundary
//! - A fixed-interval polling driver
//! - TOML configuration

mod aggregator;
pub mod config;
mod error;
mod gas;
mod notifee;
mod notifier;
mod pair;
mod polling;

pub use aggregator::{PriceAggregator, PRICE_AGGREGATOR};
pub use config::{GasStationPairConfig, GeneralConfig, OracleConfig};
pub use error::{AggregatorError, GasPriceError, NotifierError, PairError, PollingError};
pub use gas::{verify_required_pairs, GasPairInfo, GasPriceConverter, GasPriceService, GWEI_TO_ETH};
pub use notifee::{ChangeRecord, LoggingNotifee, PriceNotifee, SubmitBatchPayload};
pub use notifier::{ArgsPriceNotifier, PriceNotifier, MIN_AUTO_SEND_INTERVAL};
pub use pair::{ArgsPair, Pair, MAX_DECIMALS};
pub use polling::{PollingExecutor, PollingHandler};
