//! Price Oracle
//!
//! Polls crypto exchanges and an EVM gas station, aggregates a median price
//! per configured pair and notifies downstream when a price moves past its
//! threshold or the auto-send interval elapses.

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use oracle_api::{FetcherArgs, FetcherRegistry, HttpResponseGetter, EVM_GAS_PRICE_STATION};
use oracle_core::{
    ArgsPriceNotifier, GasPriceConverter, GasPriceService, LoggingNotifee, OracleConfig, Pair,
    PollingHandler, PriceAggregator, PriceNotifier,
};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,oracle_core=debug,oracle_api=debug")),
        )
        .init();

    // ORACLE_CONFIG selects the file, default config/config.toml
    let config = OracleConfig::from_env()?;
    config.validate().context("Invalid oracle configuration")?;
    config.log_config();

    info!("Starting price oracle");

    let mut handler = initialize_components(&config)?;
    handler.start()?;

    wait_for_shutdown().await;

    info!("Shutting down");
    handler.close().await;
    info!("Price oracle stopped");

    Ok(())
}

fn initialize_components(config: &OracleConfig) -> Result<PollingHandler<PriceNotifier>> {
    info!("Initializing components...");

    let http = Arc::new(HttpResponseGetter::with_timeout(config.general.request_timeout())?);
    let fetcher_args = FetcherArgs {
        response_getter: http.clone(),
        graphql_getter: http,
        evm_gas_config: config.evm_gas_config(),
        xexchange_tokens: config.xexchange_token_ids.clone(),
    };

    let registry = FetcherRegistry::with_defaults();
    let known_exchanges = registry.exchange_names();
    for pair in &config.pairs {
        for exchange in &pair.exchanges {
            if exchange == EVM_GAS_PRICE_STATION || !registry.contains(exchange) {
                bail!(
                    "pair {}/{} names unknown exchange {exchange:?}, known: {}",
                    pair.base,
                    pair.quote,
                    known_exchanges.join(", ")
                );
            }
        }
    }

    // Aggregator
    let fetchers = registry.create_exchanges(&fetcher_args)?;
    let aggregator = Arc::new(PriceAggregator::new(fetchers, config.general.min_results_num)?);
    for args in &config.pairs {
        aggregator.add_pair(&Pair::new(args)?);
    }
    info!(
        exchanges = known_exchanges.len(),
        min_results_num = aggregator.min_results_num(),
        "Price aggregator initialized"
    );

    // Gas price service, only when gas pairs are configured
    let gas_price_service: Option<Arc<dyn GasPriceConverter>> = if config.gas_station_pairs.is_empty() {
        None
    } else {
        let gas_fetcher = registry.create(EVM_GAS_PRICE_STATION, &fetcher_args)?;
        info!(
            api = %config.general.gas_station_api,
            selector = %config.general.gas_station_selector,
            "Gas price service initialized"
        );
        Some(Arc::new(GasPriceService::new(gas_fetcher)))
    };

    let notifier = PriceNotifier::new(ArgsPriceNotifier {
        pairs: config.all_pairs(),
        aggregator,
        gas_price_service,
        notifee: Arc::new(LoggingNotifee),
        auto_send_interval: config.general.auto_send_interval(),
    })?;
    info!(pairs = notifier.pairs().len(), "Price notifier initialized");

    let handler = PollingHandler::new(
        "price notifier",
        Arc::new(notifier),
        config.general.poll_interval(),
        config.general.poll_interval_when_error(),
    )?;

    info!("All components initialized");
    Ok(handler)
}

/// Resolve on Ctrl+C or SIGTERM.
async fn wait_for_shutdown() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C"),
        _ = terminate => info!("Received SIGTERM"),
    }
}
