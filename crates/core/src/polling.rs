//! Fixed-interval driver for a periodic job.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::error::PollingError;

/// A job run once per tick.
#[async_trait]
pub trait PollingExecutor: Send + Sync + 'static {
    type Error: fmt::Display + Send + Sync + 'static;

    async fn execute(&self) -> Result<(), Self::Error>;
}

/// Runs an executor every `polling_interval`, or every `polling_when_error`
/// after a failed run, on its own tokio task.
pub struct PollingHandler<E: PollingExecutor> {
    name: String,
    executor: Arc<E>,
    polling_interval: Duration,
    polling_when_error: Duration,
    shutdown: Option<watch::Sender<bool>>,
    task: Option<JoinHandle<()>>,
}

impl<E: PollingExecutor> PollingHandler<E> {
    pub fn new(
        name: impl Into<String>,
        executor: Arc<E>,
        polling_interval: Duration,
        polling_when_error: Duration,
    ) -> Result<Self, PollingError> {
        if polling_interval.is_zero() {
            return Err(PollingError::ZeroInterval("polling_interval"));
        }
        if polling_when_error.is_zero() {
            return Err(PollingError::ZeroInterval("polling_when_error"));
        }

        Ok(Self {
            name: name.into(),
            executor,
            polling_interval,
            polling_when_error,
            shutdown: None,
            task: None,
        })
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    pub fn start(&mut self) -> Result<(), PollingError> {
        if self.task.is_some() {
            return Err(PollingError::AlreadyStarted(self.name.clone()));
        }

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(run(
            self.name.clone(),
            self.executor.clone(),
            self.polling_interval,
            self.polling_when_error,
            shutdown_rx,
        ));

        self.shutdown = Some(shutdown_tx);
        self.task = Some(task);
        Ok(())
    }

    /// Stop the loop and wait for the task. An in-flight run is dropped.
    pub async fn close(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(true);
        }
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!(handler = %self.name, error = %e, "Polling task ended abnormally");
            }
        }
    }
}

async fn run<E: PollingExecutor>(
    name: String,
    executor: Arc<E>,
    polling_interval: Duration,
    polling_when_error: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    info!(
        handler = %name,
        polling_interval = ?polling_interval,
        polling_when_error = ?polling_when_error,
        "Polling started"
    );

    loop {
        let result = tokio::select! {
            result = executor.execute() => result,
            _ = shutdown.changed() => break,
        };

        let wait = match result {
            Ok(()) => polling_interval,
            Err(e) => {
                error!(handler = %name, error = %e, "Polling cycle failed");
                polling_when_error
            }
        };

        tokio::select! {
            _ = tokio::time::sleep(wait) => {}
            _ = shutdown.changed() => break,
        }
    }

    info!(handler = %name, "Polling stopped");
}
