//! One complete run: start delay, collection, connection and publishing.
//!
//! The `Executor` samples every enabled metric before it touches the
//! network, so a probe failure never opens a broker connection.

use std::{future::Future, pin::pin};

use rand::Rng;
use sbcmon_mqtt::TransferError;
use thiserror::Error;
use tokio::time::{sleep, Duration};
use tracing::{debug, info};

use super::{
    assembler::assemble,
    collectors::{error::CollectorError, registry::ProbeRegistry},
    host::HostIdentity,
    metric::Snapshot,
    publisher::{PublishError, Publisher, Transport},
};
use crate::config::{publish::PublishConfig, Config};

#[derive(Error, Debug)]
pub enum ExecutorError {
    #[error("Collection failed: {0}")]
    Collect(#[from] CollectorError),

    #[error("Could not connect to broker: {0}")]
    Connect(#[from] TransferError),

    #[error("Publishing failed: {0}")]
    Publish(#[from] PublishError),

    #[error("Interrupted by shutdown signal")]
    Interrupted,
}

pub struct Executor<'a> {
    config: &'a Config,
    registry: &'a ProbeRegistry,
    host: &'a HostIdentity,
}

impl<'a> Executor<'a> {
    pub fn new(config: &'a Config, registry: &'a ProbeRegistry, host: &'a HostIdentity) -> Self {
        Self {
            config,
            registry,
            host,
        }
    }

    /// Runs once and returns. `connect` opens the transport and is only
    /// called after every metric has been sampled.
    ///
    /// Completing `shutdown` abandons the run. Once a transport is open it
    /// is still closed before returning.
    pub async fn run_once<F, Fut, T, S>(&self, connect: F, shutdown: S) -> Result<(), ExecutorError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, TransferError>>,
        T: Transport,
        S: Future<Output = ()>,
    {
        let mut shutdown = pin!(shutdown);

        let (snapshot, mut transport) = tokio::select! {
            biased;
            _ = &mut shutdown => {
                info!("Shutdown requested before publishing");
                return Err(ExecutorError::Interrupted);
            }
            prepared = self.prepare(connect) => prepared?,
        };

        Publisher::new(&self.config.publish, self.host)
            .publish(&snapshot, &mut transport, shutdown)
            .await?;

        Ok(())
    }

    async fn prepare<F, Fut, T>(&self, connect: F) -> Result<(Snapshot, T), ExecutorError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, TransferError>>,
    {
        let delay = start_delay(&self.config.publish);
        if !delay.is_zero() {
            info!("Delaying start by {:.2}s", delay.as_secs_f64());
            sleep(delay).await;
        }

        let snapshot = assemble(&self.config.metrics, self.registry).await?;
        info!(metrics = snapshot.len(), "Collected metrics");

        let transport = connect().await?;
        debug!("Transport ready");

        Ok((snapshot, transport))
    }
}

/// Uniformly random in `[0, random_delay]` seconds.
fn start_delay(config: &PublishConfig) -> Duration {
    if !config.random_delay.is_finite() || config.random_delay <= 0.0 {
        return Duration::ZERO;
    }
    let secs = rand::rng().random_range(0.0..=config.random_delay);
    Duration::from_secs_f64(secs)
}
