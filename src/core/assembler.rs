//! Measurement assembly: sample every enabled metric into one [`Snapshot`].

use tracing::{debug, error};

use super::{
    collectors::{error::CollectorError, registry::ProbeRegistry, types::CollectorResult},
    metric::{MetricKind, MetricValue, Snapshot},
};
use crate::config::metrics::MetricsConfig;

/// Samples the enabled metrics in table order, one probe at a time.
///
/// Disabled kinds never reach their probe and are absent from the result.
/// The first probe error aborts the run and is returned wrapped with the
/// metric it was sampling.
pub async fn assemble(config: &MetricsConfig, registry: &ProbeRegistry) -> CollectorResult<Snapshot> {
    let mut snapshot = Snapshot::new();

    for kind in MetricKind::ALL.into_iter().filter(|kind| config.is_enabled(*kind)) {
        let value = sample(kind, registry).await.map_err(|e| {
            error!("Failed to sample '{}': {}", kind, e);
            match e {
                CollectorError::CollectorNotFound(_) => e,
                other => CollectorError::Probe {
                    metric: kind,
                    source: Box::new(other),
                },
            }
        })?;

        debug!(metric = %kind, ?value, "Sampled");
        snapshot.insert(kind, value);
    }

    Ok(snapshot)
}

async fn sample(kind: MetricKind, registry: &ProbeRegistry) -> CollectorResult<MetricValue> {
    registry.get(kind)?.sample().await
}
