use std::{collections::HashMap, sync::Arc};

use super::{error::CollectorError, traits::DataProducer, types::CollectorResult};
use crate::{
    config::metrics::SourcesConfig,
    core::metric::{MetricKind, MetricValue},
};

/// Object-safe view of a probe, so probes of different output types can
/// share one registry.
#[async_trait::async_trait]
pub trait DynProbe: Send + Sync {
    fn kind(&self) -> MetricKind;

    /// Samples the metric and converts the reading into a `MetricValue`.
    async fn sample(&self) -> CollectorResult<MetricValue>;
}

/// Adapts any `DataProducer` whose output converts into `MetricValue`.
pub struct DynWrapper<T> {
    inner: T,
    kind: MetricKind,
}

impl<T> DynWrapper<T> {
    pub fn new(kind: MetricKind, inner: T) -> Self {
        Self { inner, kind }
    }
}

#[async_trait::async_trait]
impl<T> DynProbe for DynWrapper<T>
where
    T: DataProducer,
    T::Output: Into<MetricValue>,
{
    fn kind(&self) -> MetricKind {
        self.kind
    }

    async fn sample(&self) -> CollectorResult<MetricValue> {
        let output = self.inner.produce().await?;
        Ok(output.into())
    }
}

/// Compile-time registration record for one probe.
pub struct ProbeMeta {
    pub kind: MetricKind,
    pub factory: fn(&SourcesConfig) -> Arc<dyn DynProbe>,
}

inventory::collect!(ProbeMeta);

/// Probes keyed by the metric they sample.
pub struct ProbeRegistry {
    probes: HashMap<MetricKind, Arc<dyn DynProbe>>,
}

impl ProbeRegistry {
    /// Instantiates every registered probe against `sources`.
    pub fn new(sources: &SourcesConfig) -> Self {
        let probes = inventory::iter::<ProbeMeta>
            .into_iter()
            .map(|meta| (meta.kind, (meta.factory)(sources)))
            .collect();

        ProbeRegistry { probes }
    }

    /// Builds a registry from explicit probes. Later entries replace earlier
    /// ones of the same kind.
    pub fn from_probes(probes: impl IntoIterator<Item = Arc<dyn DynProbe>>) -> Self {
        ProbeRegistry {
            probes: probes
                .into_iter()
                .map(|probe| (probe.kind(), probe))
                .collect(),
        }
    }

    pub fn get(&self, kind: MetricKind) -> CollectorResult<Arc<dyn DynProbe>> {
        self.probes
            .get(&kind)
            .cloned()
            .ok_or(CollectorError::CollectorNotFound(kind))
    }

    pub fn contains(&self, kind: MetricKind) -> bool {
        self.probes.contains_key(&kind)
    }
}

/// Registers a probe type for a metric kind. The type must implement
/// `DataProducer` and `From<&SourcesConfig>`.
#[macro_export]
macro_rules! register_probe {
    ($probe_type:ty, $kind:expr) => {
        inventory::submit! {
            $crate::core::collectors::registry::ProbeMeta {
                kind: $kind,
                factory: |sources| {
                    std::sync::Arc::new(
                        $crate::core::collectors::registry::DynWrapper::new(
                            $kind,
                            <$probe_type>::from(sources),
                        )
                    )
                },
            }
        }
    };
}
