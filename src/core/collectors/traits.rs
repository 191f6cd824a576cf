use super::types::CollectorResult;

/// A probe that reads one metric from the OS or hardware.
///
/// Implementors return their natural type (`f64`, `i64`, `Option<f64>`, ...)
/// and the registry converts it into a
/// [`MetricValue`](crate::core::metric::MetricValue). Probes whose failure is
/// tolerated return `Option<T>`, where `None` becomes `Unavailable`.
#[async_trait::async_trait]
pub trait DataProducer: Send + Sync + 'static {
    type Output: Send + Sync + 'static;

    /// Takes one reading.
    async fn produce(&self) -> CollectorResult<Self::Output>;
}
