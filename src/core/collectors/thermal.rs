use std::path::PathBuf;

use tracing::{trace, warn};

use super::{error::CollectorError, traits::DataProducer, types::CollectorResult};
use crate::{config::metrics::SourcesConfig, core::metric::MetricKind, register_probe};

/// CPU temperature in whole degrees Celsius from a thermal zone `temp` file.
///
/// Boards without a thermal zone are common, so a missing or unreadable
/// file yields `None` instead of an error.
#[derive(Debug, Clone)]
pub struct CpuTempCollector {
    path: PathBuf,
}

impl CpuTempCollector {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        CpuTempCollector { path: path.into() }
    }

    async fn read(&self) -> CollectorResult<i64> {
        let content = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|source| CollectorError::file_read(&self.path, source))?;
        parse_millidegrees(&content, &self.path.display().to_string())
    }
}

impl From<&SourcesConfig> for CpuTempCollector {
    fn from(sources: &SourcesConfig) -> Self {
        CpuTempCollector::new(&sources.thermal_zone)
    }
}

/// Converts a millidegree reading (`"48312"`) to whole degrees by dropping
/// the last three digits.
pub fn parse_millidegrees(content: &str, location: &str) -> CollectorResult<i64> {
    let raw = content
        .lines()
        .map(str::trim)
        .rfind(|line| !line.is_empty())
        .ok_or_else(|| CollectorError::InvalidFormat {
            location: location.to_string(),
            reason: "file is empty".to_string(),
        })?;

    let millidegrees = raw
        .parse::<i64>()
        .map_err(|_| CollectorError::parse("cpu_temp", location, format!("invalid value: {raw}")))?;

    Ok(millidegrees / 1000)
}

#[async_trait::async_trait]
impl DataProducer for CpuTempCollector {
    type Output = Option<i64>;

    async fn produce(&self) -> CollectorResult<Self::Output> {
        match self.read().await {
            Ok(degrees) => {
                trace!(degrees, "Read CPU temperature");
                Ok(Some(degrees))
            }
            Err(e) => {
                warn!("CPU temperature unavailable: {}", e);
                Ok(None)
            }
        }
    }
}

register_probe!(CpuTempCollector, MetricKind::CpuTemp);
